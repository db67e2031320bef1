use thiserror::Error;

use crate::delivery::DeliveryError;
use crate::storage::StorageError;

#[derive(Error, Debug)]
pub enum WebchatError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Delivery error: {0}")]
    Delivery(#[from] DeliveryError),

    #[error("Config error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Other error: {0}")]
    Other(String),
}
