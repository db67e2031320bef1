use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

pub const DEFAULT_WEBHOOK_URL: &str = "https://n8n.atendimentomed.com.br/webhook/casa-na-serra";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct WebchatConfig {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub webhook: WebhookConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub delivery: DeliveryConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServiceConfig {
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct WebhookConfig {
    pub url: String,
    pub timeout_seconds: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_WEBHOOK_URL.to_string(),
            timeout_seconds: 30,
        }
    }
}

/// Retry policy for webhook delivery.
///
/// The delay before retry `n` (0-based) is `min(base_delay_ms * 2^n, max_delay_ms)`.
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub max_retries: usize,
    pub base_delay_ms: u64,
    pub max_delay_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Spacing between consecutive paragraphs of one reply.
    pub reveal_delay_ms: u64,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            reveal_delay_ms: 2000,
        }
    }
}

impl DeliveryConfig {
    pub fn reveal_delay(&self) -> Duration {
        Duration::from_millis(self.reveal_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: "~/.webchat/storage.json".to_string(),
        }
    }
}

impl StorageConfig {
    /// Storage path with a leading `~` expanded to the home directory.
    pub fn resolved_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.path).into_owned())
    }
}

impl WebchatConfig {
    /// Load config from an optional TOML file, then `WEBCHAT__*` environment
    /// variables (e.g. `WEBCHAT__WEBHOOK__URL`). Missing values fall back to defaults.
    pub fn load(path: &str) -> Result<Self, ConfigError> {
        let s = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix("WEBCHAT")
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()?;
        s.try_deserialize()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_delivery_contract() {
        let config = WebchatConfig::default();
        assert_eq!(config.retry.max_retries, 3);
        assert_eq!(config.retry.base_delay_ms, 1000);
        assert_eq!(config.retry.max_delay_ms, 10_000);
        assert_eq!(config.delivery.reveal_delay(), Duration::from_millis(2000));
        assert_eq!(config.webhook.url, DEFAULT_WEBHOOK_URL);
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.toml");
        let config = WebchatConfig::load(path.to_str().unwrap()).expect("defaults should load");
        assert_eq!(config.retry, RetryConfig::default());
        assert_eq!(config.service.log_level, "warn");
    }

    #[test]
    fn test_load_partial_file_overrides_only_given_sections() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("webchat.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            "[webhook]\nurl = \"http://localhost:9999/hook\"\ntimeout_seconds = 5\n\n[retry]\nmax_retries = 1"
        )
        .unwrap();

        let config = WebchatConfig::load(path.to_str().unwrap()).unwrap();
        assert_eq!(config.webhook.url, "http://localhost:9999/hook");
        assert_eq!(config.webhook.timeout_seconds, 5);
        assert_eq!(config.retry.max_retries, 1);
        assert_eq!(config.retry.base_delay_ms, 1000, "unset fields keep defaults");
        assert_eq!(config.delivery.reveal_delay_ms, 2000);
    }

    #[test]
    fn test_storage_path_expands_tilde() {
        let storage = StorageConfig::default();
        assert!(storage.resolved_path().ends_with(".webchat/storage.json"));

        let plain = StorageConfig {
            path: "/var/lib/webchat/store.json".to_string(),
        };
        assert_eq!(plain.resolved_path(), PathBuf::from("/var/lib/webchat/store.json"));
    }
}
