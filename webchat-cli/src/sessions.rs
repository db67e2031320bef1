//! Session-management view.

use anyhow::{bail, Result};
use webchat_core::SessionStore;

use crate::render;

/// Resolve a user-typed id against known sessions: the stored ones plus the
/// active session, which has no record until its first message. Accepts an
/// exact id or a prefix matching exactly one session.
pub fn resolve_session(store: &SessionStore, input: &str) -> Result<String> {
    let input = input.trim().trim_end_matches("...");
    if input.is_empty() {
        bail!("session id is empty");
    }

    let mut known: Vec<String> = store.list_sessions()?.into_iter().map(|s| s.id).collect();
    if let Some(active) = store.active_session()? {
        if !known.contains(&active) {
            known.push(active);
        }
    }

    if known.iter().any(|id| id == input) {
        return Ok(input.to_string());
    }

    let matches: Vec<&str> = known
        .iter()
        .map(String::as_str)
        .filter(|id| id.starts_with(input))
        .collect();

    match matches.as_slice() {
        [only] => Ok(only.to_string()),
        [] => bail!("no session matches '{}' (see `sessions list`)", input),
        many => bail!("'{}' matches {} sessions, use more characters", input, many.len()),
    }
}

pub fn list(store: &SessionStore, json: bool) -> Result<()> {
    let sessions = store.list_sessions()?;
    let active = store.active_session()?;

    if json {
        let rows = render::session_rows(&sessions, active.as_deref());
        println!("{}", serde_json::to_string_pretty(&rows)?);
    } else {
        render::print_sessions(&sessions, active.as_deref());
    }
    Ok(())
}

pub fn create(store: &SessionStore) -> Result<String> {
    let id = store.create_session()?;
    println!("Started new chat: {}", render::short_id(&id));
    Ok(id)
}

pub fn switch(store: &SessionStore, input: &str) -> Result<String> {
    let id = resolve_session(store, input)?;
    store.set_active(&id)?;
    println!("Switched to session {}", render::short_id(&id));
    Ok(id)
}

/// Delete a session. Returns the session that is active afterwards.
pub fn delete(store: &SessionStore, input: &str) -> Result<Option<String>> {
    let id = resolve_session(store, input)?;
    let replacement = store.delete_session(&id)?;
    println!("Deleted session {}", render::short_id(&id));
    if let Some(new_id) = &replacement {
        println!("Started new chat: {}", render::short_id(new_id));
    }
    Ok(replacement)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use webchat_core::{MemoryStorage, Message};

    fn store_with(ids: &[&str]) -> SessionStore {
        let store = SessionStore::new(Arc::new(MemoryStorage::new()));
        for id in ids {
            store.save(id, &[Message::user(id, "hi")]).unwrap();
        }
        store
    }

    #[test]
    fn test_resolve_exact_and_unique_prefix() {
        let store = store_with(&["7b5c24ab-1111", "deadbeef-2222"]);

        assert_eq!(resolve_session(&store, "deadbeef-2222").unwrap(), "deadbeef-2222");
        assert_eq!(resolve_session(&store, "7b5c").unwrap(), "7b5c24ab-1111");
        assert_eq!(resolve_session(&store, "7b5c24ab...").unwrap(), "7b5c24ab-1111");
    }

    #[test]
    fn test_resolve_ambiguous_prefix_fails() {
        let store = store_with(&["abc-1", "abc-2"]);
        assert!(resolve_session(&store, "abc").is_err());
    }

    #[test]
    fn test_resolve_unknown_fails() {
        let store = store_with(&["abc-1"]);
        assert!(resolve_session(&store, "zzz").is_err());
        assert!(resolve_session(&store, "   ").is_err());
    }

    #[test]
    fn test_resolve_active_session_without_record() {
        let store = store_with(&["abc-1"]);
        let fresh = store.create_session().unwrap();

        assert_eq!(resolve_session(&store, &fresh).unwrap(), fresh);
        assert_eq!(resolve_session(&store, &fresh[..8]).unwrap(), fresh);
    }

    #[test]
    fn test_switch_to_unknown_keeps_active() {
        let store = store_with(&["abc-1"]);
        store.set_active("abc-1").unwrap();

        assert!(switch(&store, "abx").is_err());
        assert_eq!(store.active_session().unwrap().as_deref(), Some("abc-1"));
    }

    #[test]
    fn test_delete_unknown_fails_and_keeps_sessions() {
        let store = store_with(&["abc-1"]);

        assert!(delete(&store, "nope").is_err());
        let ids: Vec<String> = store.list_sessions().unwrap().into_iter().map(|s| s.id).collect();
        assert_eq!(ids, vec!["abc-1"]);
    }

    #[test]
    fn test_delete_active_via_prefix_replaces_it() {
        let store = store_with(&["abc-1"]);
        store.set_active("abc-1").unwrap();

        let replacement = delete(&store, "abc").unwrap().expect("replacement");
        assert_eq!(store.active_session().unwrap(), Some(replacement));
        assert!(store.list_sessions().unwrap().is_empty());
    }
}
