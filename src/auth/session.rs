//! The logged-in user, persisted across restarts.

use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::token::Claim;
use crate::storage::Storage;

/// Storage key the session is persisted under.
pub const PERSIST_KEY: &str = "persist:root";

/// Current user and credential. Both are set together or both are empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
  pub user: Option<Claim>,
  pub token: Option<String>,
}

impl Session {
  pub fn is_authenticated(&self) -> bool {
    self.user.is_some() && self.token.is_some()
  }
}

/// Persisted document: `{"auth": {"user": ..., "token": ...}}`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct PersistedState {
  #[serde(default)]
  auth: Session,
}

/// Owner of the session.
///
/// Every change is written to storage first and only then made visible, so a
/// failed write leaves the previous session in place.
pub struct SessionStore {
  session: Session,
  storage: Arc<dyn Storage>,
}

impl SessionStore {
  /// Load the persisted session, or start empty if there is none.
  pub fn rehydrate(storage: Arc<dyn Storage>) -> Result<Self> {
    let session = match storage.get_item(PERSIST_KEY)? {
      Some(raw) => match serde_json::from_str::<PersistedState>(&raw) {
        Ok(state) => state.auth,
        Err(e) => {
          tracing::warn!(error = %e, "persisted session is unreadable, starting logged out");
          Session::default()
        }
      },
      None => Session::default(),
    };

    if let Some(user) = &session.user {
      tracing::debug!(email = %user.email, role = %user.role, "session rehydrated");
    }

    Ok(Self { session, storage })
  }

  pub fn session(&self) -> &Session {
    &self.session
  }

  /// The user, when a complete session is held.
  pub fn current_user(&self) -> Option<&Claim> {
    if self.session.is_authenticated() {
      self.session.user.as_ref()
    } else {
      None
    }
  }

  /// Replace user and token together.
  pub fn set_user(&mut self, user: Claim, token: String) -> Result<()> {
    tracing::info!(email = %user.email, role = %user.role, "session started");
    self.replace(Session {
      user: Some(user),
      token: Some(token),
    })
  }

  /// Put back a session taken earlier with `session()`.
  pub fn restore(&mut self, session: Session) -> Result<()> {
    tracing::debug!("session restored");
    self.replace(session)
  }

  /// Clear user and token together.
  pub fn logout(&mut self) -> Result<()> {
    tracing::info!("session cleared");
    self.replace(Session::default())
  }

  fn replace(&mut self, next: Session) -> Result<()> {
    let state = PersistedState { auth: next };
    let raw =
      serde_json::to_string(&state).map_err(|e| eyre!("Failed to encode session: {}", e))?;
    self.storage.set_item(PERSIST_KEY, &raw)?;
    self.session = state.auth;
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::auth::token::{decode_token, token_for};
  use crate::storage::MemoryStorage;
  use pretty_assertions::assert_eq;

  /// Storage whose writes always fail.
  struct ReadOnlyStorage;

  impl Storage for ReadOnlyStorage {
    fn get_item(&self, _key: &str) -> Result<Option<String>> {
      Ok(None)
    }

    fn set_item(&self, _key: &str, _value: &str) -> Result<()> {
      Err(eyre!("read-only"))
    }

    fn remove_item(&self, _key: &str) -> Result<()> {
      Err(eyre!("read-only"))
    }
  }

  fn admin() -> (Claim, String) {
    let token = token_for("Admin");
    (decode_token(&token).unwrap(), token)
  }

  #[test]
  fn test_starts_empty() {
    let store = SessionStore::rehydrate(Arc::new(MemoryStorage::new())).unwrap();
    assert_eq!(store.session(), &Session::default());
    assert!(!store.session().is_authenticated());
  }

  #[test]
  fn test_set_user_then_logout_is_identity() {
    let mut store = SessionStore::rehydrate(Arc::new(MemoryStorage::new())).unwrap();
    let initial = store.session().clone();

    let (claim, token) = admin();
    store.set_user(claim.clone(), token.clone()).unwrap();
    assert_eq!(store.current_user(), Some(&claim));
    assert_eq!(store.session().token.as_deref(), Some(token.as_str()));

    store.logout().unwrap();
    assert_eq!(store.session(), &initial);
  }

  #[test]
  fn test_rehydrates_persisted_session() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let (claim, token) = admin();
    {
      let mut store = SessionStore::rehydrate(storage.clone()).unwrap();
      store.set_user(claim.clone(), token.clone()).unwrap();
    }

    let raw = storage.get_item(PERSIST_KEY).unwrap().unwrap();
    let doc: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(doc["auth"]["token"], serde_json::json!(token));
    assert_eq!(doc["auth"]["user"]["role"], serde_json::json!("Admin"));

    let store = SessionStore::rehydrate(storage).unwrap();
    assert_eq!(store.current_user(), Some(&claim));
    assert!(store.session().is_authenticated());
  }

  #[test]
  fn test_user_without_token_is_not_current() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    let (claim, _) = admin();
    let doc = serde_json::json!({"auth": {"user": claim, "token": null}});
    storage.set_item(PERSIST_KEY, &doc.to_string()).unwrap();

    let store = SessionStore::rehydrate(storage).unwrap();
    assert!(store.session().user.is_some());
    assert_eq!(store.current_user(), None);
  }

  #[test]
  fn test_corrupt_record_rehydrates_empty() {
    let storage: Arc<dyn Storage> = Arc::new(MemoryStorage::new());
    storage.set_item(PERSIST_KEY, "{ nope").unwrap();

    let store = SessionStore::rehydrate(storage).unwrap();
    assert_eq!(store.session(), &Session::default());
  }

  #[test]
  fn test_failed_write_keeps_previous_session() {
    let mut store = SessionStore::rehydrate(Arc::new(ReadOnlyStorage)).unwrap();
    let (claim, token) = admin();

    assert!(store.set_user(claim, token).is_err());
    assert_eq!(store.session(), &Session::default());
  }
}
