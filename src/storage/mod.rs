//! Durable client-side state.
//!
//! Stands in for the browser's local storage and cookie jar: a flat string
//! key/value store with a SQLite backend for real use and an in-memory one for
//! tests. Higher-level views (`CookieJar`, the session store) layer their own
//! key conventions and JSON encoding on top.

mod cookies;
mod sqlite;

use color_eyre::Result;
#[cfg(test)]
use color_eyre::eyre::eyre;
#[cfg(test)]
use std::collections::HashMap;
#[cfg(test)]
use std::sync::Mutex;

pub use cookies::{CookieJar, ACCESS_TOKEN_COOKIE, REFRESH_TOKEN_COOKIE};
pub use sqlite::SqliteStorage;

/// Trait for key/value storage backends.
pub trait Storage: Send + Sync {
  /// Read the value stored under `key`.
  fn get_item(&self, key: &str) -> Result<Option<String>>;

  /// Store `value` under `key`, replacing any previous value.
  fn set_item(&self, key: &str, value: &str) -> Result<()>;

  /// Remove `key`. Removing a missing key is not an error.
  fn remove_item(&self, key: &str) -> Result<()>;
}

/// Storage that lives only as long as the process.
#[cfg(test)]
#[derive(Default)]
pub struct MemoryStorage {
  items: Mutex<HashMap<String, String>>,
}

#[cfg(test)]
impl MemoryStorage {
  pub fn new() -> Self {
    Self::default()
  }
}

#[cfg(test)]
impl Storage for MemoryStorage {
  fn get_item(&self, key: &str) -> Result<Option<String>> {
    let items = self
      .items
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    Ok(items.get(key).cloned())
  }

  fn set_item(&self, key: &str, value: &str) -> Result<()> {
    let mut items = self
      .items
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    items.insert(key.to_string(), value.to_string());
    Ok(())
  }

  fn remove_item(&self, key: &str) -> Result<()> {
    let mut items = self
      .items
      .lock()
      .map_err(|e| eyre!("Lock poisoned: {}", e))?;
    items.remove(key);
    Ok(())
  }
}
