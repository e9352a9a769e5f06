//! Cookies persisted in client storage.
//!
//! The access token is mirrored here so the route guard can inspect it on
//! navigation, separately from the session store.

use chrono::{DateTime, Duration, Utc};
use color_eyre::{eyre::eyre, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::Storage;

pub const ACCESS_TOKEN_COOKIE: &str = "accessToken";
pub const REFRESH_TOKEN_COOKIE: &str = "refreshToken";

#[derive(Debug, Serialize, Deserialize)]
struct StoredCookie {
  value: String,
  expires_at: DateTime<Utc>,
}

/// Named cookies with an expiry, stored under `cookie:<name>`.
#[derive(Clone)]
pub struct CookieJar {
  storage: Arc<dyn Storage>,
}

impl CookieJar {
  pub fn new(storage: Arc<dyn Storage>) -> Self {
    Self { storage }
  }

  fn storage_key(name: &str) -> String {
    format!("cookie:{}", name)
  }

  /// Read a cookie. Expired or unreadable cookies are dropped and read as absent.
  pub fn get(&self, name: &str) -> Result<Option<String>> {
    self.get_at(name, Utc::now())
  }

  fn get_at(&self, name: &str, now: DateTime<Utc>) -> Result<Option<String>> {
    let key = Self::storage_key(name);
    let Some(raw) = self.storage.get_item(&key)? else {
      return Ok(None);
    };

    match serde_json::from_str::<StoredCookie>(&raw) {
      Ok(cookie) if cookie.expires_at > now => Ok(Some(cookie.value)),
      Ok(_) => {
        tracing::debug!(cookie = name, "cookie expired");
        self.storage.remove_item(&key)?;
        Ok(None)
      }
      Err(e) => {
        tracing::warn!(cookie = name, error = %e, "discarding unreadable cookie");
        self.storage.remove_item(&key)?;
        Ok(None)
      }
    }
  }

  /// Store a cookie that expires after `max_age`.
  pub fn set(&self, name: &str, value: &str, max_age: Duration) -> Result<()> {
    let cookie = StoredCookie {
      value: value.to_string(),
      expires_at: Utc::now() + max_age,
    };
    let raw =
      serde_json::to_string(&cookie).map_err(|e| eyre!("Failed to encode cookie: {}", e))?;
    self.storage.set_item(&Self::storage_key(name), &raw)
  }

  pub fn remove(&self, name: &str) -> Result<()> {
    self.storage.remove_item(&Self::storage_key(name))
  }
}
