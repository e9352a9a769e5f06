use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::auth::guard::DEFAULT_LOGIN_PATH;

/// Environment variable that overrides `api.base_url`.
pub const BASE_API_ENV: &str = "FOLIO_BASE_API";

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
  #[serde(default)]
  pub api: ApiConfig,
  #[serde(default)]
  pub guard: GuardConfig,
  #[serde(default)]
  pub cache: CacheConfig,
  #[serde(default)]
  pub storage: StorageConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ApiConfig {
  /// Site root; requests go to `<base_url>/api/...`
  pub base_url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GuardConfig {
  #[serde(default = "default_login_path")]
  pub login_path: String,
  /// Paths reachable without a credential
  #[serde(default = "default_auth_routes")]
  pub auth_routes: Vec<String>,
  /// Role name → path regexes. Replaces the built-in table when set.
  pub roles: Option<BTreeMap<String, Vec<String>>>,
  /// Path regexes the guard runs on. Defaults to the dashboard, profile and
  /// register pages.
  pub protected: Option<Vec<String>>,
}

impl Default for GuardConfig {
  fn default() -> Self {
    Self {
      login_path: default_login_path(),
      auth_routes: default_auth_routes(),
      roles: None,
      protected: None,
    }
  }
}

fn default_login_path() -> String {
  DEFAULT_LOGIN_PATH.to_string()
}

fn default_auth_routes() -> Vec<String> {
  vec![DEFAULT_LOGIN_PATH.to_string()]
}

#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
  /// How long a query result nobody subscribes to is kept
  #[serde(default = "default_keep_unused_secs")]
  pub keep_unused_secs: u64,
}

impl Default for CacheConfig {
  fn default() -> Self {
    Self {
      keep_unused_secs: default_keep_unused_secs(),
    }
  }
}

fn default_keep_unused_secs() -> u64 {
  60
}

impl CacheConfig {
  pub fn keep_unused(&self) -> Duration {
    Duration::from_secs(self.keep_unused_secs)
  }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StorageConfig {
  /// SQLite file for the session and cookies (default: $XDG_DATA_HOME/folio-admin/state.db)
  pub path: Option<PathBuf>,
}

impl Config {
  /// Load configuration from file.
  ///
  /// Search order:
  /// 1. Explicit path if provided
  /// 2. ./folio-admin.yaml (current directory)
  /// 3. $XDG_CONFIG_HOME/folio-admin/config.yaml
  ///
  /// With no file at all the defaults apply; the API base URL can still come
  /// from `FOLIO_BASE_API` or the command line.
  pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
    let path = if let Some(p) = explicit_path {
      if p.exists() {
        Some(p.to_path_buf())
      } else {
        return Err(eyre!("Config file not found: {}", p.display()));
      }
    } else {
      Self::find_config_file()
    };

    let mut config = match path {
      Some(p) => Self::load_from_path(&p)?,
      None => Self::default(),
    };

    config.apply_base_url_override(std::env::var(BASE_API_ENV).ok());
    Ok(config)
  }

  fn find_config_file() -> Option<PathBuf> {
    // Check current directory
    let local = PathBuf::from("folio-admin.yaml");
    if local.exists() {
      return Some(local);
    }

    // Check XDG config directory
    if let Some(config_dir) = dirs::config_dir() {
      let xdg_path = config_dir.join("folio-admin").join("config.yaml");
      if xdg_path.exists() {
        return Some(xdg_path);
      }
    }

    None
  }

  fn load_from_path(path: &Path) -> Result<Self> {
    let contents = std::fs::read_to_string(path)
      .map_err(|e| eyre!("Failed to read config file {}: {}", path.display(), e))?;

    Self::from_yaml(&contents)
      .map_err(|e| eyre!("Failed to parse config file {}: {}", path.display(), e))
  }

  fn from_yaml(contents: &str) -> Result<Self> {
    // An empty file is a valid, all-defaults config
    if contents.trim().is_empty() {
      return Ok(Self::default());
    }
    Ok(serde_yaml::from_str(contents)?)
  }

  /// Replace the configured base URL when `value` is a non-empty string.
  pub fn apply_base_url_override(&mut self, value: Option<String>) {
    if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
      self.api.base_url = Some(url);
    }
  }

  /// Resolve the API root (`<base_url>/api/`).
  pub fn api_root(&self) -> Result<Url> {
    let base = self.api.base_url.as_deref().ok_or_else(|| {
      eyre!(
        "No API base URL configured. Set api.base_url in folio-admin.yaml, \
         {} in the environment, or pass --base-url.",
        BASE_API_ENV
      )
    })?;

    let root = format!("{}/api/", base.trim_end_matches('/'));
    Url::parse(&root).map_err(|e| eyre!("Invalid API base URL '{}': {}", base, e))
  }

  /// Storage location, falling back to the per-user data directory.
  pub fn storage_path(&self) -> Result<PathBuf> {
    match &self.storage.path {
      Some(path) => Ok(path.clone()),
      None => crate::storage::SqliteStorage::default_path(),
    }
  }
}
