//! TOML configuration: who the user is, where journals live, and how edits behave.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::info;

use crate::policy::EditPolicy;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Signed-in user the journals are scoped to
    #[serde(default)]
    pub identity: Identity,

    /// Where journals are persisted
    #[serde(default)]
    pub store: StoreConfig,

    /// Edit window and autosave behaviour
    #[serde(default)]
    pub editing: EditingConfig,
}

/// Current user, as supplied by the identity provider
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub user_id: String,
    #[serde(default)]
    pub email: String,
    /// May list every user's journals
    #[serde(default)]
    pub admin: bool,
}

impl Default for Identity {
    fn default() -> Self {
        Self {
            user_id: "local".to_string(),
            email: String::new(),
            admin: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    File,
    Rest,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,
    /// JSON file for the file backend
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Base URL of the hosted backend
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::File,
            path: default_store_path(),
            url: String::new(),
            api_key: None,
            access_token: None,
        }
    }
}

impl StoreConfig {
    /// API key from the file, else `TRADELOG_API_KEY`
    pub fn effective_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .or_else(|| std::env::var("TRADELOG_API_KEY").ok())
    }

    /// Access token from the file, else `TRADELOG_ACCESS_TOKEN`
    pub fn effective_access_token(&self) -> Option<String> {
        self.access_token
            .clone()
            .or_else(|| std::env::var("TRADELOG_ACCESS_TOKEN").ok())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditingConfig {
    #[serde(default)]
    pub policy: EditPolicy,
    /// Quiet period before an autosave fires
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

impl Default for EditingConfig {
    fn default() -> Self {
        Self {
            policy: EditPolicy::default(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

impl EditingConfig {
    pub fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

fn default_store_path() -> PathBuf {
    PathBuf::from("journals.json")
}

fn default_debounce_ms() -> u64 {
    1000
}

impl Config {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml(&content)?;
        info!(
            user_id = %config.identity.user_id,
            backend = ?config.store.backend,
            policy = ?config.editing.policy,
            "configuration loaded"
        );
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }
}
