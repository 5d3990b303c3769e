//! Configuration Management
//!
//! Handles persistent configuration storage for the Lume client.

use crate::api::client::{DEFAULT_API_URL, DEFAULT_FILES_URL};
use crate::resource::{PollPolicy, DEFAULT_POLL_TIMEOUT};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Environment variable holding the API key
pub const API_KEY_ENV: &str = "LUME_API_KEY";

/// User configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// API key sent with every request
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL of the mapping API
    #[serde(default)]
    pub base_url: Option<String>,
    /// Base URL of the file-processing service
    #[serde(default)]
    pub files_url: Option<String>,
    /// Delay before the first status fetch of a long-running operation
    #[serde(default)]
    pub poll_interval_ms: Option<u64>,
    /// Bound on a whole poll sequence; 0 disables the bound
    #[serde(default)]
    pub poll_timeout_secs: Option<u64>,
}

impl Config {
    /// Get the config file path
    pub fn config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("lume").join("config.json"))
    }

    /// Load configuration from disk
    pub fn load() -> Self {
        match Self::config_path() {
            Some(path) => Self::load_from(&path),
            None => Self::default(),
        }
    }

    /// Load configuration from a specific file, falling back to defaults
    pub fn load_from(path: &std::path::Path) -> Self {
        if !path.exists() {
            return Self::default();
        }

        match std::fs::read_to_string(path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                tracing::warn!("Ignoring malformed config {:?}: {}", path, e);
                Self::default()
            }),
            Err(_) => Self::default(),
        }
    }

    /// Save configuration to disk
    pub fn save(&self) -> Result<()> {
        let Some(path) = Self::config_path() else {
            return Ok(());
        };
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        // Create parent directory
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;

        Ok(())
    }

    /// Get effective API key (LUME_API_KEY > config file)
    pub fn effective_api_key(&self) -> Option<String> {
        std::env::var(API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.api_key.clone().filter(|k| !k.trim().is_empty()))
    }

    pub fn effective_api_url(&self) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
    }

    pub fn effective_files_url(&self) -> String {
        self.files_url
            .clone()
            .unwrap_or_else(|| DEFAULT_FILES_URL.to_string())
    }

    /// Poll policy derived from the configured interval and timeout
    pub fn poll_policy(&self) -> PollPolicy {
        let mut policy = PollPolicy::default();

        if let Some(ms) = self.poll_interval_ms {
            policy.interval = Duration::from_millis(ms);
            policy.max_interval = policy.max_interval.max(policy.interval);
        }

        policy.timeout = match self.poll_timeout_secs {
            Some(0) => None,
            Some(secs) => Some(Duration::from_secs(secs)),
            None => Some(DEFAULT_POLL_TIMEOUT),
        };

        policy
    }

    /// Set API key and save
    pub fn set_api_key(&mut self, api_key: &str) -> Result<()> {
        self.api_key = Some(api_key.to_string());
        self.save()
    }
}
