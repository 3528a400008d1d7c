//! Application configuration management.
//!
//! Configuration is stored at `~/.config/eventcache/config.json` (or the
//! platform equivalent). Missing files and missing fields fall back to
//! defaults. On the command line, `EVENTCACHE_API_URL` or `--api-url`
//! overrides the configured backend address.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::api::client::DEFAULT_BASE_URL;
use crate::cache::{QueryOptions, RetryPolicy};
use crate::coordinator::{CoordinatorOptions, UpdateStrategy};

/// Application name used for config directory paths
const APP_NAME: &str = "eventcache";

/// Config file name
const CONFIG_FILE: &str = "config.json";

/// Environment variable overriding `api_base_url`, read by the command line
pub const API_URL_ENV: &str = "EVENTCACHE_API_URL";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub api_base_url: String,
    pub update_strategy: UpdateStrategy,
    pub list_stale_secs: u64,
    pub detail_stale_secs: u64,
    pub edit_stale_secs: u64,
    pub read_retries: u32,
    pub request_timeout_secs: u64,
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_BASE_URL.to_string(),
            update_strategy: UpdateStrategy::default(),
            list_stale_secs: 60,
            detail_stale_secs: 60,
            edit_stale_secs: 5,
            read_retries: 3,
            request_timeout_secs: 30,
            log_file: None,
        }
    }
}

impl Config {
    /// Load from the default location.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            serde_json::from_str(&contents)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))
        } else {
            Ok(Self::default())
        }
    }

    pub fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn coordinator_options(&self) -> CoordinatorOptions {
        let retry = RetryPolicy::default().with_max_retries(self.read_retries);
        let read = |secs: u64| QueryOptions::new(Duration::from_secs(secs)).with_retry(retry.clone());
        CoordinatorOptions {
            list: read(self.list_stale_secs),
            detail: read(self.detail_stale_secs),
            edit: read(self.edit_stale_secs),
            update_strategy: self.update_strategy,
        }
    }
}
