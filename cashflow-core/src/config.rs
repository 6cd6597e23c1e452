//! Configuration management
//!
//! settings.json format (all sections optional, defaults below):
//! ```json
//! {
//!   "transactionApi": { "baseUrl": "http://localhost:5000", "transport": "rest", "pageSize": 100, "timeoutSecs": 30 },
//!   "scheduler": { "intervalSecs": 3600 },
//!   "cache": { "enabled": true, "ttlSecs": 300 }
//! }
//! ```

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::result::Result;

/// Environment variable overriding the transaction API base URL
/// (for CI and local testing against a mock upstream)
pub const TRANSACTION_API_URL_ENV: &str = "CASHFLOW_TRANSACTION_API_URL";

/// Which transport backs the transaction source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Transport {
    Rest,
    Rpc,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransactionApiSettings {
    pub base_url: String,
    pub transport: Transport,
    pub page_size: u32,
    pub timeout_secs: u64,
}

impl Default for TransactionApiSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            transport: Transport::Rest,
            page_size: 100,
            timeout_secs: 30,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerSettings {
    pub interval_secs: u64,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self {
            interval_secs: 60 * 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CacheSettings {
    pub enabled: bool,
    pub ttl_secs: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl_secs: 5 * 60,
        }
    }
}

/// Cashflow configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub transaction_api: TransactionApiSettings,
    pub scheduler: SchedulerSettings,
    pub cache: CacheSettings,
}

impl Config {
    /// Load config from the application directory.
    ///
    /// A missing or unreadable settings.json falls back to defaults; the
    /// `CASHFLOW_TRANSACTION_API_URL` environment variable overrides the
    /// configured base URL.
    pub fn load(app_dir: &Path) -> Result<Self> {
        let settings_path = app_dir.join("settings.json");

        let mut config: Config = if settings_path.exists() {
            let content = std::fs::read_to_string(&settings_path)?;
            serde_json::from_str(&content).unwrap_or_default()
        } else {
            Config::default()
        };

        if let Ok(url) = std::env::var(TRANSACTION_API_URL_ENV) {
            if !url.is_empty() {
                config.transaction_api.base_url = url;
            }
        }

        Ok(config)
    }

    /// Save config to the application directory
    pub fn save(&self, app_dir: &Path) -> Result<()> {
        let settings_path = app_dir.join("settings.json");
        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(&settings_path, content)?;
        Ok(())
    }

    pub fn scheduler_interval(&self) -> Duration {
        Duration::from_secs(self.scheduler.interval_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache.ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.transaction_api.timeout_secs)
    }
}
