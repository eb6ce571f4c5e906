//! Manager configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use trustgate_store_lmdb::environment::DEFAULT_MAP_SIZE;
use trustgate_utils::LogFormat;

use crate::ManagerError;

/// Configuration for a [`TrustManager`](crate::TrustManager).
///
/// Can be loaded from a TOML file via [`ManagerConfig::from_toml_file`] or
/// built programmatically (e.g. for tests).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ManagerConfig {
    /// Directory of the LMDB key store holding user-trusted certificates.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Seconds to wait for a decision before treating silence as distrust.
    #[serde(default = "default_user_timeout_secs")]
    pub user_timeout_secs: u64,

    /// Whether certificates accepted by the system trust roots are trusted.
    #[serde(default = "default_true")]
    pub trust_system_roots: bool,

    /// Whether unknown certificates may be put before the user at all.
    #[serde(default = "default_true")]
    pub interactive: bool,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: LogFormat,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// LMDB map size in bytes.
    #[serde(default = "default_map_size")]
    pub map_size: usize,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_data_dir() -> PathBuf {
    PathBuf::from("./trustgate_data")
}

fn default_user_timeout_secs() -> u64 {
    60
}

fn default_true() -> bool {
    true
}

fn default_log_format() -> LogFormat {
    LogFormat::Human
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_map_size() -> usize {
    DEFAULT_MAP_SIZE
}

// ── Impl ───────────────────────────────────────────────────────────────

impl ManagerConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ManagerError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ManagerError::Config(format!("{}: {}", path.as_ref().display(), e)))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ManagerError> {
        let config: Self = toml::from_str(s).map_err(|e| ManagerError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> String {
        toml::to_string_pretty(self).expect("ManagerConfig is always serializable to TOML")
    }

    pub fn user_timeout(&self) -> Duration {
        Duration::from_secs(self.user_timeout_secs)
    }

    fn validate(&self) -> Result<(), ManagerError> {
        if self.user_timeout_secs == 0 {
            return Err(ManagerError::Config(
                "user_timeout_secs must be greater than zero".into(),
            ));
        }
        if self.map_size == 0 {
            return Err(ManagerError::Config("map_size must be greater than zero".into()));
        }
        Ok(())
    }
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            user_timeout_secs: default_user_timeout_secs(),
            trust_system_roots: default_true(),
            interactive: default_true(),
            log_format: default_log_format(),
            log_level: default_log_level(),
            map_size: default_map_size(),
        }
    }
}
