//! Runtime settings.
//!
//! Everything has a working default; env vars override, CLI flags override
//! env. There is no config file: the deployable surface is small enough
//! that flags and env cover it.

use serde::{Deserialize, Serialize};

use crate::errors::AstraError;

pub const DEFAULT_DB_PATH: &str = "astrasecure.db";
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:8000";
pub const DEFAULT_NMAP_PATH: &str = "nmap";
/// Hard ceiling on a single probe run, in seconds.
pub const DEFAULT_PROBE_TIMEOUT_SECS: u64 = 300;
pub const DEFAULT_MAX_CONCURRENT_SCANS: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    pub db_path: String,
    pub bind_addr: String,
    pub nmap_path: String,
    pub probe_timeout_secs: u64,
    pub max_concurrent_scans: usize,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            db_path: DEFAULT_DB_PATH.to_string(),
            bind_addr: DEFAULT_BIND_ADDR.to_string(),
            nmap_path: DEFAULT_NMAP_PATH.to_string(),
            probe_timeout_secs: DEFAULT_PROBE_TIMEOUT_SECS,
            max_concurrent_scans: DEFAULT_MAX_CONCURRENT_SCANS,
        }
    }
}

impl Settings {
    /// Defaults overlaid with `ASTRA_*` environment variables.
    pub fn from_env() -> Result<Self, AstraError> {
        let mut settings = Self::default();

        if let Ok(v) = std::env::var("ASTRA_DB_PATH") {
            settings.db_path = v;
        }
        if let Ok(v) = std::env::var("ASTRA_BIND_ADDR") {
            settings.bind_addr = v;
        }
        if let Ok(v) = std::env::var("ASTRA_NMAP_PATH") {
            settings.nmap_path = v;
        }
        if let Ok(v) = std::env::var("ASTRA_PROBE_TIMEOUT_SECS") {
            settings.probe_timeout_secs = v.parse().map_err(|_| {
                AstraError::Config(format!("ASTRA_PROBE_TIMEOUT_SECS must be an integer, got {:?}", v))
            })?;
        }
        if let Ok(v) = std::env::var("ASTRA_MAX_CONCURRENT_SCANS") {
            settings.max_concurrent_scans = v.parse().map_err(|_| {
                AstraError::Config(format!("ASTRA_MAX_CONCURRENT_SCANS must be an integer, got {:?}", v))
            })?;
        }

        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), AstraError> {
        if self.probe_timeout_secs == 0 {
            return Err(AstraError::Config("probe timeout must be at least 1 second".into()));
        }
        if self.max_concurrent_scans == 0 {
            return Err(AstraError::Config("max concurrent scans must be at least 1".into()));
        }
        Ok(())
    }
}
