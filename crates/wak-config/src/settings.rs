use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Largest accepted `scan.channel_capacity`.
pub const MAX_CHANNEL_CAPACITY: usize = 65_536;

/// Typed configuration. Every section and key is optional in YAML.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WakConfig {
    pub scan: ScanSettings,
    pub repository: RepositorySettings,
    pub log: LogSettings,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScanSettings {
    /// Messages buffered between the scan task and the reconciler.
    pub channel_capacity: usize,
}

impl Default for ScanSettings {
    fn default() -> Self {
        Self {
            channel_capacity: 64,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RepositorySettings {
    /// JSON account store. `None` keeps accounts in memory only.
    pub path: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogSettings {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}

impl WakConfig {
    pub fn from_value(v: &Value) -> Result<Self> {
        let cfg: WakConfig =
            serde_json::from_value(v.clone()).context("config does not match expected shape")?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_CHANNEL_CAPACITY).contains(&self.scan.channel_capacity) {
            bail!("CONFIG_INVALID /scan/channel_capacity must be in 1..={MAX_CHANNEL_CAPACITY}");
        }
        if self.log.filter.trim().is_empty() {
            bail!("CONFIG_INVALID /log/filter must not be empty");
        }
        Ok(())
    }
}
