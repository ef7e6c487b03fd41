//! Configuration loading

use anyhow::{bail, Result};
use ewc_scanner::ScannerConfig;
use ewc_session::SessionOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::info;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Controller to scan
    pub controller: ScannerConfig,
    #[serde(default)]
    pub session: SessionOptions,
    #[serde(default)]
    pub daemon: DaemonConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Seconds between scan cycles
    #[serde(default = "default_interval")]
    pub interval_secs: u64,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
        }
    }
}

fn default_interval() -> u64 {
    12
}

/// Load configuration from file
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        bail!(
            "Configuration file {} not found (create one with --init-config)",
            path.display()
        );
    }

    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    info!(path = %path.display(), "Loaded configuration");
    Ok(config)
}

/// Write an example configuration file
pub fn save_default_config(path: &Path) -> Result<()> {
    if path.exists() {
        bail!("Refusing to overwrite existing {}", path.display());
    }

    let config = Config {
        controller: ScannerConfig::new("192.168.1.5", "admin"),
        session: SessionOptions::default(),
        daemon: DaemonConfig::default(),
    };

    let content = toml::to_string_pretty(&config)?;
    std::fs::write(path, content)?;
    Ok(())
}
