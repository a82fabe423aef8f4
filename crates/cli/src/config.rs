//! Configuration management for the CLI

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// CLI configuration
///
/// Layered: built-in defaults, then the config file, then `QOPT_*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Concurrent lookups, 1 runs them in order
    pub workers: usize,
    /// Log as JSON lines instead of text
    pub json_logs: bool,
    /// Currency used to display costs
    pub currency: String,
}

impl Settings {
    /// Load settings; `path` overrides the default config file, and must exist
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder()
            .set_default("workers", 1)?
            .set_default("json_logs", false)?
            .set_default("currency", "USD")?;

        match path {
            Some(path) => {
                builder = builder.add_source(config::File::from(path.to_path_buf()).required(true));
            }
            None => {
                if let Some(path) = Self::config_path() {
                    builder = builder.add_source(config::File::from(path).required(false));
                }
            }
        }

        builder
            .add_source(config::Environment::with_prefix("QOPT"))
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")
    }

    /// Default configuration file path
    fn config_path() -> Option<PathBuf> {
        dirs_next::home_dir().map(|home| home.join(".config").join("qopt").join("config.toml"))
    }
}
