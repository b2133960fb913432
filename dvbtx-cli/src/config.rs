//! CLI configuration loading.

use std::path::Path;

use color_eyre::eyre::{Context, Result};
use serde::{Deserialize, Serialize};

use dvbtx_core::config::TxConfig;
use dvbtx_core::sink::SinkConfig;

/// Top-level TOML layout: a `[tx]` table for the modulator and a
/// `[sink]` table for the radio-facing side. Missing fields fall back to
/// the crate defaults, so an empty file is a valid configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub tx: TxConfig,
    pub sink: SinkConfig,
}

impl CliConfig {
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("Failed to read config {}", path.display()))?;
        toml::from_str(&content)
            .wrap_err_with(|| format!("Failed to parse config {}", path.display()))
    }
}
