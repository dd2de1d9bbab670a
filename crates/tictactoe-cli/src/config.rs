//! Demo Configuration

use anyhow::{Context, Result};
use ledger_client::DevnetConfig;
use serde::{Deserialize, Serialize};
use session_sync::SyncConfig;
use std::path::Path;

/// Everything the demo can be configured with; missing fields use defaults
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Synchronizer settings, shared by both players
    pub sync: SyncConfig,
    /// In-process ledger settings
    pub devnet: DevnetConfig,
}

impl AppConfig {
    /// Load from a JSON file, or defaults when no path is given
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }
}
