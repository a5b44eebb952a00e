use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_history_limit() -> usize {
    10
}

fn default_trend_window_days() -> i64 {
    90
}

fn default_connection_threshold() -> f32 {
    0.3
}

fn default_max_connections() -> usize {
    10
}

/// Engine tuning knobs. Every field has a default so a partial (or absent)
/// config file still yields a working engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Model name passed through to the completion provider.
    #[serde(default = "default_model")]
    pub model: String,
    /// How many prior messages the chat context carries.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_trend_window_days")]
    pub trend_window_days: i64,
    #[serde(default = "default_connection_threshold")]
    pub connection_threshold: f32,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    /// Cap on chat turns in flight across all conversations. `None` means
    /// unlimited.
    #[serde(default)]
    pub max_concurrent_turns: Option<usize>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            model: default_model(),
            history_limit: default_history_limit(),
            trend_window_days: default_trend_window_days(),
            connection_threshold: default_connection_threshold(),
            max_connections: default_max_connections(),
            max_concurrent_turns: None,
        }
    }
}

impl CoreConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        let config: CoreConfig = serde_yaml::from_str(&raw)
            .with_context(|| format!("parsing config file {}", path.display()))?;
        Ok(config)
    }
}
