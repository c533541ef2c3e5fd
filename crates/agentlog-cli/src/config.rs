//! `agentlog.toml` loading.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! working configuration.

use agentlog_core::{AgentlogError, AgentlogResult};
use agentlog_gateway::DEFAULT_MAX_BODY_BYTES;
use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Top-level configuration.
#[derive(Debug, Deserialize)]
pub struct AgentlogConfig {
    /// Directory holding `events.json`, `saved-events.json` and `task-counts.json`.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
    /// HTTP listener settings.
    #[serde(default)]
    pub server: ServerConfig,
}

/// HTTP listener settings.
#[derive(Debug, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Largest accepted ingestion body.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl Default for AgentlogConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            server: ServerConfig::default(),
        }
    }
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    3000
}
fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Read and parse a TOML config file.
pub fn parse_config(path: &Path) -> AgentlogResult<AgentlogConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        AgentlogError::Config(format!(
            "Failed to read config '{}': {e}",
            path.display()
        ))
    })?;
    let config: AgentlogConfig = toml::from_str(&content).map_err(|e| {
        AgentlogError::Config(format!(
            "Failed to parse config '{}': {e}",
            path.display()
        ))
    })?;
    Ok(config)
}

/// Like [`parse_config`], but a missing file yields the defaults.
pub fn load_config(path: &Path) -> AgentlogResult<AgentlogConfig> {
    if !path.exists() {
        tracing::info!(path = %path.display(), "No config file, using defaults");
        return Ok(AgentlogConfig::default());
    }
    parse_config(path)
}
