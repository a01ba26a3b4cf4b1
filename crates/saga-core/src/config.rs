//! Engine configuration.
//!
//! Loaded from a `config.toml` with sensible defaults; a missing file is
//! not an error.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::context::DEFAULT_MAX_CHARACTERS;

/// Context-budget configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Character budget for the serialized document context.
    pub max_characters: usize,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            max_characters: DEFAULT_MAX_CHARACTERS,
        }
    }
}

/// Tool execution configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Per-handler timeout in seconds. None disables the timeout.
    pub timeout_secs: Option<u64>,
}

/// Top-level engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Model identifier sent to the provider.
    pub model: String,
    /// Maximum output tokens requested per turn.
    pub max_tokens: u32,
    pub context: ContextConfig,
    pub tools: ToolsConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: "vendor-large".to_string(),
            max_tokens: 8192,
            context: ContextConfig::default(),
            tools: ToolsConfig::default(),
        }
    }
}

impl Config {
    /// Parses a configuration from TOML text.
    ///
    /// # Errors
    /// Returns an error if the TOML is invalid.
    pub fn from_toml(text: &str) -> Result<Self> {
        toml::from_str(text).context("invalid config.toml")
    }

    /// Loads configuration from a file, falling back to defaults when the
    /// file does not exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        Self::from_toml(&text)
    }

    /// Tool timeout as a [`Duration`], when configured.
    pub fn tool_timeout(&self) -> Option<Duration> {
        self.tools.timeout_secs.map(Duration::from_secs)
    }
}
