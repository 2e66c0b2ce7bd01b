// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

//! Engine configuration.
//!
//! Supports both programmatic and file-based configuration.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine name (for identification in logs).
    #[serde(default = "default_engine_name")]
    pub name: String,

    /// Hard upper bound on fields per compiled type.
    #[serde(default = "default_max_fields")]
    pub max_fields_per_type: usize,

    /// Whether a schema with zero fields compiles to a valid (empty) type.
    ///
    /// The persistence layer can legitimately hand out a type whose fields
    /// have not been saved yet; by default that compiles to an empty shape.
    #[serde(default = "default_true")]
    pub allow_empty_types: bool,

    /// Reloads slower than this are logged at warn level (0 disables).
    #[serde(default = "default_slow_reload_ms")]
    pub log_slow_reload_ms: u64,
}

fn default_engine_name() -> String {
    "hcms-engine".to_string()
}

fn default_max_fields() -> usize {
    64
}

fn default_true() -> bool {
    true
}

fn default_slow_reload_ms() -> u64 {
    250
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            name: default_engine_name(),
            max_fields_per_type: default_max_fields(),
            allow_empty_types: true,
            log_slow_reload_ms: default_slow_reload_ms(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.is_empty() {
            return Err(ConfigError::Invalid("engine name is empty".into()));
        }
        if self.max_fields_per_type == 0 {
            return Err(ConfigError::Invalid(
                "max_fields_per_type must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
