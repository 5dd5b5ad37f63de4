//! Configuration schema (tablesink.toml)

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

use crate::naming::FALLBACK_DATASET;

/// Adaptor configuration for one warehouse connection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Warehouse type (bigquery)
    #[serde(rename = "type", default = "default_warehouse_type")]
    pub warehouse_type: String,

    /// Project overriding the backend's ambient identity
    #[serde(default)]
    pub project: Option<String>,

    /// Dataset used when table paths omit one
    #[serde(default = "default_dataset")]
    pub dataset: String,

    /// Geographic location hint for dataset creation
    #[serde(default)]
    pub location: Option<String>,

    /// Whether the backend supports appending columns in place
    #[serde(default = "default_true")]
    pub support_add_column: bool,

    /// Whether the backend supports altering column types in place
    #[serde(default = "default_true")]
    pub support_alter_column: bool,
}

fn default_warehouse_type() -> String {
    "bigquery".to_string()
}

fn default_dataset() -> String {
    FALLBACK_DATASET.to_string()
}

fn default_true() -> bool {
    true
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            warehouse_type: default_warehouse_type(),
            project: None,
            dataset: default_dataset(),
            location: None,
            support_add_column: true,
            support_alter_column: true,
        }
    }
}

/// Errors loading a config file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

impl SinkConfig {
    /// Parse a config from TOML text
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Load a config from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}
