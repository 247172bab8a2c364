//! Export Configuration
//!
//! Settings for replaying an observation log and exporting the resulting
//! disks. Built from CLI arguments and environment by the binary.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output encoding for exported disks
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Multi-document YAML stream
    #[default]
    Yaml,
    /// JSON array
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Yaml => write!(f, "yaml"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Configuration of an export run
#[derive(Debug, Clone)]
pub struct ExportConfig {
    /// Observation log to replay
    pub input: PathBuf,
    /// Encoding of the printed disks
    pub output: OutputFormat,
    /// Node name recorded on disks whose event monitor did not report one
    pub node_name: Option<String>,
    /// Apply the disks to the cluster instead of only printing them
    pub apply: bool,
    /// Field manager used when applying
    pub field_manager: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from("observations.yaml"),
            output: OutputFormat::Yaml,
            node_name: None,
            apply: false,
            field_manager: "node-disk-manager".to_string(),
        }
    }
}

impl ExportConfig {
    /// Check the configuration for values that cannot work
    pub fn validate(&self) -> Result<()> {
        if self.input.as_os_str().is_empty() {
            return Err(Error::Configuration("input path is empty".into()));
        }
        if let Some(node_name) = &self.node_name {
            if node_name.trim().is_empty() {
                return Err(Error::Configuration("node name is blank".into()));
            }
        }
        if self.apply && self.field_manager.trim().is_empty() {
            return Err(Error::Configuration(
                "field manager is required when applying".into(),
            ));
        }
        Ok(())
    }
}
