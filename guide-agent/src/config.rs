// ABOUTME: Runtime backend configuration, read from a [runtime] TOML section.
// ABOUTME: A type discriminator selects the backend; remaining keys go to its factory.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Runtime configuration with type discriminator
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RuntimeConfig {
    /// Runtime type: "process", "replay", "scripted"
    #[serde(rename = "type")]
    pub backend_type: String,

    /// Remaining fields passed to the runtime factory
    #[serde(flatten)]
    pub config: toml::Table,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            backend_type: "scripted".to_string(),
            config: toml::Table::new(),
        }
    }
}

impl RuntimeConfig {
    /// Parse a standalone runtime table, e.g. `type = "process"\ncommand = "bridge"`
    pub fn parse(content: &str) -> Result<Self> {
        toml::from_str(content).context("Failed to parse runtime config TOML")
    }

    /// Get runtime type name
    pub fn backend_type(&self) -> &str {
        &self.backend_type
    }

    /// Convert config table to serde_json::Value for the registry
    pub fn to_json_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(&self.config).context("Runtime config is not representable as JSON")
    }
}
