// ABOUTME: Registry pattern for runtime backend selection.
// ABOUTME: Backends register factories; the service creates its runtime by name from config.

use crate::runtime::AgentRuntime;
use anyhow::{anyhow, Result};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Factory function that creates a runtime from config
pub type RuntimeFactory = Box<dyn Fn(&Value) -> Result<Arc<dyn AgentRuntime>> + Send + Sync>;

/// Registry for runtime backend selection
pub struct RuntimeRegistry {
    factories: HashMap<String, RuntimeFactory>,
}

impl RuntimeRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Register a runtime factory by name
    pub fn register<F>(mut self, name: &str, factory: F) -> Self
    where
        F: Fn(&Value) -> Result<Arc<dyn AgentRuntime>> + Send + Sync + 'static,
    {
        self.factories.insert(name.to_string(), Box::new(factory));
        self
    }

    /// Create a runtime by name with the given config
    pub fn create(&self, name: &str, config: &Value) -> Result<Arc<dyn AgentRuntime>> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| anyhow!("Unknown runtime: {}", name))?;
        factory(config)
    }

    /// List available runtime names, sorted
    pub fn available(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.factories.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    /// Create a runtime from a RuntimeConfig
    pub fn create_from_config(&self, config: &crate::config::RuntimeConfig) -> Result<Arc<dyn AgentRuntime>> {
        let json_config = config.to_json_value()?;
        self.create(config.backend_type(), &json_config)
    }
}

impl Default for RuntimeRegistry {
    fn default() -> Self {
        use crate::backends::process::ProcessRuntime;
        use crate::backends::replay::ReplayRuntime;
        use crate::backends::scripted::ScriptedRuntime;

        Self::new()
            .register("process", ProcessRuntime::factory())
            .register("replay", ReplayRuntime::factory())
            .register("scripted", ScriptedRuntime::factory())
    }
}
