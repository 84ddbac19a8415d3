// ABOUTME: Configuration parsing from guide.toml with environment variable overrides.
// ABOUTME: Covers agent identifiers, runtime backend, reply settings, storage, and HTTP binding.

use anyhow::{Context, Result};
use guide_agent::config::RuntimeConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub runtime: RuntimeConfig,
    #[serde(default)]
    pub guide: GuideConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub http: HttpConfig,
}

/// Identifiers of the remote agent
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AgentConfig {
    #[serde(default)]
    pub agent_id: String,
    #[serde(default)]
    pub agent_alias_id: String,
    #[serde(default)]
    pub enable_trace: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GuideConfig {
    /// Sender name recorded on persisted replies
    #[serde(default = "default_sender_name")]
    pub sender_name: String,
    /// Upper bound on one reply, including stream start; unset means no limit
    pub timeout_secs: Option<u64>,
    /// Enqueue a notification for each persisted reply
    #[serde(default = "default_true")]
    pub notify: bool,
    /// Capacity of the in-process notification queue
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for GuideConfig {
    fn default() -> Self {
        Self {
            sender_name: default_sender_name(),
            timeout_secs: None,
            notify: true,
            queue_capacity: default_queue_capacity(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_http_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub port: u16,
    /// Required as a bearer token on /api routes when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: default_http_host(),
            port: default_http_port(),
            api_key: None,
        }
    }
}

// Custom Debug impl to redact api_key
impl std::fmt::Debug for HttpConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

fn default_sender_name() -> String {
    "AI Guide".to_string()
}

fn default_true() -> bool {
    true
}

fn default_queue_capacity() -> usize {
    256
}

fn default_db_path() -> String {
    "./guide.db".to_string()
}

fn default_http_host() -> String {
    "127.0.0.1".to_string()
}

fn default_http_port() -> u16 {
    13100
}

/// Expand tilde (~) to home directory in paths
fn expand_tilde(path: &str) -> String {
    let home = || directories::BaseDirs::new().map(|b| b.home_dir().to_path_buf());
    if let Some(stripped) = path.strip_prefix("~/") {
        if let Some(home) = home() {
            return home.join(stripped).to_string_lossy().to_string();
        }
        tracing::warn!(path = %path, "Failed to expand tilde: could not determine home directory");
    } else if path == "~" {
        if let Some(home) = home() {
            return home.to_string_lossy().to_string();
        }
        tracing::warn!("Failed to expand tilde: could not determine home directory");
    }
    path.to_string()
}

impl Config {
    /// Find the config file, checking in order:
    /// 1. GUIDE_CONFIG_PATH env var (if set)
    /// 2. ./guide.toml
    /// 3. the platform config dir (e.g. ~/.config/guide/guide.toml)
    fn find_config_file() -> Option<PathBuf> {
        if let Ok(env_path) = std::env::var("GUIDE_CONFIG_PATH") {
            let path = PathBuf::from(&env_path);
            if path.exists() {
                return Some(path);
            }
            tracing::warn!(path = %env_path, "GUIDE_CONFIG_PATH does not exist, ignoring");
        }

        let local_config = PathBuf::from("guide.toml");
        if local_config.exists() {
            return Some(local_config);
        }

        directories::ProjectDirs::from("", "", "guide")
            .map(|dirs| dirs.config_dir().join("guide.toml"))
            .filter(|path| path.exists())
    }

    /// Parse configuration from a TOML string, without env overrides
    pub fn parse(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).context("Failed to parse guide config TOML")?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from guide.toml with environment variable overrides
    pub fn load() -> Result<Self> {
        let mut config = if let Some(config_path) = Self::find_config_file() {
            tracing::info!(path = %config_path.display(), "Loading configuration from file");
            let content = std::fs::read_to_string(&config_path)
                .with_context(|| format!("Failed to read {}", config_path.display()))?;
            toml::from_str::<Config>(&content)
                .with_context(|| format!("Failed to parse {}", config_path.display()))?
        } else {
            tracing::info!("No config file found, using environment variables and defaults");
            Config::default()
        };

        config.apply_env_overrides()?;
        config.store.path = expand_tilde(&config.store.path);
        config.validate()?;

        if config.agent.agent_id.is_empty() && config.runtime.backend_type() != "scripted" {
            tracing::warn!(
                runtime = %config.runtime.backend_type(),
                "agent.agent_id is empty (set in guide.toml or GUIDE_AGENT_ID env var)"
            );
        }

        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("GUIDE_AGENT_ID") {
            self.agent.agent_id = val;
        }
        if let Ok(val) = std::env::var("GUIDE_AGENT_ALIAS_ID") {
            self.agent.agent_alias_id = val;
        }
        if let Ok(val) = std::env::var("GUIDE_RUNTIME_TYPE") {
            self.runtime.backend_type = val;
        }
        if let Ok(val) = std::env::var("GUIDE_RUNTIME_COMMAND") {
            self.runtime
                .config
                .insert("command".to_string(), toml::Value::String(val));
        }
        if let Ok(val) = std::env::var("GUIDE_TIMEOUT_SECS") {
            self.guide.timeout_secs = Some(val.parse().with_context(|| {
                format!("GUIDE_TIMEOUT_SECS must be a valid number, got: {}", val)
            })?);
        }
        if let Ok(val) = std::env::var("GUIDE_DB_PATH") {
            self.store.path = val;
        }
        if let Ok(val) = std::env::var("GUIDE_HTTP_HOST") {
            self.http.host = val;
        }
        if let Ok(val) = std::env::var("GUIDE_HTTP_PORT") {
            self.http.port = val.parse().with_context(|| {
                format!("GUIDE_HTTP_PORT must be a valid port number, got: {}", val)
            })?;
        }
        if let Ok(val) = std::env::var("GUIDE_API_KEY") {
            self.http.api_key = Some(val);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        if self.guide.timeout_secs == Some(0) {
            anyhow::bail!("guide.timeout_secs must be greater than 0 (omit it for no limit)");
        }
        if self.guide.queue_capacity == 0 {
            anyhow::bail!("guide.queue_capacity must be greater than 0");
        }
        if self.runtime.backend_type.trim().is_empty() {
            anyhow::bail!("runtime.type must not be empty");
        }
        if self.store.path.trim().is_empty() {
            anyhow::bail!("store.path must not be empty");
        }
        Ok(())
    }
}
