// ABOUTME: Tests for configuration loading and validation
// ABOUTME: Verifies TOML parsing, env var overrides, defaults, and rejected values

use guide_core::config::Config;
use serial_test::serial;
use std::io::Write;

/// Helper to clear all config-related env vars
fn clear_config_env_vars() {
    for var in [
        "GUIDE_CONFIG_PATH",
        "GUIDE_AGENT_ID",
        "GUIDE_AGENT_ALIAS_ID",
        "GUIDE_RUNTIME_TYPE",
        "GUIDE_RUNTIME_COMMAND",
        "GUIDE_TIMEOUT_SECS",
        "GUIDE_DB_PATH",
        "GUIDE_HTTP_HOST",
        "GUIDE_HTTP_PORT",
        "GUIDE_API_KEY",
    ] {
        std::env::remove_var(var);
    }
}

fn write_config(dir: &tempfile::TempDir, content: &str) -> std::path::PathBuf {
    let path = dir.path().join("guide.toml");
    let mut file = std::fs::File::create(&path).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    path
}

#[test]
#[serial]
fn test_config_loads_from_toml_file() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[agent]
agent_id = "AGENT123"
agent_alias_id = "ALIAS456"

[runtime]
type = "process"
command = "guide-bridge"
args = ["--region", "us-east-1"]

[guide]
timeout_secs = 45

[store]
path = "/var/lib/guide/guide.db"

[http]
port = 8080
"#,
    );
    std::env::set_var("GUIDE_CONFIG_PATH", &path);

    let config = Config::load().unwrap();

    assert_eq!(config.agent.agent_id, "AGENT123");
    assert_eq!(config.agent.agent_alias_id, "ALIAS456");
    assert_eq!(config.runtime.backend_type(), "process");
    assert_eq!(
        config.runtime.config.get("command").and_then(|v| v.as_str()),
        Some("guide-bridge")
    );
    assert_eq!(config.guide.timeout_secs, Some(45));
    assert_eq!(config.guide.sender_name, "AI Guide");
    assert_eq!(config.store.path, "/var/lib/guide/guide.db");
    assert_eq!(config.http.port, 8080);
    assert_eq!(config.http.host, "127.0.0.1");

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_config_env_var_overrides() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(
        &dir,
        r#"
[agent]
agent_id = "FROM_FILE"

[http]
port = 8080
"#,
    );
    std::env::set_var("GUIDE_CONFIG_PATH", &path);
    std::env::set_var("GUIDE_AGENT_ID", "FROM_ENV");
    std::env::set_var("GUIDE_RUNTIME_TYPE", "process");
    std::env::set_var("GUIDE_RUNTIME_COMMAND", "/usr/local/bin/bridge");
    std::env::set_var("GUIDE_HTTP_PORT", "9090");
    std::env::set_var("GUIDE_TIMEOUT_SECS", "10");
    std::env::set_var("GUIDE_API_KEY", "s3cret");

    let config = Config::load().unwrap();

    assert_eq!(config.agent.agent_id, "FROM_ENV");
    assert_eq!(config.runtime.backend_type(), "process");
    assert_eq!(
        config.runtime.config.get("command").and_then(|v| v.as_str()),
        Some("/usr/local/bin/bridge")
    );
    assert_eq!(config.http.port, 9090);
    assert_eq!(config.guide.timeout_secs, Some(10));
    assert_eq!(config.http.api_key.as_deref(), Some("s3cret"));

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_invalid_port_env_var_is_an_error() {
    clear_config_env_vars();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(&dir, "");
    std::env::set_var("GUIDE_CONFIG_PATH", &path);
    std::env::set_var("GUIDE_HTTP_PORT", "not-a-port");

    let err = Config::load().unwrap_err();
    assert!(err.to_string().contains("GUIDE_HTTP_PORT"));

    clear_config_env_vars();
}

#[test]
#[serial]
fn test_api_key_is_redacted_in_debug() {
    clear_config_env_vars();
    let config = Config::parse(
        r#"
[http]
api_key = "super-secret"
"#,
    )
    .unwrap();

    let debug = format!("{:?}", config);
    assert!(!debug.contains("super-secret"));
    assert!(debug.contains("[REDACTED]"));
}

#[test]
fn test_defaults_when_sections_missing() {
    let config = Config::parse("").unwrap();

    assert_eq!(config.runtime.backend_type(), "scripted");
    assert_eq!(config.guide.timeout_secs, None);
    assert!(config.guide.notify);
    assert_eq!(config.guide.queue_capacity, 256);
    assert_eq!(config.store.path, "./guide.db");
    assert_eq!(config.http.port, 13100);
}

#[test]
fn test_zero_timeout_is_rejected() {
    let err = Config::parse("[guide]\ntimeout_secs = 0\n").unwrap_err();
    assert!(err.to_string().contains("timeout_secs"));
}

#[test]
fn test_zero_queue_capacity_is_rejected() {
    let err = Config::parse("[guide]\nqueue_capacity = 0\n").unwrap_err();
    assert!(err.to_string().contains("queue_capacity"));
}

#[test]
fn test_malformed_toml_is_an_error() {
    assert!(Config::parse("[agent\nagent_id = 1").is_err());
}
