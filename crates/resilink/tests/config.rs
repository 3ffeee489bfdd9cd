//! Configuration loading from files and environment sources

use std::io::Write;

use pretty_assertions::assert_eq;
use tempfile::NamedTempFile;

use resilink::{ClientConfig, ConfigError};

fn config_file(suffix: &str, contents: &str) -> NamedTempFile {
    let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn env(vars: &[(&str, &str)]) -> config::Environment {
    let source = vars
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect();
    ClientConfig::environment("RESILINK").source(Some(source))
}

#[test]
fn test_toml_file_overrides_defaults() {
    let file = config_file(
        ".toml",
        r#"
[stream]
url = "wss://api.example.com/ws/updates/"
auth_token = "secret"

[stream.reconnect]
max_attempts = 8

[request]
retries = 5
timeout_ms = 2500

[reporter]
base_url = "https://api.example.com"
flush_interval_secs = 30
"#,
    );

    let config = ClientConfig::load_with(Some(file.path()), env(&[])).unwrap();

    assert_eq!(
        config.stream.url.as_deref(),
        Some("wss://api.example.com/ws/updates/")
    );
    assert_eq!(config.stream.auth_token.as_deref(), Some("secret"));
    assert_eq!(config.stream.reconnect.max_attempts, 8);
    assert_eq!(config.stream.reconnect.base_delay_ms, 1000);
    assert_eq!(config.request.retries, 5);
    assert_eq!(config.request.timeout_ms, 2500);
    assert_eq!(config.request.debounce_wait_ms, 300);
    assert_eq!(config.reporter.flush_interval_secs, 30);
    assert_eq!(config.reporter.capacity, 1000);
}

#[test]
fn test_yaml_and_json_formats() {
    let yaml = config_file(".yaml", "request:\n  batch_concurrency: 2\n");
    let config = ClientConfig::load_with(Some(yaml.path()), env(&[])).unwrap();
    assert_eq!(config.request.batch_concurrency, 2);

    let json = config_file(".json", r#"{"telemetry": {"json_logs": true}}"#);
    let config = ClientConfig::load_with(Some(json.path()), env(&[])).unwrap();
    assert!(config.telemetry.json_logs);
}

#[test]
fn test_environment_overrides_file() {
    let file = config_file(".toml", "[request]\nretries = 5\n");

    let config = ClientConfig::load_with(
        Some(file.path()),
        env(&[
            ("RESILINK_REQUEST__RETRIES", "1"),
            ("RESILINK_STREAM__URL", "ws://localhost:8000/ws/"),
            ("RESILINK_STREAM__RECONNECT__ENABLED", "false"),
        ]),
    )
    .unwrap();

    assert_eq!(config.request.retries, 1);
    assert_eq!(config.stream.url.as_deref(), Some("ws://localhost:8000/ws/"));
    assert!(!config.stream.reconnect.enabled);
}

#[test]
fn test_environment_only() {
    let config = ClientConfig::load_with(
        None::<&std::path::Path>,
        env(&[("RESILINK_REQUEST__CACHE_MAX_AGE_MS", "5000")]),
    )
    .unwrap();
    assert_eq!(config.request.cache_max_age_ms, 5000);
    assert_eq!(config.stream.url, None);
}

#[test]
fn test_missing_and_unsupported_files() {
    let missing = ClientConfig::load_with(Some("/nonexistent/resilink.toml"), env(&[]));
    assert!(matches!(missing, Err(ConfigError::FileNotFound(_))));

    let ini = config_file(".ini", "retries = 1\n");
    let unsupported = ClientConfig::load_with(Some(ini.path()), env(&[]));
    assert!(matches!(unsupported, Err(ConfigError::UnsupportedFormat)));
}

#[test]
fn test_invalid_values_rejected() {
    let file = config_file(
        ".toml",
        "[stream.reconnect]\nbase_delay_ms = 5000\nmax_delay_ms = 100\n",
    );
    let result = ClientConfig::load_with(Some(file.path()), env(&[]));
    assert!(matches!(result, Err(ConfigError::Invalid(_))));

    let file = config_file(".toml", "[request]\nretries = \"many\"\n");
    let result = ClientConfig::load_with(Some(file.path()), env(&[]));
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}
