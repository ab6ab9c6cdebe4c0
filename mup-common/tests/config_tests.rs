//! Tests for bootstrap configuration loading and graceful degradation
//!
//! Tests that touch MUP_CONFIG are marked #[serial] so they do not race on
//! the process environment.

use mup_common::config::{resolve_config_path, TomlConfig, CONFIG_ENV_VAR, DEFAULT_PORT};
use serial_test::serial;
use std::env;
use std::io::Write;

#[test]
fn test_empty_toml_uses_defaults() {
    let config = TomlConfig::from_toml_str("").unwrap();
    assert_eq!(config.port, DEFAULT_PORT);
    assert!(config.database_path.is_none());
    assert_eq!(config.logging.level, "info");
    assert!(config.api_base_url.starts_with("http"));
}

#[test]
fn test_full_toml_is_parsed() {
    let config = TomlConfig::from_toml_str(
        r#"
        port = 6000
        database_path = "/tmp/mup-test.db"
        api_base_url = "http://music.local:4000"

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    assert_eq!(config.port, 6000);
    assert_eq!(config.database_path_or_default().to_str(), Some("/tmp/mup-test.db"));
    assert_eq!(config.api_base_url, "http://music.local:4000");
    assert_eq!(config.logging.level, "debug");
}

#[test]
fn test_invalid_toml_is_config_error() {
    let err = TomlConfig::from_toml_str("port = \"not a number\"").unwrap_err();
    assert!(err.to_string().contains("Configuration error"));
}

#[test]
#[serial]
fn test_cli_path_wins_over_env() {
    env::set_var(CONFIG_ENV_VAR, "/from/env.toml");
    let path = resolve_config_path(Some(std::path::Path::new("/from/cli.toml")), CONFIG_ENV_VAR);
    assert_eq!(path.unwrap().to_str(), Some("/from/cli.toml"));
    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_path_used_without_cli() {
    env::set_var(CONFIG_ENV_VAR, "/from/env.toml");
    let path = resolve_config_path(None, CONFIG_ENV_VAR);
    assert_eq!(path.unwrap().to_str(), Some("/from/env.toml"));
    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_file_falls_back_to_defaults() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("nope.toml");
    let config = TomlConfig::load_or_default(Some(&missing));
    assert_eq!(config.port, DEFAULT_PORT);
}

#[test]
#[serial]
fn test_load_or_default_reads_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "port = 7111").unwrap();
    let config = TomlConfig::load_or_default(Some(file.path()));
    assert_eq!(config.port, 7111);
}
