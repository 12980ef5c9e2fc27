//! Tests for config file discovery
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate MICRISE_CONFIG are marked with #[serial].

use micrise_common::config::{load_toml, resolve_config_path, CONFIG_ENV_VAR};
use micrise_common::Error;
use serde::Deserialize;
use serial_test::serial;
use std::env;
use std::io::Write;
use tempfile::NamedTempFile;

#[derive(Debug, Deserialize)]
struct Sample {
    name: String,
    #[serde(default)]
    level: Option<f64>,
}

fn write_config(content: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("Failed to create temp file");
    file.write_all(content.as_bytes()).expect("Failed to write temp file");
    file
}

#[test]
#[serial]
fn test_cli_path_takes_priority_over_env() {
    let cli = write_config("name = \"cli\"");
    let env_file = write_config("name = \"env\"");
    env::set_var(CONFIG_ENV_VAR, env_file.path());

    let resolved = resolve_config_path(Some(cli.path())).unwrap();
    assert_eq!(resolved.as_deref(), Some(cli.path()));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_env_path_used_without_cli() {
    let env_file = write_config("name = \"env\"");
    env::set_var(CONFIG_ENV_VAR, env_file.path());

    let resolved = resolve_config_path(None).unwrap();
    assert_eq!(resolved.as_deref(), Some(env_file.path()));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_missing_explicit_path_is_error() {
    env::remove_var(CONFIG_ENV_VAR);
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("absent.toml");

    let result = resolve_config_path(Some(&missing));
    assert!(matches!(result, Err(Error::Config(_))));

    env::set_var(CONFIG_ENV_VAR, &missing);
    let result = resolve_config_path(None);
    assert!(matches!(result, Err(Error::Config(_))));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
fn test_load_toml_parses_file() {
    let file = write_config("name = \"minti\"\nlevel = 0.5\n");
    let sample: Sample = load_toml(file.path()).unwrap();
    assert_eq!(sample.name, "minti");
    assert_eq!(sample.level, Some(0.5));
}

#[test]
fn test_load_toml_reports_path_on_parse_error() {
    let file = write_config("name = ");
    let result: Result<Sample, _> = load_toml(file.path());
    match result {
        Err(Error::TomlParse { path, .. }) => assert_eq!(path, file.path()),
        other => panic!("Expected TomlParse error, got {:?}", other),
    }
}
