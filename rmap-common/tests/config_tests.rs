//! Configuration resolution tests
//!
//! Uses serial_test: these tests manipulate RMAP_* environment variables.

use rmap_common::config::{load_config, resolve_config_path, TomlConfig};
use rmap_common::Error;
use serial_test::serial;
use std::env;
use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;

fn clear_env() {
    env::remove_var("RMAP_CONFIG");
    env::remove_var("RMAP_DATABASE");
    env::remove_var("RMAP_SENDGRID_API_KEY");
}

#[test]
#[serial]
fn test_cli_argument_has_priority() {
    clear_env();
    env::set_var("RMAP_CONFIG", "/tmp/from-env.toml");

    let cli = PathBuf::from("/tmp/from-cli.toml");
    assert_eq!(resolve_config_path(Some(cli.as_path())), Some(cli.clone()));
    assert_eq!(resolve_config_path(None), Some(PathBuf::from("/tmp/from-env.toml")));

    clear_env();
}

#[test]
#[serial]
fn test_explicit_missing_file_is_an_error() {
    clear_env();
    let missing = PathBuf::from("/nonexistent/rmap/config.toml");
    let result = load_config(Some(missing.as_path()));
    assert!(matches!(result, Err(Error::Config(_))));
}

#[test]
#[serial]
fn test_load_from_file_with_env_overrides() {
    clear_env();
    let mut file = NamedTempFile::new().unwrap();
    writeln!(
        file,
        r#"
        database = "/var/lib/rmap/from-toml.db"
        owner_email = "owner@example.org"

        [email]
        from_address = "noreply@example.org"
        "#
    )
    .unwrap();

    env::set_var("RMAP_DATABASE", "/tmp/override.db");
    env::set_var("RMAP_SENDGRID_API_KEY", "SG.test");

    let config = load_config(Some(file.path())).unwrap();
    assert_eq!(config.database, PathBuf::from("/tmp/override.db"));
    assert_eq!(config.owner_email, "owner@example.org");
    assert_eq!(config.email.sendgrid_api_key.as_deref(), Some("SG.test"));
    assert_eq!(config.email.from_address.as_deref(), Some("noreply@example.org"));

    clear_env();
}

#[test]
#[serial]
fn test_defaults_are_usable() {
    clear_env();
    let config = TomlConfig::default();
    assert!(config.validate().is_ok());
    assert_eq!(config.staging_timeout_secs, 120);
    assert!(!config.gazetteer.is_empty());
    assert_eq!(config.cost_vocabulary.len(), 6);
}
