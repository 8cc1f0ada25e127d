//! Integration tests for configuration loading and graceful degradation
//!
//! Tests that manipulate CATSYNC_CONFIG or CATSYNC_DATA_DIR are marked with
//! #[serial] so they never race on process environment.

use catsync_common::config::{
    load_toml_config, resolve_config_path, write_toml_config, PathsSection, TomlConfig,
    CONFIG_ENV_VAR, DATA_DIR_ENV_VAR,
};
use catsync_common::{CatalogKind, Error, SyncDirection};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_missing_file_falls_back_to_defaults() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("does-not-exist.toml");

    let config = load_toml_config(&path).unwrap();
    assert_eq!(config, TomlConfig::default());
}

#[test]
fn test_malformed_file_is_fatal() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[sync\nforce = yes").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(matches!(err, Error::Config(_)), "got {:?}", err);
}

#[test]
fn test_zero_workers_rejected() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "[sync]\nworkers = 0\n").unwrap();

    let err = load_toml_config(&path).unwrap_err();
    assert!(err.to_string().contains("workers"));
}

#[test]
fn test_write_then_load_preserves_settings() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.toml");

    let mut config = TomlConfig::default();
    config.sync.direction = SyncDirection::Reverse;
    config.sync.force = true;
    config.sync.kinds = vec![CatalogKind::Anime];
    config.favorites.enabled = true;
    config.paths.data_dir = Some(PathBuf::from("/srv/catsync"));

    write_toml_config(&config, &path).unwrap();
    assert!(!path.with_extension("toml.tmp").exists());

    let loaded = load_toml_config(&path).unwrap();
    assert_eq!(loaded, config);
}

#[test]
#[serial]
fn test_cli_argument_beats_environment() {
    env::set_var(CONFIG_ENV_VAR, "/tmp/catsync-env.toml");

    let resolved = resolve_config_path(Some(std::path::Path::new("/tmp/catsync-cli.toml")));
    assert_eq!(resolved, Some(PathBuf::from("/tmp/catsync-cli.toml")));

    let resolved = resolve_config_path(None);
    assert_eq!(resolved, Some(PathBuf::from("/tmp/catsync-env.toml")));

    env::remove_var(CONFIG_ENV_VAR);
}

#[test]
#[serial]
fn test_data_dir_environment_override() {
    env::set_var(DATA_DIR_ENV_VAR, "/tmp/catsync-data");

    let paths = PathsSection::default();
    assert_eq!(paths.data_dir(), PathBuf::from("/tmp/catsync-data"));
    assert_eq!(paths.cache_file(), PathBuf::from("/tmp/catsync-data/response-cache.json"));

    env::remove_var(DATA_DIR_ENV_VAR);
}
