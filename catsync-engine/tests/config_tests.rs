//! Run configuration built from config files and the environment
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that touch CATSYNC_DATA_DIR or CATSYNC_CONFIG are marked #[serial].

use catsync_common::config::{
    load_toml_config, resolve_config_path, write_toml_config, TomlConfig, CONFIG_ENV_VAR,
    DATA_DIR_ENV_VAR,
};
use catsync_engine::{CatalogKind, SyncConfig, SyncDirection, SyncError};
use serial_test::serial;
use std::env;
use std::path::PathBuf;
use std::time::Duration;
use tempfile::TempDir;

#[test]
#[serial]
fn test_store_paths_follow_data_dir_env() {
    env::set_var(DATA_DIR_ENV_VAR, "/tmp/catsync-engine-data");

    let config = SyncConfig::from_toml(&TomlConfig::default());
    assert_eq!(
        config.paths.mapping_file,
        PathBuf::from("/tmp/catsync-engine-data/mappings.toml")
    );
    assert_eq!(
        config.paths.ledger_dir,
        PathBuf::from("/tmp/catsync-engine-data/unmapped")
    );

    env::remove_var(DATA_DIR_ENV_VAR);
}

#[test]
#[serial]
fn test_config_file_from_env_drives_run_config() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("config.toml");

    let mut toml = TomlConfig::default();
    toml.sync.direction = SyncDirection::Reverse;
    toml.sync.kinds = vec![CatalogKind::Manga];
    toml.sync.workers = 2;
    toml.favorites.enabled = true;
    toml.favorites.min_interval_ms = 250;
    toml.paths.data_dir = Some(dir.path().to_path_buf());
    write_toml_config(&toml, &path).unwrap();

    env::set_var(CONFIG_ENV_VAR, &path);
    let resolved = resolve_config_path(None).unwrap();
    env::remove_var(CONFIG_ENV_VAR);
    assert_eq!(resolved, path);

    let config = SyncConfig::from_toml(&load_toml_config(&resolved).unwrap());
    assert_eq!(config.direction, SyncDirection::Reverse);
    assert_eq!(config.kinds, vec![CatalogKind::Manga]);
    assert_eq!(config.workers, 2);
    assert!(config.favorites.enabled);
    assert_eq!(config.favorites.min_interval, Duration::from_millis(250));
    assert_eq!(config.paths.cache_file, dir.path().join("response-cache.json"));
    config.validate().unwrap();
}

#[test]
fn test_zero_workers_clamped_on_load() {
    let mut toml = TomlConfig::default();
    toml.sync.workers = 0;
    assert_eq!(SyncConfig::from_toml(&toml).workers, 1);

    let config = SyncConfig {
        workers: 0,
        ..SyncConfig::default()
    };
    assert!(matches!(config.validate(), Err(SyncError::ConfigInvalid(_))));
}
