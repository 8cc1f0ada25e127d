//! Run configuration for catsync-engine
//!
//! `SyncConfig` is built once from the TOML file (plus command-line
//! overrides) and passed by reference into every reconciliation call. It is
//! never mutated during a pass.

use crate::error::{SyncError, SyncResult};
use crate::services::correspondence_resolver::ResolverOptions;
use crate::types::{CatalogKind, SyncDirection};
use catsync_common::config::TomlConfig;
use std::path::PathBuf;
use std::time::Duration;

/// Favorites reconciliation settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FavoritesConfig {
    pub enabled: bool,
    /// The only direction allowed to add favorites
    pub writable_direction: SyncDirection,
    pub min_interval: Duration,
}

impl Default for FavoritesConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            writable_direction: SyncDirection::Reverse,
            min_interval: Duration::from_millis(1000),
        }
    }
}

/// File locations, already resolved against the data directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncPaths {
    pub mapping_file: PathBuf,
    pub ignore_file: PathBuf,
    pub ledger_dir: PathBuf,
    pub cache_file: PathBuf,
}

/// Immutable per-run configuration
#[derive(Debug, Clone, PartialEq)]
pub struct SyncConfig {
    pub direction: SyncDirection,
    pub force: bool,
    pub dry_run: bool,
    pub verbose: bool,
    pub resolver: ResolverOptions,
    pub workers: usize,
    pub error_report_limit: usize,
    pub kinds: Vec<CatalogKind>,
    pub favorites: FavoritesConfig,
    pub cache_max_age: Duration,
    pub paths: SyncPaths,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self::from_toml(&TomlConfig::default())
    }
}

impl SyncConfig {
    pub fn from_toml(toml: &TomlConfig) -> Self {
        let sync = &toml.sync;
        Self {
            direction: sync.direction,
            force: sync.force,
            dry_run: sync.dry_run,
            verbose: sync.verbose,
            resolver: ResolverOptions {
                structural_fallback: sync.structural_fallback,
            },
            workers: sync.workers.max(1),
            error_report_limit: sync.error_report_limit,
            kinds: sync.kinds.clone(),
            favorites: FavoritesConfig {
                enabled: toml.favorites.enabled,
                writable_direction: toml.favorites.writable_direction,
                min_interval: Duration::from_millis(toml.favorites.min_interval_ms),
            },
            cache_max_age: Duration::from_secs(toml.cache.max_age_hours * 3600),
            paths: SyncPaths {
                mapping_file: toml.paths.mapping_file(),
                ignore_file: toml.paths.ignore_file(),
                ledger_dir: toml.paths.ledger_dir(),
                cache_file: toml.paths.cache_file(),
            },
        }
    }

    /// Reject settings no pass can run with
    pub fn validate(&self) -> SyncResult<()> {
        if self.workers == 0 {
            return Err(SyncError::ConfigInvalid("workers must be at least 1".to_string()));
        }
        if self.kinds.is_empty() {
            return Err(SyncError::ConfigInvalid(
                "at least one catalog kind must be configured".to_string(),
            ));
        }
        Ok(())
    }
}
