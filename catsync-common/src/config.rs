//! Configuration loading and path resolution
//!
//! Config file resolution follows this priority order:
//! 1. Command-line argument (highest priority)
//! 2. `CATSYNC_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/catsync/config.toml`)
//!
//! A missing file is not fatal: a warning is logged and built-in defaults are
//! used. A file that exists but fails to parse is a configuration error and
//! must stop the program before any sync pass starts.

use crate::catalog::{CatalogKind, SyncDirection};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable overriding the config file location
pub const CONFIG_ENV_VAR: &str = "CATSYNC_CONFIG";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV_VAR: &str = "CATSYNC_DATA_DIR";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    #[serde(default)]
    pub logging: LoggingConfig,

    #[serde(default)]
    pub sync: SyncSection,

    #[serde(default)]
    pub favorites: FavoritesSection,

    #[serde(default)]
    pub cache: CacheSection,

    #[serde(default)]
    pub paths: PathsSection,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

/// `[sync]` section: toggles read by every reconciliation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSection {
    #[serde(default)]
    pub direction: SyncDirection,

    /// Update even when the pair already looks synchronized
    #[serde(default)]
    pub force: bool,

    /// Compute updates without writing them
    #[serde(default)]
    pub dry_run: bool,

    #[serde(default)]
    pub verbose: bool,

    /// Match title-less entries on equal total counts
    #[serde(default = "default_true")]
    pub structural_fallback: bool,

    /// Concurrent per-entry workers
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Errors listed in the end-of-run summary
    #[serde(default = "default_error_report_limit")]
    pub error_report_limit: usize,

    #[serde(default = "default_kinds")]
    pub kinds: Vec<CatalogKind>,
}

impl Default for SyncSection {
    fn default() -> Self {
        Self {
            direction: SyncDirection::default(),
            force: false,
            dry_run: false,
            verbose: false,
            structural_fallback: true,
            workers: default_workers(),
            error_report_limit: default_error_report_limit(),
            kinds: default_kinds(),
        }
    }
}

/// `[favorites]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FavoritesSection {
    #[serde(default)]
    pub enabled: bool,

    /// The only direction allowed to add favorites on its target service
    #[serde(default = "default_favorites_direction")]
    pub writable_direction: SyncDirection,

    /// Minimum spacing between two favorite writes
    #[serde(default = "default_min_interval_ms")]
    pub min_interval_ms: u64,
}

impl Default for FavoritesSection {
    fn default() -> Self {
        Self {
            enabled: false,
            writable_direction: default_favorites_direction(),
            min_interval_ms: default_min_interval_ms(),
        }
    }
}

/// `[cache]` section
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheSection {
    #[serde(default = "default_cache_max_age_hours")]
    pub max_age_hours: u64,
}

impl Default for CacheSection {
    fn default() -> Self {
        Self {
            max_age_hours: default_cache_max_age_hours(),
        }
    }
}

/// `[paths]` section
///
/// Relative file paths resolve against `data_dir`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsSection {
    #[serde(default)]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_mapping_file")]
    pub mapping_file: PathBuf,

    #[serde(default = "default_ignore_file")]
    pub ignore_file: PathBuf,

    #[serde(default = "default_ledger_dir")]
    pub ledger_dir: PathBuf,

    #[serde(default = "default_cache_file")]
    pub cache_file: PathBuf,
}

impl Default for PathsSection {
    fn default() -> Self {
        Self {
            data_dir: None,
            mapping_file: default_mapping_file(),
            ignore_file: default_ignore_file(),
            ledger_dir: default_ledger_dir(),
            cache_file: default_cache_file(),
        }
    }
}

impl PathsSection {
    /// Data directory: configured value, then `CATSYNC_DATA_DIR`, then the
    /// platform default
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        if let Ok(dir) = std::env::var(DATA_DIR_ENV_VAR) {
            if !dir.trim().is_empty() {
                return PathBuf::from(dir);
            }
        }
        default_data_dir()
    }

    pub fn mapping_file(&self) -> PathBuf {
        self.resolve(&self.mapping_file)
    }

    pub fn ignore_file(&self) -> PathBuf {
        self.resolve(&self.ignore_file)
    }

    pub fn ledger_dir(&self) -> PathBuf {
        self.resolve(&self.ledger_dir)
    }

    pub fn cache_file(&self) -> PathBuf {
        self.resolve(&self.cache_file)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.data_dir().join(path)
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_workers() -> usize {
    4
}

fn default_error_report_limit() -> usize {
    10
}

fn default_kinds() -> Vec<CatalogKind> {
    CatalogKind::ALL.to_vec()
}

fn default_favorites_direction() -> SyncDirection {
    SyncDirection::Reverse
}

fn default_min_interval_ms() -> u64 {
    1000
}

fn default_cache_max_age_hours() -> u64 {
    24 * 7
}

fn default_mapping_file() -> PathBuf {
    PathBuf::from("mappings.toml")
}

fn default_ignore_file() -> PathBuf {
    PathBuf::from("ignore.toml")
}

fn default_ledger_dir() -> PathBuf {
    PathBuf::from("unmapped")
}

fn default_cache_file() -> PathBuf {
    PathBuf::from("response-cache.json")
}

/// OS-dependent default data directory
pub fn default_data_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("catsync"))
        .unwrap_or_else(|| PathBuf::from("./catsync_data"))
}

/// Resolve the config file path
///
/// Returns `None` when no candidate can be determined at all (no CLI
/// argument, no environment variable and no platform config directory).
pub fn resolve_config_path(cli_arg: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = cli_arg {
        return Some(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
        if !path.trim().is_empty() {
            return Some(PathBuf::from(path));
        }
    }

    dirs::config_dir().map(|d| d.join("catsync").join("config.toml"))
}

/// Load TOML configuration
///
/// Missing file: warning + defaults. Unreadable or malformed file:
/// `Error::Config`.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;

    let config = parse_toml_config(&content)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;

    validate(&config)?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Parse configuration text without touching the filesystem
pub fn parse_toml_config(content: &str) -> Result<TomlConfig> {
    toml::from_str(content).map_err(|e| Error::Config(format!("Parse TOML failed: {}", e)))
}

fn validate(config: &TomlConfig) -> Result<()> {
    if config.sync.workers == 0 {
        return Err(Error::Config("sync.workers must be at least 1".to_string()));
    }
    if config.sync.kinds.is_empty() {
        return Err(Error::Config("sync.kinds must name at least one catalog kind".to_string()));
    }
    Ok(())
}

/// Write TOML configuration atomically (temp file + rename)
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    write_atomic(path, content.as_bytes())
}

/// Write bytes to `path` through a sibling temp file and rename
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = PathBuf::from(tmp);

    std::fs::write(&tmp, bytes)?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = parse_toml_config("").unwrap();
        assert_eq!(config, TomlConfig::default());
        assert!(config.sync.structural_fallback);
        assert_eq!(config.sync.workers, 4);
        assert_eq!(config.favorites.writable_direction, SyncDirection::Reverse);
        assert_eq!(config.sync.kinds, vec![CatalogKind::Anime, CatalogKind::Manga]);
    }

    #[test]
    fn test_partial_sections() {
        let config = parse_toml_config(
            r#"
            [sync]
            direction = "reverse"
            dry_run = true
            structural_fallback = false
            kinds = ["manga"]

            [favorites]
            enabled = true
            min_interval_ms = 250
            "#,
        )
        .unwrap();

        assert_eq!(config.sync.direction, SyncDirection::Reverse);
        assert!(config.sync.dry_run);
        assert!(!config.sync.force);
        assert!(!config.sync.structural_fallback);
        assert_eq!(config.sync.kinds, vec![CatalogKind::Manga]);
        assert!(config.favorites.enabled);
        assert_eq!(config.favorites.min_interval_ms, 250);
        assert_eq!(config.cache.max_age_hours, 168);
    }

    #[test]
    fn test_malformed_document_is_config_error() {
        let err = parse_toml_config("[sync]\ndirection = \"sideways\"").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_relative_paths_resolve_against_data_dir() {
        let paths = PathsSection {
            data_dir: Some(PathBuf::from("/var/lib/catsync")),
            ..Default::default()
        };
        assert_eq!(paths.mapping_file(), PathBuf::from("/var/lib/catsync/mappings.toml"));
        assert_eq!(paths.ledger_dir(), PathBuf::from("/var/lib/catsync/unmapped"));

        let absolute = PathsSection {
            data_dir: Some(PathBuf::from("/var/lib/catsync")),
            ignore_file: PathBuf::from("/etc/catsync/ignore.toml"),
            ..Default::default()
        };
        assert_eq!(absolute.ignore_file(), PathBuf::from("/etc/catsync/ignore.toml"));
    }
}
