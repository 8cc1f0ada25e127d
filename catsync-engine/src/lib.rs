//! catsync-engine library interface
//!
//! Correspondence and reconciliation engine for keeping watch/read progress
//! consistent between two catalog-tracking services. Exposes the services
//! for the `catsync` binary and for integration testing.

pub mod config;
pub mod error;
pub mod services;
pub mod types;

pub use crate::config::{FavoritesConfig, SyncConfig};
pub use crate::error::{SyncError, SyncResult};
pub use crate::types::{
    CatalogEntry, CatalogKind, CatalogList, EntryId, Service, ServiceIds, SyncDirection, TitleSet,
    UpdateRecord, WatchStatus,
};
