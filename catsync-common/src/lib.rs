//! # catsync Common Library
//!
//! Shared code for the catsync workspace including:
//! - Error type used by configuration and persistence helpers
//! - Catalog enums shared by configuration and the engine
//! - TOML configuration loading and path resolution
//! - Logging bootstrap

pub mod catalog;
pub mod config;
pub mod error;
pub mod logging;

pub use catalog::{CatalogKind, Service, SyncDirection};
pub use error::{Error, Result};
