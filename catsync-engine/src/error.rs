//! Error types for catsync-engine
//!
//! Only `RemoteFetchFailed` ends a catalog kind's pass and only
//! `ConfigInvalid` stops the program. Every other variant is captured per
//! entry and reported in the summary.

use catsync_common::{CatalogKind, Service};
use thiserror::Error;

/// Reconciliation error type
#[derive(Debug, Error)]
pub enum SyncError {
    /// No counterpart found for an entry (recorded as unmapped)
    #[error("No correspondence found for '{title}': {reason}")]
    CorrespondenceNotFound { title: String, reason: String },

    /// A whole entry list could not be fetched
    #[error("Fetching {kind} list from service {service} failed: {message}")]
    RemoteFetchFailed {
        service: Service,
        kind: CatalogKind,
        message: String,
    },

    /// A single write failed
    #[error("Updating {kind} entry {target_id} on service {service} failed: {message}")]
    RemoteUpdateFailed {
        service: Service,
        kind: CatalogKind,
        target_id: i64,
        message: String,
    },

    /// Status value with no canonical mapping
    #[error("Unknown status: {0}")]
    StatusUnknown(String),

    /// Score format with no conversion ratio
    #[error("Unknown score format: {0}")]
    ScoreFormatUnknown(String),

    /// Invalid configuration, mapping or ignore file
    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    /// Caller cancelled the operation
    #[error("Operation cancelled")]
    Cancelled,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML parse error: {0}")]
    TomlDe(#[from] toml::de::Error),

    /// TOML write error
    #[error("TOML write error: {0}")]
    TomlSer(#[from] toml::ser::Error),

    /// catsync-common error
    #[error("Common error: {0}")]
    Common(#[from] catsync_common::Error),
}

/// Result type for reconciliation operations
pub type SyncResult<T> = Result<T, SyncError>;
