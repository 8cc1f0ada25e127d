//! Collaborator traits for the remote catalog services
//!
//! The engine performs no network I/O itself. Each service is reached
//! through these traits; transport concerns (auth, retry, backoff, rate
//! limiting) live in the implementations. Implementation errors are opaque
//! (`anyhow`) and are attributed by the caller as fetch or update failures.

use crate::types::{CatalogKind, CatalogList, EntryId, Service, TitleSet, UpdateRecord};
use anyhow::Result;
use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

/// Read and write access to one service's lists
#[async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Which service this provider talks to
    fn service(&self) -> Service;

    /// Fetch the user's whole list for one kind
    async fn fetch_entries(&self, kind: CatalogKind) -> Result<CatalogList>;

    /// Replace the user's record for `target_id` with `update`
    async fn apply_update(
        &self,
        kind: CatalogKind,
        target_id: EntryId,
        update: &UpdateRecord,
    ) -> Result<()>;
}

/// Favorite toggling (add only)
#[async_trait]
pub trait FavoriteWriter: Send + Sync {
    async fn add_favorite(&self, kind: CatalogKind, target_id: EntryId) -> Result<()>;
}

/// Secondary title lookup (e.g. localized titles missing from a list export)
#[async_trait]
pub trait TitleSource: Send + Sync {
    /// Titles for `id`, or `None` when the source does not know the work
    async fn lookup_titles(
        &self,
        kind: CatalogKind,
        id: EntryId,
        cancel: &CancellationToken,
    ) -> Result<Option<TitleSet>>;
}
