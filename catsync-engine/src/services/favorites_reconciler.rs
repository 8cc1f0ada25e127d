//! Favorites Reconciler
//!
//! The boolean, write-asymmetric variant of the update reconciler. Only the
//! configured writable direction may add favorites on its target service,
//! and favorites are never removed. Every other disagreement is reported.
//!
//! Adds run one at a time behind a [`WriteThrottle`]; cancellation during the
//! throttle wait aborts before the write is attempted.

use crate::config::FavoritesConfig;
use crate::error::SyncResult;
use crate::services::catalog_provider::FavoriteWriter;
use crate::services::correspondence_resolver::{resolve, ResolveContext, Resolution};
use crate::services::write_throttle::WriteThrottle;
use crate::types::{CatalogEntry, CatalogKind, CatalogList, EntryId, Service, SyncDirection};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Which service holds a favorite the other one lacks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FavoriteSide {
    OnlyOnA,
    OnlyOnB,
}

impl FavoriteSide {
    pub fn of(service: Service) -> Self {
        match service {
            Service::A => FavoriteSide::OnlyOnA,
            Service::B => FavoriteSide::OnlyOnB,
        }
    }
}

/// Favorite flag disagreement left for the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteMismatch {
    pub kind: CatalogKind,
    pub title: String,
    pub side: FavoriteSide,
    pub source_id: Option<EntryId>,
    pub target_id: EntryId,
}

/// Favorite added (or, in a dry run, that would be added)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoriteAdd {
    pub title: String,
    pub target_id: EntryId,
}

/// Outcome of one kind's favorites pass
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FavoritesReport {
    pub added: Vec<FavoriteAdd>,
    pub dry_run: Vec<FavoriteAdd>,
    pub mismatches: Vec<FavoriteMismatch>,
    /// `(title, message)` of failed adds
    pub errors: Vec<(String, String)>,
    /// Pairs whose flags already agree
    pub unchanged: usize,
}

/// What to do with one resolved pair
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FavoriteDecision {
    Unchanged,
    Add,
    Mismatch(FavoriteSide),
}

/// Decide the action for one pair of flags
///
/// Add only when the source has the favorite, the target does not, and the
/// pass runs in the writable direction.
pub fn decide(
    source_favorite: bool,
    target_favorite: bool,
    direction: SyncDirection,
    writable_direction: SyncDirection,
) -> FavoriteDecision {
    match (source_favorite, target_favorite) {
        (true, true) | (false, false) => FavoriteDecision::Unchanged,
        (true, false) if direction == writable_direction => FavoriteDecision::Add,
        (true, false) => FavoriteDecision::Mismatch(FavoriteSide::of(direction.source())),
        (false, true) => FavoriteDecision::Mismatch(FavoriteSide::of(direction.target())),
    }
}

pub struct FavoritesReconciler<'a> {
    config: &'a FavoritesConfig,
    throttle: &'a WriteThrottle,
    dry_run: bool,
}

impl<'a> FavoritesReconciler<'a> {
    /// `throttle` spans the whole pass so the interval holds across kinds
    pub fn new(config: &'a FavoritesConfig, throttle: &'a WriteThrottle, dry_run: bool) -> Self {
        Self {
            config,
            throttle,
            dry_run,
        }
    }

    /// Reconcile favorite flags of `source` against `target`
    ///
    /// Returns `SyncError::Cancelled` when cancelled while waiting for the
    /// throttle; adds made before that point stay made.
    pub async fn reconcile(
        &self,
        source: &CatalogList,
        target: &CatalogList,
        ctx: &ResolveContext<'_>,
        writer: &dyn FavoriteWriter,
        cancel: &CancellationToken,
    ) -> SyncResult<FavoritesReport> {
        let mut report = FavoritesReport::default();
        let writable = ctx.direction == self.config.writable_direction;

        for entry in &source.entries {
            let Resolution::Matched {
                target_id, target: counterpart, ..
            } = resolve(entry, &target.entries, ctx)
            else {
                continue;
            };
            let target_favorite = counterpart.is_some_and(|t| t.favorite);

            match decide(entry.favorite, target_favorite, ctx.direction, self.config.writable_direction) {
                FavoriteDecision::Unchanged => report.unchanged += 1,
                FavoriteDecision::Mismatch(side) => {
                    debug!(title = %entry.title(), side = ?side, "Favorite mismatch");
                    report.mismatches.push(mismatch(ctx, entry, target_id, side));
                }
                FavoriteDecision::Add => {
                    self.add(entry, target_id, ctx.kind, writer, cancel, &mut report)
                        .await?;
                }
            }
        }

        info!(
            kind = %ctx.kind,
            direction = %ctx.direction,
            writable,
            added = report.added.len(),
            dry_run = report.dry_run.len(),
            mismatches = report.mismatches.len(),
            errors = report.errors.len(),
            "Favorites reconciled"
        );
        Ok(report)
    }

    async fn add(
        &self,
        entry: &CatalogEntry,
        target_id: EntryId,
        kind: CatalogKind,
        writer: &dyn FavoriteWriter,
        cancel: &CancellationToken,
        report: &mut FavoritesReport,
    ) -> SyncResult<()> {
        let add = FavoriteAdd {
            title: entry.title().to_string(),
            target_id,
        };

        if self.dry_run {
            report.dry_run.push(add);
            return Ok(());
        }

        self.throttle.acquire(cancel).await?;

        match writer.add_favorite(kind, target_id).await {
            Ok(()) => {
                debug!(title = %add.title, target_id = %target_id, "Favorite added");
                report.added.push(add);
            }
            Err(e) => {
                warn!(title = %add.title, target_id = %target_id, error = %e, "Adding favorite failed");
                report.errors.push((add.title, format!("{:#}", e)));
            }
        }
        Ok(())
    }
}

fn mismatch(
    ctx: &ResolveContext<'_>,
    entry: &CatalogEntry,
    target_id: EntryId,
    side: FavoriteSide,
) -> FavoriteMismatch {
    FavoriteMismatch {
        kind: ctx.kind,
        title: entry.title().to_string(),
        side,
        source_id: entry.source_id(ctx.direction),
        target_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decision_table() {
        use FavoriteDecision::*;
        let fwd = SyncDirection::Forward;
        let rev = SyncDirection::Reverse;

        assert_eq!(decide(true, true, fwd, fwd), Unchanged);
        assert_eq!(decide(false, false, fwd, fwd), Unchanged);
        assert_eq!(decide(true, false, fwd, fwd), Add);
        assert_eq!(decide(true, false, fwd, rev), Mismatch(FavoriteSide::OnlyOnA));
        assert_eq!(decide(true, false, rev, rev), Add);
        // Never removes
        assert_eq!(decide(false, true, fwd, fwd), Mismatch(FavoriteSide::OnlyOnB));
        assert_eq!(decide(false, true, rev, rev), Mismatch(FavoriteSide::OnlyOnA));
    }
}
