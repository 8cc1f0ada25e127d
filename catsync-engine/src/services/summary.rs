//! End-of-pass summary
//!
//! Condenses a [`SyncReport`] into per-kind counts, a per-status breakdown,
//! unmapped and favorite-mismatch counts, and the first few errors.

use crate::services::sync_pass::{KindReport, SyncReport};
use crate::types::{CatalogKind, SyncDirection};
use std::fmt;
use uuid::Uuid;

/// One reported error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorLine {
    pub title: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KindLine {
    Completed {
        kind: CatalogKind,
        counts: String,
        by_status: String,
        unmapped: usize,
    },
    Failed {
        kind: CatalogKind,
        error: String,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncSummary {
    pub pass_id: Uuid,
    pub direction: SyncDirection,
    pub dry_run: bool,
    pub cancelled: bool,
    pub kinds: Vec<KindLine>,
    pub unmapped: usize,
    pub favorites_added: usize,
    pub favorites_dry_run: usize,
    pub favorite_mismatches: usize,
    /// First `limit` errors, in pass order
    pub errors: Vec<ErrorLine>,
    pub total_errors: usize,
}

impl SyncSummary {
    pub fn from_report(report: &SyncReport, error_limit: usize) -> Self {
        let mut summary = SyncSummary {
            pass_id: report.pass_id,
            direction: report.direction,
            dry_run: report.dry_run,
            cancelled: report.cancelled,
            kinds: Vec::with_capacity(report.kinds.len()),
            unmapped: 0,
            favorites_added: 0,
            favorites_dry_run: 0,
            favorite_mismatches: 0,
            errors: Vec::new(),
            total_errors: 0,
        };

        let mut all_errors = Vec::new();
        for kind_report in &report.kinds {
            match kind_report {
                KindReport::Completed {
                    reconciliation,
                    favorites,
                } => {
                    let stats = &reconciliation.statistics;
                    summary.unmapped += reconciliation.unmapped.len();
                    summary.kinds.push(KindLine::Completed {
                        kind: reconciliation.kind,
                        counts: stats.display_string(),
                        by_status: stats.status_breakdown(),
                        unmapped: reconciliation.unmapped.len(),
                    });
                    all_errors.extend(stats.errors().map(|item| ErrorLine {
                        title: item.title.clone(),
                        message: item.reason.clone(),
                    }));

                    if let Some(favorites) = favorites {
                        summary.favorites_added += favorites.added.len();
                        summary.favorites_dry_run += favorites.dry_run.len();
                        summary.favorite_mismatches += favorites.mismatches.len();
                        all_errors.extend(favorites.errors.iter().map(|(title, message)| ErrorLine {
                            title: title.clone(),
                            message: message.clone(),
                        }));
                    }
                }
                KindReport::Failed { kind, error } => {
                    summary.kinds.push(KindLine::Failed {
                        kind: *kind,
                        error: error.clone(),
                    });
                }
            }
        }

        summary.total_errors = all_errors.len();
        all_errors.truncate(error_limit);
        summary.errors = all_errors;
        summary
    }

    pub fn has_failures(&self) -> bool {
        self.total_errors > 0 || self.kinds.iter().any(|k| matches!(k, KindLine::Failed { .. }))
    }
}

impl fmt::Display for SyncSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sync pass {} ({}", self.pass_id, self.direction)?;
        if self.dry_run {
            write!(f, ", dry run")?;
        }
        if self.cancelled {
            write!(f, ", cancelled")?;
        }
        writeln!(f, ")")?;

        for line in &self.kinds {
            match line {
                KindLine::Completed {
                    kind,
                    counts,
                    by_status,
                    unmapped,
                } => {
                    writeln!(f, "  {}: {}", kind, counts)?;
                    if !by_status.is_empty() {
                        writeln!(f, "    by status: {}", by_status)?;
                    }
                    if *unmapped > 0 {
                        writeln!(f, "    unmapped: {}", unmapped)?;
                    }
                }
                KindLine::Failed { kind, error } => writeln!(f, "  {}: FAILED - {}", kind, error)?,
            }
        }

        writeln!(f, "Unmapped entries: {}", self.unmapped)?;
        write!(
            f,
            "Favorites: {} added, {} mismatches",
            self.favorites_added, self.favorite_mismatches
        )?;
        if self.favorites_dry_run > 0 {
            write!(f, ", {} would be added", self.favorites_dry_run)?;
        }
        writeln!(f)?;

        if self.total_errors > 0 {
            writeln!(f, "Errors (showing {} of {}):", self.errors.len(), self.total_errors)?;
            for error in &self.errors {
                writeln!(f, "  - {}: {}", error.title, error.message)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::favorites_reconciler::{FavoriteMismatch, FavoriteSide, FavoritesReport};
    use crate::services::statistics::{OutcomeItem, OutcomeKind, RunStatistics};
    use crate::services::update_reconciler::KindReconciliation;
    use crate::types::{EntryId, WatchStatus};
    use chrono::Utc;

    fn report() -> SyncReport {
        let mut statistics = RunStatistics::new();
        statistics.record(
            WatchStatus::Completed,
            OutcomeItem {
                kind: OutcomeKind::Updated,
                title: "A".into(),
                target_id: None,
                reason: "score 7 -> 8".into(),
            },
        );
        for title in ["B", "C", "D"] {
            statistics.record(
                WatchStatus::InProgress,
                OutcomeItem {
                    kind: OutcomeKind::Errored,
                    title: title.into(),
                    target_id: None,
                    reason: "HTTP 500".into(),
                },
            );
        }

        let favorites = FavoritesReport {
            mismatches: vec![FavoriteMismatch {
                kind: CatalogKind::Anime,
                title: "E".into(),
                side: FavoriteSide::OnlyOnA,
                source_id: None,
                target_id: EntryId::new(1).unwrap(),
            }],
            ..Default::default()
        };

        SyncReport {
            pass_id: Uuid::nil(),
            direction: SyncDirection::Forward,
            dry_run: false,
            started_at: Utc::now(),
            finished_at: Utc::now(),
            kinds: vec![
                KindReport::Completed {
                    reconciliation: KindReconciliation {
                        kind: CatalogKind::Anime,
                        direction: SyncDirection::Forward,
                        statistics,
                        unmapped: Vec::new(),
                        updates: Vec::new(),
                    },
                    favorites: Some(favorites),
                },
                KindReport::Failed {
                    kind: CatalogKind::Manga,
                    error: "timeout".into(),
                },
            ],
            cancelled: false,
        }
    }

    #[test]
    fn test_error_limit() {
        let summary = SyncSummary::from_report(&report(), 2);
        assert_eq!(summary.total_errors, 3);
        assert_eq!(summary.errors.len(), 2);
        assert_eq!(summary.errors[0].title, "B");
        assert_eq!(summary.favorite_mismatches, 1);
        assert!(summary.has_failures());
    }

    #[test]
    fn test_rendering() {
        let text = SyncSummary::from_report(&report(), 10).to_string();
        assert!(text.contains("anime: 1 updated, 0 skipped, 3 errors, 0 dry-run"));
        assert!(text.contains("by status: in_progress: 3, completed: 1"));
        assert!(text.contains("manga: FAILED - timeout"));
        assert!(text.contains("Favorites: 0 added, 1 mismatches"));
        assert!(text.contains("Errors (showing 3 of 3):"));
        assert!(text.contains("  - B: HTTP 500"));
    }
}
