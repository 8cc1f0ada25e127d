//! Sync pass statistics
//!
//! **Purpose:** Aggregate per-entry outcomes of one catalog kind's pass for
//! the summary.
//!
//! Statistics are built by a single fold over the finished outcomes, never
//! by concurrent increments.

use crate::types::{EntryId, WatchStatus};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Outcome category of one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Updated,
    Skipped,
    Errored,
    DryRun,
}

/// One recorded skip, error or update
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutcomeItem {
    pub kind: OutcomeKind,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_id: Option<EntryId>,
    /// Skip reason, error message or change description
    pub reason: String,
}

/// **Per-pass Statistics**
///
/// Display: "N updated, M skipped, E errors, D dry-run"
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunStatistics {
    pub updated: usize,
    pub skipped: usize,
    pub errored: usize,
    pub dry_run: usize,
    /// Entries processed, keyed by source status
    pub per_status: BTreeMap<WatchStatus, usize>,
    pub items: Vec<OutcomeItem>,
}

impl RunStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clear every counter and item
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Count one entry outcome
    pub fn record(&mut self, source_status: WatchStatus, item: OutcomeItem) {
        match item.kind {
            OutcomeKind::Updated => self.updated += 1,
            OutcomeKind::Skipped => self.skipped += 1,
            OutcomeKind::Errored => self.errored += 1,
            OutcomeKind::DryRun => self.dry_run += 1,
        }
        *self.per_status.entry(source_status).or_insert(0) += 1;
        self.items.push(item);
    }

    /// Entries processed
    pub fn total(&self) -> usize {
        self.updated + self.skipped + self.errored + self.dry_run
    }

    pub fn items_of(&self, kind: OutcomeKind) -> impl Iterator<Item = &OutcomeItem> {
        self.items.iter().filter(move |i| i.kind == kind)
    }

    pub fn errors(&self) -> impl Iterator<Item = &OutcomeItem> {
        self.items_of(OutcomeKind::Errored)
    }

    pub fn display_string(&self) -> String {
        format!(
            "{} updated, {} skipped, {} errors, {} dry-run",
            self.updated, self.skipped, self.errored, self.dry_run
        )
    }

    /// Per-status breakdown, e.g. "completed: 12, in_progress: 3"
    pub fn status_breakdown(&self) -> String {
        self.per_status
            .iter()
            .map(|(status, count)| format!("{}: {}", status, count))
            .collect::<Vec<_>>()
            .join(", ")
    }
}
