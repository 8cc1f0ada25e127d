//! Update Reconciler (diff engine)
//!
//! For one catalog kind and one direction, every source entry is resolved
//! against the target list, diffed, and either written, recorded as a dry-run
//! update, or skipped. Entries are processed independently on a bounded
//! worker pool; outcomes are folded into statistics and the unmapped ledger
//! afterwards, in source-list order.
//!
//! **Per-entry flow:** Resolve → Diff → Apply | Report
//!
//! **Update policy:** write iff the writable diff is non-empty AND
//! (`force` OR the pair is not already synchronized).

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::services::catalog_provider::CatalogProvider;
use crate::services::correspondence_resolver::{resolve, MatchMethod, ResolveContext, Resolution};
use crate::services::ignore_registry::IgnoreRegistry;
use crate::services::mapping_store::MappingStore;
use crate::services::score_normalizer::{convert, to_canonical, ScoreFormat};
use crate::services::statistics::{OutcomeItem, OutcomeKind, RunStatistics};
use crate::services::unmapped_ledger::UnmappedEntry;
use crate::types::{
    CatalogEntry, CatalogKind, CatalogList, EntryId, ServiceIds, SyncDirection, UpdateRecord,
    WatchStatus,
};
use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::fmt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Field of an entry that can differ between the two services
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiffField {
    Status,
    Score,
    Progress,
    SubProgress,
    /// Informational only; never written
    TotalUnits,
}

impl DiffField {
    pub fn is_writable(self) -> bool {
        self != DiffField::TotalUnits
    }

    pub fn as_str(self) -> &'static str {
        match self {
            DiffField::Status => "status",
            DiffField::Score => "score",
            DiffField::Progress => "progress",
            DiffField::SubProgress => "sub_progress",
            DiffField::TotalUnits => "total_units",
        }
    }
}

/// One differing field, values rendered for display
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldChange {
    pub field: DiffField,
    pub from: String,
    pub to: String,
}

impl fmt::Display for FieldChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} -> {}", self.field.as_str(), self.from, self.to)
    }
}

/// A field left out of the comparison because its value cannot be mapped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataGap {
    /// Source status has no canonical mapping
    Status,
    /// One of the two lists uses an unknown score format
    ScoreFormat,
}

/// Field-level difference between a source entry and its target
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryDiff {
    pub changes: Vec<FieldChange>,
    pub gaps: Vec<DataGap>,
}

impl EntryDiff {
    /// True when no writable field differs
    pub fn is_empty(&self) -> bool {
        !self.changes.iter().any(|c| c.field.is_writable())
    }

    pub fn has(&self, field: DiffField) -> bool {
        self.changes.iter().any(|c| c.field == field)
    }

    pub fn describe(&self) -> String {
        self.changes
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Score formats of the source and target lists
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreFormats {
    pub source: Option<ScoreFormat>,
    pub target: Option<ScoreFormat>,
}

impl ScoreFormats {
    pub fn of(source: &CatalogList, target: &CatalogList) -> Self {
        Self {
            source: source.score_format,
            target: target.score_format,
        }
    }

    /// Both formats, when both are known
    pub fn both(self) -> Option<(ScoreFormat, ScoreFormat)> {
        self.source.zip(self.target)
    }
}

/// Progress value the target would hold, clamped to its known total
fn clamp_to_total(value: u32, total: Option<u32>) -> u32 {
    total.map_or(value, |t| value.min(t))
}

/// Compare progress the way re-runs stay stable
///
/// With both totals known, remaining units are compared (so differing
/// episode counts between services do not cause endless rewrites).
/// Otherwise raw progress is compared.
pub fn same_progress(source: &CatalogEntry, target: &CatalogEntry) -> bool {
    match (source.known_total(), target.known_total()) {
        (Some(_), Some(_)) => source.remaining_units() == target.remaining_units(),
        _ => source.progress == target.progress,
    }
}

/// Field-level diff of `source` against `target`
///
/// `target` is the target's current state (a default entry when the work is
/// not on the target list yet).
pub fn diff(
    source: &CatalogEntry,
    target: &CatalogEntry,
    kind: CatalogKind,
    formats: ScoreFormats,
) -> EntryDiff {
    let mut result = EntryDiff::default();

    if source.status.is_known() {
        if source.status != target.status {
            result.changes.push(FieldChange {
                field: DiffField::Status,
                from: target.status.to_string(),
                to: source.status.to_string(),
            });
        }
    } else {
        result.gaps.push(DataGap::Status);
    }

    match formats.both() {
        Some((source_format, target_format)) => {
            let wanted = to_canonical(source.score, source_format);
            let current = to_canonical(target.score, target_format);
            if wanted != current {
                result.changes.push(FieldChange {
                    field: DiffField::Score,
                    from: current.to_string(),
                    to: wanted.to_string(),
                });
            }
        }
        None => result.gaps.push(DataGap::ScoreFormat),
    }

    let progress = clamp_to_total(source.progress, target.known_total());
    if progress != target.progress {
        result.changes.push(FieldChange {
            field: DiffField::Progress,
            from: target.progress.to_string(),
            to: progress.to_string(),
        });
    }

    if kind.is_chaptered() {
        let sub_progress = clamp_to_total(source.sub_progress, target.known_sub_total());
        if sub_progress != target.sub_progress {
            result.changes.push(FieldChange {
                field: DiffField::SubProgress,
                from: target.sub_progress.to_string(),
                to: sub_progress.to_string(),
            });
        }
    }

    if let (Some(source_total), Some(target_total)) = (source.known_total(), target.known_total()) {
        if source_total != target_total {
            result.changes.push(FieldChange {
                field: DiffField::TotalUnits,
                from: target_total.to_string(),
                to: source_total.to_string(),
            });
        }
    }

    result
}

/// Status, canonical score and progress already agree
///
/// Fields excluded by a data gap count as equal.
pub fn is_synchronized(source: &CatalogEntry, target: &CatalogEntry, diff: &EntryDiff) -> bool {
    !diff.has(DiffField::Status) && !diff.has(DiffField::Score) && same_progress(source, target)
}

/// Full replacement record for the target
///
/// Fields that cannot be mapped keep the target's current value.
pub fn build_update(
    source: &CatalogEntry,
    target: &CatalogEntry,
    kind: CatalogKind,
    formats: ScoreFormats,
) -> UpdateRecord {
    let status = if source.status.is_known() {
        source.status
    } else {
        target.status
    };

    let score = match formats.both() {
        Some((source_format, target_format)) => convert(source.score, source_format, target_format),
        None => target.score,
    };

    let sub_progress = if kind.is_chaptered() {
        clamp_to_total(source.sub_progress, target.known_sub_total())
    } else {
        target.sub_progress
    };

    UpdateRecord {
        status,
        score,
        progress: clamp_to_total(source.progress, target.known_total()),
        sub_progress,
        started_at: source.started_at.or(target.started_at),
        finished_at: source.finished_at.or(target.finished_at),
    }
}

/// What happened to one source entry
#[derive(Debug)]
pub enum EntryAction {
    Updated,
    DryRun,
    Skipped(String),
    Errored(SyncError),
    Unmapped(String),
    Excluded,
}

/// Result of processing one source entry
#[derive(Debug)]
pub struct EntryOutcome {
    pub title: String,
    pub source_status: WatchStatus,
    pub source_ids: ServiceIds,
    pub target_id: Option<EntryId>,
    pub method: Option<MatchMethod>,
    pub diff: EntryDiff,
    pub update: Option<UpdateRecord>,
    pub action: EntryAction,
}

/// Update computed for a target entry (written or dry-run)
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedUpdate {
    pub target_id: EntryId,
    pub title: String,
    pub record: UpdateRecord,
    pub applied: bool,
}

/// Aggregate of one kind's reconciliation
#[derive(Debug, Clone, PartialEq)]
pub struct KindReconciliation {
    pub kind: CatalogKind,
    pub direction: SyncDirection,
    pub statistics: RunStatistics,
    pub unmapped: Vec<UnmappedEntry>,
    pub updates: Vec<PlannedUpdate>,
}

/// Diff engine bound to one run's configuration and stores
pub struct UpdateReconciler<'a> {
    config: &'a SyncConfig,
    mappings: &'a MappingStore,
    ignore: &'a IgnoreRegistry,
}

impl<'a> UpdateReconciler<'a> {
    pub fn new(config: &'a SyncConfig, mappings: &'a MappingStore, ignore: &'a IgnoreRegistry) -> Self {
        Self {
            config,
            mappings,
            ignore,
        }
    }

    fn context(&self, kind: CatalogKind) -> ResolveContext<'a> {
        ResolveContext {
            kind,
            direction: self.config.direction,
            mappings: self.mappings,
            ignore: self.ignore,
            options: self.config.resolver,
        }
    }

    /// Reconcile one kind: every source entry against the target list
    ///
    /// `writer` is the target service's provider. Statistics start from zero.
    pub async fn reconcile_kind(
        &self,
        source: &CatalogList,
        target: &CatalogList,
        writer: &dyn CatalogProvider,
        cancel: &CancellationToken,
    ) -> KindReconciliation {
        let kind = source.kind;
        let formats = ScoreFormats::of(source, target);
        if formats.both().is_none() {
            warn!(
                kind = %kind,
                source_format = ?formats.source,
                target_format = ?formats.target,
                "Score format unknown, scores will not be compared or written"
            );
        }
        let unknown_status = source.entries.iter().filter(|e| !e.status.is_known()).count();
        if unknown_status > 0 {
            warn!(
                kind = %kind,
                entries = unknown_status,
                "Source status unknown, target status left unchanged"
            );
        }

        info!(
            kind = %kind,
            direction = %self.config.direction,
            source_entries = source.entries.len(),
            target_entries = target.entries.len(),
            workers = self.config.workers,
            dry_run = self.config.dry_run,
            force = self.config.force,
            "Reconciling"
        );

        let ctx = self.context(kind);
        let ctx = &ctx;
        let candidates = target.entries.as_slice();
        let outcomes: Vec<EntryOutcome> = stream::iter(source.entries.iter())
            .map(|entry| self.process_entry(entry, candidates, ctx, formats, writer, cancel))
            .buffered(self.config.workers.max(1))
            .collect()
            .await;

        let result = self.fold(kind, outcomes);
        info!(
            kind = %kind,
            stats = %result.statistics.display_string(),
            unmapped = result.unmapped.len(),
            "Reconciliation complete"
        );
        result
    }

    async fn process_entry(
        &self,
        entry: &CatalogEntry,
        candidates: &[CatalogEntry],
        ctx: &ResolveContext<'_>,
        formats: ScoreFormats,
        writer: &dyn CatalogProvider,
        cancel: &CancellationToken,
    ) -> EntryOutcome {
        let mut outcome = EntryOutcome {
            title: entry.title().to_string(),
            source_status: entry.status,
            source_ids: entry.ids,
            target_id: None,
            method: None,
            diff: EntryDiff::default(),
            update: None,
            action: EntryAction::Excluded,
        };

        let (target_id, current, method) = match resolve(entry, candidates, ctx) {
            Resolution::Excluded => return outcome,
            Resolution::Unmapped { reason } => {
                outcome.action = EntryAction::Unmapped(reason.as_str().to_string());
                return outcome;
            }
            Resolution::Matched {
                target_id,
                target,
                method,
            } => (target_id, target.cloned().unwrap_or_default(), method),
        };
        outcome.target_id = Some(target_id);
        outcome.method = Some(method);

        let entry_diff = diff(entry, &current, ctx.kind, formats);
        let synchronized = is_synchronized(entry, &current, &entry_diff);
        outcome.diff = entry_diff;

        if outcome.diff.is_empty() {
            outcome.action = EntryAction::Skipped("no changes".to_string());
            return outcome;
        }
        if synchronized && !self.config.force {
            outcome.action = EntryAction::Skipped("already synchronized".to_string());
            return outcome;
        }

        let record = build_update(entry, &current, ctx.kind, formats);
        if self.config.verbose {
            info!(title = %outcome.title, target_id = %target_id, method = %method, changes = %outcome.diff.describe(), "Update");
        } else {
            debug!(title = %outcome.title, target_id = %target_id, method = %method, changes = %outcome.diff.describe(), "Update");
        }
        outcome.update = Some(record.clone());

        if self.config.dry_run {
            outcome.action = EntryAction::DryRun;
            return outcome;
        }
        if cancel.is_cancelled() {
            outcome.action = EntryAction::Skipped("cancelled".to_string());
            return outcome;
        }

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => None,
            result = writer.apply_update(ctx.kind, target_id, &record) => Some(result),
        };
        outcome.action = match result {
            None => {
                warn!(title = %outcome.title, target_id = %target_id, "Update abandoned on cancel");
                EntryAction::Skipped("cancelled".to_string())
            }
            Some(Ok(())) => EntryAction::Updated,
            Some(Err(e)) => {
                let error = SyncError::RemoteUpdateFailed {
                    service: ctx.direction.target(),
                    kind: ctx.kind,
                    target_id: target_id.get(),
                    message: format!("{:#}", e),
                };
                warn!(title = %outcome.title, error = %error, "Update failed, continuing");
                EntryAction::Errored(error)
            }
        };
        outcome
    }

    /// Single reduce step over the finished outcomes
    fn fold(&self, kind: CatalogKind, outcomes: Vec<EntryOutcome>) -> KindReconciliation {
        let direction = self.config.direction;
        let mut statistics = RunStatistics::new();
        let mut unmapped = Vec::new();
        let mut updates = Vec::new();

        for outcome in outcomes {
            let (item_kind, reason) = match outcome.action {
                EntryAction::Updated => (OutcomeKind::Updated, outcome.diff.describe()),
                EntryAction::DryRun => (OutcomeKind::DryRun, outcome.diff.describe()),
                EntryAction::Skipped(reason) => (OutcomeKind::Skipped, reason),
                EntryAction::Errored(error) => (OutcomeKind::Errored, error.to_string()),
                EntryAction::Excluded => (OutcomeKind::Skipped, "ignored".to_string()),
                EntryAction::Unmapped(reason) => {
                    let error = SyncError::CorrespondenceNotFound {
                        title: outcome.title.clone(),
                        reason: reason.clone(),
                    };
                    debug!(kind = %kind, "{}", error);
                    unmapped.push(UnmappedEntry {
                        kind,
                        direction,
                        ids: outcome.source_ids,
                        title: outcome.title.clone(),
                        reason,
                        recorded_at: Utc::now(),
                    });
                    (OutcomeKind::Skipped, error.to_string())
                }
            };

            if let (Some(target_id), Some(record)) = (outcome.target_id, outcome.update) {
                if matches!(item_kind, OutcomeKind::Updated | OutcomeKind::DryRun) {
                    updates.push(PlannedUpdate {
                        target_id,
                        title: outcome.title.clone(),
                        record,
                        applied: item_kind == OutcomeKind::Updated,
                    });
                }
            }

            statistics.record(
                outcome.source_status,
                OutcomeItem {
                    kind: item_kind,
                    title: outcome.title,
                    target_id: outcome.target_id,
                    reason,
                },
            );
        }

        KindReconciliation {
            kind,
            direction,
            statistics,
            unmapped,
            updates,
        }
    }
}
