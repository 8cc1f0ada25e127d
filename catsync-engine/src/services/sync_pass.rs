//! Sync pass orchestrator
//!
//! **Flow per catalog kind:** Discover → (enrich titles) → Reconcile →
//! Favorites → Aggregate
//!
//! A failure to fetch either list ends only that kind; the remaining kinds
//! still run. Cancellation stops the pass between kinds and during favorite
//! throttle waits.

use crate::config::SyncConfig;
use crate::error::{SyncError, SyncResult};
use crate::services::catalog_provider::{CatalogProvider, FavoriteWriter, TitleSource};
use crate::services::correspondence_resolver::ResolveContext;
use crate::services::favorites_reconciler::{FavoritesReconciler, FavoritesReport};
use crate::services::ignore_registry::IgnoreRegistry;
use crate::services::mapping_store::MappingStore;
use crate::services::response_cache::{title_key, ResponseCache};
use crate::services::statistics::RunStatistics;
use crate::services::unmapped_ledger::UnmappedLedger;
use crate::services::update_reconciler::{KindReconciliation, UpdateReconciler};
use crate::services::write_throttle::WriteThrottle;
use crate::types::{CatalogKind, CatalogList, EntryId, Service, SyncDirection, TitleSet};
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// External collaborators and stores used by one pass
pub struct Collaborators<'a> {
    pub service_a: &'a dyn CatalogProvider,
    pub service_b: &'a dyn CatalogProvider,
    pub favorites_a: Option<&'a dyn FavoriteWriter>,
    pub favorites_b: Option<&'a dyn FavoriteWriter>,
    /// Fills missing title fields of source entries
    pub titles: Option<&'a dyn TitleSource>,
    pub cache: Option<Arc<ResponseCache>>,
    pub mappings: &'a MappingStore,
    pub ignore: &'a IgnoreRegistry,
}

impl<'a> Collaborators<'a> {
    pub fn new(
        service_a: &'a dyn CatalogProvider,
        service_b: &'a dyn CatalogProvider,
        mappings: &'a MappingStore,
        ignore: &'a IgnoreRegistry,
    ) -> Self {
        Self {
            service_a,
            service_b,
            favorites_a: None,
            favorites_b: None,
            titles: None,
            cache: None,
            mappings,
            ignore,
        }
    }

    fn provider(&self, service: Service) -> &'a dyn CatalogProvider {
        match service {
            Service::A => self.service_a,
            Service::B => self.service_b,
        }
    }

    fn favorite_writer(&self, service: Service) -> Option<&'a dyn FavoriteWriter> {
        match service {
            Service::A => self.favorites_a,
            Service::B => self.favorites_b,
        }
    }
}

/// Result of one catalog kind
#[derive(Debug, Clone, PartialEq)]
pub enum KindReport {
    Completed {
        reconciliation: KindReconciliation,
        favorites: Option<FavoritesReport>,
    },
    /// A list could not be fetched; nothing was reconciled for this kind
    Failed { kind: CatalogKind, error: String },
}

impl KindReport {
    pub fn kind(&self) -> CatalogKind {
        match self {
            KindReport::Completed { reconciliation, .. } => reconciliation.kind,
            KindReport::Failed { kind, .. } => *kind,
        }
    }

    pub fn statistics(&self) -> Option<&RunStatistics> {
        match self {
            KindReport::Completed { reconciliation, .. } => Some(&reconciliation.statistics),
            KindReport::Failed { .. } => None,
        }
    }
}

/// Result of a whole pass
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub pass_id: Uuid,
    pub direction: SyncDirection,
    pub dry_run: bool,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub kinds: Vec<KindReport>,
    pub cancelled: bool,
}

impl SyncReport {
    /// Every unmapped entry of the pass
    pub fn ledger(&self) -> UnmappedLedger {
        let mut ledger = UnmappedLedger::new();
        for report in &self.kinds {
            if let KindReport::Completed { reconciliation, .. } = report {
                ledger.extend(reconciliation.unmapped.iter().cloned());
            }
        }
        ledger
    }

    pub fn kind(&self, kind: CatalogKind) -> Option<&KindReport> {
        self.kinds.iter().find(|r| r.kind() == kind)
    }

    pub fn failed_kinds(&self) -> impl Iterator<Item = &KindReport> {
        self.kinds.iter().filter(|r| matches!(r, KindReport::Failed { .. }))
    }
}

pub struct SyncPass;

impl SyncPass {
    /// Run every configured kind in the configured direction
    ///
    /// Only an invalid configuration fails the call; per-kind failures are
    /// part of the report.
    pub async fn run(
        config: &SyncConfig,
        collaborators: &Collaborators<'_>,
        cancel: &CancellationToken,
    ) -> SyncResult<SyncReport> {
        config.validate()?;

        let pass_id = Uuid::new_v4();
        let started_at = Utc::now();
        info!(
            pass_id = %pass_id,
            direction = %config.direction,
            kinds = ?config.kinds,
            dry_run = config.dry_run,
            force = config.force,
            "Sync pass starting"
        );

        let mut kinds = Vec::with_capacity(config.kinds.len());
        let mut cancelled = false;
        let favorites_throttle = WriteThrottle::new(config.favorites.min_interval);

        for &kind in &config.kinds {
            if cancel.is_cancelled() {
                warn!(pass_id = %pass_id, kind = %kind, "Pass cancelled before kind started");
                cancelled = true;
                break;
            }

            match Self::run_kind(kind, config, collaborators, &favorites_throttle, cancel).await {
                Ok((report, kind_cancelled)) => {
                    kinds.push(report);
                    if kind_cancelled {
                        cancelled = true;
                        break;
                    }
                }
                Err(e) => {
                    error!(pass_id = %pass_id, kind = %kind, error = %e, "Catalog kind aborted");
                    kinds.push(KindReport::Failed {
                        kind,
                        error: e.to_string(),
                    });
                }
            }
        }

        let report = SyncReport {
            pass_id,
            direction: config.direction,
            dry_run: config.dry_run,
            started_at,
            finished_at: Utc::now(),
            kinds,
            cancelled,
        };
        info!(
            pass_id = %pass_id,
            kinds = report.kinds.len(),
            failed = report.failed_kinds().count(),
            cancelled,
            "Sync pass finished"
        );
        Ok(report)
    }

    /// Returns the kind's report and whether cancellation cut it short
    async fn run_kind(
        kind: CatalogKind,
        config: &SyncConfig,
        collaborators: &Collaborators<'_>,
        favorites_throttle: &WriteThrottle,
        cancel: &CancellationToken,
    ) -> SyncResult<(KindReport, bool)> {
        let direction = config.direction;
        let source_service = direction.source();
        let target_service = direction.target();
        let target_provider = collaborators.provider(target_service);

        // Discover
        let mut source = fetch(collaborators.provider(source_service), source_service, kind).await?;
        let target = fetch(target_provider, target_service, kind).await?;

        if let Some(titles) = collaborators.titles {
            enrich_titles(
                &mut source,
                source_service,
                titles,
                collaborators.cache.as_deref(),
                config.workers,
                cancel,
            )
            .await;
        }

        // Resolve, diff, apply
        let reconciler = UpdateReconciler::new(config, collaborators.mappings, collaborators.ignore);
        let reconciliation = reconciler
            .reconcile_kind(&source, &target, target_provider, cancel)
            .await;

        // Favorites
        let mut cancelled = cancel.is_cancelled();
        let favorites = match collaborators.favorite_writer(target_service) {
            Some(writer) if config.favorites.enabled && !cancelled => {
                let ctx = ResolveContext {
                    kind,
                    direction,
                    mappings: collaborators.mappings,
                    ignore: collaborators.ignore,
                    options: config.resolver,
                };
                let favorites = FavoritesReconciler::new(&config.favorites, favorites_throttle, config.dry_run);
                match favorites.reconcile(&source, &target, &ctx, writer, cancel).await {
                    Ok(report) => Some(report),
                    Err(SyncError::Cancelled) => {
                        warn!(kind = %kind, "Favorites cancelled");
                        cancelled = true;
                        None
                    }
                    Err(e) => return Err(e),
                }
            }
            _ => None,
        };

        Ok((
            KindReport::Completed {
                reconciliation,
                favorites,
            },
            cancelled,
        ))
    }
}

async fn fetch(
    provider: &dyn CatalogProvider,
    service: Service,
    kind: CatalogKind,
) -> SyncResult<CatalogList> {
    debug!(service = %service, kind = %kind, "Fetching list");
    provider
        .fetch_entries(kind)
        .await
        .map_err(|e| SyncError::RemoteFetchFailed {
            service,
            kind,
            message: format!("{:#}", e),
        })
}

/// Fill empty title fields of source entries through the title source
///
/// Lookups go through the cache when one is configured. A failed lookup
/// leaves the entry as it was.
async fn enrich_titles(
    list: &mut CatalogList,
    service: Service,
    source: &dyn TitleSource,
    cache: Option<&ResponseCache>,
    workers: usize,
    cancel: &CancellationToken,
) {
    let kind = list.kind;
    let wanted: Vec<(usize, EntryId)> = list
        .entries
        .iter()
        .enumerate()
        .filter(|(_, e)| e.titles.iter().any(|t| t.trim().is_empty()))
        .filter_map(|(i, e)| e.ids.get(service).map(|id| (i, id)))
        .collect();

    if wanted.is_empty() {
        return;
    }
    debug!(kind = %kind, count = wanted.len(), "Looking up missing titles");

    let found: Vec<(usize, Option<TitleSet>)> = stream::iter(wanted)
        .map(|(index, id)| async move {
            if cancel.is_cancelled() {
                return (index, None);
            }
            let key = title_key(kind, service, id);
            if let Some(cache) = cache {
                if let Some(titles) = cache.get_as::<TitleSet>(&key).await {
                    return (index, Some(titles));
                }
            }
            match source.lookup_titles(kind, id, cancel).await {
                Ok(Some(titles)) => {
                    if let Some(cache) = cache {
                        if let Err(e) = cache.set_as(key, &titles).await {
                            warn!(error = %e, "Caching titles failed");
                        }
                    }
                    (index, Some(titles))
                }
                Ok(None) => (index, None),
                Err(e) => {
                    warn!(kind = %kind, id = %id, error = %e, "Title lookup failed");
                    (index, None)
                }
            }
        })
        .buffered(workers.max(1))
        .collect()
        .await;

    for (index, titles) in found {
        if let Some(titles) = titles {
            list.entries[index].titles.fill_missing(&titles);
        }
    }
}
