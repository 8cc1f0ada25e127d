//! Reconciliation services
//!
//! Leaf-first: title matching and score conversion are pure; the resolver
//! builds on them plus the mapping store and ignore registry; the update and
//! favorites reconcilers build on the resolver; the sync pass drives them.

pub mod catalog_provider;
pub mod correspondence_resolver;
pub mod favorites_reconciler;
pub mod ignore_registry;
pub mod mapping_store;
pub mod response_cache;
pub mod score_normalizer;
pub mod snapshot_provider;
pub mod statistics;
pub mod summary;
pub mod sync_pass;
pub mod title_matcher;
pub mod unmapped_ledger;
pub mod update_reconciler;
pub mod write_throttle;

pub use catalog_provider::{CatalogProvider, FavoriteWriter, TitleSource};
pub use correspondence_resolver::{resolve, MatchMethod, ResolveContext, Resolution, ResolverOptions, UnmappedReason};
pub use favorites_reconciler::{FavoriteSide, FavoritesReconciler, FavoritesReport};
pub use ignore_registry::{IgnoreRegistry, IgnoreRule};
pub use mapping_store::{ManualMapping, MappingStore};
pub use response_cache::ResponseCache;
pub use score_normalizer::ScoreFormat;
pub use snapshot_provider::{SnapshotDocument, SnapshotProvider};
pub use statistics::{OutcomeItem, OutcomeKind, RunStatistics};
pub use summary::SyncSummary;
pub use sync_pass::{Collaborators, KindReport, SyncPass, SyncReport};
pub use title_matcher::{normalize, title_match_tier, title_matching_levels, TitleMatch, TitleTier};
pub use unmapped_ledger::{UnmappedEntry, UnmappedLedger};
pub use update_reconciler::{EntryDiff, KindReconciliation, UpdateReconciler};
pub use write_throttle::WriteThrottle;
