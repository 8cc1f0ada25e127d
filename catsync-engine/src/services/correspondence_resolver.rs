//! Correspondence Resolver
//!
//! Decides which target-service entry (if any) denotes the same work as a
//! source-service entry. Resolution is a pure function of the entry, the
//! candidate list, the direction, the mapping store, the ignore registry and
//! the resolver options; it reads no shared state.
//!
//! **Order (first hit wins):**
//! 1. Ignore registry → `Excluded`
//! 2. Manual mapping for the source id
//! 3. Counterpart id already carried by the entry
//! 4. Title cascade over candidates, in list order
//! 5. Structural fallback on equal totals (title-less pairs only, toggleable)

use crate::services::ignore_registry::IgnoreRegistry;
use crate::services::mapping_store::MappingStore;
use crate::services::title_matcher::{title_match_tier, TitleMatch};
use crate::types::{CatalogEntry, CatalogKind, EntryId, SyncDirection};
use std::fmt;
use tracing::debug;

/// Resolver toggles
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolverOptions {
    /// Match title-less pairs on equal total counts
    ///
    /// Can over-match works split or merged differently between services.
    pub structural_fallback: bool,
}

impl Default for ResolverOptions {
    fn default() -> Self {
        Self {
            structural_fallback: true,
        }
    }
}

/// Everything resolution depends on besides the entry and candidates
#[derive(Debug, Clone, Copy)]
pub struct ResolveContext<'a> {
    pub kind: CatalogKind,
    pub direction: SyncDirection,
    pub mappings: &'a MappingStore,
    pub ignore: &'a IgnoreRegistry,
    pub options: ResolverOptions,
}

/// How a correspondence was established
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchMethod {
    ManualMapping,
    ExistingId,
    Title(TitleMatch),
    Structural,
}

impl fmt::Display for MatchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchMethod::ManualMapping => write!(f, "manual mapping"),
            MatchMethod::ExistingId => write!(f, "existing id"),
            MatchMethod::Title(m) => write!(f, "title ({} {}, {:.1})", m.field, m.tier, m.similarity),
            MatchMethod::Structural => write!(f, "equal totals"),
        }
    }
}

/// Why no correspondence was found
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnmappedReason {
    /// Titles were available but nothing matched
    NoMatch,
    /// The entry has no titles and the structural fallback is disabled
    NoTitleSignal,
}

impl UnmappedReason {
    pub fn as_str(self) -> &'static str {
        match self {
            UnmappedReason::NoMatch => "no match",
            UnmappedReason::NoTitleSignal => "no title signal",
        }
    }
}

impl fmt::Display for UnmappedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Resolution outcome
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution<'a> {
    /// Listed in the ignore registry; not a failure
    Excluded,
    Matched {
        target_id: EntryId,
        /// The target entry when it is present in the candidate list
        target: Option<&'a CatalogEntry>,
        method: MatchMethod,
    },
    Unmapped { reason: UnmappedReason },
}

impl Resolution<'_> {
    pub fn target_id(&self) -> Option<EntryId> {
        match self {
            Resolution::Matched { target_id, .. } => Some(*target_id),
            _ => None,
        }
    }
}

/// Resolve one source entry against the target-side candidates
pub fn resolve<'a>(
    entry: &CatalogEntry,
    candidates: &'a [CatalogEntry],
    ctx: &ResolveContext<'_>,
) -> Resolution<'a> {
    let target_service = ctx.direction.target();
    let find_target =
        |id: EntryId| candidates.iter().find(|c| c.ids.get(target_service) == Some(id));

    // 1. Ignore registry
    if ctx.ignore.is_entry_ignored(ctx.kind, entry) {
        debug!(title = %entry.title(), "Entry excluded by ignore registry");
        return Resolution::Excluded;
    }

    // 2. Manual mapping
    if let Some(source_id) = entry.source_id(ctx.direction) {
        if let Some(target_id) = ctx.mappings.target_for(ctx.kind, ctx.direction, source_id) {
            debug!(
                title = %entry.title(),
                source_id = %source_id,
                target_id = %target_id,
                "Resolved by manual mapping"
            );
            return Resolution::Matched {
                target_id,
                target: find_target(target_id),
                method: MatchMethod::ManualMapping,
            };
        }
    }

    // 3. Counterpart id from an earlier lookup
    if let Some(target_id) = entry.target_id(ctx.direction) {
        return Resolution::Matched {
            target_id,
            target: find_target(target_id),
            method: MatchMethod::ExistingId,
        };
    }

    // 4. Title cascade
    for candidate in candidates {
        let Some(target_id) = candidate.ids.get(target_service) else {
            continue;
        };
        if let Some(hit) = title_match_tier(&entry.titles, &candidate.titles) {
            debug!(
                title = %entry.title(),
                candidate = %candidate.title(),
                field = %hit.field,
                tier = %hit.tier,
                similarity = hit.similarity,
                "Resolved by title"
            );
            return Resolution::Matched {
                target_id,
                target: Some(candidate),
                method: MatchMethod::Title(hit),
            };
        }
    }

    // 5. Structural fallback
    // Only when neither side of the pair carries any title
    if ctx.options.structural_fallback && entry.titles.is_empty() {
        for candidate in candidates {
            let Some(target_id) = candidate.ids.get(target_service) else {
                continue;
            };
            if candidate.titles.is_empty() && same_structure(entry, candidate) {
                debug!(
                    title = %entry.title(),
                    target_id = %target_id,
                    total = ?entry.known_total(),
                    "Resolved by equal totals"
                );
                return Resolution::Matched {
                    target_id,
                    target: Some(candidate),
                    method: MatchMethod::Structural,
                };
            }
        }
    }

    let reason = if entry.titles.is_empty() && !ctx.options.structural_fallback {
        UnmappedReason::NoTitleSignal
    } else {
        UnmappedReason::NoMatch
    };
    debug!(title = %entry.title(), reason = %reason, "No correspondence");
    Resolution::Unmapped { reason }
}

/// Equal known totals; sub-totals must also agree when both sides know them
fn same_structure(a: &CatalogEntry, b: &CatalogEntry) -> bool {
    match (a.known_total(), b.known_total()) {
        (Some(ta), Some(tb)) if ta == tb => match (a.known_sub_total(), b.known_sub_total()) {
            (Some(sa), Some(sb)) => sa == sb,
            _ => true,
        },
        _ => false,
    }
}
