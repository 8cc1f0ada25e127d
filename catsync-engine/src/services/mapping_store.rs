//! Manual mapping store
//!
//! Explicit A↔B identifier overrides, kept in a human-editable TOML file:
//!
//! ```toml
//! [[mapping]]
//! kind = "anime"
//! a_id = 100
//! b_id = 200
//! comment = "second cour listed separately on B"
//! ```
//!
//! At most one mapping exists per `(kind, a_id)`; a later mapping replaces an
//! earlier one.

use crate::error::{SyncError, SyncResult};
use crate::types::{CatalogKind, EntryId, SyncDirection};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, warn};

/// Explicit correspondence override
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManualMapping {
    pub kind: CatalogKind,
    pub a_id: EntryId,
    pub b_id: EntryId,
    #[serde(default)]
    pub comment: String,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct MappingFile {
    #[serde(default, rename = "mapping")]
    mappings: Vec<ManualMapping>,
}

/// Ordered collection of manual mappings
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MappingStore {
    mappings: Vec<ManualMapping>,
}

impl MappingStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from a list, applying last-write-wins for duplicate keys
    pub fn from_mappings(mappings: impl IntoIterator<Item = ManualMapping>) -> Self {
        let mut store = Self::new();
        for m in mappings {
            store.add_or_update(m.kind, m.a_id, m.b_id, m.comment);
        }
        store
    }

    /// Load mappings from a TOML file
    ///
    /// A missing file yields an empty store. A malformed file is
    /// `ConfigInvalid`.
    pub fn load(path: &Path) -> SyncResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No mapping file, starting with empty store");
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| SyncError::ConfigInvalid(format!("{}: {}", path.display(), e)))
    }

    /// Parse mapping TOML text
    pub fn parse(content: &str) -> SyncResult<Self> {
        let file: MappingFile = toml::from_str(content)
            .map_err(|e| SyncError::ConfigInvalid(format!("Malformed mapping file: {}", e)))?;

        let raw_count = file.mappings.len();
        let store = Self::from_mappings(file.mappings);
        if store.len() < raw_count {
            warn!(
                duplicates = raw_count - store.len(),
                "Mapping file lists the same service A id more than once; later entries win"
            );
        }
        Ok(store)
    }

    /// Persist to TOML (atomic replace)
    pub fn save(&self, path: &Path) -> SyncResult<()> {
        let file = MappingFile {
            mappings: self.mappings.clone(),
        };
        let content = toml::to_string_pretty(&file)?;
        catsync_common::config::write_atomic(path, content.as_bytes())?;
        info!(path = %path.display(), count = self.mappings.len(), "Saved manual mappings");
        Ok(())
    }

    /// Insert or replace the mapping for `(kind, a_id)`
    ///
    /// Returns `true` when an existing mapping was replaced.
    pub fn add_or_update(
        &mut self,
        kind: CatalogKind,
        a_id: EntryId,
        b_id: EntryId,
        comment: impl Into<String>,
    ) -> bool {
        let mapping = ManualMapping {
            kind,
            a_id,
            b_id,
            comment: comment.into(),
        };

        match self
            .mappings
            .iter_mut()
            .find(|m| m.kind == kind && m.a_id == a_id)
        {
            Some(existing) => {
                *existing = mapping;
                true
            }
            None => {
                self.mappings.push(mapping);
                false
            }
        }
    }

    /// Mapping for an entry's source-side identifier
    ///
    /// Forward looks up by service A id, Reverse by service B id (first
    /// mapping in file order wins when several A ids point at one B id).
    pub fn lookup(
        &self,
        kind: CatalogKind,
        direction: SyncDirection,
        source_id: EntryId,
    ) -> Option<&ManualMapping> {
        self.mappings.iter().find(|m| {
            m.kind == kind
                && match direction {
                    SyncDirection::Forward => m.a_id == source_id,
                    SyncDirection::Reverse => m.b_id == source_id,
                }
        })
    }

    /// Target-side identifier mapped from `source_id`
    pub fn target_for(
        &self,
        kind: CatalogKind,
        direction: SyncDirection,
        source_id: EntryId,
    ) -> Option<EntryId> {
        self.lookup(kind, direction, source_id).map(|m| match direction {
            SyncDirection::Forward => m.b_id,
            SyncDirection::Reverse => m.a_id,
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManualMapping> {
        self.mappings.iter()
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }
}
