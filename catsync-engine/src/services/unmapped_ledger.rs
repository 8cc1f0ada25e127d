//! Unmapped entry ledger
//!
//! Append-only record of source entries for which no counterpart was found.
//! Written as a timestamped JSON snapshot after a pass so the user can fix
//! the gaps with manual mappings or ignore rules.

use crate::error::SyncResult;
use crate::types::{CatalogKind, ServiceIds, SyncDirection};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::info;

/// Source entry without a counterpart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnmappedEntry {
    pub kind: CatalogKind,
    pub direction: SyncDirection,
    /// Whatever identifiers were known
    pub ids: ServiceIds,
    pub title: String,
    pub reason: String,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct UnmappedLedger {
    entries: Vec<UnmappedEntry>,
}

impl UnmappedLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn extend(&mut self, entries: impl IntoIterator<Item = UnmappedEntry>) {
        self.entries.extend(entries);
    }

    pub fn entries(&self) -> &[UnmappedEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn count_for(&self, kind: CatalogKind) -> usize {
        self.entries.iter().filter(|e| e.kind == kind).count()
    }

    /// Write `unmapped-<UTC timestamp>.json` into `dir`
    pub fn write_snapshot(&self, dir: &Path) -> SyncResult<PathBuf> {
        let stamp = Utc::now().format("%Y%m%dT%H%M%S%.3fZ");
        let path = dir.join(format!("unmapped-{}.json", stamp));
        let json = serde_json::to_vec_pretty(&self.entries)?;
        catsync_common::config::write_atomic(&path, &json)?;

        info!(path = %path.display(), count = self.entries.len(), "Wrote unmapped ledger snapshot");
        Ok(path)
    }

    pub fn read_snapshot(path: &Path) -> SyncResult<Self> {
        let content = std::fs::read(path)?;
        let entries = serde_json::from_slice(&content)?;
        Ok(Self { entries })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn entry(kind: CatalogKind, title: &str) -> UnmappedEntry {
        UnmappedEntry {
            kind,
            direction: SyncDirection::Forward,
            ids: ServiceIds::new(Some(12), None),
            title: title.to_string(),
            reason: "no match".to_string(),
            recorded_at: Utc::now(),
        }
    }

    #[test]
    fn test_snapshot_round_trip() {
        let dir = TempDir::new().unwrap();
        let mut ledger = UnmappedLedger::new();
        ledger.extend([
            entry(CatalogKind::Anime, "Lost Work"),
            entry(CatalogKind::Manga, "Other Work"),
        ]);

        let path = ledger.write_snapshot(&dir.path().join("ledger")).unwrap();
        assert!(path.file_name().unwrap().to_string_lossy().starts_with("unmapped-"));

        let restored = UnmappedLedger::read_snapshot(&path).unwrap();
        assert_eq!(restored, ledger);
        assert_eq!(restored.count_for(CatalogKind::Anime), 1);
    }

    #[test]
    fn test_empty_ledger_still_writes_snapshot() {
        let dir = TempDir::new().unwrap();
        let path = UnmappedLedger::new().write_snapshot(dir.path()).unwrap();
        assert!(UnmappedLedger::read_snapshot(&path).unwrap().is_empty());
    }
}
