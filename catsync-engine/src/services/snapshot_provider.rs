//! File-backed catalog provider
//!
//! Serves one service's lists from an exported JSON document so two exports
//! can be reconciled offline:
//!
//! ```json
//! {
//!   "score_format": "POINT_100",
//!   "anime": [ { "ids": { "a": 1 }, "titles": { "primary": "..." }, ... } ],
//!   "manga": []
//! }
//! ```
//!
//! Updates and favorite adds change the in-memory document; `save` writes it
//! back.

use crate::error::SyncResult;
use crate::services::catalog_provider::{CatalogProvider, FavoriteWriter};
use crate::services::score_normalizer::ScoreFormat;
use crate::types::{CatalogEntry, CatalogKind, CatalogList, EntryId, Service, UpdateRecord};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Exported list document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SnapshotDocument {
    /// Service-native score format string, e.g. `POINT_10_DECIMAL`
    #[serde(default)]
    pub score_format: String,
    #[serde(default)]
    pub anime: Vec<CatalogEntry>,
    #[serde(default)]
    pub manga: Vec<CatalogEntry>,
}

impl SnapshotDocument {
    fn list(&self, kind: CatalogKind) -> &Vec<CatalogEntry> {
        match kind {
            CatalogKind::Anime => &self.anime,
            CatalogKind::Manga => &self.manga,
        }
    }

    fn list_mut(&mut self, kind: CatalogKind) -> &mut Vec<CatalogEntry> {
        match kind {
            CatalogKind::Anime => &mut self.anime,
            CatalogKind::Manga => &mut self.manga,
        }
    }
}

pub struct SnapshotProvider {
    service: Service,
    path: Option<PathBuf>,
    document: Mutex<SnapshotDocument>,
}

impl SnapshotProvider {
    pub fn new(service: Service, document: SnapshotDocument) -> Self {
        Self {
            service,
            path: None,
            document: Mutex::new(document),
        }
    }

    /// Read a snapshot file; `save` writes back to the same path
    pub fn load(service: Service, path: &Path) -> SyncResult<Self> {
        let content = std::fs::read(path)?;
        let document: SnapshotDocument = serde_json::from_slice(&content)?;
        info!(
            service = %service,
            path = %path.display(),
            anime = document.anime.len(),
            manga = document.manga.len(),
            "Loaded list snapshot"
        );
        Ok(Self {
            service,
            path: Some(path.to_path_buf()),
            document: Mutex::new(document),
        })
    }

    pub async fn document(&self) -> SnapshotDocument {
        self.document.lock().await.clone()
    }

    /// Write the document back to its file (no-op for in-memory snapshots)
    pub async fn save(&self) -> SyncResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let document = self.document.lock().await;
        let json = serde_json::to_vec_pretty(&*document)?;
        catsync_common::config::write_atomic(path, &json)?;
        info!(service = %self.service, path = %path.display(), "Saved list snapshot");
        Ok(())
    }
}

fn parse_score_format(raw: &str) -> Option<ScoreFormat> {
    if raw.trim().is_empty() {
        return None;
    }
    match raw.parse::<ScoreFormat>() {
        Ok(format) => Some(format),
        Err(e) => {
            warn!(error = %e, "Snapshot score format not convertible");
            None
        }
    }
}

#[async_trait]
impl CatalogProvider for SnapshotProvider {
    fn service(&self) -> Service {
        self.service
    }

    async fn fetch_entries(&self, kind: CatalogKind) -> Result<CatalogList> {
        let document = self.document.lock().await;
        Ok(CatalogList::new(
            kind,
            parse_score_format(&document.score_format),
            document.list(kind).clone(),
        ))
    }

    async fn apply_update(
        &self,
        kind: CatalogKind,
        target_id: EntryId,
        update: &UpdateRecord,
    ) -> Result<()> {
        let service = self.service;
        let mut document = self.document.lock().await;
        let entries = document.list_mut(kind);

        let index = match entries.iter().position(|e| e.ids.get(service) == Some(target_id)) {
            Some(index) => index,
            None => {
                debug!(service = %service, kind = %kind, target_id = %target_id, "Adding entry to snapshot");
                let mut entry = CatalogEntry::default();
                entry.ids.set(service, Some(target_id));
                entries.push(entry);
                entries.len() - 1
            }
        };

        let entry = &mut entries[index];
        entry.status = update.status;
        entry.score = update.score;
        entry.progress = update.progress;
        entry.sub_progress = update.sub_progress;
        entry.started_at = update.started_at;
        entry.finished_at = update.finished_at;
        Ok(())
    }
}

#[async_trait]
impl FavoriteWriter for SnapshotProvider {
    async fn add_favorite(&self, kind: CatalogKind, target_id: EntryId) -> Result<()> {
        let service = self.service;
        let mut document = self.document.lock().await;
        let entry = document
            .list_mut(kind)
            .iter_mut()
            .find(|e| e.ids.get(service) == Some(target_id))
            .ok_or_else(|| anyhow!("{} entry {} is not on the list", kind, target_id))?;
        entry.favorite = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ServiceIds, TitleSet, WatchStatus};
    use tempfile::TempDir;

    fn document() -> SnapshotDocument {
        SnapshotDocument {
            score_format: "POINT_10".to_string(),
            anime: vec![CatalogEntry {
                ids: ServiceIds::new(None, Some(7)),
                titles: TitleSet::primary_only("Frieren"),
                status: WatchStatus::InProgress,
                progress: 3,
                ..Default::default()
            }],
            manga: Vec::new(),
        }
    }

    fn record(progress: u32) -> UpdateRecord {
        UpdateRecord {
            status: WatchStatus::Completed,
            score: 9.0,
            progress,
            sub_progress: 0,
            started_at: None,
            finished_at: None,
        }
    }

    #[tokio::test]
    async fn test_update_existing_and_new_entries() {
        let provider = SnapshotProvider::new(Service::B, document());
        let seven = EntryId::new(7).unwrap();
        let eight = EntryId::new(8).unwrap();

        provider.apply_update(CatalogKind::Anime, seven, &record(28)).await.unwrap();
        provider.apply_update(CatalogKind::Anime, eight, &record(1)).await.unwrap();

        let list = provider.fetch_entries(CatalogKind::Anime).await.unwrap();
        assert_eq!(list.score_format, Some(ScoreFormat::Point10));
        assert_eq!(list.entries.len(), 2);
        let updated = list.find_by_id(Service::B, seven).unwrap();
        assert_eq!(updated.progress, 28);
        assert_eq!(updated.titles.primary, "Frieren");
        assert_eq!(list.find_by_id(Service::B, eight).unwrap().status, WatchStatus::Completed);
    }

    #[tokio::test]
    async fn test_unknown_score_format_reads_as_none() {
        let mut doc = document();
        doc.score_format = "STARS".into();
        let provider = SnapshotProvider::new(Service::A, doc);
        let list = provider.fetch_entries(CatalogKind::Anime).await.unwrap();
        assert_eq!(list.score_format, None);
    }

    #[tokio::test]
    async fn test_add_favorite_requires_entry() {
        let provider = SnapshotProvider::new(Service::B, document());
        provider
            .add_favorite(CatalogKind::Anime, EntryId::new(7).unwrap())
            .await
            .unwrap();
        assert!(provider.document().await.anime[0].favorite);
        assert!(provider
            .add_favorite(CatalogKind::Anime, EntryId::new(99).unwrap())
            .await
            .is_err());
    }

    #[tokio::test]
    async fn test_save_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("b.json");
        std::fs::write(&path, serde_json::to_vec(&document()).unwrap()).unwrap();

        let provider = SnapshotProvider::load(Service::B, &path).unwrap();
        provider
            .apply_update(CatalogKind::Anime, EntryId::new(7).unwrap(), &record(12))
            .await
            .unwrap();
        provider.save().await.unwrap();

        let reloaded = SnapshotProvider::load(Service::B, &path).unwrap();
        assert_eq!(reloaded.document().await.anime[0].progress, 12);
    }
}
