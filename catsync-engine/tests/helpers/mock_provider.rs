//! In-memory collaborators that record every call

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use catsync_engine::services::{CatalogProvider, FavoriteWriter, TitleSource};
use catsync_engine::{CatalogKind, CatalogList, EntryId, Service, TitleSet, UpdateRecord};
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// Provider serving fixed lists
pub struct MockProvider {
    service: Service,
    lists: HashMap<CatalogKind, CatalogList>,
    failing_fetches: HashSet<CatalogKind>,
    failing_updates: HashSet<i64>,
    stalled_updates: HashSet<i64>,
    pub updates: Mutex<Vec<(CatalogKind, EntryId, UpdateRecord)>>,
    pub favorites: Mutex<Vec<(CatalogKind, EntryId)>>,
}

impl MockProvider {
    pub fn new(service: Service) -> Self {
        Self {
            service,
            lists: HashMap::new(),
            failing_fetches: HashSet::new(),
            failing_updates: HashSet::new(),
            stalled_updates: HashSet::new(),
            updates: Mutex::new(Vec::new()),
            favorites: Mutex::new(Vec::new()),
        }
    }

    pub fn with_list(mut self, list: CatalogList) -> Self {
        self.lists.insert(list.kind, list);
        self
    }

    /// Fetching this kind returns an error
    pub fn failing_fetch(mut self, kind: CatalogKind) -> Self {
        self.failing_fetches.insert(kind);
        self
    }

    /// Writing this target id returns an error
    pub fn failing_update(mut self, target_id: i64) -> Self {
        self.failing_updates.insert(target_id);
        self
    }

    /// Writing this target id never completes
    pub fn stalled_update(mut self, target_id: i64) -> Self {
        self.stalled_updates.insert(target_id);
        self
    }

    pub fn update_calls(&self) -> Vec<(CatalogKind, EntryId, UpdateRecord)> {
        self.updates.lock().unwrap().clone()
    }

    pub fn favorite_calls(&self) -> Vec<(CatalogKind, EntryId)> {
        self.favorites.lock().unwrap().clone()
    }
}

#[async_trait]
impl CatalogProvider for MockProvider {
    fn service(&self) -> Service {
        self.service
    }

    async fn fetch_entries(&self, kind: CatalogKind) -> Result<CatalogList> {
        if self.failing_fetches.contains(&kind) {
            return Err(anyhow!("HTTP 503 from service {}", self.service));
        }
        Ok(self
            .lists
            .get(&kind)
            .cloned()
            .unwrap_or_else(|| CatalogList::new(kind, None, Vec::new())))
    }

    async fn apply_update(&self, kind: CatalogKind, target_id: EntryId, update: &UpdateRecord) -> Result<()> {
        if self.failing_updates.contains(&target_id.get()) {
            return Err(anyhow!("HTTP 500"));
        }
        if self.stalled_updates.contains(&target_id.get()) {
            std::future::pending::<()>().await;
        }
        self.updates.lock().unwrap().push((kind, target_id, update.clone()));
        Ok(())
    }
}

#[async_trait]
impl FavoriteWriter for MockProvider {
    async fn add_favorite(&self, kind: CatalogKind, target_id: EntryId) -> Result<()> {
        self.favorites.lock().unwrap().push((kind, target_id));
        Ok(())
    }
}

/// Title source answering from a fixed table
#[derive(Default)]
pub struct MockTitleSource {
    titles: HashMap<i64, TitleSet>,
    pub calls: AtomicUsize,
}

impl MockTitleSource {
    pub fn with(mut self, id: i64, titles: TitleSet) -> Self {
        self.titles.insert(id, titles);
        self
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TitleSource for MockTitleSource {
    async fn lookup_titles(
        &self,
        _kind: CatalogKind,
        id: EntryId,
        _cancel: &CancellationToken,
    ) -> Result<Option<TitleSet>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.titles.get(&id.get()).cloned())
    }
}
