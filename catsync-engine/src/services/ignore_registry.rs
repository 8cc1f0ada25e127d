//! Ignore registry
//!
//! Entries listed here are excluded from reconciliation before any
//! correspondence is attempted. A rule names either an identifier on one
//! service or a title (compared case-insensitively after normalization).
//!
//! ```toml
//! [[rule]]
//! kind = "manga"
//! service = "a"
//! id = 30013
//! reason = "one-shot, not on service B"
//!
//! [[rule]]
//! kind = "anime"
//! title = "Recap Special"
//! reason = "recap"
//! ```

use crate::error::{SyncError, SyncResult};
use crate::services::title_matcher::normalize;
use crate::types::{CatalogEntry, CatalogKind, EntryId, Service, ServiceIds, TitleSet};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use tracing::{debug, info};

/// One exclusion rule
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IgnoreRule {
    pub kind: CatalogKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<Service>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<EntryId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub reason: String,
}

impl IgnoreRule {
    fn validate(&self) -> SyncResult<()> {
        if self.id.is_some() && self.service.is_none() {
            return Err(SyncError::ConfigInvalid(format!(
                "Ignore rule for id {} must name its service",
                self.id.map(EntryId::get).unwrap_or_default()
            )));
        }
        let has_title = self.title.as_deref().is_some_and(|t| !normalize(t).is_empty());
        if self.id.is_none() && !has_title {
            return Err(SyncError::ConfigInvalid(
                "Ignore rule needs an id or a non-empty title".to_string(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct IgnoreFile {
    #[serde(default, rename = "rule")]
    rules: Vec<IgnoreRule>,
}

/// Identifier sets per service plus a title set
#[derive(Debug, Clone, Default)]
pub struct IgnoreRegistry {
    rules: Vec<IgnoreRule>,
    a_ids: HashSet<(CatalogKind, EntryId)>,
    b_ids: HashSet<(CatalogKind, EntryId)>,
    titles: HashSet<(CatalogKind, String)>,
}

impl IgnoreRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load rules from TOML; a missing file yields an empty registry
    pub fn load(path: &Path) -> SyncResult<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "No ignore file, nothing excluded");
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
            .map_err(|e| SyncError::ConfigInvalid(format!("{}: {}", path.display(), e)))
    }

    pub fn parse(content: &str) -> SyncResult<Self> {
        let file: IgnoreFile = toml::from_str(content)
            .map_err(|e| SyncError::ConfigInvalid(format!("Malformed ignore file: {}", e)))?;

        let mut registry = Self::new();
        for rule in file.rules {
            registry.insert(rule)?;
        }
        Ok(registry)
    }

    pub fn save(&self, path: &Path) -> SyncResult<()> {
        let file = IgnoreFile {
            rules: self.rules.clone(),
        };
        let content = toml::to_string_pretty(&file)?;
        catsync_common::config::write_atomic(path, content.as_bytes())?;
        info!(path = %path.display(), count = self.rules.len(), "Saved ignore rules");
        Ok(())
    }

    /// Add a rule by identifier, by title, or both
    pub fn add_ignore(
        &mut self,
        kind: CatalogKind,
        id: Option<(Service, EntryId)>,
        title: Option<&str>,
        reason: impl Into<String>,
    ) -> SyncResult<()> {
        self.insert(IgnoreRule {
            kind,
            service: id.map(|(s, _)| s),
            id: id.map(|(_, i)| i),
            title: title.map(str::to_string),
            reason: reason.into(),
        })
    }

    fn insert(&mut self, rule: IgnoreRule) -> SyncResult<()> {
        rule.validate()?;

        if let (Some(service), Some(id)) = (rule.service, rule.id) {
            match service {
                Service::A => self.a_ids.insert((rule.kind, id)),
                Service::B => self.b_ids.insert((rule.kind, id)),
            };
        }
        if let Some(title) = &rule.title {
            let normalized = normalize(title);
            if !normalized.is_empty() {
                self.titles.insert((rule.kind, normalized));
            }
        }
        self.rules.push(rule);
        Ok(())
    }

    /// True when any identifier or title of the entry is excluded
    pub fn is_ignored(&self, kind: CatalogKind, ids: &ServiceIds, titles: &TitleSet) -> bool {
        let id_hit = ids.a.is_some_and(|id| self.a_ids.contains(&(kind, id)))
            || ids.b.is_some_and(|id| self.b_ids.contains(&(kind, id)));
        if id_hit {
            return true;
        }

        if self.titles.is_empty() {
            return false;
        }
        titles
            .iter()
            .map(normalize)
            .filter(|t| !t.is_empty())
            .any(|t| self.titles.contains(&(kind, t)))
    }

    pub fn is_entry_ignored(&self, kind: CatalogKind, entry: &CatalogEntry) -> bool {
        self.is_ignored(kind, &entry.ids, &entry.titles)
    }

    pub fn rules(&self) -> &[IgnoreRule] {
        &self.rules
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}
