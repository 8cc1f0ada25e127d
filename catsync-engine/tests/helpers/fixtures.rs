//! Entry and list builders

use catsync_engine::services::ScoreFormat;
use catsync_engine::{CatalogEntry, CatalogKind, CatalogList, ServiceIds, TitleSet, WatchStatus};

/// Episodic entry with a primary title
pub fn anime(a: Option<i64>, b: Option<i64>, title: &str, status: WatchStatus, score: f64, progress: u32) -> CatalogEntry {
    CatalogEntry {
        ids: ServiceIds::new(a, b),
        titles: TitleSet::primary_only(title),
        status,
        score,
        progress,
        ..Default::default()
    }
}

/// Chaptered entry with chapters and volumes
pub fn manga(
    a: Option<i64>,
    b: Option<i64>,
    title: &str,
    status: WatchStatus,
    chapters: u32,
    volumes: u32,
) -> CatalogEntry {
    CatalogEntry {
        ids: ServiceIds::new(a, b),
        titles: TitleSet::primary_only(title),
        status,
        progress: chapters,
        sub_progress: volumes,
        ..Default::default()
    }
}

pub fn list(kind: CatalogKind, format: Option<ScoreFormat>, entries: Vec<CatalogEntry>) -> CatalogList {
    CatalogList::new(kind, format, entries)
}

pub fn point100() -> Option<ScoreFormat> {
    Some(ScoreFormat::Point100)
}

pub fn point10() -> Option<ScoreFormat> {
    Some(ScoreFormat::Point10)
}
