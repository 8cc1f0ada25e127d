//! File-backed stores across process restarts
//!
//! Every test works in its own temp directory: snapshots are written to disk,
//! a pass runs against them, and the stores are reloaded from the files the
//! pass (or the user) left behind.

use catsync_engine::services::{
    Collaborators, IgnoreRegistry, MappingStore, ResponseCache, SnapshotDocument,
    SnapshotProvider, SyncPass, UnmappedLedger,
};
use catsync_engine::{
    CatalogEntry, CatalogKind, EntryId, Service, ServiceIds, SyncConfig, TitleSet, WatchStatus,
};
use serde_json::json;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;

fn id(raw: i64) -> EntryId {
    EntryId::new(raw).unwrap()
}

fn write_snapshot(dir: &Path, name: &str, document: &SnapshotDocument) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_vec_pretty(document).unwrap()).unwrap();
    path
}

/// Same film under an English title on A and its native romanization on B
fn write_snapshots(dir: &Path) -> (PathBuf, PathBuf) {
    let a = SnapshotDocument {
        score_format: "POINT_100".to_string(),
        anime: vec![CatalogEntry {
            ids: ServiceIds::new(Some(1), None),
            titles: TitleSet::primary_only("Your Name."),
            status: WatchStatus::Completed,
            score: 90.0,
            progress: 1,
            total_units: Some(1),
            ..Default::default()
        }],
        manga: Vec::new(),
    };
    let b = SnapshotDocument {
        score_format: "POINT_10".to_string(),
        anime: vec![CatalogEntry {
            ids: ServiceIds::new(None, Some(2)),
            titles: TitleSet::new("", "君の名は。", "Kimi no Na wa."),
            status: WatchStatus::Planned,
            ..Default::default()
        }],
        manga: Vec::new(),
    };
    (
        write_snapshot(dir, "a.json", &a),
        write_snapshot(dir, "b.json", &b),
    )
}

fn anime_only() -> SyncConfig {
    SyncConfig {
        kinds: vec![CatalogKind::Anime],
        ..SyncConfig::default()
    }
}

#[tokio::test]
async fn test_ledger_then_mapping_then_write_back() {
    let dir = TempDir::new().unwrap();
    let (a_path, b_path) = write_snapshots(dir.path());
    let mapping_path = dir.path().join("mappings.toml");
    let ledger_dir = dir.path().join("ledger");
    let config = anime_only();

    // First pass: titles share nothing, so the film lands in the ledger
    let service_a = SnapshotProvider::load(Service::A, &a_path).unwrap();
    let service_b = SnapshotProvider::load(Service::B, &b_path).unwrap();
    let mappings = MappingStore::load(&mapping_path).unwrap();
    let ignore = IgnoreRegistry::new();
    let collaborators = Collaborators::new(&service_a, &service_b, &mappings, &ignore);

    let report = SyncPass::run(&config, &collaborators, &CancellationToken::new())
        .await
        .unwrap();
    let ledger_file = report.ledger().write_snapshot(&ledger_dir).unwrap();

    let ledger = UnmappedLedger::read_snapshot(&ledger_file).unwrap();
    assert_eq!(ledger.len(), 1);
    assert_eq!(ledger.entries()[0].ids.a, Some(id(1)));
    assert_eq!(ledger.entries()[0].reason, "no match");

    // The user maps the pair by hand
    let mut mappings = MappingStore::load(&mapping_path).unwrap();
    assert!(!mappings.add_or_update(CatalogKind::Anime, id(1), id(2), "same film"));
    mappings.save(&mapping_path).unwrap();

    // Second pass in a fresh "process"
    let service_a = SnapshotProvider::load(Service::A, &a_path).unwrap();
    let service_b = SnapshotProvider::load(Service::B, &b_path).unwrap();
    let mappings = MappingStore::load(&mapping_path).unwrap();
    assert_eq!(mappings.len(), 1);
    let collaborators = Collaborators::new(&service_a, &service_b, &mappings, &ignore);

    let report = SyncPass::run(&config, &collaborators, &CancellationToken::new())
        .await
        .unwrap();
    assert!(report.ledger().is_empty());
    let stats = report.kind(CatalogKind::Anime).unwrap().statistics().unwrap();
    assert_eq!(stats.updated, 1);

    service_b.save().await.unwrap();

    let reloaded = SnapshotProvider::load(Service::B, &b_path).unwrap();
    let document = reloaded.document().await;
    let film = &document.anime[0];
    assert_eq!(film.ids.b, Some(id(2)));
    assert_eq!(film.status, WatchStatus::Completed);
    assert_eq!(film.score, 9.0);
    assert_eq!(film.progress, 1);
    // Titles on the target are never rewritten
    assert_eq!(film.titles.romanized, "Kimi no Na wa.");
}

#[tokio::test]
async fn test_ignore_file_survives_reload() {
    let dir = TempDir::new().unwrap();
    let (a_path, b_path) = write_snapshots(dir.path());
    let ignore_path = dir.path().join("nested").join("ignore.toml");

    let mut registry = IgnoreRegistry::new();
    registry
        .add_ignore(CatalogKind::Anime, None, Some("YOUR NAME"), "rewatch tracked elsewhere")
        .unwrap();
    registry.save(&ignore_path).unwrap();

    let ignore = IgnoreRegistry::load(&ignore_path).unwrap();
    assert_eq!(ignore.len(), 1);
    assert_eq!(ignore.rules()[0].reason, "rewatch tracked elsewhere");

    let service_a = SnapshotProvider::load(Service::A, &a_path).unwrap();
    let service_b = SnapshotProvider::load(Service::B, &b_path).unwrap();
    let mappings = MappingStore::new();
    let collaborators = Collaborators::new(&service_a, &service_b, &mappings, &ignore);

    let report = SyncPass::run(&anime_only(), &collaborators, &CancellationToken::new())
        .await
        .unwrap();
    assert!(report.ledger().is_empty());
    let stats = report.kind(CatalogKind::Anime).unwrap().statistics().unwrap();
    assert_eq!(stats.skipped, 1);
    assert_eq!(stats.items[0].reason, "ignored");
}

#[test]
fn test_malformed_mapping_file_is_config_error() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("mappings.toml");
    std::fs::write(&path, "[[mapping]]\nkind = \"anime\"\na_id = \"one\"\n").unwrap();

    let err = MappingStore::load(&path).unwrap_err();
    assert!(matches!(err, catsync_engine::SyncError::ConfigInvalid(_)));
}

#[tokio::test]
async fn test_cache_written_only_when_changed() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("cache.json");
    let max_age = Duration::from_secs(3600);

    let cache = ResponseCache::load(&path, max_age).unwrap();
    assert!(!cache.persist(&path).await.unwrap());
    assert!(!path.exists());

    cache.set("titles:anime:b:2", json!({ "primary": "Your Name." })).await;
    assert!(cache.persist(&path).await.unwrap());
    assert!(path.exists());
    // Clean again after persisting
    assert!(!cache.persist(&path).await.unwrap());

    let reloaded = ResponseCache::load(&path, max_age).unwrap();
    assert_eq!(
        reloaded.get("titles:anime:b:2").await,
        Some(json!({ "primary": "Your Name." }))
    );
    assert!(!reloaded.is_dirty());
}
