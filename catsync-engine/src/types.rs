//! Core data model shared by every reconciliation component
//!
//! One `CatalogEntry` shape serves both catalog kinds. Identifiers are
//! explicit options: a service identifier is either a positive value or
//! absent, never a 0/-1 placeholder.

use crate::error::{SyncError, SyncResult};
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub use catsync_common::{CatalogKind, Service, SyncDirection};

use crate::services::score_normalizer::ScoreFormat;

/// Positive service-side identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct EntryId(i64);

impl EntryId {
    /// Returns `None` for the legacy placeholders (0, -1, any non-positive value)
    pub fn new(value: i64) -> Option<Self> {
        (value > 0).then_some(Self(value))
    }

    pub fn get(self) -> i64 {
        self.0
    }
}

impl TryFrom<i64> for EntryId {
    type Error = String;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        EntryId::new(value).ok_or_else(|| format!("{} is not a valid entry identifier", value))
    }
}

impl From<EntryId> for i64 {
    fn from(id: EntryId) -> i64 {
        id.0
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier pair; either side may be unresolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ServiceIds {
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub a: Option<EntryId>,
    #[serde(default, deserialize_with = "deserialize_optional_id")]
    pub b: Option<EntryId>,
}

impl ServiceIds {
    pub fn new(a: Option<i64>, b: Option<i64>) -> Self {
        Self {
            a: a.and_then(EntryId::new),
            b: b.and_then(EntryId::new),
        }
    }

    pub fn get(&self, service: Service) -> Option<EntryId> {
        match service {
            Service::A => self.a,
            Service::B => self.b,
        }
    }

    pub fn set(&mut self, service: Service, id: Option<EntryId>) {
        match service {
            Service::A => self.a = id,
            Service::B => self.b = id,
        }
    }
}

/// Exported lists use 0 or -1 for "not known"; both read as absent
fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<EntryId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<i64> = Option::deserialize(deserializer)?;
    Ok(raw.and_then(EntryId::new))
}

/// Localized titles of a work; empty strings carry no signal
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleSet {
    #[serde(default)]
    pub primary: String,
    #[serde(default)]
    pub native: String,
    #[serde(default)]
    pub romanized: String,
}

impl TitleSet {
    pub fn new(
        primary: impl Into<String>,
        native: impl Into<String>,
        romanized: impl Into<String>,
    ) -> Self {
        Self {
            primary: primary.into(),
            native: native.into(),
            romanized: romanized.into(),
        }
    }

    pub fn primary_only(primary: impl Into<String>) -> Self {
        Self {
            primary: primary.into(),
            ..Default::default()
        }
    }

    /// True when every field is empty or whitespace
    pub fn is_empty(&self) -> bool {
        self.iter().all(|t| t.trim().is_empty())
    }

    /// Titles in primary, native, romanized order
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        [self.primary.as_str(), self.native.as_str(), self.romanized.as_str()].into_iter()
    }

    /// Best display title: primary, then romanized, then native
    pub fn display(&self) -> &str {
        [&self.primary, &self.romanized, &self.native]
            .into_iter()
            .map(|t| t.trim())
            .find(|t| !t.is_empty())
            .unwrap_or("<untitled>")
    }

    /// Fill empty fields from `other`, keeping existing values
    pub fn fill_missing(&mut self, other: &TitleSet) {
        if self.primary.trim().is_empty() {
            self.primary = other.primary.clone();
        }
        if self.native.trim().is_empty() {
            self.native = other.native.clone();
        }
        if self.romanized.trim().is_empty() {
            self.romanized = other.romanized.clone();
        }
    }
}

/// Canonical list status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchStatus {
    InProgress,
    Completed,
    Paused,
    Dropped,
    Planned,
    #[default]
    Unknown,
}

impl WatchStatus {
    /// Parse a service status string
    ///
    /// Accepts the vocabulary of both services (`watching`, `current`,
    /// `on_hold`, `plan_to_read`, ...). Anything else is `StatusUnknown`.
    pub fn parse_service(raw: &str) -> SyncResult<WatchStatus> {
        let key = raw.trim().to_ascii_lowercase().replace(['-', ' '], "_");
        let status = match key.as_str() {
            "in_progress" | "watching" | "reading" | "current" | "repeating" | "rewatching"
            | "rereading" => WatchStatus::InProgress,
            "completed" | "complete" => WatchStatus::Completed,
            "paused" | "on_hold" | "onhold" => WatchStatus::Paused,
            "dropped" => WatchStatus::Dropped,
            "planned" | "planning" | "plan_to_watch" | "plan_to_read" => WatchStatus::Planned,
            "unknown" => WatchStatus::Unknown,
            _ => return Err(SyncError::StatusUnknown(raw.to_string())),
        };
        Ok(status)
    }

    pub fn is_known(self) -> bool {
        self != WatchStatus::Unknown
    }

    pub fn as_str(self) -> &'static str {
        match self {
            WatchStatus::InProgress => "in_progress",
            WatchStatus::Completed => "completed",
            WatchStatus::Paused => "paused",
            WatchStatus::Dropped => "dropped",
            WatchStatus::Planned => "planned",
            WatchStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for WatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised strings deserialize to `Unknown` so one odd entry cannot fail
/// a whole list; the reconciler then leaves the status field alone.
impl<'de> Deserialize<'de> for WatchStatus {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(WatchStatus::parse_service(&raw).unwrap_or_else(|_| {
            tracing::warn!(status = %raw, "Unrecognised status, treating as unknown");
            WatchStatus::Unknown
        }))
    }
}

/// One list entry on one service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    #[serde(default)]
    pub ids: ServiceIds,

    #[serde(default)]
    pub titles: TitleSet,

    #[serde(default)]
    pub status: WatchStatus,

    /// Episodes or chapters consumed
    #[serde(default)]
    pub progress: u32,

    /// Volumes consumed (chaptered works only)
    #[serde(default)]
    pub sub_progress: u32,

    /// Score in the owning list's native scale
    #[serde(default)]
    pub score: f64,

    #[serde(default)]
    pub total_units: Option<u32>,

    #[serde(default)]
    pub total_sub_units: Option<u32>,

    #[serde(default)]
    pub started_at: Option<NaiveDate>,

    #[serde(default)]
    pub finished_at: Option<NaiveDate>,

    #[serde(default)]
    pub favorite: bool,
}

impl CatalogEntry {
    pub fn title(&self) -> &str {
        self.titles.display()
    }

    /// Identifier on the direction's source service
    pub fn source_id(&self, direction: SyncDirection) -> Option<EntryId> {
        self.ids.get(direction.source())
    }

    /// Identifier on the direction's target service, when already known
    pub fn target_id(&self, direction: SyncDirection) -> Option<EntryId> {
        self.ids.get(direction.target())
    }

    /// Total units when known; 0 reads as unknown
    pub fn known_total(&self) -> Option<u32> {
        self.total_units.filter(|&t| t > 0)
    }

    pub fn known_sub_total(&self) -> Option<u32> {
        self.total_sub_units.filter(|&t| t > 0)
    }

    /// Units left to consume, when the total is known
    pub fn remaining_units(&self) -> Option<u32> {
        self.known_total().map(|t| t.saturating_sub(self.progress))
    }
}

/// Entries fetched from one service for one kind
#[derive(Debug, Clone, PartialEq)]
pub struct CatalogList {
    pub kind: CatalogKind,
    /// `None` when the service reported a format this crate cannot convert
    pub score_format: Option<ScoreFormat>,
    pub entries: Vec<CatalogEntry>,
}

impl CatalogList {
    pub fn new(kind: CatalogKind, score_format: Option<ScoreFormat>, entries: Vec<CatalogEntry>) -> Self {
        Self {
            kind,
            score_format,
            entries,
        }
    }

    /// Entry whose identifier on `service` equals `id`
    pub fn find_by_id(&self, service: Service, id: EntryId) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.ids.get(service) == Some(id))
    }
}

/// Complete state written to a target entry
///
/// The target services replace whole records, so every field is always sent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRecord {
    pub status: WatchStatus,
    /// Score in the target list's native scale
    pub score: f64,
    pub progress: u32,
    pub sub_progress: u32,
    pub started_at: Option<NaiveDate>,
    pub finished_at: Option<NaiveDate>,
}
