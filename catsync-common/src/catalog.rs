//! Catalog enums shared by configuration and the reconciliation engine

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Kind of catalog list being synchronized
///
/// Anime entries are episodic (progress counts episodes). Manga entries are
/// chaptered (progress counts chapters, sub-progress counts volumes).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CatalogKind {
    Anime,
    Manga,
}

impl CatalogKind {
    pub const ALL: [CatalogKind; 2] = [CatalogKind::Anime, CatalogKind::Manga];

    /// True for kinds that track a second counter (volumes)
    pub fn is_chaptered(self) -> bool {
        matches!(self, CatalogKind::Manga)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            CatalogKind::Anime => "anime",
            CatalogKind::Manga => "manga",
        }
    }
}

impl fmt::Display for CatalogKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CatalogKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "anime" => Ok(CatalogKind::Anime),
            "manga" => Ok(CatalogKind::Manga),
            other => Err(Error::InvalidInput(format!("Unknown catalog kind: {}", other))),
        }
    }
}

/// One of the two tracking services
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Service {
    A,
    B,
}

impl Service {
    pub fn other(self) -> Service {
        match self {
            Service::A => Service::B,
            Service::B => Service::A,
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Service::A => f.write_str("a"),
            Service::B => f.write_str("b"),
        }
    }
}

impl FromStr for Service {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "a" => Ok(Service::A),
            "b" => Ok(Service::B),
            other => Err(Error::InvalidInput(format!("Unknown service: {}", other))),
        }
    }
}

/// Which service is authoritative for a pass
///
/// `Forward` propagates service A state onto service B, `Reverse` the
/// opposite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncDirection {
    #[default]
    Forward,
    Reverse,
}

impl SyncDirection {
    /// Service whose entries are read as the source of truth
    pub fn source(self) -> Service {
        match self {
            SyncDirection::Forward => Service::A,
            SyncDirection::Reverse => Service::B,
        }
    }

    /// Service whose entries receive updates
    pub fn target(self) -> Service {
        self.source().other()
    }

    pub fn reversed(self) -> SyncDirection {
        match self {
            SyncDirection::Forward => SyncDirection::Reverse,
            SyncDirection::Reverse => SyncDirection::Forward,
        }
    }
}

impl fmt::Display for SyncDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SyncDirection::Forward => f.write_str("a->b"),
            SyncDirection::Reverse => f.write_str("b->a"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_direction_swaps_services() {
        assert_eq!(SyncDirection::Forward.source(), Service::A);
        assert_eq!(SyncDirection::Forward.target(), Service::B);
        assert_eq!(SyncDirection::Reverse.source(), Service::B);
        assert_eq!(SyncDirection::Reverse.target(), Service::A);
        assert_eq!(SyncDirection::Forward.reversed(), SyncDirection::Reverse);
    }

    #[test]
    fn test_kind_parsing() {
        assert_eq!("Anime".parse::<CatalogKind>().unwrap(), CatalogKind::Anime);
        assert_eq!(" manga ".parse::<CatalogKind>().unwrap(), CatalogKind::Manga);
        assert!("novel".parse::<CatalogKind>().is_err());
        assert!(CatalogKind::Manga.is_chaptered());
        assert!(!CatalogKind::Anime.is_chaptered());
    }
}
