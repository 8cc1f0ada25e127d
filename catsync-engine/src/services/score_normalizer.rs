//! Score scale conversion
//!
//! Every service-native score is converted to the canonical integer 0-10
//! scale before comparison. Conversion uses half-up rounding (`8.5 -> 9`),
//! never banker's rounding. A raw `0` always means "not scored" and is never
//! scaled.

use crate::error::SyncError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Highest canonical score
pub const CANONICAL_MAX: u8 = 10;

/// Guards half-up rounding against ratios that land a hair under `.5`
const ROUNDING_EPSILON: f64 = 1e-9;

/// Native scoring scale of a service list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ScoreFormat {
    #[serde(rename = "POINT_100")]
    Point100,
    #[serde(rename = "POINT_10_DECIMAL")]
    Point10Decimal,
    #[serde(rename = "POINT_10")]
    Point10,
    #[serde(rename = "POINT_5")]
    Point5,
    #[serde(rename = "POINT_3")]
    Point3,
}

impl ScoreFormat {
    /// Highest native value on this scale
    pub fn max(self) -> f64 {
        match self {
            ScoreFormat::Point100 => 100.0,
            ScoreFormat::Point10Decimal | ScoreFormat::Point10 => 10.0,
            ScoreFormat::Point5 => 5.0,
            ScoreFormat::Point3 => 3.0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ScoreFormat::Point100 => "POINT_100",
            ScoreFormat::Point10Decimal => "POINT_10_DECIMAL",
            ScoreFormat::Point10 => "POINT_10",
            ScoreFormat::Point5 => "POINT_5",
            ScoreFormat::Point3 => "POINT_3",
        }
    }
}

impl fmt::Display for ScoreFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScoreFormat {
    type Err = SyncError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "POINT_100" => Ok(ScoreFormat::Point100),
            "POINT_10_DECIMAL" => Ok(ScoreFormat::Point10Decimal),
            "POINT_10" => Ok(ScoreFormat::Point10),
            "POINT_5" => Ok(ScoreFormat::Point5),
            "POINT_3" => Ok(ScoreFormat::Point3),
            _ => Err(SyncError::ScoreFormatUnknown(s.to_string())),
        }
    }
}

/// Round to the nearest integer, `.5` always upward
pub fn round_half_up(value: f64) -> f64 {
    (value + 0.5 + ROUNDING_EPSILON).floor()
}

/// Convert a native score to the canonical 0-10 scale
pub fn to_canonical(raw: f64, format: ScoreFormat) -> u8 {
    if raw.is_nan() || raw <= 0.0 {
        return 0;
    }

    let scaled = match format {
        ScoreFormat::Point100 => raw / 10.0,
        ScoreFormat::Point10Decimal | ScoreFormat::Point10 => raw,
        ScoreFormat::Point5 => raw * 2.0,
        ScoreFormat::Point3 => raw * 10.0 / 3.0,
    };

    round_half_up(scaled.clamp(0.0, CANONICAL_MAX as f64)) as u8
}

/// Convert a canonical score back to a native value
///
/// On the 3-point scale any positive canonical score maps to at least 1.
pub fn from_canonical(score: u8, format: ScoreFormat) -> f64 {
    if score == 0 {
        return 0.0;
    }

    let score = score.min(CANONICAL_MAX) as f64;
    match format {
        ScoreFormat::Point100 => round_half_up(score * 10.0),
        ScoreFormat::Point10Decimal | ScoreFormat::Point10 => round_half_up(score),
        ScoreFormat::Point5 => round_half_up(score / 2.0),
        ScoreFormat::Point3 => round_half_up(score * 3.0 / 10.0).max(1.0),
    }
}

/// Convert a native score between two scales through the canonical scale
pub fn convert(raw: f64, from: ScoreFormat, to: ScoreFormat) -> f64 {
    from_canonical(to_canonical(raw, from), to)
}
