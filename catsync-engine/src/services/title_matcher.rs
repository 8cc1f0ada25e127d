//! Title normalization and similarity tiers
//!
//! Two entries are considered the same work when any same-field title pair
//! (primary/primary, native/native, romanized/romanized) matches at one of
//! four tiers, tried in order:
//!
//! 1. Exact: case-insensitive equality of the raw strings
//! 2. Normalized: equality after [`normalize`]
//! 3. Word overlap: Dice coefficient over normalized words, >= 98.0
//! 4. Edit distance: Levenshtein similarity over normalized strings, >= 98.0
//!
//! Titles are never compared across fields. An empty field (or one that
//! normalizes to nothing) carries no signal and is skipped.

use crate::types::TitleSet;
use std::collections::HashMap;
use std::fmt;

/// Similarity needed for the fuzzy tiers to count as a match
pub const MATCH_THRESHOLD: f64 = 98.0;

/// Matching tier, in evaluation order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TitleTier {
    Exact,
    Normalized,
    WordOverlap,
    EditDistance,
}

impl fmt::Display for TitleTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TitleTier::Exact => write!(f, "exact"),
            TitleTier::Normalized => write!(f, "normalized"),
            TitleTier::WordOverlap => write!(f, "word-overlap"),
            TitleTier::EditDistance => write!(f, "edit-distance"),
        }
    }
}

/// Localized title field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TitleField {
    Primary,
    Native,
    Romanized,
}

impl fmt::Display for TitleField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TitleField::Primary => write!(f, "primary"),
            TitleField::Native => write!(f, "native"),
            TitleField::Romanized => write!(f, "romanized"),
        }
    }
}

/// Where and how two title sets matched
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TitleMatch {
    pub field: TitleField,
    pub tier: TitleTier,
    /// 100.0 for the equality tiers
    pub similarity: f64,
}

/// Normalize a title for comparison
///
/// Lowercases, drops every parenthesized part (an unclosed `(` drops the
/// rest of the string), removes `: ! ? " '`, turns `- _ . ,` into spaces and
/// collapses whitespace. Idempotent.
pub fn normalize(title: &str) -> String {
    let lowered = title.to_lowercase();
    let mut out = String::with_capacity(lowered.len());
    let mut depth = 0usize;

    for ch in lowered.chars() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            _ if depth > 0 => {}
            ':' | '!' | '?' | '"' | '\'' => {}
            '-' | '_' | '.' | ',' => out.push(' '),
            c => out.push(c),
        }
    }

    out.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Dice coefficient over whitespace-delimited words, scaled to 0-100
///
/// Words are counted as a multiset, so a repeated word only matches as many
/// times as it appears on both sides. Zero when either side has no words.
pub fn word_overlap_similarity(a: &str, b: &str) -> f64 {
    let words_a: Vec<&str> = a.split_whitespace().collect();
    let words_b: Vec<&str> = b.split_whitespace().collect();

    if words_a.is_empty() || words_b.is_empty() {
        return 0.0;
    }

    let mut available: HashMap<&str, usize> = HashMap::new();
    for word in &words_b {
        *available.entry(*word).or_insert(0) += 1;
    }

    let mut common = 0usize;
    for word in &words_a {
        if let Some(count) = available.get_mut(word) {
            if *count > 0 {
                *count -= 1;
                common += 1;
            }
        }
    }

    2.0 * common as f64 / (words_a.len() + words_b.len()) as f64 * 100.0
}

/// Levenshtein similarity, scaled to 0-100 and clamped at 0
pub fn edit_distance_similarity(a: &str, b: &str) -> f64 {
    if a == b {
        return 100.0;
    }

    let max_len = a.chars().count().max(b.chars().count());
    let distance = strsim::levenshtein(a, b);

    ((1.0 - distance as f64 / max_len as f64) * 100.0).max(0.0)
}

/// Try every tier on a single pair of titles
///
/// Returns `None` when either title is empty or no tier reaches the
/// threshold.
pub fn match_titles(a: &str, b: &str) -> Option<(TitleTier, f64)> {
    if a.trim().is_empty() || b.trim().is_empty() {
        return None;
    }

    if a.to_lowercase() == b.to_lowercase() {
        return Some((TitleTier::Exact, 100.0));
    }

    let norm_a = normalize(a);
    let norm_b = normalize(b);
    if norm_a.is_empty() || norm_b.is_empty() {
        return None;
    }

    if norm_a == norm_b {
        return Some((TitleTier::Normalized, 100.0));
    }

    let overlap = word_overlap_similarity(&norm_a, &norm_b);
    if overlap >= MATCH_THRESHOLD {
        return Some((TitleTier::WordOverlap, overlap));
    }

    let edit = edit_distance_similarity(&norm_a, &norm_b);
    if edit >= MATCH_THRESHOLD {
        return Some((TitleTier::EditDistance, edit));
    }

    None
}

/// First matching field pair between two title sets, with its tier
pub fn title_match_tier(a: &TitleSet, b: &TitleSet) -> Option<TitleMatch> {
    let pairs = [
        (TitleField::Primary, &a.primary, &b.primary),
        (TitleField::Native, &a.native, &b.native),
        (TitleField::Romanized, &a.romanized, &b.romanized),
    ];

    pairs.into_iter().find_map(|(field, left, right)| {
        match_titles(left, right).map(|(tier, similarity)| TitleMatch {
            field,
            tier,
            similarity,
        })
    })
}

/// True when any same-field title pair matches at any tier
pub fn title_matching_levels(a: &TitleSet, b: &TitleSet) -> bool {
    title_match_tier(a, b).is_some()
}
