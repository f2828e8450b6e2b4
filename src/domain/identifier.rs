//! Source identifier parsing and normalization
//!
//! Turns free-form pasted or uploaded text into a deduplicated, validated
//! working set of marketplace identifiers, reporting how much of the input
//! survived. Normalization is pure: no I/O, no session state.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

use super::constants::limits;

/// ASIN: fixed-length 10-character alphanumeric key
static ASIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Z0-9]{10}$").unwrap());

/// Seller SKU: printable label, letters/digits plus common separators
static SKU_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._-]{0,39}$").unwrap());

/// Token separators: any run of comma, tab, or whitespace (newlines included)
static SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[,\s]+").unwrap());

/// Kind of external product key a working set is built from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Asin,
    Sku,
}

/// An opaque external product key in canonical form
///
/// Canonical form is trimmed and, for ASINs, uppercased. Construction goes
/// through [`Identifier::parse`] so an `Identifier` in hand is always valid.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Identifier(String);

impl Identifier {
    /// Parse a single raw token into a canonical identifier
    pub fn parse(raw: &str, kind: IdentifierKind) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return None;
        }
        match kind {
            IdentifierKind::Asin => {
                let canonical = trimmed.to_ascii_uppercase();
                ASIN_RE.is_match(&canonical).then(|| Self(canonical))
            }
            IdentifierKind::Sku => SKU_RE.is_match(trimmed).then(|| Self(trimmed.to_string())),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Key used for duplicate detection: case-insensitive for both kinds
    fn dedup_key(&self) -> String {
        self.0.to_ascii_uppercase()
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Intake policy for one normalization run
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct NormalizePolicy {
    pub kind: IdentifierKind,
    /// Working-set cap; exceeding it is surfaced, never silently truncated
    pub max_items: usize,
}

impl NormalizePolicy {
    /// Policy for pasted-text bulk fill
    pub fn inline_bulk(kind: IdentifierKind) -> Self {
        Self { kind, max_items: limits::INLINE_BULK_MAX }
    }

    /// Policy for catalog-sourced bulk create
    pub fn catalog_bulk(kind: IdentifierKind) -> Self {
        Self { kind, max_items: limits::CATALOG_BULK_MAX }
    }
}

/// Counts describing what happened to the raw input
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizeStats {
    /// Non-empty tokens seen in the input
    pub total: usize,
    /// Tokens that passed the format check and were not duplicates
    pub unique_valid: usize,
    /// Tokens rejected by the format check
    pub invalid: usize,
    /// Valid tokens dropped as repeats of an earlier one
    pub duplicates: usize,
}

/// Result of one normalization run: the working set plus intake stats
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedSet {
    pub identifiers: Vec<Identifier>,
    pub stats: NormalizeStats,
    /// Cap the run was normalized under, echoed for over-limit reporting
    pub max_items: usize,
}

impl NormalizedSet {
    /// True when the working set exceeds the policy cap. The caller must
    /// block pipeline start and explain; the set itself is never truncated.
    pub fn over_limit(&self) -> bool {
        self.identifiers.len() > self.max_items
    }

    /// Degenerate empty-input case; not an error, but nothing to enrich
    pub fn is_empty(&self) -> bool {
        self.identifiers.is_empty()
    }
}

/// Parse free-form text into a deduplicated, validated identifier set.
///
/// Splits on any run of comma/whitespace/newline/tab, canonicalizes each
/// token per the policy's identifier kind, drops format failures, and
/// deduplicates case-insensitively preserving first-seen order.
pub fn normalize(raw_text: &str, policy: &NormalizePolicy) -> NormalizedSet {
    let mut identifiers = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut stats = NormalizeStats { total: 0, unique_valid: 0, invalid: 0, duplicates: 0 };

    for token in SEPARATOR_RE.split(raw_text) {
        if token.trim().is_empty() {
            continue;
        }
        stats.total += 1;
        match Identifier::parse(token, policy.kind) {
            Some(id) => {
                if seen.insert(id.dedup_key()) {
                    stats.unique_valid += 1;
                    identifiers.push(id);
                } else {
                    stats.duplicates += 1;
                }
            }
            None => stats.invalid += 1,
        }
    }

    NormalizedSet { identifiers, stats, max_items: policy.max_items }
}
