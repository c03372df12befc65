use once_cell::sync::Lazy;
use regex::Regex;

use crate::citations::CitationMap;

/// Default similarity cutoff for the fuzzy fallback.
///
/// Tolerates formatting drift (a dropped hyphen, a plural, an extra article)
/// while keeping genuinely different titles apart.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.92;

static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

/// Anything that is neither a word character nor the single space left by
/// whitespace collapsing.
static NON_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w ]").unwrap());

static SPACE_RUN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r" {2,}").unwrap());

/// Normalize a title into the key used for matching.
///
/// Steps (order matters):
/// 1. Lowercase
/// 2. Collapse whitespace runs into a single space
/// 3. Strip everything that is not a word character or a space
/// 4. Trim
///
/// Removing a standalone symbol (`"a - b"`) leaves two adjacent spaces, which
/// are folded back into one before trimming so the result is a fixed point.
pub fn normalize_title(title: &str) -> String {
    let lowered = title.to_lowercase();
    let collapsed = WHITESPACE_RE.replace_all(&lowered, " ");
    let stripped = NON_WORD_RE.replace_all(&collapsed, "");
    SPACE_RUN_RE.replace_all(&stripped, " ").trim().to_string()
}

/// Similarity ratio in `[0, 1]` between two already-normalized keys.
pub fn similarity(a: &str, b: &str) -> f64 {
    rapidfuzz::fuzz::ratio(a.chars(), b.chars())
}

/// A fuzzy hit against the external citation map.
#[derive(Debug, Clone, PartialEq)]
pub struct FuzzyMatch {
    pub key: String,
    pub citations: u64,
    pub score: f64,
}

/// Find the closest external key at or above `threshold`.
///
/// Ties keep the first key in map order. An empty key never fuzzy-matches.
pub fn best_fuzzy_match(key: &str, map: &CitationMap, threshold: f64) -> Option<FuzzyMatch> {
    if key.is_empty() {
        return None;
    }

    let mut best: Option<(f64, &str, u64)> = None;
    for (candidate, citations) in map.iter() {
        if candidate.is_empty() {
            continue;
        }
        let score = similarity(key, candidate);
        if score >= threshold && best.is_none_or(|(top, _, _)| score > top) {
            best = Some((score, candidate, citations));
        }
    }

    best.map(|(score, key, citations)| FuzzyMatch {
        key: key.to_string(),
        citations,
        score,
    })
}
