//! External citation data: raw entries from a source and the normalized map
//! the reconciler matches against.

use std::collections::HashMap;

use serde::Deserialize;

use crate::matching::normalize_title;

/// One (title, citation count) pair as reported by a citation source.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct CitationEntry {
    pub title: String,
    #[serde(default)]
    pub citations: u64,
}

impl CitationEntry {
    pub fn new(title: impl Into<String>, citations: u64) -> Self {
        Self {
            title: title.into(),
            citations,
        }
    }
}

/// Normalized title key → citation count.
///
/// Keys keep their first-insertion order; inserting an existing key replaces
/// the value in place.
#[derive(Debug, Clone, Default)]
pub struct CitationMap {
    order: Vec<String>,
    counts: HashMap<String, u64>,
}

impl CitationMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a key, returning the previous count if the key was already present.
    pub fn insert(&mut self, key: String, citations: u64) -> Option<u64> {
        match self.counts.insert(key.clone(), citations) {
            Some(previous) => Some(previous),
            None => {
                self.order.push(key);
                None
            }
        }
    }

    pub fn get(&self, key: &str) -> Option<u64> {
        self.counts.get(key).copied()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.counts.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate `(key, citations)` in first-insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, u64)> + '_ {
        self.order
            .iter()
            .map(|key| (key.as_str(), self.counts.get(key).copied().unwrap_or_default()))
    }
}

/// Build the matching map from raw source entries.
///
/// Titles are normalized; entries whose title normalizes to nothing are
/// dropped. Duplicate keys are last-write-wins.
pub fn build_citation_map(entries: impl IntoIterator<Item = CitationEntry>) -> CitationMap {
    let mut map = CitationMap::new();
    let mut collisions = 0usize;

    for entry in entries {
        let key = normalize_title(&entry.title);
        if key.is_empty() {
            continue;
        }
        if let Some(previous) = map.insert(key.clone(), entry.citations) {
            collisions += 1;
            tracing::debug!(
                key = %key,
                previous,
                replacement = entry.citations,
                "duplicate normalized title, keeping last value"
            );
        }
    }

    if collisions > 0 {
        tracing::warn!(
            collisions,
            "citation source returned titles that normalize to the same key"
        );
    }

    map
}
