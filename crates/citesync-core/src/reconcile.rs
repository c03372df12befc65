//! Reconciliation pass: merge external citation counts into local records.
//!
//! Each record is matched by normalized title, first exactly and then, only
//! when the exact lookup misses, against the closest external key above the
//! fuzzy threshold. Records are updated in place and never reordered, added
//! or removed.

use std::fmt;

use chrono::NaiveDateTime;

use crate::citations::CitationMap;
use crate::matching::{DEFAULT_FUZZY_THRESHOLD, best_fuzzy_match, normalize_title};
use crate::record::{DEFAULT_CHECKED_FIELD, PublicationRecord};

/// Timestamp format written to the last-checked field (ISO-8601, seconds).
pub const CHECKED_AT_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Tunables for a reconciliation pass.
#[derive(Debug, Clone)]
pub struct ReconcileOptions {
    /// Minimum similarity for the fuzzy fallback.
    pub threshold: f64,
    /// JSON key the last-checked timestamp is written to.
    pub checked_field: String,
}

impl Default for ReconcileOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_FUZZY_THRESHOLD,
            checked_field: DEFAULT_CHECKED_FIELD.to_string(),
        }
    }
}

/// Counters for a reconciliation pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    pub updated: usize,
    pub skipped: usize,
    pub fuzzy_used: usize,
    pub total_external: usize,
}

impl fmt::Display for ReconcileStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Updated: {} items, Skipped: {} items, Fuzzy matched: {} items, Total Scholar items: {}",
            self.updated, self.skipped, self.fuzzy_used, self.total_external
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingTitle,
    NoMatch,
}

/// What happened to one record.
#[derive(Debug, Clone, PartialEq)]
pub enum RecordOutcome {
    Updated {
        old: u64,
        new: u64,
        fuzzy: Option<f64>,
    },
    Unchanged {
        citations: u64,
        fuzzy: Option<f64>,
    },
    Skipped(SkipReason),
}

impl RecordOutcome {
    pub fn is_match(&self) -> bool {
        !matches!(self, RecordOutcome::Skipped(_))
    }

    pub fn is_fuzzy(&self) -> bool {
        matches!(
            self,
            RecordOutcome::Updated { fuzzy: Some(_), .. }
                | RecordOutcome::Unchanged { fuzzy: Some(_), .. }
        )
    }
}

/// Result of a reconciliation pass.
#[derive(Debug, Clone)]
pub struct Reconciliation {
    pub records: Vec<PublicationRecord>,
    /// One entry per record, same order as `records`.
    pub outcomes: Vec<RecordOutcome>,
    pub stats: ReconcileStats,
}

impl Reconciliation {
    /// Sum of citation counts across the updated list.
    pub fn total_citations(&self) -> u64 {
        self.records.iter().map(PublicationRecord::citations).sum()
    }

    /// The `n` most cited records with a non-zero count. Equal counts keep list order.
    pub fn top_cited(&self, n: usize) -> Vec<&PublicationRecord> {
        let mut cited: Vec<&PublicationRecord> =
            self.records.iter().filter(|r| r.citations() > 0).collect();
        cited.sort_by(|a, b| b.citations().cmp(&a.citations()));
        cited.truncate(n);
        cited
    }
}

/// Run one reconciliation pass over `records`.
pub fn reconcile(
    map: &CitationMap,
    records: Vec<PublicationRecord>,
    now: NaiveDateTime,
    options: &ReconcileOptions,
) -> Reconciliation {
    let timestamp = now.format(CHECKED_AT_FORMAT).to_string();
    let mut stats = ReconcileStats {
        total_external: map.len(),
        ..ReconcileStats::default()
    };
    let mut outcomes = Vec::with_capacity(records.len());
    let mut records = records;

    for record in records.iter_mut() {
        let outcome = reconcile_record(map, record, &timestamp, options);
        match &outcome {
            RecordOutcome::Updated { .. } => stats.updated += 1,
            RecordOutcome::Skipped(_) => stats.skipped += 1,
            RecordOutcome::Unchanged { .. } => {}
        }
        if outcome.is_fuzzy() {
            stats.fuzzy_used += 1;
        }
        outcomes.push(outcome);
    }

    Reconciliation {
        records,
        outcomes,
        stats,
    }
}

fn reconcile_record(
    map: &CitationMap,
    record: &mut PublicationRecord,
    timestamp: &str,
    options: &ReconcileOptions,
) -> RecordOutcome {
    let Some(title) = record.title() else {
        tracing::debug!("skipping: record has no title");
        return RecordOutcome::Skipped(SkipReason::MissingTitle);
    };
    let key = normalize_title(title);

    let (new, fuzzy) = match map.get(&key) {
        Some(citations) => (citations, None),
        None => match best_fuzzy_match(&key, map, options.threshold) {
            Some(hit) => {
                tracing::debug!(title, matched = %hit.key, score = hit.score, "fuzzy match");
                (hit.citations, Some(hit.score))
            }
            None => {
                tracing::debug!(title, "skipping: no match");
                return RecordOutcome::Skipped(SkipReason::NoMatch);
            }
        },
    };

    let old = record.citations();
    if new != old {
        record.set_citations(new);
        record.set_checked_at(&options.checked_field, timestamp);
        RecordOutcome::Updated { old, new, fuzzy }
    } else {
        record.set_checked_at(&options.checked_field, timestamp);
        RecordOutcome::Unchanged {
            citations: old,
            fuzzy,
        }
    }
}
