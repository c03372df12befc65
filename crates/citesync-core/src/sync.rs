//! End-to-end run: load the store, fetch citations, reconcile, write back.
//!
//! The store is validated before any request is made and written exactly
//! once, after the whole list has been reconciled in memory. Any error or a
//! cancellation before that point leaves the file untouched.

use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use chrono::NaiveDateTime;
use tokio_util::sync::CancellationToken;

use crate::CoreError;
use crate::reconcile::{ReconcileOptions, Reconciliation, reconcile};
use crate::source::{CitationSource, fetch_citation_map};
use crate::store;

/// Options for a sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub reconcile: ReconcileOptions,
    /// Per-request timeout for the citation source.
    pub timeout: Duration,
    /// Reconcile and report without writing the store.
    pub dry_run: bool,
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self {
            reconcile: ReconcileOptions::default(),
            timeout: Duration::from_secs(30),
            dry_run: false,
        }
    }
}

/// Outcome of a completed sync run.
#[derive(Debug, Clone)]
pub struct SyncReport {
    pub path: PathBuf,
    pub source: String,
    pub reconciliation: Reconciliation,
    /// Whether the store was rewritten (false on dry runs).
    pub written: bool,
    pub elapsed: Duration,
}

/// Synchronize the publication store at `path` with `source`.
pub async fn sync_publications(
    path: &Path,
    source: &dyn CitationSource,
    author_id: &str,
    client: &reqwest::Client,
    options: &SyncOptions,
    now: NaiveDateTime,
    cancel: CancellationToken,
) -> Result<SyncReport, CoreError> {
    let start = Instant::now();
    let records = store::load(path)?;

    let map = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(CoreError::Cancelled),
        map = fetch_citation_map(source, author_id, client, options.timeout) => map?,
    };

    let reconciliation = reconcile(&map, records, now, &options.reconcile);
    tracing::info!(
        updated = reconciliation.stats.updated,
        skipped = reconciliation.stats.skipped,
        fuzzy = reconciliation.stats.fuzzy_used,
        total_external = reconciliation.stats.total_external,
        "reconciliation complete"
    );

    if cancel.is_cancelled() {
        return Err(CoreError::Cancelled);
    }

    let written = if options.dry_run {
        tracing::info!(path = %path.display(), "dry run, not writing publications");
        false
    } else {
        store::save(path, &reconciliation.records)?;
        true
    };

    Ok(SyncReport {
        path: path.to_path_buf(),
        source: source.name().to_string(),
        reconciliation,
        written,
        elapsed: start.elapsed(),
    })
}
