use std::path::PathBuf;

use thiserror::Error;

pub mod citations;
pub mod config_file;
pub mod matching;
pub mod reconcile;
pub mod record;
pub mod site_config;
pub mod source;
pub mod store;
pub mod sync;

// Re-export for convenience
pub use citations::{CitationEntry, CitationMap, build_citation_map};
pub use matching::{DEFAULT_FUZZY_THRESHOLD, normalize_title};
pub use reconcile::{
    ReconcileOptions, ReconcileStats, Reconciliation, RecordOutcome, SkipReason, reconcile,
};
pub use record::PublicationRecord;
pub use source::CitationSource;
pub use sync::{SyncOptions, SyncReport, sync_publications};

#[derive(Error, Debug)]
pub enum CoreError {
    /// A required identifier or credential is missing.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// The citation provider reported an error or refused the request.
    #[error("provider error: {0}")]
    Provider(String),
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    /// The publication store is not a JSON array of objects.
    #[error("format error: {0}")]
    Format(String),
    #[error("publications file not found: {}", .0.display())]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("run cancelled")]
    Cancelled,
}
