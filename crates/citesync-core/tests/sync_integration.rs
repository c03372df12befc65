//! Integration tests for the full sync pipeline.
//!
//! Citation data comes from an offline JSON export or an in-test source, so
//! no HTTP requests are made.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use std::time::Duration;

use chrono::{NaiveDate, NaiveDateTime};
use citesync_core::source::JsonFileSource;
use citesync_core::{
    CitationEntry, CitationSource, CoreError, RecordOutcome, SkipReason, SyncOptions,
    sync_publications,
};
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Source returning a fixed list, standing in for a live provider.
struct FixedSource(Vec<CitationEntry>);

impl CitationSource for FixedSource {
    fn name(&self) -> &str {
        "Fixed"
    }

    fn fetch<'a>(
        &'a self,
        _author_id: &'a str,
        _client: &'a reqwest::Client,
        _timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CitationEntry>, CoreError>> + Send + 'a>> {
        let entries = self.0.clone();
        Box::pin(async move { Ok(entries) })
    }
}

fn now() -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 11, 30)
        .unwrap()
        .and_hms_opt(8, 0, 0)
        .unwrap()
}

fn write_json(dir: &Path, name: &str, value: &Value) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(value).unwrap()).unwrap();
    path
}

fn read_json(path: &Path) -> Value {
    serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap()
}

async fn run(path: &Path, source: &dyn CitationSource) -> citesync_core::SyncReport {
    sync_publications(
        path,
        source,
        "AUTHOR_ID",
        &reqwest::Client::new(),
        &SyncOptions::default(),
        now(),
        CancellationToken::new(),
    )
    .await
    .expect("sync should succeed")
}

#[tokio::test]
async fn mixed_list_from_json_export() {
    let dir = tempfile::tempdir().unwrap();
    let citations = write_json(
        dir.path(),
        "scholar.json",
        &json!([
            {"title": "Deep Learning Basics", "citations": 42},
            {"title": "Attention Is All You Need", "citations": 100},
            {"title": "Graph Neural Networks Survey", "citations": 5},
            {"title": "Shallow Parsing Methods", "citations": 77},
        ]),
    );
    let publications = write_json(
        dir.path(),
        "publications.json",
        &json!([
            {"id": 1, "title": "Deep Learning Basics!", "citations": 10},
            {"id": 2, "title": "Attention is all you need.", "citations": 100},
            {"id": 3, "title": "Graph Neural Network Survey"},
            {"id": 4, "title": ""},
            {"id": 5, "title": "Deep Learning for NLP", "citations": 3},
        ]),
    );

    let report = run(&publications, &JsonFileSource::new(&citations)).await;
    let stats = report.reconciliation.stats;
    assert_eq!(stats.updated, 2);
    assert_eq!(stats.skipped, 2);
    assert_eq!(stats.fuzzy_used, 1);
    assert_eq!(stats.total_external, 4);
    assert_eq!(
        report.reconciliation.outcomes[3],
        RecordOutcome::Skipped(SkipReason::MissingTitle)
    );
    assert_eq!(
        report.reconciliation.outcomes[4],
        RecordOutcome::Skipped(SkipReason::NoMatch)
    );

    let checked = "2024-11-30T08:00:00";
    assert_eq!(
        read_json(&publications),
        json!([
            {"id": 1, "title": "Deep Learning Basics!", "citations": 42, "citations_last_checked": checked},
            {"id": 2, "title": "Attention is all you need.", "citations": 100, "citations_last_checked": checked},
            {"id": 3, "title": "Graph Neural Network Survey", "citations": 5, "citations_last_checked": checked},
            {"id": 4, "title": ""},
            {"id": 5, "title": "Deep Learning for NLP", "citations": 3},
        ])
    );
}

#[tokio::test]
async fn second_run_only_refreshes_timestamps() {
    let dir = tempfile::tempdir().unwrap();
    let publications = write_json(
        dir.path(),
        "publications.json",
        &json!([{"title": "Deep Learning Basics", "citations": 1}]),
    );
    let source = FixedSource(vec![CitationEntry::new("Deep Learning Basics", 42)]);

    let first = run(&publications, &source).await;
    assert_eq!(first.reconciliation.stats.updated, 1);

    let second = run(&publications, &source).await;
    assert_eq!(second.reconciliation.stats.updated, 0);
    assert_eq!(second.reconciliation.stats.skipped, 0);
    assert_eq!(read_json(&publications)[0]["citations"], json!(42));
}

#[tokio::test]
async fn non_ascii_written_literally() {
    let dir = tempfile::tempdir().unwrap();
    let publications = write_json(
        dir.path(),
        "publications.json",
        &json!([{"title": "한국어 자연어 처리 연구", "citations": 0}]),
    );
    let source = FixedSource(vec![CitationEntry::new("한국어 자연어 처리 연구.", 8)]);

    let report = run(&publications, &source).await;
    assert_eq!(report.reconciliation.stats.updated, 1);

    let raw = std::fs::read_to_string(&publications).unwrap();
    assert!(raw.contains("한국어 자연어 처리 연구"));
    assert!(!raw.contains("\\u"));
}

#[tokio::test]
async fn record_that_is_not_an_object_is_a_format_error() {
    let dir = tempfile::tempdir().unwrap();
    let original = r#"[{"title": "Fine"}, "not a record"]"#;
    let publications = dir.path().join("publications.json");
    std::fs::write(&publications, original).unwrap();

    let err = sync_publications(
        &publications,
        &FixedSource(vec![]),
        "AUTHOR_ID",
        &reqwest::Client::new(),
        &SyncOptions::default(),
        now(),
        CancellationToken::new(),
    )
    .await
    .unwrap_err();

    assert!(matches!(err, CoreError::Format(_)));
    assert_eq!(std::fs::read_to_string(&publications).unwrap(), original);
}
