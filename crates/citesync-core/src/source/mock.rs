//! Mock citation source for testing.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::CitationSource;
use crate::CoreError;
use crate::citations::CitationEntry;

/// A hand-rolled mock implementing [`CitationSource`] for tests.
///
/// Returns a fixed entry list (or a fixed provider error) on every call and
/// counts calls via [`call_count()`](MockSource::call_count).
pub struct MockSource {
    response: Result<Vec<CitationEntry>, String>,
    call_count: AtomicUsize,
}

impl MockSource {
    /// Create a mock that always returns `entries`.
    pub fn new(entries: Vec<CitationEntry>) -> Self {
        Self {
            response: Ok(entries),
            call_count: AtomicUsize::new(0),
        }
    }

    /// Create a mock that always fails with a provider error.
    pub fn failing(message: &str) -> Self {
        Self {
            response: Err(message.to_string()),
            call_count: AtomicUsize::new(0),
        }
    }

    /// How many times `fetch()` has been called.
    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }
}

impl CitationSource for MockSource {
    fn name(&self) -> &str {
        "Mock"
    }

    fn fetch<'a>(
        &'a self,
        _author_id: &'a str,
        _client: &'a reqwest::Client,
        _timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CitationEntry>, CoreError>> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let response = self.response.clone();
        Box::pin(async move { response.map_err(CoreError::Provider) })
    }
}
