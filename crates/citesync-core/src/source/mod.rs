//! Citation source trait and provider implementations.

pub mod json_file;
#[cfg(test)]
pub mod mock;
pub mod scholar_profile;
pub mod serpapi;

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub use json_file::JsonFileSource;
pub use scholar_profile::ScholarProfile;
pub use serpapi::SerpApi;

use crate::CoreError;
use crate::citations::{CitationEntry, CitationMap, build_citation_map};

/// Upper bound on result pages fetched from a paginated provider.
pub const DEFAULT_MAX_PAGES: usize = 10;

/// A provider of (title, citation count) pairs for an author.
pub trait CitationSource: Send + Sync {
    /// Human-readable provider name (e.g., "SerpAPI").
    fn name(&self) -> &str;

    /// Fetch every publication listed for `author_id`.
    fn fetch<'a>(
        &'a self,
        author_id: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CitationEntry>, CoreError>> + Send + 'a>>;
}

/// Fetch from `source` and build the normalized citation map.
pub async fn fetch_citation_map(
    source: &dyn CitationSource,
    author_id: &str,
    client: &reqwest::Client,
    timeout: Duration,
) -> Result<CitationMap, CoreError> {
    if author_id.trim().is_empty() {
        return Err(CoreError::Configuration(
            "no Scholar author id configured".to_string(),
        ));
    }
    let entries = source.fetch(author_id, client, timeout).await?;
    let raw = entries.len();
    let map = build_citation_map(entries);
    tracing::info!(
        source = source.name(),
        entries = raw,
        keys = map.len(),
        "fetched citation data"
    );
    Ok(map)
}

/// Which provider to use, as named in configuration or on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceKind {
    #[default]
    SerpApi,
    Scholar,
    File,
}

impl SourceKind {
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "serpapi" | "serp" => Some(Self::SerpApi),
            "scholar" | "google-scholar" | "profile" => Some(Self::Scholar),
            "file" | "json" => Some(Self::File),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SerpApi => "serpapi",
            Self::Scholar => "scholar",
            Self::File => "file",
        }
    }
}

/// Map an HTTP status from a provider to an error, if it is one.
pub(crate) fn check_status(provider: &str, status: reqwest::StatusCode) -> Result<(), CoreError> {
    if status.as_u16() == 429 {
        return Err(CoreError::Provider(format!(
            "{} rate limited the request (429)",
            provider
        )));
    }
    if !status.is_success() {
        return Err(CoreError::Provider(format!("{} returned HTTP {}", provider, status)));
    }
    Ok(())
}
