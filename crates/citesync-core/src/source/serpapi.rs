use super::{CitationSource, DEFAULT_MAX_PAGES, check_status};
use crate::CoreError;
use crate::citations::CitationEntry;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

const PAGE_SIZE: usize = 100;

/// Google Scholar author profiles through the SerpAPI search API.
pub struct SerpApi {
    pub api_key: String,
    pub max_pages: usize,
}

impl SerpApi {
    /// Create a SerpAPI source. Fails if the key is empty.
    pub fn new(api_key: impl Into<String>) -> Result<Self, CoreError> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(CoreError::Configuration(
                "no SerpAPI key found (set SERP_API_KEY or pass --serpapi-key)".to_string(),
            ));
        }
        Ok(Self {
            api_key,
            max_pages: DEFAULT_MAX_PAGES,
        })
    }

    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }
}

impl CitationSource for SerpApi {
    fn name(&self) -> &str {
        "SerpAPI"
    }

    fn fetch<'a>(
        &'a self,
        author_id: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CitationEntry>, CoreError>> + Send + 'a>> {
        Box::pin(async move {
            let mut entries = Vec::new();

            for page in 0..self.max_pages {
                let start = page * PAGE_SIZE;
                let url = format!(
                    "https://serpapi.com/search.json?engine=google_scholar_author&hl=en&author_id={}&num={}&start={}&api_key={}",
                    urlencoding::encode(author_id),
                    PAGE_SIZE,
                    start,
                    urlencoding::encode(&self.api_key)
                );

                let resp = client.get(&url).timeout(timeout).send().await?;

                // SerpAPI reports most failures as a JSON body with an `error`
                // field, often alongside a non-2xx status; prefer that message.
                let status = resp.status();
                let data: serde_json::Value = match resp.json().await {
                    Ok(data) => data,
                    Err(e) => {
                        check_status(self.name(), status)?;
                        return Err(e.into());
                    }
                };
                let parsed = parse_author_page(&data)?;
                check_status(self.name(), status)?;

                tracing::debug!(page, articles = parsed.entries.len(), "SerpAPI page");
                entries.extend(parsed.entries);
                if !parsed.has_next {
                    return Ok(entries);
                }
            }

            tracing::warn!(
                max_pages = self.max_pages,
                "SerpAPI pagination limit reached, later publications ignored"
            );
            Ok(entries)
        })
    }
}

/// One decoded page of the `google_scholar_author` response.
#[derive(Debug, Default)]
pub struct AuthorPage {
    pub entries: Vec<CitationEntry>,
    pub has_next: bool,
}

/// Decode a `google_scholar_author` response body.
pub fn parse_author_page(data: &serde_json::Value) -> Result<AuthorPage, CoreError> {
    if let Some(error) = data.get("error") {
        let message = error
            .as_str()
            .map(String::from)
            .unwrap_or_else(|| error.to_string());
        return Err(CoreError::Provider(format!("SerpAPI error: {}", message)));
    }

    let entries = data["articles"]
        .as_array()
        .map(|articles| {
            articles
                .iter()
                .filter_map(|article| {
                    let title = article["title"].as_str().filter(|t| !t.is_empty())?;
                    let citations = article["cited_by"]["value"].as_u64().unwrap_or(0);
                    Some(CitationEntry::new(title, citations))
                })
                .collect()
        })
        .unwrap_or_default();

    let has_next = data["serpapi_pagination"]["next"].as_str().is_some();

    Ok(AuthorPage { entries, has_next })
}
