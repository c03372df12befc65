use super::CitationSource;
use crate::CoreError;
use crate::citations::CitationEntry;
use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;
use std::time::Duration;

/// Offline source reading an exported JSON array of
/// `{"title": ..., "citations": ...}` objects. The author id is ignored.
pub struct JsonFileSource {
    pub path: PathBuf,
}

impl JsonFileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl CitationSource for JsonFileSource {
    fn name(&self) -> &str {
        "JSON file"
    }

    fn fetch<'a>(
        &'a self,
        _author_id: &'a str,
        _client: &'a reqwest::Client,
        _timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<CitationEntry>, CoreError>> + Send + 'a>> {
        Box::pin(async move {
            if !self.path.exists() {
                return Err(CoreError::Configuration(format!(
                    "citations file not found: {}",
                    self.path.display()
                )));
            }
            let content = std::fs::read_to_string(&self.path)?;
            parse_entries(&content)
        })
    }
}

/// Decode an exported citation list.
pub fn parse_entries(content: &str) -> Result<Vec<CitationEntry>, CoreError> {
    serde_json::from_str(content)
        .map_err(|e| CoreError::Provider(format!("invalid citations file: {}", e)))
}
