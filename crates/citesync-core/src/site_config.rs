//! Author id lookup in the website's `config.json`.
//!
//! Accepted shapes, in priority order:
//! - `{"author": {"scholarId": "..."}}`
//! - `{"scholarId": "..."}`
//! - `{"social": {"googleScholar": "https://scholar.google.com/citations?user=..."}}`
//! - `{"googleScholar": "https://..."}`

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::CoreError;

/// Default location of the website configuration.
pub const DEFAULT_SITE_CONFIG: &str = "config.json";

static USER_PARAM_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[?&]user=([^&#]+)").unwrap());

/// Read `path` and resolve the Scholar author id from it.
///
/// Returns `Ok(None)` when the file is valid but carries no id.
pub fn load_scholar_id(path: &Path) -> Result<Option<String>, CoreError> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        CoreError::Configuration(format!("cannot read {}: {}", path.display(), e))
    })?;
    let root: Value = serde_json::from_str(&content).map_err(|e| {
        CoreError::Configuration(format!("{} is not valid JSON: {}", path.display(), e))
    })?;
    Ok(scholar_id_from_value(&root))
}

/// Resolve the Scholar author id from a parsed site configuration.
pub fn scholar_id_from_value(root: &Value) -> Option<String> {
    let direct = root["author"]["scholarId"]
        .as_str()
        .or_else(|| root["scholarId"].as_str())
        .map(str::trim)
        .filter(|id| !id.is_empty());
    if let Some(id) = direct {
        return Some(id.to_string());
    }

    root["social"]["googleScholar"]
        .as_str()
        .or_else(|| root["googleScholar"].as_str())
        .and_then(scholar_id_from_url)
}

/// Extract the `user=` parameter from a Google Scholar profile URL.
pub fn scholar_id_from_url(url: &str) -> Option<String> {
    USER_PARAM_RE
        .captures(url)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}
