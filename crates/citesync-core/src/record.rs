use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// JSON key holding the citation count.
pub const CITATIONS_FIELD: &str = "citations";

/// JSON key holding the publication title.
pub const TITLE_FIELD: &str = "title";

/// JSON key the persisted store uses for the last-checked timestamp.
pub const DEFAULT_CHECKED_FIELD: &str = "citations_last_checked";

/// A single publication entry from the local store.
///
/// Wraps the raw JSON object so fields this tool does not know about, and
/// their order, survive a load/save cycle.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PublicationRecord(Map<String, Value>);

impl PublicationRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_map(fields: Map<String, Value>) -> Self {
        Self(fields)
    }

    pub fn into_map(self) -> Map<String, Value> {
        self.0
    }

    pub fn fields(&self) -> &Map<String, Value> {
        &self.0
    }

    /// The title, if present as a non-empty string.
    pub fn title(&self) -> Option<&str> {
        self.0
            .get(TITLE_FIELD)
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
    }

    /// Current citation count. Absent or unreadable values count as 0;
    /// numeric strings are accepted.
    pub fn citations(&self) -> u64 {
        match self.0.get(CITATIONS_FIELD) {
            Some(Value::Number(n)) => n
                .as_u64()
                .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
                .unwrap_or(0),
            Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
            _ => 0,
        }
    }

    pub fn set_citations(&mut self, citations: u64) {
        self.0.insert(CITATIONS_FIELD.to_string(), Value::from(citations));
    }

    pub fn checked_at(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    pub fn set_checked_at(&mut self, field: &str, timestamp: &str) {
        self.0.insert(field.to_string(), Value::String(timestamp.to_string()));
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, value: Value) -> Option<Value> {
        self.0.insert(field.into(), value)
    }
}

impl From<Map<String, Value>> for PublicationRecord {
    fn from(fields: Map<String, Value>) -> Self {
        Self(fields)
    }
}
