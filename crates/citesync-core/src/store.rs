//! JSON file persistence for the publication list.
//!
//! The store is a JSON array of objects. It is read in full at the start of a
//! run and replaced in one rename at the end, so an aborted run never leaves a
//! half-written file behind.

use std::io::Write;
use std::path::Path;

use serde_json::Value;

use crate::CoreError;
use crate::record::PublicationRecord;

/// Load the publication list from `path`.
///
/// Fails with [`CoreError::NotFound`] if the file does not exist and with
/// [`CoreError::Format`] if it is not a JSON array of objects.
pub fn load(path: &Path) -> Result<Vec<PublicationRecord>, CoreError> {
    if !path.exists() {
        return Err(CoreError::NotFound(path.to_path_buf()));
    }
    let content = std::fs::read_to_string(path)?;
    let records = parse(&content)?;
    tracing::info!(path = %path.display(), records = records.len(), "loaded publications");
    Ok(records)
}

/// Parse a publication list from JSON text.
pub fn parse(content: &str) -> Result<Vec<PublicationRecord>, CoreError> {
    let root: Value = serde_json::from_str(content)
        .map_err(|e| CoreError::Format(format!("invalid JSON: {}", e)))?;

    let Value::Array(items) = root else {
        return Err(CoreError::Format(
            "publications file is not a list".to_string(),
        ));
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| match item {
            Value::Object(fields) => Ok(PublicationRecord::from_map(fields)),
            other => Err(CoreError::Format(format!(
                "entry {} is not an object (found {})",
                index,
                json_kind(&other)
            ))),
        })
        .collect()
}

/// Render the publication list: two-space indentation, non-ASCII kept literal.
pub fn render(records: &[PublicationRecord]) -> Result<String, CoreError> {
    serde_json::to_string_pretty(records)
        .map_err(|e| CoreError::Format(format!("failed to serialize publications: {}", e)))
}

/// Atomically replace `path` with the rendered publication list.
///
/// Writes to a temporary file in the same directory and renames it over the
/// target.
pub fn save(path: &Path, records: &[PublicationRecord]) -> Result<(), CoreError> {
    let content = render(records)?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(dir)?;

    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(content.as_bytes())?;
    // The temp file is created owner-only; keep the mode of the file it replaces.
    if let Ok(metadata) = std::fs::metadata(path) {
        tmp.as_file().set_permissions(metadata.permissions())?;
    }
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| CoreError::Io(e.error))?;

    tracing::info!(path = %path.display(), records = records.len(), "saved publications");
    Ok(())
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
