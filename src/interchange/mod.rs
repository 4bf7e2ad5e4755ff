//! JSON and CSV export of snapshots, and bulk CSV import of entries.
//!
//! CSV is written and read without quoting, so a value containing a comma
//! is split into separate cells on the way back in. Rows are one header row
//! naming the fields followed by one row per entry.

use csv::{QuoteStyle, ReaderBuilder, Trim, WriterBuilder};
use indexmap::IndexSet;
use serde_json::Value as JsonValue;
use thiserror::Error;

use crate::storage::StorageError;
use crate::store::Snapshot;

#[derive(Error, Debug)]
pub enum InterchangeError {
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV output is not valid UTF-8")]
    Encoding,

    /// The import text has no header row
    #[error("CSV import has no header row")]
    MissingHeader,

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type InterchangeResult<T> = Result<T, InterchangeError>;

/// Pretty-printed JSON object of the snapshot, fields in store order.
pub fn snapshot_to_json(snapshot: &Snapshot) -> InterchangeResult<String> {
    Ok(serde_json::to_string_pretty(snapshot)?)
}

/// Header row of field names plus one value row.
pub fn snapshot_to_csv(snapshot: &Snapshot) -> InterchangeResult<String> {
    entries_to_csv(std::slice::from_ref(snapshot))
}

/// Header is the union of all entry fields in first-seen order; missing
/// cells are left empty. No fields at all yields an empty string.
pub fn entries_to_csv(entries: &[Snapshot]) -> InterchangeResult<String> {
    let header: IndexSet<&str> = entries
        .iter()
        .flat_map(|entry| entry.keys().map(String::as_str))
        .collect();
    if header.is_empty() {
        return Ok(String::new());
    }

    let mut writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .from_writer(Vec::new());
    writer.write_record(header.iter())?;
    for entry in entries {
        writer.write_record(header.iter().map(|field| cell(entry.get(*field))))?;
    }
    let bytes = writer
        .into_inner()
        .map_err(|e| InterchangeError::Csv(e.into_error().into()))?;
    String::from_utf8(bytes).map_err(|_| InterchangeError::Encoding)
}

/// Parse entries from CSV text. Header names and values are trimmed; a row
/// shorter than the header omits the missing fields.
pub fn entries_from_csv(text: &str) -> InterchangeResult<Vec<Snapshot>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers = reader.headers()?.clone();
    if headers.is_empty() || headers.iter().all(str::is_empty) {
        return Err(InterchangeError::MissingHeader);
    }

    let mut entries = Vec::new();
    for record in reader.records() {
        let record = record?;
        let mut entry = Snapshot::new();
        for (idx, header) in headers.iter().enumerate() {
            let key = header.trim_matches('\u{feff}').to_string();
            if let Some(value) = record.get(idx) {
                entry.insert(key, JsonValue::String(value.to_string()));
            }
        }
        entries.push(entry);
    }
    Ok(entries)
}

fn cell(value: Option<&JsonValue>) -> String {
    match value {
        None | Some(JsonValue::Null) => String::new(),
        Some(JsonValue::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
