//! CSV upload parsing
//!
//! Produces one `RawRow` per data line: canonical header key paired with
//! the trimmed cell text.

use csv::{ReaderBuilder, Trim};

use super::IngestError;

/// One parsed row: `(canonical_key, trimmed_value)` in column order
pub type RawRow = Vec<(String, String)>;

const UTF8_BOM: &str = "\u{feff}";

/// Canonical key for a header cell ("Some Header" → `some_header`)
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
}

/// Parse an uploaded file into raw rows
///
/// Fails when the bytes are not UTF-8, the header row is missing, a row
/// has a different number of cells than the header, or no data rows exist.
pub fn parse_upload(bytes: &[u8]) -> Result<Vec<RawRow>, IngestError> {
    let text = std::str::from_utf8(bytes)
        .map_err(|_| IngestError::Parse("file is not UTF-8 text".to_string()))?;
    let text = text.strip_prefix(UTF8_BOM).unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(false)
        .trim(Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| IngestError::Parse(format!("unreadable header row: {}", e)))?
        .iter()
        .map(normalize_header)
        .collect();

    if headers.iter().all(String::is_empty) {
        return Err(IngestError::Parse("missing header row".to_string()));
    }

    let mut rows = Vec::new();
    for (index, result) in reader.records().enumerate() {
        let record = result.map_err(|e| {
            IngestError::Parse(format!("row {} is malformed: {}", index + 1, e))
        })?;

        if record.iter().all(str::is_empty) {
            continue;
        }

        let row: RawRow = headers
            .iter()
            .zip(record.iter())
            .filter(|(key, _)| !key.is_empty())
            .map(|(key, value)| (key.clone(), value.to_string()))
            .collect();
        rows.push(row);
    }

    if rows.is_empty() {
        return Err(IngestError::Parse("file contains no listing rows".to_string()));
    }

    tracing::debug!(rows = rows.len(), columns = headers.len(), "Parsed upload");
    Ok(rows)
}
