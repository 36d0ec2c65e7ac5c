//! CSV reading into raw rows

use crate::error::{Error, Result};
use crate::models::RawRow;
use crate::types::ExportKind;
use csv::{Reader, ReaderBuilder, StringRecord};

/// A parsed export document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvTable {
    /// Column names of the header row
    pub headers: Vec<String>,
    /// Data rows in document order
    pub rows: Vec<RawRow>,
}

/// Reader shared by parsing and window merging
///
/// Rows may be shorter or longer than the header, and quoted fields may span
/// lines.
pub(crate) fn csv_reader(text: &str) -> Reader<&[u8]> {
    ReaderBuilder::new()
        .flexible(true)
        .has_headers(true)
        .from_reader(text.trim_start_matches('\u{feff}').as_bytes())
}

/// Read an export document into a header and raw rows
///
/// Fails on an empty document or a structural reader error. Fields beyond
/// the header width have no column name and are dropped.
pub fn read_table(text: &str, kind: ExportKind) -> Result<CsvTable> {
    if text.trim().is_empty() {
        return Err(Error::export(kind, None, "empty document"));
    }

    let mut reader = csv_reader(text);
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| Error::export(kind, None, format!("malformed CSV header: {e}")))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record =
            record.map_err(|e| Error::export(kind, None, format!("malformed CSV: {e}")))?;
        rows.push(to_row(&headers, &record));
    }

    Ok(CsvTable { headers, rows })
}

fn to_row(headers: &[String], record: &StringRecord) -> RawRow {
    headers
        .iter()
        .zip(record.iter())
        .map(|(column, value)| (column.as_str(), value))
        .collect()
}
