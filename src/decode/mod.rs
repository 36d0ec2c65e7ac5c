//! CSV-to-record mapping
//!
//! # Overview
//!
//! Export documents are read with the `csv` crate into [`RawRow`]s, then
//! projected onto typed records through [`ExportRecord`]. Rows keep their
//! input order and every record carries its source row as `raw_data`.
//!
//! A document is rejected only when it is structurally unusable: empty,
//! unreadable, or with a header that shares no column with the kind being
//! parsed. Individual bad values never fail a row.

mod reader;
mod records;

pub(crate) use reader::csv_reader;
pub use reader::{read_table, CsvTable};
pub use records::ExportRecord;

use crate::error::{Error, Result};
use crate::models::{BiometricEntry, DailyNutrition, Exercise, Note, RawRow, Record, Serving};
use crate::types::ExportKind;
use tracing::debug;

/// Parse an export document into records of type `T`
pub fn parse_records<T: ExportRecord>(csv_text: &str) -> Result<Vec<T>> {
    let table = read_table(csv_text, T::KIND)?;

    if !table.headers.iter().any(|h| T::is_known_column(h)) {
        return Err(Error::export(
            T::KIND,
            None,
            format!(
                "header shares no known column: [{}]",
                table.headers.join(", ")
            ),
        ));
    }

    let records: Vec<T> = table.rows.into_iter().map(T::from_row).collect();
    debug!(kind = %T::KIND, rows = records.len(), "Parsed export");
    Ok(records)
}

/// Parse an export document of the given kind
pub fn parse(csv_text: &str, kind: ExportKind) -> Result<Vec<Record>> {
    match kind {
        ExportKind::Servings => wrap::<Serving>(csv_text),
        ExportKind::DailyNutrition => wrap::<DailyNutrition>(csv_text),
        ExportKind::Biometrics => wrap::<BiometricEntry>(csv_text),
        ExportKind::Notes => wrap::<Note>(csv_text),
        ExportKind::Exercises => wrap::<Exercise>(csv_text),
    }
}

/// Read the rows of a document without projecting them
pub fn parse_raw(csv_text: &str, kind: ExportKind) -> Result<Vec<RawRow>> {
    Ok(read_table(csv_text, kind)?.rows)
}

fn wrap<T: ExportRecord>(csv_text: &str) -> Result<Vec<Record>> {
    Ok(parse_records::<T>(csv_text)?
        .into_iter()
        .map(ExportRecord::into_record)
        .collect())
}
