//! Concatenation of windowed export documents

use crate::decode::csv_reader;
use crate::error::{Error, Result};
use crate::types::{DateRange, ExportKind};
use csv::{StringRecord, Terminator, WriterBuilder};
use tracing::warn;

/// Collects window bodies and joins them under a single header
///
/// The first window fixes the header. Later windows must repeat it exactly
/// and contribute only their data rows.
#[derive(Debug)]
pub struct WindowMerger {
    kind: ExportKind,
    header: Option<StringRecord>,
    bodies: Vec<String>,
}

impl WindowMerger {
    /// Create an empty merger
    pub fn new(kind: ExportKind) -> Self {
        Self {
            kind,
            header: None,
            bodies: Vec::new(),
        }
    }

    /// Number of windows accepted so far
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }

    /// Accept the body of the next window
    pub fn push(&mut self, window: &DateRange, body: String) -> Result<()> {
        let header = csv_reader(&body)
            .headers()
            .map_err(|e| {
                Error::export(self.kind, Some(*window), format!("malformed CSV header: {e}"))
            })?
            .clone();

        match &self.header {
            None => self.header = Some(header),
            Some(first) if *first == header => {}
            Some(first) => {
                warn!(kind = %self.kind, window = %window, "Export header changed between windows");
                return Err(Error::export(
                    self.kind,
                    Some(*window),
                    format!(
                        "header differs from first window: expected [{}], got [{}]",
                        join(first),
                        join(&header)
                    ),
                ));
            }
        }

        self.bodies.push(body);
        Ok(())
    }

    /// Join the accepted windows into one document
    ///
    /// A single window is returned untouched.
    pub fn finish(mut self) -> Result<String> {
        if self.bodies.len() <= 1 {
            return Ok(self.bodies.pop().unwrap_or_default());
        }
        let Some(header) = self.header else {
            return Ok(String::new());
        };

        let kind = self.kind;
        let csv_error = |e: csv::Error| Error::export(kind, None, format!("malformed CSV: {e}"));

        let mut writer = WriterBuilder::new()
            .flexible(true)
            .terminator(Terminator::Any(b'\n'))
            .from_writer(Vec::new());
        writer.write_record(&header).map_err(csv_error)?;

        for body in &self.bodies {
            let mut reader = csv_reader(body);
            for record in reader.records() {
                writer.write_record(&record.map_err(csv_error)?).map_err(csv_error)?;
            }
        }

        let bytes = writer
            .into_inner()
            .map_err(|e| Error::export(kind, None, format!("failed to join windows: {e}")))?;
        String::from_utf8(bytes)
            .map_err(|e| Error::export(kind, None, format!("failed to join windows: {e}")))
    }
}

fn join(record: &StringRecord) -> String {
    record.iter().collect::<Vec<_>>().join(", ")
}
