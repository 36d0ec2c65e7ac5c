//! Common types used throughout the client
//!
//! Date ranges, export kinds and small shared enums.

use crate::error::{Error, Result};
use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Date Range
// ============================================================================

/// Inclusive range of calendar days
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "DateRangeFields")]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Deserialize)]
struct DateRangeFields {
    start: NaiveDate,
    end: NaiveDate,
}

impl TryFrom<DateRangeFields> for DateRange {
    type Error = Error;

    fn try_from(fields: DateRangeFields) -> Result<Self> {
        Self::new(fields.start, fields.end)
    }
}

impl DateRange {
    /// Create a range, rejecting `start > end`
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(Error::InvalidDateRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// A range covering a single day
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// First day (inclusive)
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Last day (inclusive)
    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of calendar days covered, counting both ends
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }

    /// Sub-range starting at `start` covering at most `days` days
    pub(crate) fn window_from(start: NaiveDate, days: i64, limit: NaiveDate) -> Self {
        let end = start
            .checked_add_signed(Duration::days(days - 1))
            .map_or(limit, |end| end.min(limit));
        Self { start, end }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} to {}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

// ============================================================================
// Export Kind
// ============================================================================

/// Category of data retrievable as CSV from the export endpoint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExportKind {
    /// Individual food servings
    Servings,
    /// Daily nutrition totals
    DailyNutrition,
    /// Biometric measurements (weight, blood pressure, ...)
    Biometrics,
    /// Free-text notes
    Notes,
    /// Logged exercises
    Exercises,
}

impl ExportKind {
    /// All export kinds
    pub const ALL: [ExportKind; 5] = [
        ExportKind::Servings,
        ExportKind::DailyNutrition,
        ExportKind::Biometrics,
        ExportKind::Notes,
        ExportKind::Exercises,
    ];

    /// Value of the `generate` query parameter on the export endpoint
    pub fn generate_param(self) -> &'static str {
        match self {
            ExportKind::Servings => "servings",
            ExportKind::DailyNutrition => "dailySummary",
            ExportKind::Biometrics => "biometrics",
            ExportKind::Notes => "notes",
            ExportKind::Exercises => "exercises",
        }
    }

    /// Short name used in logs and errors
    pub fn as_str(self) -> &'static str {
        match self {
            ExportKind::Servings => "servings",
            ExportKind::DailyNutrition => "daily_nutrition",
            ExportKind::Biometrics => "biometrics",
            ExportKind::Notes => "notes",
            ExportKind::Exercises => "exercises",
        }
    }
}

impl fmt::Display for ExportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        ExportKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s || kind.generate_param() == s)
            .ok_or_else(|| Error::config(format!("Unknown export kind: {s}")))
    }
}

// ============================================================================
// Backoff Type
// ============================================================================

/// Delay growth between transport retries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackoffType {
    /// Same delay every attempt
    Constant,
    /// Delay grows linearly
    Linear,
    /// Delay doubles every attempt
    #[default]
    Exponential,
}
