//! Typed export records
//!
//! Each record carries a typed projection of the fields this crate knows
//! about plus `raw_data`, the untouched CSV row. Columns Cronometer adds in
//! the future remain reachable through `raw_data`.

use chrono::{NaiveDate, NaiveDateTime};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

use crate::types::ExportKind;

// ============================================================================
// Raw Row
// ============================================================================

/// One CSV row as `(column, value)` pairs in service order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawRow {
    fields: Vec<(String, String)>,
}

impl RawRow {
    /// Create an empty row
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a column
    pub fn push(&mut self, column: impl Into<String>, value: impl Into<String>) {
        self.fields.push((column.into(), value.into()));
    }

    /// Value of a column, if present
    pub fn get(&self, column: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(name, _)| name == column)
            .map(|(_, value)| value.as_str())
    }

    /// Whether the row has a column
    pub fn contains(&self, column: &str) -> bool {
        self.fields.iter().any(|(name, _)| name == column)
    }

    /// Columns and values in order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Column names in order
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|(k, _)| k.as_str())
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.fields.len()
    }

    /// Whether the row has no columns
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}

impl<K, V> FromIterator<(K, V)> for RawRow
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl Serialize for RawRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (column, value) in &self.fields {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for RawRow {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct RawRowVisitor;

        impl<'de> Visitor<'de> for RawRowVisitor {
            type Value = RawRow;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of column names to string values")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<RawRow, A::Error> {
                let mut row = RawRow::new();
                while let Some((column, value)) = access.next_entry::<String, String>()? {
                    row.push(column, value);
                }
                Ok(row)
            }
        }

        deserializer.deserialize_map(RawRowVisitor)
    }
}

// ============================================================================
// Records
// ============================================================================

/// A single food serving
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Serving {
    /// Day and time the serving was logged
    pub logged_at: Option<NaiveDateTime>,
    pub food_name: String,
    /// Amount as displayed by Cronometer, e.g. "1 cup"
    pub serving_size: String,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
    pub cholesterol_mg: f64,
    pub saturated_fat_g: f64,
    /// Food group, when the export includes one
    pub group: Option<String>,
    pub raw_data: RawRow,
}

/// A biometric measurement
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BiometricEntry {
    pub logged_at: Option<NaiveDateTime>,
    /// e.g. "Weight", "Body Fat", "Blood Pressure"
    pub metric: String,
    pub value: f64,
    pub unit: String,
    pub raw_data: RawRow,
}

/// A free-text note
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub logged_at: Option<NaiveDateTime>,
    pub content: String,
    pub raw_data: RawRow,
}

/// Nutrition totals for one day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyNutrition {
    pub date: Option<NaiveDate>,
    pub calories: f64,
    pub protein_g: f64,
    pub carbs_g: f64,
    pub fat_g: f64,
    pub fiber_g: f64,
    pub sugar_g: f64,
    pub sodium_mg: f64,
    pub raw_data: RawRow,
}

/// A logged exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    pub logged_at: Option<NaiveDateTime>,
    pub name: String,
    pub duration_minutes: f64,
    pub calories_burned: f64,
    pub raw_data: RawRow,
}

/// Any typed record, as produced by [`crate::decode::parse`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Record {
    Serving(Serving),
    DailyNutrition(DailyNutrition),
    Biometric(BiometricEntry),
    Note(Note),
    Exercise(Exercise),
}

impl Record {
    /// Export kind the record came from
    pub fn kind(&self) -> ExportKind {
        match self {
            Record::Serving(_) => ExportKind::Servings,
            Record::DailyNutrition(_) => ExportKind::DailyNutrition,
            Record::Biometric(_) => ExportKind::Biometrics,
            Record::Note(_) => ExportKind::Notes,
            Record::Exercise(_) => ExportKind::Exercises,
        }
    }

    /// The original CSV row
    pub fn raw_data(&self) -> &RawRow {
        match self {
            Record::Serving(r) => &r.raw_data,
            Record::DailyNutrition(r) => &r.raw_data,
            Record::Biometric(r) => &r.raw_data,
            Record::Note(r) => &r.raw_data,
            Record::Exercise(r) => &r.raw_data,
        }
    }
}
