//! Projection of raw rows onto typed records
//!
//! Column names have changed between Cronometer releases, so every field
//! reads the first non-empty value among a list of aliases. Coercion never
//! fails a row: bad numbers become `0.0`, a bad time falls back to midnight
//! and a bad date leaves the timestamp empty.

use crate::models::{BiometricEntry, DailyNutrition, Exercise, Note, RawRow, Record, Serving};
use crate::types::ExportKind;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use tracing::trace;

const DATE_COLUMNS: &[&str] = &["Day", "Date", "date"];
const TIME_COLUMNS: &[&str] = &["Time", "time"];

const DATE_FORMAT: &str = "%Y-%m-%d";
const TIME_FORMATS: &[&str] = &["%H:%M", "%H:%M:%S", "%I:%M %p"];

// Nutrient columns shared by servings and daily totals
const CALORIES: &[&str] = &["Energy (kcal)", "Calories"];
const PROTEIN: &[&str] = &["Protein (g)", "Protein"];
const CARBS: &[&str] = &["Carbs (g)", "Carbohydrates"];
const FAT: &[&str] = &["Fat (g)", "Fat"];
const FIBER: &[&str] = &["Fiber (g)", "Fiber"];
const SUGAR: &[&str] = &["Sugars (g)", "Sugar"];
const SODIUM: &[&str] = &["Sodium (mg)", "Sodium"];

const FOOD_NAME: &[&str] = &["Food Name", "Name", "Food"];
const SERVING_SIZE: &[&str] = &["Amount", "Serving"];
const CHOLESTEROL: &[&str] = &["Cholesterol (mg)"];
const SATURATED_FAT: &[&str] = &["Saturated (g)"];
const FOOD_GROUP: &[&str] = &["Food Group", "Group"];

const METRIC: &[&str] = &["Metric", "Name", "Type"];
const METRIC_VALUE: &[&str] = &["Amount", "Value"];
const UNIT: &[&str] = &["Unit"];

const NOTE_CONTENT: &[&str] = &["Note", "Content", "Text"];

const EXERCISE_NAME: &[&str] = &["Exercise", "Name"];
const DURATION: &[&str] = &["Minutes", "Duration"];
const CALORIES_BURNED: &[&str] = &["Calories Burned", "Calories"];

/// A record type produced from one export kind
pub trait ExportRecord: Sized {
    /// Export the record comes from
    const KIND: ExportKind;

    /// Alias lists of every field the projection reads
    const FIELD_ALIASES: &'static [&'static [&'static str]];

    /// Whether any field of the record reads `column`
    fn is_known_column(column: &str) -> bool {
        Self::FIELD_ALIASES
            .iter()
            .any(|aliases| aliases.contains(&column))
    }

    /// Project a raw row, keeping it as `raw_data`
    fn from_row(row: RawRow) -> Self;

    /// The original row
    fn raw_data(&self) -> &RawRow;

    /// Wrap into the kind-tagged [`Record`]
    fn into_record(self) -> Record;
}

// ============================================================================
// Field Coercion
// ============================================================================

/// Read-only view of a row with alias lookup
struct Fields<'a> {
    row: &'a RawRow,
}

impl<'a> Fields<'a> {
    fn new(row: &'a RawRow) -> Self {
        Self { row }
    }

    /// First non-empty value among `aliases`, as written in the row
    fn first(&self, aliases: &[&str]) -> Option<&'a str> {
        aliases
            .iter()
            .filter_map(|alias| self.row.get(alias))
            .find(|value| !value.is_empty())
    }

    /// Like [`Fields::first`], trimmed for coercion
    fn first_trimmed(&self, aliases: &[&str]) -> Option<&'a str> {
        self.first(aliases)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }

    fn text(&self, aliases: &[&str]) -> String {
        self.first(aliases).unwrap_or_default().to_string()
    }

    fn optional_text(&self, aliases: &[&str]) -> Option<String> {
        self.first(aliases).map(str::to_string)
    }

    fn number(&self, aliases: &[&str]) -> f64 {
        let Some(value) = self.first_trimmed(aliases) else {
            return 0.0;
        };
        match value.parse::<f64>() {
            Ok(n) if n.is_finite() => n,
            _ => {
                trace!(value, column = aliases[0], "Unparsable number, using 0.0");
                0.0
            }
        }
    }

    fn date(&self) -> Option<NaiveDate> {
        let value = self.first_trimmed(DATE_COLUMNS)?;
        let date = NaiveDate::parse_from_str(value, DATE_FORMAT).ok();
        if date.is_none() {
            trace!(value, "Unparsable date");
        }
        date
    }

    /// Date plus time of day, midnight when the time is missing or invalid
    fn datetime(&self) -> Option<NaiveDateTime> {
        let date = self.date()?;
        let time = self.first_trimmed(TIME_COLUMNS).and_then(|value| {
            let time = TIME_FORMATS
                .iter()
                .find_map(|format| NaiveTime::parse_from_str(value, format).ok());
            if time.is_none() {
                trace!(value, "Unparsable time, using midnight");
            }
            time
        });
        Some(date.and_time(time.unwrap_or(NaiveTime::MIN)))
    }
}

// ============================================================================
// Record Projections
// ============================================================================

impl ExportRecord for Serving {
    const KIND: ExportKind = ExportKind::Servings;
    const FIELD_ALIASES: &'static [&'static [&'static str]] = &[
        DATE_COLUMNS,
        TIME_COLUMNS,
        FOOD_NAME,
        SERVING_SIZE,
        CALORIES,
        PROTEIN,
        CARBS,
        FAT,
        FIBER,
        SUGAR,
        SODIUM,
        CHOLESTEROL,
        SATURATED_FAT,
        FOOD_GROUP,
    ];

    fn from_row(row: RawRow) -> Self {
        let f = Fields::new(&row);
        Self {
            logged_at: f.datetime(),
            food_name: f.text(FOOD_NAME),
            serving_size: f.text(SERVING_SIZE),
            calories: f.number(CALORIES),
            protein_g: f.number(PROTEIN),
            carbs_g: f.number(CARBS),
            fat_g: f.number(FAT),
            fiber_g: f.number(FIBER),
            sugar_g: f.number(SUGAR),
            sodium_mg: f.number(SODIUM),
            cholesterol_mg: f.number(CHOLESTEROL),
            saturated_fat_g: f.number(SATURATED_FAT),
            group: f.optional_text(FOOD_GROUP),
            raw_data: row,
        }
    }

    fn raw_data(&self) -> &RawRow {
        &self.raw_data
    }

    fn into_record(self) -> Record {
        Record::Serving(self)
    }
}

impl ExportRecord for DailyNutrition {
    const KIND: ExportKind = ExportKind::DailyNutrition;
    const FIELD_ALIASES: &'static [&'static [&'static str]] = &[
        DATE_COLUMNS,
        CALORIES,
        PROTEIN,
        CARBS,
        FAT,
        FIBER,
        SUGAR,
        SODIUM,
    ];

    fn from_row(row: RawRow) -> Self {
        let f = Fields::new(&row);
        Self {
            date: f.date(),
            calories: f.number(CALORIES),
            protein_g: f.number(PROTEIN),
            carbs_g: f.number(CARBS),
            fat_g: f.number(FAT),
            fiber_g: f.number(FIBER),
            sugar_g: f.number(SUGAR),
            sodium_mg: f.number(SODIUM),
            raw_data: row,
        }
    }

    fn raw_data(&self) -> &RawRow {
        &self.raw_data
    }

    fn into_record(self) -> Record {
        Record::DailyNutrition(self)
    }
}

impl ExportRecord for BiometricEntry {
    const KIND: ExportKind = ExportKind::Biometrics;
    const FIELD_ALIASES: &'static [&'static [&'static str]] = &[
        DATE_COLUMNS,
        TIME_COLUMNS,
        METRIC,
        METRIC_VALUE,
        UNIT,
    ];

    fn from_row(row: RawRow) -> Self {
        let f = Fields::new(&row);
        Self {
            logged_at: f.datetime(),
            metric: f.text(METRIC),
            value: f.number(METRIC_VALUE),
            unit: f.text(UNIT),
            raw_data: row,
        }
    }

    fn raw_data(&self) -> &RawRow {
        &self.raw_data
    }

    fn into_record(self) -> Record {
        Record::Biometric(self)
    }
}

impl ExportRecord for Note {
    const KIND: ExportKind = ExportKind::Notes;
    const FIELD_ALIASES: &'static [&'static [&'static str]] =
        &[DATE_COLUMNS, TIME_COLUMNS, NOTE_CONTENT];

    fn from_row(row: RawRow) -> Self {
        let f = Fields::new(&row);
        Self {
            logged_at: f.datetime(),
            content: f.text(NOTE_CONTENT),
            raw_data: row,
        }
    }

    fn raw_data(&self) -> &RawRow {
        &self.raw_data
    }

    fn into_record(self) -> Record {
        Record::Note(self)
    }
}

impl ExportRecord for Exercise {
    const KIND: ExportKind = ExportKind::Exercises;
    const FIELD_ALIASES: &'static [&'static [&'static str]] = &[
        DATE_COLUMNS,
        TIME_COLUMNS,
        EXERCISE_NAME,
        DURATION,
        CALORIES_BURNED,
    ];

    fn from_row(row: RawRow) -> Self {
        let f = Fields::new(&row);
        Self {
            logged_at: f.datetime(),
            name: f.text(EXERCISE_NAME),
            duration_minutes: f.number(DURATION),
            calories_burned: f.number(CALORIES_BURNED),
            raw_data: row,
        }
    }

    fn raw_data(&self) -> &RawRow {
        &self.raw_data
    }

    fn into_record(self) -> Record {
        Record::Exercise(self)
    }
}
