//! Daily symptom records and their spreadsheet row layout.
//!
//! A [`SymptomRecord`] is what the form layer hands to the sync service: a
//! calendar date, one count per size [`Category`], and the overwhelm and
//! meltdown flags. Records serialize to a fixed column order that matches
//! [`header_row`].

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Label of the first column.
pub const DATE_COLUMN: &str = "Date";
/// Label of the overwhelm flag column.
pub const OVERWHELM_COLUMN: &str = "Overwhelm";
/// Label of the meltdown flag column.
pub const MELTDOWN_COLUMN: &str = "Meltdown";

/// Errors produced while building records from user input.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// The label does not name one of the eight categories.
    #[error("unknown category '{0}' (expected one of S, S/M, M, M/L, L, L/XL, XL, XXL)")]
    UnknownCategory(String),

    /// The count is not a non-negative integer.
    #[error("invalid count '{value}' for {label}: expected a non-negative integer")]
    InvalidCount { label: String, value: String },

    /// A `LABEL=N` assignment is missing its `=`.
    #[error("invalid count assignment '{0}': expected LABEL=N")]
    InvalidAssignment(String),
}

/// The fixed set of size categories, in column order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Category {
    #[serde(rename = "S")]
    S,
    #[serde(rename = "S/M")]
    SM,
    #[serde(rename = "M")]
    M,
    #[serde(rename = "M/L")]
    ML,
    #[serde(rename = "L")]
    L,
    #[serde(rename = "L/XL")]
    LXL,
    #[serde(rename = "XL")]
    XL,
    #[serde(rename = "XXL")]
    XXL,
}

impl Category {
    /// All categories in column order.
    pub const ALL: [Category; 8] = [
        Category::S,
        Category::SM,
        Category::M,
        Category::ML,
        Category::L,
        Category::LXL,
        Category::XL,
        Category::XXL,
    ];

    /// Returns the column label for this category.
    pub fn label(&self) -> &'static str {
        match self {
            Self::S => "S",
            Self::SM => "S/M",
            Self::M => "M",
            Self::ML => "M/L",
            Self::L => "L",
            Self::LXL => "L/XL",
            Self::XL => "XL",
            Self::XXL => "XXL",
        }
    }

    /// Looks up a category by label, ignoring ASCII case and surrounding space.
    pub fn from_label(label: &str) -> Option<Self> {
        let wanted = label.trim();
        Self::ALL
            .into_iter()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Category {
    type Err = RecordError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_label(s).ok_or_else(|| RecordError::UnknownCategory(s.to_string()))
    }
}

/// One non-negative count per category. Every category defaults to zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SymptomCounts([u32; 8]);

impl SymptomCounts {
    /// Creates counts with every category at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the count for a category.
    pub fn get(&self, category: Category) -> u32 {
        self.0[category.index()]
    }

    /// Sets the count for a category.
    pub fn set(&mut self, category: Category, count: u32) {
        self.0[category.index()] = count;
    }

    /// Builder variant of [`set`](Self::set).
    pub fn with(mut self, category: Category, count: u32) -> Self {
        self.set(category, count);
        self
    }

    /// Iterates over `(category, count)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (Category, u32)> + '_ {
        Category::ALL.into_iter().map(|c| (c, self.get(c)))
    }
}

/// A single day's submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymptomRecord {
    /// Calendar date the record is for.
    pub date: NaiveDate,
    /// Per-category counts.
    pub counts: SymptomCounts,
    /// Whether an overwhelm occurred.
    pub overwhelm: bool,
    /// Whether a meltdown occurred.
    pub meltdown: bool,
}

impl SymptomRecord {
    /// Creates an all-zero record for the given date.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            counts: SymptomCounts::new(),
            overwhelm: false,
            meltdown: false,
        }
    }

    /// Builder method to set one category count.
    pub fn with_count(mut self, category: Category, count: u32) -> Self {
        self.counts.set(category, count);
        self
    }

    /// Builder method to replace all counts.
    pub fn with_counts(mut self, counts: SymptomCounts) -> Self {
        self.counts = counts;
        self
    }

    /// Builder method to set the overwhelm flag.
    pub fn with_overwhelm(mut self, overwhelm: bool) -> Self {
        self.overwhelm = overwhelm;
        self
    }

    /// Builder method to set the meltdown flag.
    pub fn with_meltdown(mut self, meltdown: bool) -> Self {
        self.meltdown = meltdown;
        self
    }

    /// Serializes the record as a sheet row.
    ///
    /// The date is an ISO `YYYY-MM-DD` string, counts are decimal strings and
    /// the flags are JSON booleans, in the same order as [`header_row`].
    pub fn to_row(&self) -> Vec<Value> {
        let mut row = Vec::with_capacity(Category::ALL.len() + 3);
        row.push(Value::String(self.date.format("%Y-%m-%d").to_string()));
        row.extend(
            self.counts
                .iter()
                .map(|(_, count)| Value::String(count.to_string())),
        );
        row.push(Value::Bool(self.overwhelm));
        row.push(Value::Bool(self.meltdown));
        row
    }
}

/// The header row written once when a spreadsheet is created.
pub fn header_row() -> Vec<Value> {
    std::iter::once(DATE_COLUMN)
        .chain(Category::ALL.iter().map(Category::label))
        .chain([OVERWHELM_COLUMN, MELTDOWN_COLUMN])
        .map(|label| Value::String(label.to_string()))
        .collect()
}

/// Parses a count string as entered in a form field.
///
/// Empty input counts as zero, matching the form's default of "0".
pub fn parse_count(label: &str, value: &str) -> Result<u32, RecordError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Ok(0);
    }
    trimmed.parse::<u32>().map_err(|_| RecordError::InvalidCount {
        label: label.to_string(),
        value: value.to_string(),
    })
}

/// Parses a `LABEL=N` assignment such as `S/M=2`.
pub fn parse_count_assignment(input: &str) -> Result<(Category, u32), RecordError> {
    let (label, value) = input
        .split_once('=')
        .ok_or_else(|| RecordError::InvalidAssignment(input.to_string()))?;
    let category = label.parse::<Category>()?;
    let count = parse_count(category.label(), value)?;
    Ok((category, count))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn category_labels_in_column_order() {
        let labels: Vec<&str> = Category::ALL.iter().map(Category::label).collect();
        assert_eq!(
            labels,
            vec!["S", "S/M", "M", "M/L", "L", "L/XL", "XL", "XXL"]
        );
    }

    #[test]
    fn category_from_label_ignores_case() {
        assert_eq!(Category::from_label("s/m"), Some(Category::SM));
        assert_eq!(Category::from_label(" xxl "), Some(Category::XXL));
        assert_eq!(Category::from_label("XS"), None);
        assert!("XS".parse::<Category>().is_err());
    }

    #[test]
    fn header_matches_row_width() {
        let header = header_row();
        let row = SymptomRecord::new(date(2024, 3, 1)).to_row();
        assert_eq!(header.len(), 11);
        assert_eq!(header.len(), row.len());
        assert_eq!(header[0], Value::from("Date"));
        assert_eq!(header[2], Value::from("S/M"));
        assert_eq!(header[10], Value::from("Meltdown"));
    }

    #[test]
    fn record_serializes_in_column_order() {
        let record = SymptomRecord::new(date(2024, 3, 1))
            .with_count(Category::S, 2)
            .with_count(Category::M, 1)
            .with_overwhelm(true);

        insta::assert_json_snapshot!(record.to_row(), @r###"
        [
          "2024-03-01",
          "2",
          "0",
          "1",
          "0",
          "0",
          "0",
          "0",
          "0",
          true,
          false
        ]
        "###);
    }

    #[test]
    fn counts_default_to_zero() {
        let counts = SymptomCounts::new();
        assert!(counts.iter().all(|(_, n)| n == 0));

        let counts = counts.with(Category::XL, 4).with(Category::S, 1);
        assert_eq!(counts.get(Category::XL), 4);
        assert_eq!(counts.get(Category::S), 1);
        assert_eq!(counts.get(Category::M), 0);
    }

    #[test]
    fn parse_assignment() {
        assert_eq!(parse_count_assignment("S/M=2"), Ok((Category::SM, 2)));
        assert_eq!(parse_count_assignment("xl= 7 "), Ok((Category::XL, 7)));
        assert_eq!(parse_count_assignment("L="), Ok((Category::L, 0)));
    }

    #[test]
    fn parse_assignment_rejects_bad_input() {
        assert!(matches!(
            parse_count_assignment("S2"),
            Err(RecordError::InvalidAssignment(_))
        ));
        assert!(matches!(
            parse_count_assignment("XS=1"),
            Err(RecordError::UnknownCategory(_))
        ));
        assert!(matches!(
            parse_count_assignment("M=-1"),
            Err(RecordError::InvalidCount { .. })
        ));
        assert!(matches!(
            parse_count_assignment("M=1.5"),
            Err(RecordError::InvalidCount { .. })
        ));
    }
}
