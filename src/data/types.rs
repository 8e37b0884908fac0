//! Core record types for loaded dashboard data
//!
//! - `Record`: one input row (country, category, date)
//! - `ColumnMapping`: which CSV headers feed each record field
//! - `LoadReport`: the records of one load plus row-level diagnostics

use serde::{Deserialize, Serialize};

/// A single observation from a source file
///
/// `category` is the secondary grouping key (discipline or sport).
/// `date` sorts lexicographically; it is empty when the source carries
/// no date column.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Record {
    pub country: String,
    pub category: String,
    #[serde(default)]
    pub date: String,
}

impl Record {
    pub fn new(
        country: impl Into<String>,
        category: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            country: country.into(),
            category: category.into(),
            date: date.into(),
        }
    }

    /// Record without a date, as produced from the athletes roster
    pub fn undated(country: impl Into<String>, category: impl Into<String>) -> Self {
        Self::new(country, category, "")
    }
}

/// Header names used to build a [`Record`] from a CSV row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnMapping {
    pub country: String,
    pub category: String,
    #[serde(default)]
    pub date: Option<String>,
}

impl ColumnMapping {
    pub fn new(country: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            country: country.into(),
            category: category.into(),
            date: None,
        }
    }

    /// Builder method: read dates from the given column
    pub fn with_date(mut self, column: impl Into<String>) -> Self {
        self.date = Some(column.into());
        self
    }

    /// Layout of `athletes.csv`: one row per athlete, disciplines as a list literal
    pub fn athletes() -> Self {
        Self::new("country", "disciplines")
    }

    /// Layout of `medallists.csv`: one row per medal with the date it was won
    pub fn medallists() -> Self {
        Self::new("country_long", "discipline").with_date("medal_date")
    }
}

/// Outcome of loading one source
#[derive(Debug, Default)]
pub struct LoadReport {
    pub records: Vec<Record>,
    pub rows_processed: usize,
    pub rows_failed: usize,
    pub errors: Vec<String>,
}

impl LoadReport {
    pub fn is_clean(&self) -> bool {
        self.rows_failed == 0
    }
}
