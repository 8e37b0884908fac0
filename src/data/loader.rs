//! CSV Loader
//!
//! Reads dashboard records from delimited files using a header-based
//! column mapping. Discipline labels are stripped of list-literal
//! punctuation and dates are normalised to `YYYY-MM-DD` when possible.

use super::error::{DataError, DataResult};
use super::types::{ColumnMapping, LoadReport, Record};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use regex::Regex;
use std::io::Read;
use std::path::Path;

/// Most row errors kept in a [`LoadReport`]
const MAX_REPORTED_ERRORS: usize = 100;

/// Date formats tried, in order, before keeping a date verbatim
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%Y/%m/%d", "%m/%d/%Y", "%d.%m.%Y", "%d %B %Y"];

const DATETIME_FORMATS: [&str; 3] = ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%SZ"];

/// CSV loader with configurable column mapping
pub struct CsvLoader {
    mapping: ColumnMapping,
    delimiter: u8,
    category_noise: Regex,
}

/// Resolved header positions for one source
struct ColumnIndices {
    country: usize,
    category: usize,
    date: Option<usize>,
}

impl CsvLoader {
    /// Create a loader for the given column layout
    pub fn new(mapping: ColumnMapping) -> DataResult<Self> {
        let category_noise =
            Regex::new(r"[\[\]']+").map_err(|e| DataError::Setup(e.to_string()))?;

        Ok(Self {
            mapping,
            delimiter: b',',
            category_noise,
        })
    }

    /// Set the field delimiter
    pub fn with_delimiter(mut self, delimiter: u8) -> Self {
        self.delimiter = delimiter;
        self
    }

    pub fn mapping(&self) -> &ColumnMapping {
        &self.mapping
    }

    /// Load records from a CSV file
    pub fn load_path(&self, path: &Path) -> DataResult<LoadReport> {
        if !path.exists() {
            return Err(DataError::NotFound(path.to_path_buf()));
        }

        let reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_path(path)?;

        let source_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());

        let report = self.load_reader(reader, &source_name)?;

        tracing::info!(
            source = %source_name,
            records = report.records.len(),
            rows_failed = report.rows_failed,
            "Loaded records"
        );

        Ok(report)
    }

    /// Load records from an in-memory CSV string
    pub fn load_str(&self, csv_data: &str) -> DataResult<LoadReport> {
        let reader = csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .flexible(true)
            .from_reader(csv_data.as_bytes());

        self.load_reader(reader, "<inline>")
    }

    fn load_reader<R: Read>(
        &self,
        mut reader: csv::Reader<R>,
        source_name: &str,
    ) -> DataResult<LoadReport> {
        let headers = reader.headers()?.clone();
        let columns = self.resolve_columns(&headers, source_name)?;

        let mut report = LoadReport::default();

        for (line_num, result) in reader.records().enumerate() {
            // Header is line 1
            let actual_line = line_num + 2;

            let row = match result {
                Ok(r) => r,
                Err(e) => {
                    report.errors.push(format!("Line {}: {}", actual_line, e));
                    report.rows_failed += 1;
                    continue;
                }
            };

            let country = row.get(columns.country).map(str::trim).unwrap_or("");
            if country.is_empty() {
                report
                    .errors
                    .push(format!("Line {}: missing country", actual_line));
                report.rows_failed += 1;
                continue;
            }

            let category = self.clean_category(row.get(columns.category).unwrap_or(""));
            if category.is_empty() {
                report
                    .errors
                    .push(format!("Line {}: missing category", actual_line));
                report.rows_failed += 1;
                continue;
            }

            let date = columns
                .date
                .and_then(|idx| row.get(idx))
                .map(normalize_date)
                .unwrap_or_default();

            report.records.push(Record::new(country, category, date));
            report.rows_processed += 1;
        }

        if report.errors.len() > MAX_REPORTED_ERRORS {
            let total = report.errors.len();
            report.errors.truncate(MAX_REPORTED_ERRORS);
            report
                .errors
                .push(format!("... and {} more errors", total - MAX_REPORTED_ERRORS));
        }

        if !report.is_clean() {
            tracing::warn!(
                source = %source_name,
                rows_failed = report.rows_failed,
                "Skipped malformed rows"
            );
        }

        Ok(report)
    }

    fn resolve_columns(
        &self,
        headers: &csv::StringRecord,
        source_name: &str,
    ) -> DataResult<ColumnIndices> {
        let find = |name: &str| -> DataResult<usize> {
            headers
                .iter()
                .position(|h| h.trim() == name)
                .ok_or_else(|| DataError::MissingColumn {
                    column: name.to_string(),
                    source_name: source_name.to_string(),
                })
        };

        Ok(ColumnIndices {
            country: find(&self.mapping.country)?,
            category: find(&self.mapping.category)?,
            date: self.mapping.date.as_deref().map(find).transpose()?,
        })
    }

    /// Strip list-literal punctuation: `['Swimming']` becomes `Swimming`
    pub fn clean_category(&self, raw: &str) -> String {
        self.category_noise.replace_all(raw, "").trim().to_string()
    }
}

/// Normalise a date cell to `YYYY-MM-DD`, keeping unknown formats verbatim
pub fn normalize_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }

    for fmt in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(raw, fmt) {
            return date.format("%Y-%m-%d").to_string();
        }
    }

    for fmt in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(raw, fmt) {
            return dt.date().format("%Y-%m-%d").to_string();
        }
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.date_naive().format("%Y-%m-%d").to_string();
    }

    raw.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_athletes() {
        let csv_data = "name,country,disciplines
Ana,France,['Judo']
Ben,France,['Swimming']
Cai,China,\"['Diving']\"";

        let loader = CsvLoader::new(ColumnMapping::athletes()).unwrap();
        let report = loader.load_str(csv_data).unwrap();

        assert_eq!(report.rows_processed, 3);
        assert!(report.is_clean());
        assert_eq!(report.records[0], Record::undated("France", "Judo"));
        assert_eq!(report.records[2], Record::undated("China", "Diving"));
    }

    #[test]
    fn test_load_medallists_normalises_dates() {
        let csv_data = "medal_date,country_long,discipline
2024-07-27,Australia,Cycling Road
07/28/2024,China,Diving
2024-07-29T10:00:00,France,Judo
Day one,Japan,Judo";

        let loader = CsvLoader::new(ColumnMapping::medallists()).unwrap();
        let report = loader.load_str(csv_data).unwrap();

        let dates: Vec<&str> = report.records.iter().map(|r| r.date.as_str()).collect();
        assert_eq!(dates, vec!["2024-07-27", "2024-07-28", "2024-07-29", "Day one"]);
    }

    #[test]
    fn test_missing_column_is_load_failure() {
        let csv_data = "country_long,discipline
France,Judo";

        let loader = CsvLoader::new(ColumnMapping::medallists()).unwrap();
        let err = loader.load_str(csv_data).unwrap_err();

        match err {
            DataError::MissingColumn { column, .. } => assert_eq!(column, "medal_date"),
            other => panic!("Expected MissingColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_rows_without_country_are_reported() {
        let csv_data = "country,disciplines
France,['Judo']
,['Rowing']
Italy,";

        let loader = CsvLoader::new(ColumnMapping::athletes()).unwrap();
        let report = loader.load_str(csv_data).unwrap();

        assert_eq!(report.rows_processed, 1);
        assert_eq!(report.rows_failed, 2);
        assert!(report.errors[0].starts_with("Line 3"));
    }

    #[test]
    fn test_load_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("athletes.csv");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "country;disciplines").unwrap();
        writeln!(file, "Kenya;['Athletics']").unwrap();

        let loader = CsvLoader::new(ColumnMapping::athletes())
            .unwrap()
            .with_delimiter(b';');
        let report = loader.load_path(&path).unwrap();

        assert_eq!(report.records, vec![Record::undated("Kenya", "Athletics")]);
    }

    #[test]
    fn test_load_missing_file() {
        let loader = CsvLoader::new(ColumnMapping::athletes()).unwrap();
        let result = loader.load_path(Path::new("/nonexistent/athletes.csv"));
        assert!(matches!(result, Err(DataError::NotFound(_))));
    }

    #[test]
    fn test_clean_category() {
        let loader = CsvLoader::new(ColumnMapping::athletes()).unwrap();
        assert_eq!(loader.clean_category("['Swimming']"), "Swimming");
        assert_eq!(
            loader.clean_category("['Athletics', 'Rowing']"),
            "Athletics, Rowing"
        );
        assert_eq!(loader.clean_category("Fencing"), "Fencing");
    }
}
