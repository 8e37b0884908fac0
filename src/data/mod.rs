//! Dashboard Data Sources
//!
//! Loading of the delimited source files feeding every chart:
//!
//! - **types**: `Record`, `ColumnMapping`, `LoadReport`
//! - **loader**: header-mapped CSV reader with label and date cleanup
//! - **error**: load failure types
//!
//! # Example
//!
//! ```rust,no_run
//! use medalboard::data::{ColumnMapping, CsvLoader};
//! use std::path::Path;
//!
//! let loader = CsvLoader::new(ColumnMapping::medallists())?;
//! let report = loader.load_path(Path::new("data/medallists.csv"))?;
//! println!("{} medals loaded", report.records.len());
//! # Ok::<(), medalboard::data::DataError>(())
//! ```

pub mod error;
pub mod loader;
pub mod types;

pub use error::{DataError, DataResult};
pub use loader::{normalize_date, CsvLoader};
pub use types::{ColumnMapping, LoadReport, Record};
