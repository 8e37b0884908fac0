//! # Medalboard
//!
//! Olympic medal dashboard engine: loads athlete and medal CSV exports,
//! builds the grouped bar and Sankey chart models, and replays the medal
//! race date by date.
//!
//! ## Modules
//!
//! - [`data`]: CSV loading into flat records
//! - [`aggregate`]: Country → category counts, bar and Sankey models
//! - [`replay`]: Cumulative top-K snapshots and the timed replay player
//! - [`selection`]: Country selection events driving the Sankey chart
//! - [`dashboard`]: Wiring of the above into one dashboard
//! - [`api`]: REST API server with Axum
//! - [`websocket`]: Live replay frames and Sankey updates
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use medalboard::data::{ColumnMapping, CsvLoader};
//! use medalboard::replay::{ReplaySequencer, SequencerSettings};
//! use std::path::Path;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let medals = CsvLoader::new(ColumnMapping::medallists())?
//!         .load_path(Path::new("data/medallists.csv"))?;
//!
//!     let sequencer = ReplaySequencer::new(medals.records, SequencerSettings::default());
//!     for snapshot in &sequencer {
//!         if let Some(leader) = snapshot.leader() {
//!             println!("{}: {} leads with {}", snapshot.date, leader.country, leader.total);
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod aggregate;
pub mod api;
pub mod config;
pub mod dashboard;
pub mod data;
pub mod replay;
pub mod selection;
pub mod websocket;

pub use aggregate::{Aggregate, BarChartModel, CountryAggregate, SankeyGraph};
pub use api::{build_router, serve, ApiError, AppState};
pub use config::Config;
pub use dashboard::{Dashboard, DashboardError};
pub use data::{ColumnMapping, CsvLoader, DataError, Record};
pub use replay::{
    FrameSink, ReplayError, ReplayFrame, ReplayPlayer, ReplaySequencer, Snapshot, Standing,
    TieBreak,
};
pub use selection::{SelectedSankey, SelectionBus, SelectionEvent};
pub use websocket::{ConnectionHub, HubConfig};
