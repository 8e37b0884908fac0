//! Aggregation
//!
//! Grouped counts and the chart models derived from them:
//!
//! - **grouping**: country → category counts in first-encounter order
//! - **bar**: grouped bar chart with pinned ordering and value domain
//! - **sankey**: country → category flow graph

pub mod bar;
pub mod grouping;
pub mod sankey;

pub use bar::{BarChartModel, BarGroup};
pub use grouping::{Aggregate, AggregateEntry, CategoryCount, CategoryShare, CountryAggregate};
pub use sankey::{SankeyGraph, SankeyLink, SankeyNode};
