//! Grouped bar chart model
//!
//! One group per country, one bar per category. The renderer gets the
//! group order and the scale domains; layout stays on its side.

use super::grouping::{Aggregate, CategoryCount};
use serde::Serialize;

/// Headroom added above the tallest bar
const Y_HEADROOM: f64 = 0.1;

/// Bars for one country
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarGroup {
    pub country: String,
    pub bars: Vec<CategoryCount>,
    pub total: u64,
}

/// Data for the athletes-per-country-per-discipline chart
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BarChartModel {
    pub groups: Vec<BarGroup>,
    /// Widest group, in bars
    pub max_categories: usize,
    /// Tallest single bar
    pub max_count: u64,
}

impl BarChartModel {
    /// Build the chart with `pinned` first and the other countries by name
    pub fn build(aggregate: &Aggregate, pinned: Option<&str>) -> Self {
        let mut groups: Vec<BarGroup> = aggregate
            .countries()
            .iter()
            .map(|c| BarGroup {
                country: c.country.clone(),
                bars: c.categories.clone(),
                total: c.total,
            })
            .collect();

        groups.sort_by(|a, b| {
            let a_pinned = pinned == Some(a.country.as_str());
            let b_pinned = pinned == Some(b.country.as_str());
            b_pinned
                .cmp(&a_pinned)
                .then_with(|| a.country.cmp(&b.country))
        });

        let max_categories = groups.iter().map(|g| g.bars.len()).max().unwrap_or(0);
        let max_count = groups
            .iter()
            .flat_map(|g| g.bars.iter().map(|b| b.count))
            .max()
            .unwrap_or(0);

        Self {
            groups,
            max_categories,
            max_count,
        }
    }

    /// Upper bound of the value axis
    pub fn y_domain_max(&self) -> f64 {
        self.max_count as f64 * (1.0 + Y_HEADROOM)
    }

    pub fn countries(&self) -> impl Iterator<Item = &str> {
        self.groups.iter().map(|g| g.country.as_str())
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
