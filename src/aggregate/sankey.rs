//! Sankey graph model
//!
//! Links a country node to one node per category, weighted by count.
//! Nodes are deduplicated by name; links between the same pair of nodes
//! are merged by summing their values.

use super::grouping::Aggregate;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SankeyNode {
    pub name: String,
}

/// Directed flow between two node indices
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SankeyLink {
    pub source: usize,
    pub target: usize,
    pub value: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SankeyGraph {
    pub nodes: Vec<SankeyNode>,
    pub links: Vec<SankeyLink>,
}

impl SankeyGraph {
    /// Graph for a single country, `None` when the country has no records
    pub fn for_country(aggregate: &Aggregate, country: &str) -> Option<Self> {
        if !aggregate.contains(country) {
            return None;
        }
        Some(Self::for_countries(aggregate, &[country]))
    }

    /// Graph for several countries sharing category nodes
    ///
    /// Countries missing from the aggregate are skipped with a warning.
    pub fn for_countries(aggregate: &Aggregate, countries: &[&str]) -> Self {
        let mut graph = Self::default();

        for &country in countries {
            let Some(data) = aggregate.get(country) else {
                tracing::warn!(country = %country, "No data found for country");
                continue;
            };

            let source = graph.node_index(country);
            if data.categories.is_empty() {
                tracing::debug!(country = %country, "Country has no categories");
            }

            for category in &data.categories {
                let target = graph.node_index(&category.category);
                graph.add_flow(source, target, category.count);
            }
        }

        graph.links.retain(|l| l.value > 0);
        graph
    }

    fn node_index(&mut self, name: &str) -> usize {
        match self.nodes.iter().position(|n| n.name == name) {
            Some(idx) => idx,
            None => {
                self.nodes.push(SankeyNode {
                    name: name.to_string(),
                });
                self.nodes.len() - 1
            }
        }
    }

    fn add_flow(&mut self, source: usize, target: usize, value: u64) {
        match self
            .links
            .iter_mut()
            .find(|l| l.source == source && l.target == target)
        {
            Some(link) => link.value += value,
            None => self.links.push(SankeyLink {
                source,
                target,
                value,
            }),
        }
    }

    /// Sum of all link values
    pub fn total_flow(&self) -> u64 {
        self.links.iter().map(|l| l.value).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}
