//! Ranked snapshots of cumulative totals

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

/// How equal totals are ordered in a ranking
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TieBreak {
    /// Keep the order in which countries first appear in the scan
    #[default]
    FirstSeen,
    /// Country name ascending
    CountryName,
}

impl std::str::FromStr for TieBreak {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "first_seen" => Ok(TieBreak::FirstSeen),
            "country_name" | "name" => Ok(TieBreak::CountryName),
            other => Err(format!("Unknown tie-break rule: {}", other)),
        }
    }
}

/// A country's total at some point of the replay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Standing {
    pub country: String,
    pub total: u64,
}

impl Standing {
    pub fn new(country: impl Into<String>, total: u64) -> Self {
        Self {
            country: country.into(),
            total,
        }
    }
}

/// Top-K standings at one replay date
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Position of `date` among the sorted distinct dates
    pub index: usize,
    pub date: String,
    pub standings: Vec<Standing>,
}

impl Snapshot {
    pub fn leader(&self) -> Option<&Standing> {
        self.standings.first()
    }

    /// Largest total shown, used as the value-axis domain
    pub fn max_total(&self) -> u64 {
        self.standings.iter().map(|s| s.total).max().unwrap_or(0)
    }
}

/// Sort standings by total descending and keep the first `limit`
///
/// `standings` must arrive in first-seen order; the sort is stable so
/// `TieBreak::FirstSeen` preserves it.
pub fn rank(mut standings: Vec<Standing>, tie_break: TieBreak, limit: usize) -> Vec<Standing> {
    standings.sort_by(|a, b| {
        b.total.cmp(&a.total).then_with(|| match tie_break {
            TieBreak::FirstSeen => Ordering::Equal,
            TieBreak::CountryName => a.country.cmp(&b.country),
        })
    });
    standings.truncate(limit);
    standings
}
