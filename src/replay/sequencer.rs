//! Replay Sequencer
//!
//! Turns dated records into a lazy, date-ordered sequence of top-K
//! snapshots. Each call to [`ReplaySequencer::iter`] re-runs the
//! cumulative scan, so a restarted replay never sees totals left over
//! from an earlier run.

use super::cumulative::{self, CumulativeObservation, FinalTotals};
use super::snapshot::{rank, Snapshot, Standing, TieBreak};
use crate::data::Record;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

/// Default number of countries per snapshot
pub const DEFAULT_TOP_K: usize = 10;

/// Ranking settings for a sequencer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencerSettings {
    pub top_k: usize,
    pub tie_break: TieBreak,
}

impl Default for SequencerSettings {
    fn default() -> Self {
        Self {
            top_k: DEFAULT_TOP_K,
            tie_break: TieBreak::default(),
        }
    }
}

/// Source of replay snapshots over a fixed record set
#[derive(Debug, Clone)]
pub struct ReplaySequencer {
    records: Arc<[Record]>,
    dates: Arc<[String]>,
    settings: SequencerSettings,
}

impl ReplaySequencer {
    pub fn new(records: impl Into<Arc<[Record]>>, settings: SequencerSettings) -> Self {
        let records: Arc<[Record]> = records.into();

        let dates: BTreeSet<&str> = records.iter().map(|r| r.date.as_str()).collect();
        let dates: Arc<[String]> = dates.into_iter().map(str::to_string).collect();

        tracing::debug!(
            records = records.len(),
            dates = dates.len(),
            top_k = settings.top_k,
            "Built replay sequencer"
        );

        Self {
            records,
            dates,
            settings,
        }
    }

    /// Distinct dates, ascending
    pub fn dates(&self) -> &[String] {
        &self.dates
    }

    /// Number of snapshots a full replay yields
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn settings(&self) -> SequencerSettings {
        self.settings
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// Start a fresh pass over the snapshots
    pub fn iter(&self) -> Snapshots {
        let scan = cumulative::scan(&self.records);
        Snapshots {
            observations: scan.observations,
            dates: Arc::clone(&self.dates),
            settings: self.settings,
            position: 0,
        }
    }

    pub fn final_totals(&self) -> FinalTotals {
        cumulative::scan(&self.records).final_totals
    }

    /// Every country ranked by final total, untruncated
    pub fn final_table(&self) -> Vec<Standing> {
        let totals = self.final_totals();
        let len = totals.len();
        rank(totals.into_standings(), self.settings.tie_break, len)
    }
}

impl<'a> IntoIterator for &'a ReplaySequencer {
    type Item = Snapshot;
    type IntoIter = Snapshots;

    fn into_iter(self) -> Snapshots {
        self.iter()
    }
}

/// Lazy snapshot iterator produced by [`ReplaySequencer::iter`]
#[derive(Debug)]
pub struct Snapshots {
    observations: Vec<CumulativeObservation>,
    dates: Arc<[String]>,
    settings: SequencerSettings,
    position: usize,
}

impl Snapshots {
    /// Highest running total per country among observations dated at or
    /// before `date`, in first-seen order within that window
    fn standings_at(&self, date: &str) -> Vec<Standing> {
        let mut standings: Vec<Standing> = Vec::new();
        let mut index: HashMap<&str, usize> = HashMap::new();

        for obs in self.observations.iter().filter(|o| o.date.as_str() <= date) {
            match index.get(obs.country.as_str()) {
                Some(&idx) => {
                    let standing = &mut standings[idx];
                    standing.total = standing.total.max(obs.running_total);
                }
                None => {
                    index.insert(obs.country.as_str(), standings.len());
                    standings.push(Standing::new(&obs.country, obs.running_total));
                }
            }
        }

        standings
    }
}

impl Iterator for Snapshots {
    type Item = Snapshot;

    fn next(&mut self) -> Option<Snapshot> {
        let date = self.dates.get(self.position)?.clone();
        let standings = rank(
            self.standings_at(&date),
            self.settings.tie_break,
            self.settings.top_k,
        );

        let snapshot = Snapshot {
            index: self.position,
            date,
            standings,
        };
        self.position += 1;
        Some(snapshot)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.dates.len().saturating_sub(self.position);
        (remaining, Some(remaining))
    }
}

impl ExactSizeIterator for Snapshots {}
