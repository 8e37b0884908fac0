//! Cumulative medal scan
//!
//! A forward pass over records in encounter order. Every record bumps its
//! country's running total and leaves one observation behind, tagged with
//! the record's date. Records are not date-sorted first.

use super::snapshot::Standing;
use crate::data::Record;
use serde::Serialize;
use std::collections::HashMap;

/// Running total of one country right after one record was counted
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CumulativeObservation {
    pub date: String,
    pub country: String,
    pub running_total: u64,
}

/// Final count per country, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FinalTotals {
    totals: Vec<Standing>,
    index: HashMap<String, usize>,
}

impl FinalTotals {
    pub fn get(&self, country: &str) -> Option<u64> {
        self.index.get(country).map(|&idx| self.totals[idx].total)
    }

    /// Totals in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = &Standing> {
        self.totals.iter()
    }

    pub fn len(&self) -> usize {
        self.totals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.totals.is_empty()
    }

    pub fn into_standings(self) -> Vec<Standing> {
        self.totals
    }
}

/// Output of one scan
#[derive(Debug, Clone, Default)]
pub struct CumulativeScan {
    pub observations: Vec<CumulativeObservation>,
    pub final_totals: FinalTotals,
}

/// Count records per country, emitting one observation per record
pub fn scan(records: &[Record]) -> CumulativeScan {
    let mut totals = FinalTotals::default();
    let mut observations = Vec::with_capacity(records.len());

    for record in records {
        let idx = match totals.index.get(&record.country) {
            Some(&idx) => idx,
            None => {
                let idx = totals.totals.len();
                totals.index.insert(record.country.clone(), idx);
                totals.totals.push(Standing::new(&record.country, 0));
                idx
            }
        };

        let standing = &mut totals.totals[idx];
        standing.total += 1;

        observations.push(CumulativeObservation {
            date: record.date.clone(),
            country: record.country.clone(),
            running_total: standing.total,
        });
    }

    CumulativeScan {
        observations,
        final_totals: totals,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_running_totals() {
        let records = vec![
            Record::new("US", "Swimming", "2024-07-28"),
            Record::new("FR", "Judo", "2024-07-27"),
            Record::new("US", "Athletics", "2024-07-27"),
        ];

        let scan = scan(&records);

        let totals: Vec<(&str, u64)> = scan
            .observations
            .iter()
            .map(|o| (o.country.as_str(), o.running_total))
            .collect();
        assert_eq!(totals, vec![("US", 1), ("FR", 1), ("US", 2)]);
        assert_eq!(scan.observations[2].date, "2024-07-27");

        assert_eq!(scan.final_totals.get("US"), Some(2));
        assert_eq!(scan.final_totals.get("FR"), Some(1));
        assert_eq!(scan.final_totals.get("JP"), None);
    }

    #[test]
    fn test_running_totals_never_decrease() {
        let countries = ["A", "B", "A", "C", "B", "A", "C", "C"];
        let records: Vec<Record> = countries
            .iter()
            .enumerate()
            .map(|(i, c)| Record::new(*c, "x", format!("d{}", i % 3)))
            .collect();

        let scan = scan(&records);

        let mut last: HashMap<&str, u64> = HashMap::new();
        for obs in &scan.observations {
            let prev = last.insert(obs.country.as_str(), obs.running_total).unwrap_or(0);
            assert!(obs.running_total >= prev);
        }
    }

    #[test]
    fn test_final_totals_match_aggregate() {
        let records = vec![
            Record::new("US", "Swimming", "d1"),
            Record::new("US", "Swimming", "d2"),
            Record::new("US", "Rowing", "d2"),
            Record::new("FR", "Judo", "d1"),
        ];

        let aggregate = crate::aggregate::Aggregate::from_records(&records);
        let totals = scan(&records).final_totals;

        for country in aggregate.countries() {
            let summed: u64 = country.entries().map(|e| e.count).sum();
            assert_eq!(totals.get(&country.country), Some(summed));
        }
        assert_eq!(totals.len(), aggregate.len());
    }

    #[test]
    fn test_empty_scan() {
        let scan = scan(&[]);
        assert!(scan.observations.is_empty());
        assert!(scan.final_totals.is_empty());
    }
}
