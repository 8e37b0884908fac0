//! Country/category grouping
//!
//! Single-pass count of records by country and then by category. Both
//! levels keep first-encounter order so the output is deterministic for
//! a given input order.

use crate::data::Record;
use serde::Serialize;
use std::collections::HashMap;

/// One grouped count: how many records share a country and category
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AggregateEntry {
    pub country: String,
    pub category: String,
    pub count: u64,
}

/// Count of records for one category within a country
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryCount {
    pub category: String,
    pub count: u64,
}

/// A category count with its share of the country total
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryShare {
    pub category: String,
    pub count: u64,
    /// Percentage of the country total, rounded to two decimals
    pub percent: f64,
}

/// All categories observed for one country
#[derive(Debug, Clone, Serialize)]
pub struct CountryAggregate {
    pub country: String,
    pub categories: Vec<CategoryCount>,
    pub total: u64,
    #[serde(skip)]
    category_index: HashMap<String, usize>,
}

impl CountryAggregate {
    fn new(country: &str) -> Self {
        Self {
            country: country.to_string(),
            categories: Vec::new(),
            total: 0,
            category_index: HashMap::new(),
        }
    }

    fn add(&mut self, category: &str) {
        match self.category_index.get(category) {
            Some(&idx) => self.categories[idx].count += 1,
            None => {
                self.category_index
                    .insert(category.to_string(), self.categories.len());
                self.categories.push(CategoryCount {
                    category: category.to_string(),
                    count: 1,
                });
            }
        }
        self.total += 1;
    }

    /// Count for a single category, zero when absent
    pub fn count_for(&self, category: &str) -> u64 {
        self.category_index
            .get(category)
            .map(|&idx| self.categories[idx].count)
            .unwrap_or(0)
    }

    /// Flattened entries for this country
    pub fn entries(&self) -> impl Iterator<Item = AggregateEntry> + '_ {
        self.categories.iter().map(move |c| AggregateEntry {
            country: self.country.clone(),
            category: c.category.clone(),
            count: c.count,
        })
    }

    /// Per-category share of the country total
    pub fn breakdown(&self) -> Vec<CategoryShare> {
        self.categories
            .iter()
            .map(|c| {
                let percent = if self.total == 0 {
                    0.0
                } else {
                    (c.count as f64 / self.total as f64 * 10_000.0).round() / 100.0
                };
                CategoryShare {
                    category: c.category.clone(),
                    count: c.count,
                    percent,
                }
            })
            .collect()
    }
}

/// Records grouped by country, then category
#[derive(Debug, Clone, Default, Serialize)]
pub struct Aggregate {
    countries: Vec<CountryAggregate>,
    #[serde(skip)]
    index: HashMap<String, usize>,
}

impl Aggregate {
    /// Group records in one pass
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a Record>,
    {
        let mut aggregate = Self::default();

        for record in records {
            let idx = match aggregate.index.get(&record.country) {
                Some(&idx) => idx,
                None => {
                    let idx = aggregate.countries.len();
                    aggregate.index.insert(record.country.clone(), idx);
                    aggregate.countries.push(CountryAggregate::new(&record.country));
                    idx
                }
            };
            // A blank category registers the country without a group
            if !record.category.trim().is_empty() {
                aggregate.countries[idx].add(&record.category);
            }
        }

        tracing::debug!(
            countries = aggregate.countries.len(),
            records = aggregate.total_records(),
            "Aggregated records"
        );

        aggregate
    }

    pub fn get(&self, country: &str) -> Option<&CountryAggregate> {
        self.index.get(country).map(|&idx| &self.countries[idx])
    }

    pub fn contains(&self, country: &str) -> bool {
        self.index.contains_key(country)
    }

    /// Countries in first-encounter order
    pub fn countries(&self) -> &[CountryAggregate] {
        &self.countries
    }

    pub fn entries(&self) -> impl Iterator<Item = AggregateEntry> + '_ {
        self.countries.iter().flat_map(|c| c.entries())
    }

    pub fn len(&self) -> usize {
        self.countries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.countries.is_empty()
    }

    pub fn total_records(&self) -> u64 {
        self.countries.iter().map(|c| c.total).sum()
    }
}
