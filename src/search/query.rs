//! Merge Search
//!
//! A `mergeSearch` query is a conjunction of text filters and inclusive
//! numeric ranges. Empty filters are wildcards.
//!
//! The pattern path scans the store: a record matches when every text
//! filter occurs (case-insensitively) in its field and every numeric field
//! lies inside its range. Its score is the total number of occurrences.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::record::{NumericField, Record, TextField};
use crate::store::RecordStore;

use super::{PatternMethod, SearchMethod};

/// A `mergeSearch` request in engine terms
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeQuery {
    pub filters: BTreeMap<TextField, String>,
    pub ranges: BTreeMap<NumericField, (f64, f64)>,
    pub method: SearchMethod,
}

/// A matching id and its relevance score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoredId {
    pub id: u32,
    pub score: u64,
}

impl MergeQuery {
    pub fn new(method: SearchMethod) -> Self {
        Self {
            filters: BTreeMap::new(),
            ranges: BTreeMap::new(),
            method,
        }
    }

    /// Add a text filter (empty strings are wildcards)
    pub fn filter(mut self, field: TextField, value: impl Into<String>) -> Self {
        self.filters.insert(field, value.into());
        self
    }

    /// Add an inclusive numeric range
    pub fn range(mut self, field: NumericField, min: f64, max: f64) -> Self {
        self.ranges.insert(field, (min, max));
        self
    }

    /// Text filters that actually constrain the result
    pub fn active_filters(&self) -> impl Iterator<Item = (TextField, &str)> + '_ {
        self.filters
            .iter()
            .map(|(f, v)| (*f, v.trim()))
            .filter(|(_, v)| !v.is_empty())
    }

    /// True if `record` satisfies every numeric range
    pub fn in_ranges(&self, record: &Record) -> bool {
        self.ranges
            .iter()
            .all(|(field, &(min, max))| within(record.numeric(*field), min, max))
    }
}

/// Inclusive on both bounds
pub fn within(value: f64, min: f64, max: f64) -> bool {
    min <= value && value <= max
}

/// Evaluate the pattern path of a query over every live record
pub fn scan(store: &RecordStore, query: &MergeQuery, method: PatternMethod) -> Vec<ScoredId> {
    let needles: Vec<(TextField, String)> = query
        .active_filters()
        .map(|(field, value)| (field, value.to_lowercase()))
        .collect();

    let mut hits: Vec<ScoredId> = store
        .records()
        .filter(|record| query.in_ranges(record))
        .filter_map(|record| {
            let mut score = 0u64;
            for (field, needle) in &needles {
                let found: usize = record
                    .text(*field)
                    .into_iter()
                    .map(|value| {
                        method
                            .find_all(value.to_lowercase().as_bytes(), needle.as_bytes())
                            .len()
                    })
                    .sum();
                if found == 0 {
                    return None;
                }
                score += found as u64;
            }
            Some(ScoredId {
                id: record.id,
                score,
            })
        })
        .collect();

    rank(&mut hits);
    hits
}

/// Order by score descending, then id ascending
pub fn rank(hits: &mut [ScoredId]) {
    hits.sort_by(|a, b| b.score.cmp(&a.score).then(a.id.cmp(&b.id)));
}
