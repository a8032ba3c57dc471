//! Inverted Index
//!
//! ```text
//! text:    field → token → { id → term frequency }
//! numeric: field → ⌊value / width⌋ → { id → exact value }
//! docs:    id → (address, what was indexed for it)
//! ```
//!
//! Query semantics:
//! - tokens of one text filter are OR-ed, their frequencies summed
//! - separate filters and ranges are AND-ed
//! - an empty filter is a wildcard
//! - ranges are inclusive on both bounds and checked on exact values;
//!   buckets only narrow the scan

use std::collections::{BTreeMap, HashMap};

use unicode_segmentation::UnicodeSegmentation;

use crate::record::{NumericField, Record, TextField};
use crate::search::query::{rank, within};
use crate::search::{MergeQuery, ScoredId};
use crate::store::Address;

use super::KeyIndex;

type Postings = BTreeMap<u32, u32>;

#[derive(Debug, Clone, Default)]
struct DocEntry {
    addr: Address,
    tokens: Vec<(TextField, String)>,
    buckets: Vec<(NumericField, i64)>,
}

#[derive(Debug, Clone)]
pub struct InvertedIndex {
    text: HashMap<TextField, HashMap<String, Postings>>,
    numeric: HashMap<NumericField, BTreeMap<i64, BTreeMap<u32, f64>>>,
    docs: BTreeMap<u32, DocEntry>,
    bucket_width: f64,
}

/// Lower-cased Unicode words of `text`
pub fn tokenize(text: &str) -> Vec<String> {
    text.unicode_words().map(str::to_lowercase).collect()
}

impl InvertedIndex {
    pub fn new(bucket_width: u32) -> Self {
        Self {
            text: HashMap::new(),
            numeric: HashMap::new(),
            docs: BTreeMap::new(),
            bucket_width: bucket_width.max(1) as f64,
        }
    }

    fn bucket(&self, value: f64) -> i64 {
        // `as` saturates for infinities
        (value / self.bucket_width).floor() as i64
    }

    /// Index every searchable field of `record`
    pub fn insert_record(&mut self, record: &Record, addr: Address) {
        self.remove(record.id);

        let mut doc = DocEntry {
            addr,
            ..DocEntry::default()
        };
        for field in TextField::ALL {
            for value in record.text(field) {
                for token in tokenize(value) {
                    *self
                        .text
                        .entry(field)
                        .or_default()
                        .entry(token.clone())
                        .or_default()
                        .entry(record.id)
                        .or_insert(0) += 1;
                    doc.tokens.push((field, token));
                }
            }
        }
        for field in NumericField::ALL {
            let value = record.numeric(field);
            let bucket = self.bucket(value);
            self.numeric
                .entry(field)
                .or_default()
                .entry(bucket)
                .or_default()
                .insert(record.id, value);
            doc.buckets.push((field, bucket));
        }
        doc.tokens.sort();
        doc.tokens.dedup();
        self.docs.insert(record.id, doc);
    }

    /// Number of distinct tokens indexed for `field`
    pub fn vocabulary(&self, field: TextField) -> usize {
        self.text.get(&field).map_or(0, HashMap::len)
    }

    /// Postings of a token, ascending by id
    pub fn postings(&self, field: TextField, token: &str) -> Vec<(u32, u32)> {
        self.text
            .get(&field)
            .and_then(|t| t.get(&token.to_lowercase()))
            .map(|p| p.iter().map(|(&id, &f)| (id, f)).collect())
            .unwrap_or_default()
    }

    /// Evaluate a merge query; results ranked by score, then id
    pub fn query(&self, query: &MergeQuery) -> Vec<ScoredId> {
        let mut candidates: Option<HashMap<u32, u64>> = None;

        for (field, value) in query.active_filters() {
            let mut tokens = tokenize(value);
            tokens.sort();
            tokens.dedup();
            if tokens.is_empty() {
                continue;
            }
            let mut union: HashMap<u32, u64> = HashMap::new();
            if let Some(vocab) = self.text.get(&field) {
                for token in &tokens {
                    for (&id, &freq) in vocab.get(token).into_iter().flatten() {
                        *union.entry(id).or_insert(0) += freq as u64;
                    }
                }
            }
            candidates = Some(intersect(candidates, union));
        }

        for (&field, &(min, max)) in &query.ranges {
            let mut hits: HashMap<u32, u64> = HashMap::new();
            if min <= max {
                let (lo, hi) = (self.bucket(min), self.bucket(max));
                if let Some(buckets) = self.numeric.get(&field) {
                    for (_, members) in buckets.range(lo..=hi) {
                        for (&id, &value) in members {
                            if within(value, min, max) {
                                hits.insert(id, 0);
                            }
                        }
                    }
                }
            }
            candidates = Some(intersect(candidates, hits));
        }

        let scores = candidates
            .unwrap_or_else(|| self.docs.keys().map(|&id| (id, 0)).collect());
        let mut hits: Vec<ScoredId> = scores
            .into_iter()
            .map(|(id, score)| ScoredId { id, score })
            .collect();
        rank(&mut hits);
        hits
    }
}

fn intersect(acc: Option<HashMap<u32, u64>>, next: HashMap<u32, u64>) -> HashMap<u32, u64> {
    match acc {
        None => next,
        Some(acc) => acc
            .into_iter()
            .filter_map(|(id, score)| next.get(&id).map(|extra| (id, score + extra)))
            .collect(),
    }
}

impl KeyIndex for InvertedIndex {
    /// Re-address a known document (tokens are only indexed by `insert_record`)
    fn insert(&mut self, id: u32, addr: Address) {
        self.docs.entry(id).or_default().addr = addr;
    }

    fn remove(&mut self, id: u32) -> Option<Address> {
        let doc = self.docs.remove(&id)?;
        for (field, token) in &doc.tokens {
            if let Some(vocab) = self.text.get_mut(field) {
                if let Some(postings) = vocab.get_mut(token) {
                    postings.remove(&id);
                    if postings.is_empty() {
                        vocab.remove(token);
                    }
                }
            }
        }
        for (field, bucket) in &doc.buckets {
            if let Some(buckets) = self.numeric.get_mut(field) {
                if let Some(members) = buckets.get_mut(bucket) {
                    members.remove(&id);
                    if members.is_empty() {
                        buckets.remove(bucket);
                    }
                }
            }
        }
        Some(doc.addr)
    }

    fn get(&self, id: u32) -> Option<Address> {
        self.docs.get(&id).map(|d| d.addr)
    }

    fn range(&self, lo: u32, hi: u32) -> Vec<(u32, Address)> {
        if lo > hi {
            return Vec::new();
        }
        self.docs
            .range(lo..=hi)
            .map(|(&id, d)| (id, d.addr))
            .collect()
    }

    fn len(&self) -> usize {
        self.docs.len()
    }
}
