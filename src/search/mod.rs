//! Search Module
//!
//! Substring search algorithms and the `mergeSearch` query evaluator.
//!
//! ## Matcher Contract
//! ```text
//! find_all(text, pattern) -> [offset, ...]   ascending, overlapping
//!
//!   text    = "aaaa"
//!   pattern = "aa"     →  [0, 1, 2]
//!   pattern = ""       →  []
//!   pattern longer     →  []
//! ```
//!
//! Every matcher works on raw bytes and must return identical offsets for
//! identical inputs. Case folding is the caller's job.

mod kmp;
mod naive;
mod rabin_karp;
pub mod query;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::PokedexError;

pub use kmp::Kmp;
pub use naive::Naive;
pub use query::{MergeQuery, ScoredId};
pub use rabin_karp::RabinKarp;

/// Substring search over bytes
pub trait Matcher {
    /// Start offsets of every (possibly overlapping) occurrence of `pattern`
    fn find_all(&self, text: &[u8], pattern: &[u8]) -> Vec<usize>;

    /// Number of occurrences
    fn count(&self, text: &[u8], pattern: &[u8]) -> usize {
        self.find_all(text, pattern).len()
    }
}

/// Which substring algorithm to run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PatternMethod {
    Naive,
    Kmp,
    RabinKarp,
}

impl PatternMethod {
    pub const ALL: [PatternMethod; 3] =
        [PatternMethod::Naive, PatternMethod::Kmp, PatternMethod::RabinKarp];

    /// Run this algorithm with its default parameters
    pub fn find_all(self, text: &[u8], pattern: &[u8]) -> Vec<usize> {
        match self {
            PatternMethod::Naive => Naive.find_all(text, pattern),
            PatternMethod::Kmp => Kmp.find_all(text, pattern),
            PatternMethod::RabinKarp => RabinKarp::default().find_all(text, pattern),
        }
    }
}

/// `mergeSearch` strategy as sent by the frontend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SearchMethod {
    Inverted,
    Pattern(PatternMethod),
}

impl TryFrom<i64> for SearchMethod {
    type Error = PokedexError;

    fn try_from(code: i64) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(SearchMethod::Inverted),
            1 => Ok(SearchMethod::Pattern(PatternMethod::Naive)),
            2 => Ok(SearchMethod::Pattern(PatternMethod::Kmp)),
            3 => Ok(SearchMethod::Pattern(PatternMethod::RabinKarp)),
            _ => Err(PokedexError::InvalidMethod {
                what: "search",
                code,
            }),
        }
    }
}

impl fmt::Display for PatternMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PatternMethod::Naive => "naive",
            PatternMethod::Kmp => "kmp",
            PatternMethod::RabinKarp => "rabin-karp",
        };
        f.write_str(name)
    }
}

impl fmt::Display for SearchMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMethod::Inverted => f.write_str("inverted-index"),
            SearchMethod::Pattern(p) => p.fmt(f),
        }
    }
}
