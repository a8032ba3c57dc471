//! Knuth–Morris–Pratt matcher

use super::Matcher;

#[derive(Debug, Clone, Copy, Default)]
pub struct Kmp;

impl Kmp {
    /// `fail[i]` = length of the longest proper border of `pattern[..=i]`
    pub fn failure_function(pattern: &[u8]) -> Vec<usize> {
        let mut fail = vec![0; pattern.len()];
        let mut k = 0;
        for i in 1..pattern.len() {
            while k > 0 && pattern[i] != pattern[k] {
                k = fail[k - 1];
            }
            if pattern[i] == pattern[k] {
                k += 1;
            }
            fail[i] = k;
        }
        fail
    }
}

impl Matcher for Kmp {
    fn find_all(&self, text: &[u8], pattern: &[u8]) -> Vec<usize> {
        let m = pattern.len();
        if m == 0 || m > text.len() {
            return Vec::new();
        }

        let fail = Self::failure_function(pattern);
        let mut matches = Vec::new();
        let mut j = 0;

        for (i, &byte) in text.iter().enumerate() {
            while j > 0 && byte != pattern[j] {
                j = fail[j - 1];
            }
            if byte == pattern[j] {
                j += 1;
            }
            if j == m {
                matches.push(i + 1 - m);
                // keep the border so overlapping matches are found
                j = fail[j - 1];
            }
        }
        matches
    }
}
