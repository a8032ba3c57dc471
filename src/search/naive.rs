//! Brute-force matcher, O(n·m). Used as the reference the others must agree with.

use super::Matcher;

#[derive(Debug, Clone, Copy, Default)]
pub struct Naive;

impl Matcher for Naive {
    fn find_all(&self, text: &[u8], pattern: &[u8]) -> Vec<usize> {
        if pattern.is_empty() || pattern.len() > text.len() {
            return Vec::new();
        }
        (0..=text.len() - pattern.len())
            .filter(|&i| &text[i..i + pattern.len()] == pattern)
            .collect()
    }
}
