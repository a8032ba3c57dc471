//! Rabin–Karp matcher
//!
//! Rolling polynomial hash mod a prime. A hash hit is only reported after
//! the window is compared byte-for-byte, so collisions never leak out.

use super::Matcher;

/// Default radix (one above the byte alphabet)
pub const DEFAULT_BASE: u32 = 257;

/// Default modulus (large prime below 2^31)
pub const DEFAULT_MODULUS: u32 = 1_000_000_007;

#[derive(Debug, Clone, Copy)]
pub struct RabinKarp {
    base: u64,
    modulus: u64,
}

impl Default for RabinKarp {
    fn default() -> Self {
        Self::with_params(DEFAULT_BASE, DEFAULT_MODULUS)
    }
}

impl RabinKarp {
    /// Matcher with a custom radix and modulus
    ///
    /// Small moduli are legal and produce many collisions; results stay
    /// exact because every hit is verified.
    pub fn with_params(base: u32, modulus: u32) -> Self {
        let modulus = modulus.max(2) as u64;
        Self {
            base: base as u64 % modulus,
            modulus,
        }
    }

    fn hash(&self, bytes: &[u8]) -> u64 {
        bytes
            .iter()
            .fold(0, |h, &b| (h * self.base + b as u64) % self.modulus)
    }
}

impl Matcher for RabinKarp {
    fn find_all(&self, text: &[u8], pattern: &[u8]) -> Vec<usize> {
        let (n, m) = (text.len(), pattern.len());
        if m == 0 || m > n {
            return Vec::new();
        }

        let q = self.modulus;
        // weight of the byte leaving the window: base^(m-1) mod q
        let lead = (1..m).fold(1, |h, _| (h * self.base) % q);

        let target = self.hash(pattern);
        let mut window = self.hash(&text[..m]);
        let mut matches = Vec::new();

        for i in 0..=n - m {
            if window == target && &text[i..i + m] == pattern {
                matches.push(i);
            }
            if i + m < n {
                let out = (text[i] as u64 * lead) % q;
                window = ((window + q - out) * self.base + text[i + m] as u64) % q;
            }
        }
        matches
    }
}
