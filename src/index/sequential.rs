//! Sequential index: (id, address) pairs in store order, searched linearly.
//! O(n) per key; every other kind is checked against it.

use crate::store::Address;

use super::KeyIndex;

#[derive(Debug, Clone, Default)]
pub struct SequentialIndex {
    entries: Vec<(u32, Address)>,
}

impl SequentialIndex {
    pub fn new() -> Self {
        Self::default()
    }

    fn position(&self, id: u32) -> Option<usize> {
        self.entries.iter().position(|&(k, _)| k == id)
    }
}

impl KeyIndex for SequentialIndex {
    fn insert(&mut self, id: u32, addr: Address) {
        match self.position(id) {
            Some(pos) => self.entries[pos].1 = addr,
            None => self.entries.push((id, addr)),
        }
    }

    fn remove(&mut self, id: u32) -> Option<Address> {
        let pos = self.position(id)?;
        Some(self.entries.remove(pos).1)
    }

    fn get(&self, id: u32) -> Option<Address> {
        self.entries.iter().find(|&&(k, _)| k == id).map(|&(_, a)| a)
    }

    fn range(&self, lo: u32, hi: u32) -> Vec<(u32, Address)> {
        let mut hits: Vec<_> = self
            .entries
            .iter()
            .copied()
            .filter(|&(k, _)| lo <= k && k <= hi)
            .collect();
        hits.sort_unstable_by_key(|&(k, _)| k);
        hits
    }

    fn len(&self) -> usize {
        self.entries.len()
    }
}
