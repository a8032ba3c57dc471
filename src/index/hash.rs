//! Extendible Hashing
//!
//! ```text
//!  global depth = 2
//!  directory          buckets
//!  ┌────┐
//!  │ 00 │──────────▶ [local 1 | e e e]
//!  │ 01 │──────┐
//!  │ 10 │──────┼───▶ (00 shares the local-1 bucket above)
//!  │ 11 │──┐   └───▶ [local 2 | e e  ]
//!  └────┘  └───────▶ [local 2 | e    ]
//! ```
//!
//! A directory slot is chosen by the low `global_depth` bits of the hash.
//! A full bucket splits on its next bit; the directory doubles first when
//! the bucket's local depth already equals the global depth. Buckets are
//! not coalesced on delete.

use crate::store::Address;

use super::KeyIndex;

#[derive(Debug, Clone)]
struct Bucket {
    local_depth: u32,
    entries: Vec<(u32, Address)>,
}

#[derive(Debug, Clone)]
pub struct ExtendibleHash {
    global_depth: u32,
    directory: Vec<usize>,
    buckets: Vec<Bucket>,
    capacity: usize,
    len: usize,
}

/// Bijective 32-bit mixer, so distinct ids always separate eventually
fn hash(id: u32) -> u32 {
    let mut h = id;
    h ^= h >> 16;
    h = h.wrapping_mul(0x85eb_ca6b);
    h ^= h >> 13;
    h = h.wrapping_mul(0xc2b2_ae35);
    h ^= h >> 16;
    h
}

impl ExtendibleHash {
    pub fn new(bucket_capacity: usize) -> Self {
        Self {
            global_depth: 0,
            directory: vec![0],
            buckets: vec![Bucket {
                local_depth: 0,
                entries: Vec::new(),
            }],
            capacity: bucket_capacity.max(1),
            len: 0,
        }
    }

    pub fn global_depth(&self) -> u32 {
        self.global_depth
    }

    pub fn bucket_count(&self) -> usize {
        self.buckets.len()
    }

    pub fn directory_len(&self) -> usize {
        self.directory.len()
    }

    fn slot(&self, id: u32) -> usize {
        let mask = (1u64 << self.global_depth) - 1;
        (hash(id) as u64 & mask) as usize
    }

    fn bucket_of(&self, id: u32) -> usize {
        self.directory[self.slot(id)]
    }

    fn split(&mut self, b: usize) {
        let depth = self.buckets[b].local_depth;
        if depth == self.global_depth {
            self.directory.extend_from_within(..);
            self.global_depth += 1;
        }

        let new_b = self.buckets.len();
        let (stay, moved): (Vec<_>, Vec<_>) = self.buckets[b]
            .entries
            .drain(..)
            .partition(|&(id, _)| (hash(id) >> depth) & 1 == 0);
        self.buckets[b].entries = stay;
        self.buckets[b].local_depth = depth + 1;
        self.buckets.push(Bucket {
            local_depth: depth + 1,
            entries: moved,
        });

        for (slot, target) in self.directory.iter_mut().enumerate() {
            if *target == b && (slot >> depth) & 1 == 1 {
                *target = new_b;
            }
        }
    }

    /// Structural self-check used by tests
    pub fn check_invariants(&self) -> Result<(), String> {
        if self.directory.len() != 1usize << self.global_depth {
            return Err("directory size is not 2^global_depth".into());
        }
        let mut total = 0;
        for (b, bucket) in self.buckets.iter().enumerate() {
            if bucket.local_depth > self.global_depth {
                return Err(format!("bucket {} deeper than directory", b));
            }
            if bucket.entries.len() > self.capacity {
                return Err(format!("bucket {} over capacity", b));
            }
            let refs = self.directory.iter().filter(|&&t| t == b).count();
            if refs != 1usize << (self.global_depth - bucket.local_depth) {
                return Err(format!("bucket {} has {} directory slots", b, refs));
            }
            for &(id, _) in &bucket.entries {
                if self.bucket_of(id) != b {
                    return Err(format!("id {} stored in the wrong bucket", id));
                }
            }
            total += bucket.entries.len();
        }
        if total != self.len {
            return Err("entry count mismatch".into());
        }
        Ok(())
    }
}

impl KeyIndex for ExtendibleHash {
    fn insert(&mut self, id: u32, addr: Address) {
        loop {
            let b = self.bucket_of(id);
            let bucket = &mut self.buckets[b];
            if let Some(entry) = bucket.entries.iter_mut().find(|(k, _)| *k == id) {
                entry.1 = addr;
                return;
            }
            if bucket.entries.len() < self.capacity {
                bucket.entries.push((id, addr));
                self.len += 1;
                return;
            }
            self.split(b);
        }
    }

    fn remove(&mut self, id: u32) -> Option<Address> {
        let b = self.bucket_of(id);
        let entries = &mut self.buckets[b].entries;
        let pos = entries.iter().position(|&(k, _)| k == id)?;
        self.len -= 1;
        Some(entries.swap_remove(pos).1)
    }

    fn get(&self, id: u32) -> Option<Address> {
        self.buckets[self.bucket_of(id)]
            .entries
            .iter()
            .find(|&&(k, _)| k == id)
            .map(|&(_, a)| a)
    }

    fn range(&self, lo: u32, hi: u32) -> Vec<(u32, Address)> {
        let mut hits: Vec<_> = self
            .buckets
            .iter()
            .flat_map(|b| b.entries.iter().copied())
            .filter(|&(k, _)| lo <= k && k <= hi)
            .collect();
        hits.sort_unstable_by_key(|&(k, _)| k);
        hits
    }

    fn len(&self) -> usize {
        self.len
    }
}
