//! Index Module
//!
//! Derived caches mapping record id → store address. Indexes never own
//! records; the store resolves addresses back to records.
//!
//! ## Kinds
//! ```text
//! code  kind          structure
//! ────  ────────────  ─────────────────────────────────────────────
//!  0    Sequential    linear scan over (id, address) pairs
//!  1    Hash          extendible hashing (directory + buckets)
//!  2    BTree         multi-way tree, split 1→2 / merge 2→1
//!  3    BPlusTree     separators inside, linked leaves outside
//!  4    BStarTree     multi-way tree, redistribute + split 2→3
//!  5    Inverted      token/bucket → postings, for mergeSearch
//! ```
//!
//! ## Lifecycle
//! Each kind is `Absent`, `Building` or `Ready`. Lookups only succeed on a
//! `Ready` kind. Every store mutation is applied to every `Ready` index.

pub mod bplus;
pub mod hash;
pub mod inverted;
pub mod multiway;
pub mod sequential;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::IndexConfig;
use crate::error::{PokedexError, Result};
use crate::record::Record;
use crate::search::{MergeQuery, ScoredId};
use crate::store::{Address, Batch, RecordStore};

pub use bplus::BPlusTree;
pub use hash::ExtendibleHash;
pub use inverted::InvertedIndex;
pub use multiway::{MultiwayTree, SplitPolicy};
pub use sequential::SequentialIndex;

/// Records checked between two looks at the cancel flag
const CANCEL_CHECK_EVERY: usize = 64;

// =============================================================================
// Index Kind
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum IndexKind {
    Sequential,
    Hash,
    BTree,
    BPlusTree,
    BStarTree,
    Inverted,
}

impl IndexKind {
    pub const ALL: [IndexKind; 6] = [
        IndexKind::Sequential,
        IndexKind::Hash,
        IndexKind::BTree,
        IndexKind::BPlusTree,
        IndexKind::BStarTree,
        IndexKind::Inverted,
    ];

    /// Wire code used by `/indexacao` and `/getList`
    pub fn code(self) -> u8 {
        self as u8
    }

    fn slot(self) -> usize {
        self as usize
    }
}

impl TryFrom<i64> for IndexKind {
    type Error = PokedexError;

    fn try_from(code: i64) -> Result<Self> {
        usize::try_from(code)
            .ok()
            .and_then(|c| IndexKind::ALL.get(c).copied())
            .ok_or(PokedexError::InvalidMethod { what: "index", code })
    }
}

impl fmt::Display for IndexKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            IndexKind::Sequential => "sequential",
            IndexKind::Hash => "extendible hash",
            IndexKind::BTree => "B-tree",
            IndexKind::BPlusTree => "B+-tree",
            IndexKind::BStarTree => "B*-tree",
            IndexKind::Inverted => "inverted index",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Key Index Contract
// =============================================================================

/// Point/range map from id to address, shared by every key-ordered structure
pub trait KeyIndex {
    /// Insert or re-address an id
    fn insert(&mut self, id: u32, addr: Address);

    /// Remove an id, returning its last address
    fn remove(&mut self, id: u32) -> Option<Address>;

    fn get(&self, id: u32) -> Option<Address>;

    /// Entries with `lo <= id <= hi`, ascending by id
    fn range(&self, lo: u32, hi: u32) -> Vec<(u32, Address)>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// Live Index
// =============================================================================

/// A built index of any kind
#[derive(Debug, Clone)]
pub enum LiveIndex {
    Sequential(SequentialIndex),
    Hash(ExtendibleHash),
    BTree(MultiwayTree),
    BPlusTree(BPlusTree),
    BStarTree(MultiwayTree),
    Inverted(InvertedIndex),
}

impl LiveIndex {
    fn empty(kind: IndexKind, config: &IndexConfig) -> Self {
        match kind {
            IndexKind::Sequential => LiveIndex::Sequential(SequentialIndex::new()),
            IndexKind::Hash => LiveIndex::Hash(ExtendibleHash::new(config.hash_bucket_capacity)),
            IndexKind::BTree => {
                LiveIndex::BTree(MultiwayTree::new(config.btree_order, SplitPolicy::Classic))
            }
            IndexKind::BPlusTree => LiveIndex::BPlusTree(BPlusTree::new(config.bplus_order)),
            IndexKind::BStarTree => {
                LiveIndex::BStarTree(MultiwayTree::new(config.btree_order, SplitPolicy::Star))
            }
            IndexKind::Inverted => {
                LiveIndex::Inverted(InvertedIndex::new(config.numeric_bucket_width))
            }
        }
    }

    /// Build an index of `kind` from every live record of `store`
    pub fn build(kind: IndexKind, store: &RecordStore, config: &IndexConfig) -> Self {
        let mut index = Self::empty(kind, config);
        for (addr, record) in store.iter() {
            index.insert(record, addr);
        }
        index
    }

    /// Same as [`LiveIndex::build`], giving up with `Cancelled` once `cancel` is set
    pub fn build_cancellable(
        kind: IndexKind,
        store: &RecordStore,
        config: &IndexConfig,
        cancel: &AtomicBool,
    ) -> Result<Self> {
        let mut index = Self::empty(kind, config);
        for (n, (addr, record)) in store.iter().enumerate() {
            if n % CANCEL_CHECK_EVERY == 0 && cancel.load(Ordering::Relaxed) {
                return Err(PokedexError::Cancelled);
            }
            index.insert(record, addr);
        }
        Ok(index)
    }

    pub fn kind(&self) -> IndexKind {
        match self {
            LiveIndex::Sequential(_) => IndexKind::Sequential,
            LiveIndex::Hash(_) => IndexKind::Hash,
            LiveIndex::BTree(_) => IndexKind::BTree,
            LiveIndex::BPlusTree(_) => IndexKind::BPlusTree,
            LiveIndex::BStarTree(_) => IndexKind::BStarTree,
            LiveIndex::Inverted(_) => IndexKind::Inverted,
        }
    }

    fn as_key_index(&self) -> &dyn KeyIndex {
        match self {
            LiveIndex::Sequential(i) => i,
            LiveIndex::Hash(i) => i,
            LiveIndex::BTree(i) | LiveIndex::BStarTree(i) => i,
            LiveIndex::BPlusTree(i) => i,
            LiveIndex::Inverted(i) => i,
        }
    }

    /// Address of an id
    pub fn get(&self, id: u32) -> Option<Address> {
        self.as_key_index().get(id)
    }

    /// Entries with ids in `lo..=hi`, ascending
    pub fn range(&self, lo: u32, hi: u32) -> Vec<(u32, Address)> {
        self.as_key_index().range(lo, hi)
    }

    pub fn len(&self) -> usize {
        self.as_key_index().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Track a record stored (or re-stored) at `addr`
    pub fn insert(&mut self, record: &Record, addr: Address) {
        match self {
            LiveIndex::Sequential(i) => i.insert(record.id, addr),
            LiveIndex::Hash(i) => i.insert(record.id, addr),
            LiveIndex::BTree(i) | LiveIndex::BStarTree(i) => i.insert(record.id, addr),
            LiveIndex::BPlusTree(i) => i.insert(record.id, addr),
            LiveIndex::Inverted(i) => i.insert_record(record, addr),
        }
    }

    /// Forget an id
    pub fn remove(&mut self, id: u32) {
        match self {
            LiveIndex::Sequential(i) => {
                i.remove(id);
            }
            LiveIndex::Hash(i) => {
                i.remove(id);
            }
            LiveIndex::BTree(i) | LiveIndex::BStarTree(i) => {
                i.remove(id);
            }
            LiveIndex::BPlusTree(i) => {
                i.remove(id);
            }
            LiveIndex::Inverted(i) => {
                i.remove(id);
            }
        }
    }
}

// =============================================================================
// Index Set (per-kind state)
// =============================================================================

/// State of one index kind
#[derive(Debug, Clone, Default)]
pub enum IndexSlot {
    #[default]
    Absent,
    Building,
    Ready(Arc<LiveIndex>),
}

/// Observable state of a kind, without the structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IndexState {
    Absent,
    Building,
    Ready,
}

/// The six index slots of one engine generation
///
/// Cloning is cheap: built structures are shared until a mutation
/// copies them.
#[derive(Debug, Clone, Default)]
pub struct IndexSet {
    slots: [IndexSlot; 6],
}

impl IndexSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self, kind: IndexKind) -> IndexState {
        match self.slots[kind.slot()] {
            IndexSlot::Absent => IndexState::Absent,
            IndexSlot::Building => IndexState::Building,
            IndexSlot::Ready(_) => IndexState::Ready,
        }
    }

    /// Built structure of a kind, or `IndexNotReady`
    pub fn ready(&self, kind: IndexKind) -> Result<&LiveIndex> {
        match &self.slots[kind.slot()] {
            IndexSlot::Ready(index) => Ok(index),
            _ => Err(PokedexError::IndexNotReady(kind)),
        }
    }

    pub fn set_building(&mut self, kind: IndexKind) {
        self.slots[kind.slot()] = IndexSlot::Building;
    }

    pub fn set_ready(&mut self, index: LiveIndex) {
        let kind = index.kind();
        self.slots[kind.slot()] = IndexSlot::Ready(Arc::new(index));
    }

    pub fn clear(&mut self, kind: IndexKind) {
        self.slots[kind.slot()] = IndexSlot::Absent;
    }

    /// Kinds currently `Ready`
    pub fn live_kinds(&self) -> Vec<IndexKind> {
        IndexKind::ALL
            .into_iter()
            .filter(|&k| self.state(k) == IndexState::Ready)
            .collect()
    }

    /// Rebuild every `Ready` kind from `store` (after a sort or load)
    pub fn rebuild_live(&mut self, store: &RecordStore, config: &IndexConfig) {
        for kind in self.live_kinds() {
            debug!(%kind, "Rebuilding index");
            self.set_ready(LiveIndex::build(kind, store, config));
        }
    }

    /// Apply a new or re-addressed record to every `Ready` index
    pub fn apply_insert(&mut self, record: &Record, addr: Address) {
        for slot in self.slots.iter_mut() {
            if let IndexSlot::Ready(index) = slot {
                Arc::make_mut(index).insert(record, addr);
            }
        }
    }

    /// Apply a deletion to every `Ready` index
    pub fn apply_remove(&mut self, id: u32) {
        for slot in self.slots.iter_mut() {
            if let IndexSlot::Ready(index) = slot {
                Arc::make_mut(index).remove(id);
            }
        }
    }

    /// Resolve ids through a `Ready` index, preserving caller order
    pub fn lookup(&self, kind: IndexKind, store: &RecordStore, ids: &[u32]) -> Result<Batch> {
        let index = self.ready(kind)?;
        let mut batch = Batch::default();
        for &id in ids {
            match index.get(id).and_then(|addr| store.at(addr)) {
                Some(record) => batch.records.push(record.clone()),
                None => batch.missing.push(id),
            }
        }
        Ok(batch)
    }

    /// Run a merge query through the `Ready` inverted index
    pub fn query(&self, query: &MergeQuery) -> Result<Vec<ScoredId>> {
        match self.ready(IndexKind::Inverted)? {
            LiveIndex::Inverted(index) => Ok(index.query(query)),
            _ => Err(PokedexError::IndexNotReady(IndexKind::Inverted)),
        }
    }
}
