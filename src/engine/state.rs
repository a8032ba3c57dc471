//! Engine state
//!
//! ```text
//!            zip(kind)                     encrypt(method)
//!   ┌──────────────────────┐        ┌──────────────────────────┐
//!   │                      ▼        │                          ▼
//! Normal ◀──── unzip(kind) ── Compressed    Normal ◀── decrypt ── Encrypted
//! (records + indexes)         (sealed blob)                  (sealed blob)
//! ```
//!
//! A `Generation` is immutable once published. Writers build the next one
//! copy-on-write and swap it in; readers keep whatever `Arc` they cloned.

use std::fmt;

use bytes::Bytes;
use serde::Serialize;

use crate::compress::CompressionKind;
use crate::crypto::CipherMethod;
use crate::error::{PokedexError, Result};
use crate::config::IndexConfig;
use crate::index::{IndexKind, IndexSet};
use crate::sort::SortKey;
use crate::store::RecordStore;

/// Records plus everything derived from them
#[derive(Debug, Clone, Default)]
pub struct Dataset {
    pub store: RecordStore,
    pub indexes: IndexSet,
    /// Last sort key and the store revision it left behind
    pub sorted: Option<(SortKey, u64)>,
}

/// Tombstones tolerated before a write compacts the slot table
pub const COMPACT_MIN_TOMBSTONES: usize = 32;

impl Dataset {
    pub fn new(store: RecordStore, indexes: IndexSet) -> Self {
        Self {
            store,
            indexes,
            sorted: None,
        }
    }

    /// Dataset whose store was just ordered by `key`
    pub fn sorted(store: RecordStore, indexes: IndexSet, key: SortKey) -> Self {
        let revision = store.revision();
        Self {
            store,
            indexes,
            sorted: Some((key, revision)),
        }
    }

    /// Key the store is still ordered by
    ///
    /// Any mutation after the sort moves the store revision on.
    pub fn sorted_by(&self) -> Option<SortKey> {
        match self.sorted {
            Some((key, revision)) if revision == self.store.revision() => Some(key),
            _ => None,
        }
    }

    /// Drop tombstones once they outnumber live records
    ///
    /// Compaction renumbers addresses, so live indexes are rebuilt.
    /// Returns true if the slot table was compacted.
    pub fn compact_if_sparse(&mut self, config: &IndexConfig) -> bool {
        let tombstones = self.store.tombstones();
        if tombstones < COMPACT_MIN_TOMBSTONES || tombstones <= self.store.len() {
            return false;
        }
        self.store.compact();
        self.indexes.rebuild_live(&self.store, config);
        true
    }
}

/// The one store mode; the records only exist while `Normal`
#[derive(Debug, Clone)]
pub enum StoreMode {
    Normal(Dataset),
    Compressed {
        kind: CompressionKind,
        blob: Bytes,
        /// Index kinds rebuilt on `unzip`
        live: Vec<IndexKind>,
    },
    Encrypted {
        method: CipherMethod,
        blob: Bytes,
        /// Index kinds rebuilt on `decrypt`
        live: Vec<IndexKind>,
    },
}

impl Default for StoreMode {
    fn default() -> Self {
        StoreMode::Normal(Dataset::default())
    }
}

impl StoreMode {
    /// The open dataset, or the mode error every gated operation reports
    pub fn dataset(&self) -> Result<&Dataset> {
        match self {
            StoreMode::Normal(dataset) => Ok(dataset),
            StoreMode::Compressed { kind, .. } => Err(PokedexError::StoreCompressed(*kind)),
            StoreMode::Encrypted { method, .. } => Err(PokedexError::StoreEncrypted(*method)),
        }
    }

    pub fn kind(&self) -> ModeKind {
        match self {
            StoreMode::Normal(_) => ModeKind::Normal,
            StoreMode::Compressed { kind, .. } => ModeKind::Compressed(*kind),
            StoreMode::Encrypted { method, .. } => ModeKind::Encrypted(*method),
        }
    }
}

/// Mode without its payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ModeKind {
    Normal,
    Compressed(CompressionKind),
    Encrypted(CipherMethod),
}

impl fmt::Display for ModeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModeKind::Normal => f.write_str("normal"),
            ModeKind::Compressed(kind) => write!(f, "compressed ({})", kind),
            ModeKind::Encrypted(method) => write!(f, "encrypted ({})", method),
        }
    }
}

/// Immutable snapshot of the engine
#[derive(Debug, Clone, Default)]
pub struct Generation {
    /// Bumped on every publish
    pub number: u64,
    pub mode: StoreMode,
}

impl Generation {
    pub fn dataset(&self) -> Result<&Dataset> {
        self.mode.dataset()
    }

    pub fn mode_kind(&self) -> ModeKind {
        self.mode.kind()
    }

    /// Successor generation holding `mode`
    pub(crate) fn succeed(&self, mode: StoreMode) -> Generation {
        Generation {
            number: self.number + 1,
            mode,
        }
    }
}
