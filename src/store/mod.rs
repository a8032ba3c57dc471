//! Record Store
//!
//! Slot table holding every record in iteration order.
//!
//! ## Layout
//! ```text
//! slots:     [ rec 1 | rec 4 | ✝ | rec 2 | rec 4' | ... ]
//!               0       1     2     3       4
//! positions: { 1 → 0, 2 → 3, 4 → 4 }
//! ```
//!
//! - `delete` tombstones a slot (✝)
//! - `put` tombstones the old slot and appends the replacement, so the
//!   record's address changes and every index has to follow it
//! - `compact` drops tombstones and renumbers addresses
//!
//! Each mutation bumps `revision`; a sort order cached against an older
//! revision no longer holds.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{PokedexError, Result};
use crate::record::Record;

/// Position of a record inside the slot table
pub type Address = usize;

/// Result of a batched lookup
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    /// Found records, in the caller's order
    pub records: Vec<Record>,
    /// Requested ids that do not exist, in the caller's order
    pub missing: Vec<u32>,
}

/// In-memory record table with tombstoned slots
#[derive(Debug, Clone, Default)]
pub struct RecordStore {
    slots: Vec<Option<Record>>,
    positions: HashMap<u32, Address>,
    revision: u64,
}

impl RecordStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from records kept in the given order
    pub fn from_records(records: Vec<Record>) -> Result<Self> {
        let mut store = Self::new();
        store.load(records)?;
        Ok(store)
    }

    // =========================================================================
    // Bulk Operations
    // =========================================================================

    /// Replace the whole contents, returning the number of records loaded
    ///
    /// Fails without touching the store on a duplicate id or invalid record.
    pub fn load(&mut self, records: Vec<Record>) -> Result<usize> {
        let mut positions = HashMap::with_capacity(records.len());
        for (addr, record) in records.iter().enumerate() {
            record.validate()?;
            if positions.insert(record.id, addr).is_some() {
                return Err(PokedexError::Validation(format!(
                    "duplicate id {}",
                    record.id
                )));
            }
        }

        let count = records.len();
        self.slots = records.into_iter().map(Some).collect();
        self.positions = positions;
        self.revision += 1;

        debug!(count, "Record store loaded");
        Ok(count)
    }

    /// Drop tombstones, keeping the iteration order of live records
    pub fn compact(&mut self) {
        if self.tombstones() == 0 {
            return;
        }
        let live: Vec<Record> = self.slots.drain(..).flatten().collect();
        self.positions = live
            .iter()
            .enumerate()
            .map(|(addr, r)| (r.id, addr))
            .collect();
        self.slots = live.into_iter().map(Some).collect();
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a record by id
    pub fn get(&self, id: u32) -> Result<&Record> {
        self.address_of(id)
            .and_then(|addr| self.at(addr))
            .ok_or(PokedexError::NotFound(id))
    }

    /// Resolve ids in caller order, reporting the ones that do not exist
    pub fn get_many(&self, ids: &[u32]) -> Batch {
        let mut batch = Batch::default();
        for &id in ids {
            match self.get(id) {
                Ok(record) => batch.records.push(record.clone()),
                Err(_) => batch.missing.push(id),
            }
        }
        batch
    }

    /// Address of a live record
    pub fn address_of(&self, id: u32) -> Option<Address> {
        self.positions.get(&id).copied()
    }

    /// Record stored at an address (None for tombstones)
    pub fn at(&self, addr: Address) -> Option<&Record> {
        self.slots.get(addr).and_then(|slot| slot.as_ref())
    }

    /// Live records with their addresses, in iteration order
    pub fn iter(&self) -> impl Iterator<Item = (Address, &Record)> + '_ {
        self.slots
            .iter()
            .enumerate()
            .filter_map(|(addr, slot)| slot.as_ref().map(|r| (addr, r)))
    }

    /// Live records in iteration order
    pub fn records(&self) -> impl Iterator<Item = &Record> + '_ {
        self.slots.iter().flatten()
    }

    /// Every live id, in iteration order
    pub fn list_ids(&self) -> Vec<u32> {
        self.records().map(|r| r.id).collect()
    }

    /// Page `n` (0-based) of `size` records in iteration order
    pub fn page(&self, n: usize, size: usize) -> Vec<Record> {
        self.records()
            .skip(n.saturating_mul(size))
            .take(size)
            .cloned()
            .collect()
    }

    /// Number of pages needed to show every record
    pub fn page_count(&self, size: usize) -> usize {
        if size == 0 {
            return 0;
        }
        self.len().div_ceil(size)
    }

    /// Id the next inserted record receives
    pub fn next_id(&self) -> Result<u32> {
        match self.positions.keys().max() {
            None => Ok(1),
            Some(max) => max
                .checked_add(1)
                .ok_or_else(|| PokedexError::Validation("id space exhausted".to_string())),
        }
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    /// Number of tombstoned slots
    pub fn tombstones(&self) -> usize {
        self.slots.len() - self.positions.len()
    }

    /// Mutation counter
    pub fn revision(&self) -> u64 {
        self.revision
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Insert a new record under a freshly assigned id
    ///
    /// The id carried by `record` is ignored.
    pub fn insert(&mut self, mut record: Record) -> Result<(u32, Address)> {
        record.id = self.next_id()?;
        record.validate()?;

        let id = record.id;
        let addr = self.append(record);
        Ok((id, addr))
    }

    /// Replace the record with the same id, returning its new address
    pub fn put(&mut self, record: Record) -> Result<Address> {
        record.validate()?;
        let old = self
            .address_of(record.id)
            .ok_or(PokedexError::NotFound(record.id))?;

        self.slots[old] = None;
        Ok(self.append(record))
    }

    /// Tombstone a record; false if the id does not exist
    pub fn delete(&mut self, id: u32) -> bool {
        match self.positions.remove(&id) {
            Some(addr) => {
                self.slots[addr] = None;
                self.revision += 1;
                true
            }
            None => false,
        }
    }

    fn append(&mut self, record: Record) -> Address {
        let addr = self.slots.len();
        self.positions.insert(record.id, addr);
        self.slots.push(Some(record));
        self.revision += 1;
        addr
    }
}
