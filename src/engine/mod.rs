//! Engine Module
//!
//! The coordinator behind every façade operation.
//!
//! ## Responsibilities
//! - Own the current `Generation` (store mode, records, indexes)
//! - Serialize writers, let readers work on snapshots
//! - Persist the store file matching the mode
//! - Route `Command`s to operations
//!
//! ## Concurrency Model: Single-Writer / Multiple-Reader (SWMR)
//!
//! - **Writes** (load/post/put/delete/sort/index/zip/encrypt and their
//!   inverses): serialized by `write_lock`. A writer clones what it needs
//!   from the current generation, builds the next one, persists it, then
//!   swaps it in under a brief `current` write lock.
//! - **Reads**: clone the `Arc<Generation>` under a brief read lock and work
//!   on that snapshot with no further locking.
//! - **Index builds** publish the kind as `Building` first; lookups against
//!   it fail with `IndexNotReady` until the `Ready` generation lands.

mod persist;
mod state;
pub mod tasks;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::compress::CompressionKind;
use crate::config::Config;
use crate::crypto::{self, CipherMethod};
use crate::error::{PokedexError, Result};
use crate::index::{IndexKind, IndexSet, IndexState, LiveIndex};
use crate::kana;
use crate::protocol::{code, Command, PokemonDto, Reply, Response};
use crate::record::{codec, csv, Record};
use crate::search::query::scan;
use crate::search::{MergeQuery, ScoredId, SearchMethod};
use crate::sort::{ExternalSorter, SortKey, SortStrategy};
use crate::store::{Batch, RecordStore};

pub use persist::TMP_DIR;
pub use state::{Dataset, Generation, ModeKind, StoreMode};

/// A result and how long it took
#[derive(Debug, Clone, PartialEq)]
pub struct Timed<T> {
    pub value: T,
    pub elapsed_ms: f64,
}

fn elapsed_ms(start: Instant) -> f64 {
    start.elapsed().as_secs_f64() * 1000.0
}

/// The main Pokédex engine
pub struct Engine {
    /// Engine configuration
    config: Config,

    /// Snapshot readers clone; replaced wholesale by writers
    current: RwLock<Arc<Generation>>,

    /// Serializes write operations
    write_lock: Mutex<()>,
}

impl Engine {
    /// Open or create an engine with the given config
    ///
    /// On startup:
    /// 1. Validate the config and create the data directory
    /// 2. Pick the mode from whichever store file exists
    /// 3. Decode the open store (sealed stores stay sealed)
    pub fn open(config: Config) -> Result<Self> {
        config.validate()?;
        fs::create_dir_all(&config.data_dir)?;

        let mode = match persist::detect(&config.data_dir)? {
            persist::Persisted::Empty => StoreMode::default(),
            persist::Persisted::Normal(records) => StoreMode::Normal(Dataset {
                store: RecordStore::from_records(records)?,
                ..Dataset::default()
            }),
            persist::Persisted::Compressed(kind, blob) => StoreMode::Compressed {
                kind,
                blob: Bytes::from(blob),
                live: Vec::new(),
            },
            persist::Persisted::Encrypted(method, blob) => StoreMode::Encrypted {
                method,
                blob: Bytes::from(blob),
                live: Vec::new(),
            },
        };

        info!(
            data_dir = %config.data_dir.display(),
            mode = %mode.kind(),
            records = mode.dataset().map(|d| d.store.len()).unwrap_or(0),
            "Engine opened"
        );

        Ok(Self {
            config,
            current: RwLock::new(Arc::new(Generation { number: 0, mode })),
            write_lock: Mutex::new(()),
        })
    }

    /// Open with a path (convenience method)
    ///
    /// Uses default config with the specified data directory
    pub fn open_path(path: &Path) -> Result<Self> {
        let config = Config {
            data_dir: path.to_path_buf(),
            ..Config::default()
        };
        Self::open(config)
    }

    // =========================================================================
    // Generations
    // =========================================================================

    /// Current generation; stays valid however long the caller keeps it
    pub fn snapshot(&self) -> Arc<Generation> {
        self.current.read().clone()
    }

    fn publish(&self, generation: Generation) -> Arc<Generation> {
        let generation = Arc::new(generation);
        *self.current.write() = generation.clone();
        debug!(generation = generation.number, mode = %generation.mode_kind(), "Published generation");
        generation
    }

    /// Persist an open dataset and publish it
    fn commit(&self, current: &Generation, dataset: Dataset) -> Result<()> {
        let bytes = codec::encode(dataset.store.records())?;
        persist::write(&self.config.data_dir, ModeKind::Normal, &bytes)?;
        self.publish(current.succeed(StoreMode::Normal(dataset)));
        Ok(())
    }

    /// Rebuild an open dataset from a restored record stream
    fn restore(&self, current: &Generation, bytes: &[u8], live: &[IndexKind]) -> Result<()> {
        let store = RecordStore::from_records(codec::decode(bytes)?)?;
        let mut indexes = IndexSet::new();
        for &kind in live {
            indexes.set_ready(LiveIndex::build(kind, &store, &self.config.index));
        }
        self.commit(current, Dataset::new(store, indexes))
    }

    pub fn mode(&self) -> ModeKind {
        self.snapshot().mode_kind()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Get a record by id
    pub fn get(&self, id: u32) -> Result<Record> {
        let snapshot = self.snapshot();
        snapshot.dataset()?.store.get(id).cloned()
    }

    /// Resolve ids straight through the store, in caller order
    pub fn get_many(&self, ids: &[u32]) -> Result<Batch> {
        Ok(self.snapshot().dataset()?.store.get_many(ids))
    }

    /// Page `n` of `page_size` records in the store's iteration order
    pub fn page(&self, n: usize) -> Result<Vec<Record>> {
        Ok(self.snapshot().dataset()?.store.page(n, self.config.page_size))
    }

    pub fn page_count(&self) -> Result<usize> {
        Ok(self
            .snapshot()
            .dataset()?
            .store
            .page_count(self.config.page_size))
    }

    /// Every id, ascending
    pub fn list_ids(&self) -> Result<Vec<u32>> {
        let mut ids = self.snapshot().dataset()?.store.list_ids();
        ids.sort_unstable();
        Ok(ids)
    }

    /// Live records in iteration order
    pub fn records(&self) -> Result<Vec<Record>> {
        Ok(self.snapshot().dataset()?.store.records().cloned().collect())
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.snapshot().dataset()?.store.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    /// Key the store is ordered by, if no mutation happened since the sort
    pub fn sorted_by(&self) -> Result<Option<SortKey>> {
        Ok(self.snapshot().dataset()?.sorted_by())
    }

    pub fn index_state(&self, kind: IndexKind) -> Result<IndexState> {
        Ok(self.snapshot().dataset()?.indexes.state(kind))
    }

    // =========================================================================
    // Record Writes
    // =========================================================================

    /// Import the configured CSV file
    pub fn load_csv(&self) -> Result<usize> {
        let path = self.config.csv_path.clone();
        self.load_csv_from(&path)
    }

    /// Import a CSV file, replacing the store
    pub fn load_csv_from(&self, path: &Path) -> Result<usize> {
        let records = csv::read_path(path, &self.config.csv_layout)?;
        self.load_records(records)
    }

    /// Replace the store; indexes that were `Ready` are rebuilt
    pub fn load_records(&self, records: Vec<Record>) -> Result<usize> {
        let _write_guard = self.write_lock.lock();
        let start = Instant::now();

        let current = self.snapshot();
        let live = current.dataset()?.indexes.live_kinds();
        let store = RecordStore::from_records(records)?;
        let mut indexes = IndexSet::new();
        for kind in live {
            indexes.set_ready(LiveIndex::build(kind, &store, &self.config.index));
        }
        let count = store.len();
        self.commit(&current, Dataset::new(store, indexes))?;

        info!(count, elapsed_ms = elapsed_ms(start), "Database loaded");
        Ok(count)
    }

    /// Insert a record under a fresh id (max id + 1), returning the id
    pub fn insert(&self, record: Record) -> Result<u32> {
        let _write_guard = self.write_lock.lock();

        let current = self.snapshot();
        let mut dataset = current.dataset()?.clone();
        let (id, addr) = dataset.store.insert(record)?;
        if let Some(stored) = dataset.store.at(addr) {
            dataset.indexes.apply_insert(stored, addr);
        }
        self.compact_if_sparse(&mut dataset);
        self.commit(&current, dataset)?;

        debug!(id, "Record inserted");
        Ok(id)
    }

    /// Replace the record carrying the same id
    pub fn put(&self, record: Record) -> Result<u32> {
        let _write_guard = self.write_lock.lock();

        let current = self.snapshot();
        let mut dataset = current.dataset()?.clone();
        let id = record.id;
        let addr = dataset.store.put(record)?;
        if let Some(stored) = dataset.store.at(addr) {
            dataset.indexes.apply_insert(stored, addr);
        }
        self.compact_if_sparse(&mut dataset);
        self.commit(&current, dataset)?;

        debug!(id, "Record replaced");
        Ok(id)
    }

    pub fn delete(&self, id: u32) -> Result<()> {
        let _write_guard = self.write_lock.lock();

        let current = self.snapshot();
        let mut dataset = current.dataset()?.clone();
        if !dataset.store.delete(id) {
            return Err(PokedexError::NotFound(id));
        }
        dataset.indexes.apply_remove(id);
        self.compact_if_sparse(&mut dataset);
        self.commit(&current, dataset)?;

        debug!(id, "Record deleted");
        Ok(())
    }

    fn compact_if_sparse(&self, dataset: &mut Dataset) {
        if dataset.compact_if_sparse(&self.config.index) {
            debug!(records = dataset.store.len(), "Record store compacted");
        }
    }

    /// Tombstoned slots waiting for compaction
    pub fn tombstones(&self) -> Result<usize> {
        Ok(self.snapshot().dataset()?.store.tombstones())
    }

    // =========================================================================
    // Sorting
    // =========================================================================

    /// Externally sort the store by `key`, returning elapsed milliseconds
    pub fn sort(&self, strategy: SortStrategy, key: SortKey) -> Result<f64> {
        self.sort_inner(strategy, key, None)
    }

    pub(crate) fn sort_inner(
        &self,
        strategy: SortStrategy,
        key: SortKey,
        cancel: Option<&AtomicBool>,
    ) -> Result<f64> {
        let _write_guard = self.write_lock.lock();
        let start = Instant::now();

        let current = self.snapshot();
        let dataset = current.dataset()?;
        let records: Vec<Record> = dataset.store.records().cloned().collect();

        let mut sorter = ExternalSorter::new(&self.tmp_dir(), self.config.sort, key);
        if let Some(flag) = cancel {
            sorter = sorter.with_cancel(flag);
        }
        let (sorted, report) = sorter.sort(records, strategy)?;

        let store = RecordStore::from_records(sorted)?;
        let mut indexes = dataset.indexes.clone();
        indexes.rebuild_live(&store, &self.config.index);
        self.commit(&current, Dataset::sorted(store, indexes, key))?;

        let elapsed = elapsed_ms(start);
        info!(
            %strategy,
            %key,
            runs = report.initial_runs,
            passes = report.passes,
            elapsed_ms = elapsed,
            "Store sorted"
        );
        Ok(elapsed)
    }

    // =========================================================================
    // Indexes
    // =========================================================================

    /// Build (or rebuild) an index, returning elapsed milliseconds
    pub fn build_index(&self, kind: IndexKind) -> Result<f64> {
        self.build_index_inner(kind, None, false)
    }

    /// With `only_if_absent`, a kind that became `Ready` while this caller
    /// waited for the write lock is left alone.
    pub(crate) fn build_index_inner(
        &self,
        kind: IndexKind,
        cancel: Option<&AtomicBool>,
        only_if_absent: bool,
    ) -> Result<f64> {
        let _write_guard = self.write_lock.lock();
        let start = Instant::now();

        let current = self.snapshot();
        let dataset = current.dataset()?;
        if only_if_absent && dataset.indexes.state(kind) == IndexState::Ready {
            debug!(%kind, "Index already built");
            return Ok(0.0);
        }

        let mut marked = dataset.clone();
        marked.indexes.set_building(kind);
        let building = self.publish(current.succeed(StoreMode::Normal(marked)));

        let built = match cancel {
            Some(flag) => {
                LiveIndex::build_cancellable(kind, &dataset.store, &self.config.index, flag)
            }
            None => Ok(LiveIndex::build(kind, &dataset.store, &self.config.index)),
        };

        match built {
            Ok(index) => {
                let mut ready = dataset.clone();
                ready.indexes.set_ready(index);
                self.publish(building.succeed(StoreMode::Normal(ready)));
            }
            Err(e) => {
                warn!(%kind, error = %e, "Index build abandoned");
                self.publish(building.succeed(StoreMode::Normal(dataset.clone())));
                return Err(e);
            }
        }

        let elapsed = elapsed_ms(start);
        info!(%kind, records = dataset.store.len(), elapsed_ms = elapsed, "Index built");
        Ok(elapsed)
    }

    /// Build `kind` if it is `Absent`; a `Building` kind is `IndexNotReady`
    pub fn ensure_index(&self, kind: IndexKind) -> Result<()> {
        match self.index_state(kind)? {
            IndexState::Ready => Ok(()),
            IndexState::Building => Err(PokedexError::IndexNotReady(kind)),
            IndexState::Absent => self.build_index_inner(kind, None, true).map(|_| ()),
        }
    }

    /// Resolve ids through a `Ready` index, in caller order
    pub fn lookup(&self, kind: IndexKind, ids: &[u32]) -> Result<Timed<Batch>> {
        let start = Instant::now();
        let snapshot = self.snapshot();
        let dataset = snapshot.dataset()?;
        let batch = dataset.indexes.lookup(kind, &dataset.store, ids)?;
        Ok(Timed {
            value: batch,
            elapsed_ms: elapsed_ms(start),
        })
    }

    // =========================================================================
    // Search
    // =========================================================================

    /// Run a merge query with the method it names
    pub fn merge_search(&self, query: &MergeQuery) -> Result<Timed<Vec<ScoredId>>> {
        let start = Instant::now();
        let snapshot = self.snapshot();
        let dataset = snapshot.dataset()?;
        let hits = match query.method {
            SearchMethod::Inverted => dataset.indexes.query(query)?,
            SearchMethod::Pattern(method) => scan(&dataset.store, query, method),
        };
        debug!(method = %query.method, hits = hits.len(), "Merge search");
        Ok(Timed {
            value: hits,
            elapsed_ms: elapsed_ms(start),
        })
    }

    // =========================================================================
    // Compression
    // =========================================================================

    /// Seal the store with a codec, returning elapsed milliseconds
    pub fn zip(&self, kind: CompressionKind) -> Result<f64> {
        let _write_guard = self.write_lock.lock();
        let start = Instant::now();

        let current = self.snapshot();
        let dataset = current.dataset()?;
        let bytes = codec::encode(dataset.store.records())?;
        let blob = kind.compress(&bytes);
        persist::write(&self.config.data_dir, ModeKind::Compressed(kind), &blob)?;

        let (plain, packed) = (bytes.len(), blob.len());
        self.publish(current.succeed(StoreMode::Compressed {
            kind,
            blob: Bytes::from(blob),
            live: dataset.indexes.live_kinds(),
        }));

        let elapsed = elapsed_ms(start);
        info!(%kind, plain, packed, elapsed_ms = elapsed, "Store compressed");
        Ok(elapsed)
    }

    /// Restore a store sealed with `kind`
    pub fn unzip(&self, kind: CompressionKind) -> Result<f64> {
        let _write_guard = self.write_lock.lock();
        let start = Instant::now();

        let current = self.snapshot();
        let (blob, live) = match &current.mode {
            StoreMode::Compressed {
                kind: actual,
                blob,
                live,
            } if *actual == kind => (blob.clone(), live.clone()),
            StoreMode::Compressed { kind: actual, .. } => {
                return Err(PokedexError::StoreCompressed(*actual))
            }
            StoreMode::Encrypted { method, .. } => return Err(PokedexError::StoreEncrypted(*method)),
            StoreMode::Normal(_) => return Err(PokedexError::StoreNotCompressed),
        };

        let bytes = kind.decompress(&blob)?;
        self.restore(&current, &bytes, &live)?;

        let elapsed = elapsed_ms(start);
        info!(%kind, elapsed_ms = elapsed, "Store decompressed");
        Ok(elapsed)
    }

    // =========================================================================
    // Encryption
    // =========================================================================

    /// Encrypt the store under a fresh key, returned as hex
    pub fn encrypt(&self, method: CipherMethod) -> Result<String> {
        let _write_guard = self.write_lock.lock();
        let start = Instant::now();

        let current = self.snapshot();
        let dataset = current.dataset()?;
        let key = crypto::generate_key(method);
        let bytes = codec::encode(dataset.store.records())?;
        let sealed = crypto::seal(method, &key, &bytes)?;
        persist::write(&self.config.data_dir, ModeKind::Encrypted(method), &sealed)?;

        self.publish(current.succeed(StoreMode::Encrypted {
            method,
            blob: Bytes::from(sealed),
            live: dataset.indexes.live_kinds(),
        }));

        info!(%method, elapsed_ms = elapsed_ms(start), "Store encrypted");
        Ok(crypto::encode_key(&key))
    }

    /// Decrypt with a hex key; a failure leaves the store encrypted
    pub fn decrypt(&self, method: CipherMethod, key: &str) -> Result<()> {
        let _write_guard = self.write_lock.lock();
        let start = Instant::now();

        let current = self.snapshot();
        let (blob, live) = match &current.mode {
            StoreMode::Encrypted {
                method: actual,
                blob,
                live,
            } if *actual == method => (blob.clone(), live.clone()),
            StoreMode::Encrypted { method: actual, .. } => {
                return Err(PokedexError::StoreEncrypted(*actual))
            }
            StoreMode::Compressed { kind, .. } => return Err(PokedexError::StoreCompressed(*kind)),
            StoreMode::Normal(_) => return Err(PokedexError::StoreNotEncrypted),
        };

        let key = crypto::decode_key(method, key)?;
        let bytes = crypto::open(method, &key, &blob).inspect_err(|e| {
            warn!(%method, error = %e, "Decrypt rejected");
        })?;
        self.restore(&current, &bytes, &live)?;

        info!(%method, elapsed_ms = elapsed_ms(start), "Store decrypted");
        Ok(())
    }

    // =========================================================================
    // Command Routing
    // =========================================================================

    /// Execute a command
    ///
    /// Index lookups and inverted queries build their index on demand when
    /// it is `Absent`.
    pub fn execute(&self, command: Command) -> Result<Reply> {
        let command_type = command.command_type();
        debug!(?command_type, "Executing command");

        match command {
            Command::LoadDatabase => {
                let start = Instant::now();
                self.load_csv()?;
                Ok(Reply::Message(Response::timed(code::IMPORTED, elapsed_ms(start))))
            }
            Command::GetAll { page } => Ok(Reply::Records(dtos(&self.page(page)?))),
            Command::PageCount => Ok(Reply::Count(self.page_count()?)),
            Command::IdList => Ok(Reply::Ids(self.list_ids()?)),
            Command::GetList { kind, ids } => {
                self.ensure_index(kind)?;
                let Timed { value, elapsed_ms } = self.lookup(kind, &ids)?;
                Ok(Reply::Listed {
                    pokemons: dtos(&value.records),
                    time: elapsed_ms,
                    missing: value.missing,
                })
            }
            Command::Get { id } => Ok(Reply::Record(Box::new(PokemonDto::from(&self.get(id)?)))),
            Command::Post { record } => Ok(Reply::Created {
                id: self.insert(record)?,
            }),
            Command::Put { record } => Ok(Reply::Created {
                id: self.put(record)?,
            }),
            Command::Delete { id } => {
                self.delete(id)?;
                Ok(Reply::Message(Response::ok(code::DELETED)))
            }
            Command::Sort { strategy, key } => {
                let elapsed = self.sort(strategy, key)?;
                Ok(Reply::Message(Response::timed(code::SORTED, elapsed)))
            }
            Command::BuildIndex { kind } => {
                let elapsed = self.build_index(kind)?;
                Ok(Reply::Message(Response::timed(code::INDEXED, elapsed)))
            }
            Command::Zip { kind } => {
                let elapsed = self.zip(kind)?;
                Ok(Reply::Message(Response::timed(code::COMPRESSED, elapsed)))
            }
            Command::Unzip { kind } => {
                let elapsed = self.unzip(kind)?;
                Ok(Reply::Message(Response::timed(code::DECOMPRESSED, elapsed)))
            }
            Command::Encrypt { method } => Ok(Reply::Text(self.encrypt(method)?)),
            Command::Decrypt { method, key } => {
                self.decrypt(method, &key)?;
                Ok(Reply::Message(Response::ok(code::DECRYPTED)))
            }
            Command::MergeSearch { query } => {
                if query.method == SearchMethod::Inverted {
                    self.ensure_index(IndexKind::Inverted)?;
                }
                let Timed { value, elapsed_ms } = self.merge_search(&query)?;
                Ok(Reply::Searched {
                    ids: value.into_iter().map(|hit| hit.id).collect(),
                    time: elapsed_ms,
                })
            }
            Command::InvertedIndex { mut query } => {
                query.method = SearchMethod::Inverted;
                self.ensure_index(IndexKind::Inverted)?;
                let hits = self.merge_search(&query)?.value;
                Ok(Reply::Ids(hits.into_iter().map(|hit| hit.id).collect()))
            }
            Command::ToKatakana { text } => Ok(Reply::Text(kana::to_katakana(&text))),
        }
    }

    // =========================================================================
    // Accessors (for testing and debugging)
    // =========================================================================

    /// Get the data directory path
    pub fn data_dir(&self) -> &Path {
        &self.config.data_dir
    }

    /// Directory holding external sort runs
    pub fn tmp_dir(&self) -> PathBuf {
        self.config.data_dir.join(TMP_DIR)
    }

    /// Get the configuration
    pub fn config(&self) -> &Config {
        &self.config
    }
}

fn dtos(records: &[Record]) -> Vec<PokemonDto> {
    records.iter().map(PokemonDto::from).collect()
}
