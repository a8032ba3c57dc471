//! Configuration for the Pokédex engine
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::error::{PokedexError, Result};
use crate::record::csv::CsvLayout;

/// Main configuration for an engine instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for all data files
    /// Internal structure:
    ///   {data_dir}/
    ///     ├── pokedex.dat      (open store)
    ///     ├── pokedex.huf      (Huffman-sealed store)
    ///     ├── pokedex.lzw      (LZW-sealed store)
    ///     ├── pokedex.enc      (encrypted store)
    ///     └── tmp/             (external sort runs)
    pub data_dir: PathBuf,

    /// CSV file imported by `loadDatabase`
    pub csv_path: PathBuf,

    /// Column positions inside the CSV file
    pub csv_layout: CsvLayout,

    // -------------------------------------------------------------------------
    // Query Configuration
    // -------------------------------------------------------------------------
    /// Records per `getAll` page
    pub page_size: usize,

    // -------------------------------------------------------------------------
    // Sort / Index Configuration
    // -------------------------------------------------------------------------
    pub sort: SortConfig,

    pub index: IndexConfig,

    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// HTTP listen address
    pub listen_addr: String,
}

/// External sort tuning
#[derive(Debug, Clone, Copy)]
pub struct SortConfig {
    /// Records held in memory while producing one run
    pub run_capacity: usize,

    /// Runs merged per pass by the balanced strategy
    pub fan_in: usize,

    /// Upper bound on fan-in for the variable-way strategy
    pub max_fan_in: usize,

    /// Heap size for replacement selection
    pub heap_capacity: usize,
}

/// Index structure tuning
#[derive(Debug, Clone, Copy)]
pub struct IndexConfig {
    /// Max children per node for the B-tree and B*-tree
    pub btree_order: usize,

    /// Max children per internal node / entries per leaf for the B+-tree
    pub bplus_order: usize,

    /// Entries per extendible-hash bucket
    pub hash_bucket_capacity: usize,

    /// Width of the value buckets for numeric inverted-index fields
    pub numeric_bucket_width: u32,
}

impl Default for SortConfig {
    fn default() -> Self {
        Self {
            run_capacity: 64,
            fan_in: 2,
            max_fan_in: 8,
            heap_capacity: 7,
        }
    }
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            btree_order: 8,
            bplus_order: 8,
            hash_bucket_capacity: 4,
            numeric_bucket_width: 10,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./pokedex_data"),
            csv_path: PathBuf::from("./data/pokedex.csv"),
            csv_layout: CsvLayout::default(),
            page_size: 60,
            sort: SortConfig::default(),
            index: IndexConfig::default(),
            listen_addr: "127.0.0.1:8080".to_string(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the tunables against the minimums the structures need
    pub fn validate(&self) -> Result<()> {
        if self.page_size == 0 {
            return Err(PokedexError::Config("page_size must be at least 1".into()));
        }
        if self.sort.run_capacity == 0 || self.sort.heap_capacity == 0 {
            return Err(PokedexError::Config(
                "sort run and heap capacities must be at least 1".into(),
            ));
        }
        if self.sort.fan_in < 2 || self.sort.max_fan_in < 2 {
            return Err(PokedexError::Config("sort fan-in must be at least 2".into()));
        }
        if self.index.btree_order < 4 || self.index.bplus_order < 4 {
            return Err(PokedexError::Config("tree order must be at least 4".into()));
        }
        if self.index.hash_bucket_capacity == 0 || self.index.numeric_bucket_width == 0 {
            return Err(PokedexError::Config(
                "hash bucket capacity and numeric bucket width must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Set the CSV file used by `loadDatabase`
    pub fn csv_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.csv_path = path.into();
        self
    }

    pub fn csv_layout(mut self, layout: CsvLayout) -> Self {
        self.config.csv_layout = layout;
        self
    }

    /// Set the number of records per page
    pub fn page_size(mut self, size: usize) -> Self {
        self.config.page_size = size;
        self
    }

    /// Set the in-memory run size of the external sort
    pub fn run_capacity(mut self, records: usize) -> Self {
        self.config.sort.run_capacity = records;
        self
    }

    /// Set the balanced merge fan-in
    pub fn fan_in(mut self, k: usize) -> Self {
        self.config.sort.fan_in = k;
        self
    }

    /// Set the variable-way merge fan-in ceiling
    pub fn max_fan_in(mut self, k: usize) -> Self {
        self.config.sort.max_fan_in = k;
        self
    }

    /// Set the replacement-selection heap size
    pub fn heap_capacity(mut self, records: usize) -> Self {
        self.config.sort.heap_capacity = records;
        self
    }

    /// Set the B-tree / B*-tree order
    pub fn btree_order(mut self, order: usize) -> Self {
        self.config.index.btree_order = order;
        self
    }

    /// Set the B+-tree order
    pub fn bplus_order(mut self, order: usize) -> Self {
        self.config.index.bplus_order = order;
        self
    }

    /// Set the extendible-hash bucket capacity
    pub fn hash_bucket_capacity(mut self, entries: usize) -> Self {
        self.config.index.hash_bucket_capacity = entries;
        self
    }

    /// Set the bucket width used for numeric inverted-index fields
    pub fn numeric_bucket_width(mut self, width: u32) -> Self {
        self.config.index.numeric_bucket_width = width;
        self
    }

    /// Set the HTTP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    pub fn build(self) -> Result<Config> {
        self.config.validate()?;
        Ok(self.config)
    }
}
