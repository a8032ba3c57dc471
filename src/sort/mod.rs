//! Sort Module
//!
//! External merge sorting of the whole store through run files.
//!
//! ```text
//!  records ──▶ run formation ──▶ [run][run][run]... ──▶ merge passes ──▶ sorted
//!              (strategy)          {data_dir}/tmp        (k-way heap)
//! ```
//!
//! ## Strategies
//! - `Balanced`: fixed-size in-memory chunks, merged `fan_in` at a time
//! - `Variable`: natural runs (chunks that continue the previous run are
//!   appended to it), fan-in picked per sort, smallest runs merged first
//! - `Replacement`: replacement selection through a bounded heap
//!
//! Every strategy orders by `(key, original position)`, so ties keep their
//! input order and all three produce the same sequence.

mod balanced;
mod merge;
mod replacement;
mod run;
mod variable;

use std::cmp::Ordering;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::SortConfig;
use crate::error::{PokedexError, Result};
use crate::record::Record;

pub use run::{Run, RunReader, RunWriter};

/// A record tagged with its position in the unsorted input
pub type Tagged = (u64, Record);

// =============================================================================
// Strategy / Key
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortStrategy {
    Balanced,
    Variable,
    Replacement,
}

impl SortStrategy {
    pub const ALL: [SortStrategy; 3] = [
        SortStrategy::Balanced,
        SortStrategy::Variable,
        SortStrategy::Replacement,
    ];
}

impl TryFrom<i64> for SortStrategy {
    type Error = PokedexError;

    fn try_from(code: i64) -> Result<Self> {
        match code {
            0 => Ok(SortStrategy::Balanced),
            1 => Ok(SortStrategy::Variable),
            2 => Ok(SortStrategy::Replacement),
            _ => Err(PokedexError::InvalidMethod { what: "sort", code }),
        }
    }
}

impl fmt::Display for SortStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortStrategy::Balanced => "balanced merge",
            SortStrategy::Variable => "variable-way merge",
            SortStrategy::Replacement => "replacement selection",
        };
        f.write_str(name)
    }
}

/// Field the store is ordered by
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum SortKey {
    #[default]
    Id,
    Name,
    Generation,
    Hp,
    Atk,
    Def,
    Height,
    Weight,
    ReleaseDate,
}

impl SortKey {
    pub fn compare(self, a: &Record, b: &Record) -> Ordering {
        match self {
            SortKey::Id => a.id.cmp(&b.id),
            SortKey::Name => a.name.cmp(&b.name),
            SortKey::Generation => a.generation.cmp(&b.generation),
            SortKey::Hp => a.hp.cmp(&b.hp),
            SortKey::Atk => a.atk.cmp(&b.atk),
            SortKey::Def => a.def.cmp(&b.def),
            SortKey::Height => a.height_m.total_cmp(&b.height_m),
            SortKey::Weight => a.weight_kg.total_cmp(&b.weight_kg),
            SortKey::ReleaseDate => a.release_date.cmp(&b.release_date),
        }
    }

    /// Total order used by every strategy: key, then input position
    pub fn compare_tagged(self, a: &Tagged, b: &Tagged) -> Ordering {
        self.compare(&a.1, &b.1).then(a.0.cmp(&b.0))
    }
}

impl std::str::FromStr for SortKey {
    type Err = PokedexError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "" | "id" | "numero" => Ok(SortKey::Id),
            "name" | "nome" => Ok(SortKey::Name),
            "generation" | "geracao" => Ok(SortKey::Generation),
            "hp" => Ok(SortKey::Hp),
            "atk" => Ok(SortKey::Atk),
            "def" => Ok(SortKey::Def),
            "height" | "altura" => Ok(SortKey::Height),
            "weight" | "peso" => Ok(SortKey::Weight),
            "releasedate" | "lancamento" => Ok(SortKey::ReleaseDate),
            other => Err(PokedexError::Validation(format!("unknown sort key {:?}", other))),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

// =============================================================================
// Sorter
// =============================================================================

/// What a sort did
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortReport {
    /// Runs produced by run formation
    pub initial_runs: usize,
    /// Merge passes over the runs
    pub passes: usize,
}

/// Shared state of one external sort
pub struct ExternalSorter<'a> {
    dir: PathBuf,
    config: SortConfig,
    key: SortKey,
    cancel: Option<&'a AtomicBool>,
    next_run: AtomicUsize,
}

impl<'a> ExternalSorter<'a> {
    /// Sorter writing its runs under `tmp_dir` (created if missing)
    pub fn new(tmp_dir: &Path, config: SortConfig, key: SortKey) -> Self {
        Self {
            dir: tmp_dir.to_path_buf(),
            config,
            key,
            cancel: None,
            next_run: AtomicUsize::new(0),
        }
    }

    /// Abort with `Cancelled` once `flag` is raised
    pub fn with_cancel(mut self, flag: &'a AtomicBool) -> Self {
        self.cancel = Some(flag);
        self
    }

    pub fn key(&self) -> SortKey {
        self.key
    }

    /// Sort `records` with `strategy`, returning them in order
    pub fn sort(&self, records: Vec<Record>, strategy: SortStrategy) -> Result<(Vec<Record>, SortReport)> {
        fs::create_dir_all(&self.dir)?;

        let input = records.into_iter().enumerate().map(|(i, r)| (i as u64, r));
        let result = match strategy {
            SortStrategy::Balanced => balanced::sort(self, input),
            SortStrategy::Variable => variable::sort(self, input),
            SortStrategy::Replacement => replacement::sort(self, input),
        };

        // runs are removed as they are consumed; sweep leftovers after an error
        if result.is_err() {
            self.sweep();
        }
        let (records, report) = result?;

        debug!(
            %strategy,
            key = %self.key,
            initial_runs = report.initial_runs,
            passes = report.passes,
            "External sort finished"
        );
        Ok((records, report))
    }

    pub(crate) fn check_cancel(&self) -> Result<()> {
        match self.cancel {
            Some(flag) if flag.load(AtomicOrdering::Relaxed) => Err(PokedexError::Cancelled),
            _ => Ok(()),
        }
    }

    pub(crate) fn config(&self) -> &SortConfig {
        &self.config
    }

    pub(crate) fn cmp(&self, a: &Tagged, b: &Tagged) -> Ordering {
        self.key.compare_tagged(a, b)
    }

    /// Open a fresh run file
    pub(crate) fn new_run(&self) -> Result<RunWriter> {
        let n = self.next_run.fetch_add(1, AtomicOrdering::Relaxed);
        RunWriter::create(&self.dir.join(format!("run-{:05}.tmp", n)))
    }

    /// Read the last run back and delete it
    pub(crate) fn drain(&self, run: Option<Run>) -> Result<Vec<Record>> {
        let Some(run) = run else {
            return Ok(Vec::new());
        };
        let mut out = Vec::with_capacity(run.len);
        for item in RunReader::open(&run.path)? {
            out.push(item?.1);
        }
        run.remove()?;
        Ok(out)
    }

    fn sweep(&self) {
        if let Ok(entries) = fs::read_dir(&self.dir) {
            for entry in entries.flatten() {
                if entry.file_name().to_string_lossy().starts_with("run-") {
                    let _ = fs::remove_file(entry.path());
                }
            }
        }
    }
}

/// Sort fixed-size chunks in memory and hand each to `emit`
pub(crate) fn for_each_sorted_chunk<I, F>(sorter: &ExternalSorter<'_>, input: I, mut emit: F) -> Result<()>
where
    I: Iterator<Item = Tagged>,
    F: FnMut(Vec<Tagged>) -> Result<()>,
{
    let capacity = sorter.config().run_capacity.max(1);
    let mut chunk = Vec::with_capacity(capacity);
    for item in input {
        sorter.check_cancel()?;
        chunk.push(item);
        if chunk.len() == capacity {
            chunk.sort_by(|a, b| sorter.cmp(a, b));
            emit(std::mem::replace(&mut chunk, Vec::with_capacity(capacity)))?;
        }
    }
    if !chunk.is_empty() {
        chunk.sort_by(|a, b| sorter.cmp(a, b));
        emit(chunk)?;
    }
    Ok(())
}
