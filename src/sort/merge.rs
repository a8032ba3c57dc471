//! K-way merge of run files through a min-heap

use std::cmp::Ordering;
use std::collections::BinaryHeap;

use crate::error::Result;

use super::{ExternalSorter, Run, RunReader, SortKey, Tagged};

struct Head {
    item: Tagged,
    source: usize,
    key: SortKey,
}

impl PartialEq for Head {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Head {}

impl PartialOrd for Head {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Head {
    // reversed: BinaryHeap is a max-heap
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.compare_tagged(&other.item, &self.item)
    }
}

/// Merge `runs` into one new run, deleting the inputs
pub(crate) fn merge_runs(sorter: &ExternalSorter<'_>, runs: Vec<Run>) -> Result<Run> {
    let mut readers = Vec::with_capacity(runs.len());
    for run in &runs {
        readers.push(RunReader::open(&run.path)?);
    }

    let mut heap = BinaryHeap::with_capacity(readers.len());
    for (source, reader) in readers.iter_mut().enumerate() {
        if let Some(item) = reader.next() {
            heap.push(Head {
                item: item?,
                source,
                key: sorter.key(),
            });
        }
    }

    let mut out = sorter.new_run()?;
    while let Some(Head { item, source, key }) = heap.pop() {
        sorter.check_cancel()?;
        out.push(&item)?;
        if let Some(next) = readers[source].next() {
            heap.push(Head {
                item: next?,
                source,
                key,
            });
        }
    }

    drop(readers);
    for run in runs {
        run.remove()?;
    }
    out.finish()
}

/// Merge groups of `fan_in` runs until one is left
///
/// Returns the final run (None for empty input) and the number of passes.
pub(crate) fn merge_passes(
    sorter: &ExternalSorter<'_>,
    mut runs: Vec<Run>,
    fan_in: usize,
    smallest_first: bool,
) -> Result<(Option<Run>, usize)> {
    let fan_in = fan_in.max(2);
    let mut passes = 0;

    while runs.len() > 1 {
        if smallest_first {
            runs.sort_by_key(|r| r.len);
        }
        let mut next = Vec::with_capacity(runs.len().div_ceil(fan_in));
        let mut pending = runs.into_iter().peekable();
        while pending.peek().is_some() {
            let group: Vec<Run> = pending.by_ref().take(fan_in).collect();
            if group.len() == 1 {
                next.extend(group);
            } else {
                next.push(merge_runs(sorter, group)?);
            }
        }
        runs = next;
        passes += 1;
    }

    Ok((runs.pop(), passes))
}
