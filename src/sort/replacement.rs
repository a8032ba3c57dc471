//! Replacement selection
//!
//! A heap of `heap_capacity` tagged records emits the smallest item whose
//! run tag matches the open run. An incoming item smaller than the last
//! one written is tagged for the next run. On random input runs average
//! about twice the heap size.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;

use crate::error::Result;
use crate::record::Record;

use super::merge::merge_passes;
use super::{ExternalSorter, RunWriter, SortKey, SortReport, Tagged};

struct Entry {
    run: usize,
    item: Tagged,
    key: SortKey,
}

impl PartialEq for Entry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Entry {}

impl PartialOrd for Entry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Entry {
    fn cmp(&self, other: &Self) -> Ordering {
        self.run
            .cmp(&other.run)
            .then_with(|| self.key.compare_tagged(&self.item, &other.item))
    }
}

pub(super) fn sort<I>(sorter: &ExternalSorter<'_>, mut input: I) -> Result<(Vec<Record>, SortReport)>
where
    I: Iterator<Item = Tagged>,
{
    let key = sorter.key();
    let capacity = sorter.config().heap_capacity.max(1);
    let mut heap: BinaryHeap<Reverse<Entry>> = BinaryHeap::with_capacity(capacity);
    for item in input.by_ref().take(capacity) {
        heap.push(Reverse(Entry { run: 0, item, key }));
    }

    let mut runs = Vec::new();
    let mut current = 0;
    let mut writer: Option<RunWriter> = None;

    while let Some(Reverse(Entry { run, item, .. })) = heap.pop() {
        sorter.check_cancel()?;
        if run != current || writer.is_none() {
            if let Some(done) = writer.take() {
                runs.push(done.finish()?);
            }
            current = run;
            writer = Some(sorter.new_run()?);
        }
        if let Some(w) = writer.as_mut() {
            w.push(&item)?;
        }

        if let Some(next) = input.next() {
            let tag = if sorter.cmp(&next, &item) == Ordering::Less {
                current + 1
            } else {
                current
            };
            heap.push(Reverse(Entry {
                run: tag,
                item: next,
                key,
            }));
        }
    }
    if let Some(done) = writer {
        runs.push(done.finish()?);
    }

    let initial_runs = runs.len();
    let (last, passes) = merge_passes(sorter, runs, sorter.config().fan_in, false)?;
    Ok((
        sorter.drain(last)?,
        SortReport {
            initial_runs,
            passes,
        },
    ))
}
