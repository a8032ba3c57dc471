//! Variable-way merge
//!
//! Run formation keeps runs natural: a sorted chunk whose first item does
//! not precede the tail of the open run is appended to it, so presorted
//! input collapses into a single run. The merge then picks the smallest
//! fan-in (capped at `max_fan_in`) that still finishes in the minimum
//! number of passes, and always merges the shortest runs first.

use std::cmp::Ordering;

use crate::error::Result;
use crate::record::Record;

use super::merge::merge_passes;
use super::{for_each_sorted_chunk, ExternalSorter, RunWriter, SortReport, Tagged};

pub(super) fn sort<I>(sorter: &ExternalSorter<'_>, input: I) -> Result<(Vec<Record>, SortReport)>
where
    I: Iterator<Item = Tagged>,
{
    let mut runs = Vec::new();
    let mut open: Option<(RunWriter, Tagged)> = None;

    for_each_sorted_chunk(sorter, input, |chunk| {
        let (Some(first), Some(last)) = (chunk.first(), chunk.last()) else {
            return Ok(());
        };
        let continues = matches!(
            &open,
            Some((_, tail)) if sorter.cmp(tail, first) != Ordering::Greater
        );
        if !continues {
            if let Some((writer, _)) = open.take() {
                runs.push(writer.finish()?);
            }
        }
        let tail = last.clone();
        let mut writer = match open.take() {
            Some((writer, _)) => writer,
            None => sorter.new_run()?,
        };
        for item in &chunk {
            writer.push(item)?;
        }
        open = Some((writer, tail));
        Ok(())
    })?;
    if let Some((writer, _)) = open {
        runs.push(writer.finish()?);
    }

    let initial_runs = runs.len();
    let fan_in = choose_fan_in(initial_runs, sorter.config().max_fan_in);
    let (last, passes) = merge_passes(sorter, runs, fan_in, true)?;
    Ok((
        sorter.drain(last)?,
        SortReport {
            initial_runs,
            passes,
        },
    ))
}

/// Smallest fan-in in `2..=max_fan_in` reaching the pass count of `max_fan_in`
pub(crate) fn choose_fan_in(runs: usize, max_fan_in: usize) -> usize {
    let max_fan_in = max_fan_in.max(2);
    if runs <= 1 {
        return max_fan_in;
    }
    let target = passes_needed(runs, max_fan_in);
    (2..=max_fan_in)
        .find(|&k| passes_needed(runs, k) == target)
        .unwrap_or(max_fan_in)
}

fn passes_needed(mut runs: usize, fan_in: usize) -> usize {
    let mut passes = 0;
    while runs > 1 {
        runs = runs.div_ceil(fan_in);
        passes += 1;
    }
    passes
}
