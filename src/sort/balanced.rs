//! Balanced k-way merge: fixed-size runs, fixed fan-in

use crate::error::Result;
use crate::record::Record;

use super::merge::merge_passes;
use super::{for_each_sorted_chunk, ExternalSorter, SortReport, Tagged};

pub(super) fn sort<I>(sorter: &ExternalSorter<'_>, input: I) -> Result<(Vec<Record>, SortReport)>
where
    I: Iterator<Item = Tagged>,
{
    let mut runs = Vec::new();
    for_each_sorted_chunk(sorter, input, |chunk| {
        let mut run = sorter.new_run()?;
        for item in &chunk {
            run.push(item)?;
        }
        runs.push(run.finish()?);
        Ok(())
    })?;

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
