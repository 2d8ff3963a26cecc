//! Stage drivers: one module per pipeline phase, sharing a common loop.
//!
//! Every driver walks the work plan in order and, for each sequence number
//! in an item's range, records the in-flight unit in the run marker,
//! appends a run-log entry, invokes exactly one external process and
//! inspects its exit code. A non-zero exit is logged as critical and the
//! loop continues; one bad file must not abort a multi-day batch.

use anyhow::Result;
use std::fs::File;

use crate::channel::display_channel;
use crate::naming::Stage;
use crate::plan::WorkItem;
use crate::runstate::{timestamp, RunLog, RunMarker};

pub mod convert;
pub mod detector;
pub mod generate;
pub mod merge;
pub mod reconstruct;
pub mod sortfiles;

/// Walk the plan and run `per_file` once per (channel, sequence) pair.
///
/// The closure returns the subprocess exit code; everything else about
/// the outcome handling is shared across stages.
pub(crate) fn drive_stage<F>(
    stage: Stage,
    plan: &[WorkItem],
    marker: &RunMarker,
    run_log: &mut RunLog,
    stage_log: &File,
    mut per_file: F,
) -> Result<()>
where
    F: FnMut(&WorkItem, u32, &File, &mut RunLog) -> Result<i32>,
{
    for (index, item) in plan.iter().enumerate() {
        let pretty = display_channel(&item.channel, false);
        println!("Processing channel {pretty}");
        run_log.plain("")?;
        run_log.entry(&format!("Processing channel {pretty}"))?;
        for sequence in item.sequence_range() {
            let current = format!(
                "{}{}, channel {} ({}/{}), file {:02} ({}/{})",
                timestamp(),
                stage.describe(),
                item.channel,
                index + 1,
                plan.len(),
                sequence,
                sequence - item.start_sequence,
                item.file_count
            );
            marker.write(&current)?;
            let code = per_file(item, sequence, stage_log, run_log)?;
            if code != 0 {
                tracing::error!(
                    "Non-zero return code ({code}), something might have gone wrong"
                );
                run_log.entry(&format!(
                    "Non-zero return code ({code}), something might have gone wrong"
                ))?;
            }
        }
    }
    Ok(())
}

/// Stage banner printed to the terminal and mirrored into the run log.
pub(crate) fn banner(run_log: &mut RunLog, text: &str) -> Result<()> {
    println!("\n{text}\n");
    run_log.plain("")?;
    run_log.entry(text)
}
