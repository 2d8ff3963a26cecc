//! Particle sorting with GoAT.
//!
//! Unlike reconstruction there is no shared mutable config: input and
//! output directories are passed as flags, one invocation per file.

use anyhow::{Context, Result};
use std::fs::File;

use crate::exec::{ToolCommand, WorkingDir};
use crate::naming::Stage;
use crate::plan::WorkItem;
use crate::runstate::{RunLog, RunMarker};
use crate::settings::Paths;
use crate::stages::{banner, drive_stage};

pub const STAGE_LOG: &str = "goat.log";

pub fn run(
    paths: &Paths,
    plan: &[WorkItem],
    marker: &RunMarker,
    run_log: &mut RunLog,
) -> Result<()> {
    banner(run_log, " - - - Starting GoAT particle sorting - - - ")?;
    let log_path = paths.output_root.join(STAGE_LOG);
    let stage_log =
        File::create(&log_path).with_context(|| format!("create {}", log_path.display()))?;

    let cwd_guard = WorkingDir::change_to(&paths.goat_path)?;
    drive_stage(
        Stage::Sorted,
        plan,
        marker,
        run_log,
        &stage_log,
        |item, sequence, stage_log, run_log| {
            let input = Stage::Reconstructed.file_name(&item.channel, sequence);
            tracing::info!("Processing file {}/{input}", paths.acqu_data.display());
            run_log.entry(&format!(
                "Processing file {}/{input}",
                paths.acqu_data.display()
            ))?;

            ToolCommand::new(paths.goat_bin.join("goat"))
                .arg(&paths.goat_config)
                .arg("-d")
                .arg(&paths.acqu_data)
                .arg("-D")
                .arg(&paths.goat_data)
                .arg("-f")
                .arg(&input)
                .run(stage_log)
        },
    )?;
    drop(cwd_guard);

    banner(run_log, "Finished particle sorting")
}
