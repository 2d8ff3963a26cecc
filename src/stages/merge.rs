//! Merge sorted, generated and detector outputs into one file per
//! sequence number with hadd.

use anyhow::{Context, Result};
use std::fs::File;

use crate::exec::{ToolCommand, WorkingDir};
use crate::naming::Stage;
use crate::plan::WorkItem;
use crate::runstate::{RunLog, RunMarker};
use crate::settings::Paths;
use crate::stages::{banner, drive_stage};

pub const STAGE_LOG: &str = "hadd.log";

pub fn run(
    paths: &Paths,
    plan: &[WorkItem],
    marker: &RunMarker,
    run_log: &mut RunLog,
) -> Result<()> {
    banner(run_log, " - - - Start merging root files - - - ")?;
    let log_path = paths.output_root.join(STAGE_LOG);
    let stage_log =
        File::create(&log_path).with_context(|| format!("create {}", log_path.display()))?;

    let cwd_guard = WorkingDir::change_to(&paths.output_root)?;
    drive_stage(
        Stage::Merged,
        plan,
        marker,
        run_log,
        &stage_log,
        |item, sequence, stage_log, run_log| {
            let output = paths
                .merged_data
                .join(Stage::Merged.file_name(&item.channel, sequence));
            tracing::info!("Merging file {}", output.display());
            run_log.entry(&format!("Merging file {}", output.display()))?;

            // hadd complains about the missing PParticle dictionary on
            // stderr; capture it in the stage log instead of failing.
            ToolCommand::from_words(&paths.hadd_command)
                .arg(&output)
                .arg(
                    paths
                        .goat_data
                        .join(Stage::Sorted.file_name(&item.channel, sequence)),
                )
                .arg(
                    paths
                        .pluto_data
                        .join(Stage::Generated.file_name(&item.channel, sequence)),
                )
                .arg(
                    paths
                        .geant_data
                        .join(Stage::DetectorSim.file_name(&item.channel, sequence)),
                )
                .log_stderr()
                .run(stage_log)
        },
    )?;
    drop(cwd_guard);

    banner(run_log, "Finished merging files")
}
