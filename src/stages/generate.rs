//! Event generation with Pluto, driven through a throwaway ROOT script.

use anyhow::{Context, Result};
use std::fs::File;

use crate::channel::unit_prefix;
use crate::exec::ToolCommand;
use crate::naming::Stage;
use crate::plan::{total_events, WorkItem};
use crate::runstate::{RunLog, RunMarker};
use crate::settings::Paths;
use crate::stages::{banner, drive_stage};

pub const STAGE_LOG: &str = "pluto.log";

pub fn run(
    paths: &Paths,
    plan: &[WorkItem],
    marker: &RunMarker,
    run_log: &mut RunLog,
) -> Result<()> {
    banner(
        run_log,
        &format!(
            "Starting Pluto simulation for total {} events",
            unit_prefix(total_events(plan))
        ),
    )?;
    let log_path = paths.output_root.join(STAGE_LOG);
    let stage_log =
        File::create(&log_path).with_context(|| format!("create {}", log_path.display()))?;

    drive_stage(
        Stage::Generated,
        plan,
        marker,
        run_log,
        &stage_log,
        |item, sequence, stage_log, run_log| {
            let output = paths
                .pluto_data
                .join(Stage::Generated.file_name(&item.channel, sequence));
            tracing::info!(
                "Generating file {} with {} events",
                output.display(),
                item.events_per_file
            );
            run_log.entry(&format!(
                "Generating file {} with {} events",
                output.display(),
                item.events_per_file
            ))?;

            let driver = paths.generator_dir.join("sim.C");
            let body = format!(
                "sim(){{ gROOT->ProcessLine(\".x simulate.C({}, {}, \\\"{}\\\", \\\"{}\\\")\"); }}",
                item.events_per_file,
                sequence,
                item.channel,
                paths.pluto_data.display()
            );
            std::fs::write(&driver, body)
                .with_context(|| format!("write {}", driver.display()))?;

            // Pluto prints informational text to stderr, so it goes to the
            // stage log rather than being treated as an error signal.
            ToolCommand::from_words(&paths.root_command)
                .arg("sim.C")
                .current_dir(&paths.generator_dir)
                .log_stderr()
                .run(stage_log)
        },
    )?;

    banner(run_log, "Finished Pluto simulation")
}
