//! Conversion of Pluto output into the mkin format Geant4 reads.

use anyhow::{Context, Result};
use std::fs::File;

use crate::exec::ToolCommand;
use crate::naming::Stage;
use crate::plan::{total_files, WorkItem};
use crate::runstate::{RunLog, RunMarker};
use crate::settings::{Paths, Settings};
use crate::stages::{banner, drive_stage};

pub const STAGE_LOG: &str = "mkin.log";

pub fn run(
    settings: &Settings,
    paths: &Paths,
    plan: &[WorkItem],
    marker: &RunMarker,
    run_log: &mut RunLog,
) -> Result<()> {
    banner(
        run_log,
        &format!(
            "Conversion of the {} Pluto-generated files",
            total_files(plan)
        ),
    )?;
    let converter = paths.geant_path.join("pluto2mkin");
    let log_path = paths.output_root.join(STAGE_LOG);
    let stage_log =
        File::create(&log_path).with_context(|| format!("create {}", log_path.display()))?;

    drive_stage(
        Stage::Converted,
        plan,
        marker,
        run_log,
        &stage_log,
        |item, sequence, stage_log, _run_log| {
            let input = paths
                .pluto_data
                .join(Stage::Generated.file_name(&item.channel, sequence));
            let mut command = ToolCommand::new(&converter).arg("--input").arg(&input);
            if settings.smear_vertex {
                // Uniform smearing along the target, gaussian across the
                // beam spot.
                command = command
                    .arg("--target")
                    .arg(format!("length={}", settings.target_length_cm))
                    .arg("--beam")
                    .arg(format!("diam={}", settings.beam_diameter_cm));
            }
            // The converter warns about a missing PParticle dictionary on
            // stderr; that noise belongs in the stage log.
            let code = command.log_stderr().run(stage_log)?;

            // pluto2mkin writes next to the process cwd; relocate its
            // output into the channel directory or later stages will not
            // find it.
            let converted = Stage::Converted.file_name(&item.channel, sequence);
            let produced = std::env::current_dir()
                .context("read working directory")?
                .join(&converted);
            if produced.is_file() {
                let dest = paths.pluto_data.join(&converted);
                std::fs::rename(&produced, &dest).with_context(|| {
                    format!("move {} to {}", produced.display(), dest.display())
                })?;
            } else if code == 0 {
                tracing::error!("converter did not produce {converted}");
            }
            Ok(code)
        },
    )?;

    banner(run_log, "Finished converting the files")
}
