//! Geant4 detector simulation.
//!
//! The A2 binary resolves its macros relative to its install root, so the
//! whole stage runs with the working directory changed there; the guard
//! restores it on every exit path.

use anyhow::{Context, Result};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use crate::exec::{ToolCommand, WorkingDir};
use crate::naming::Stage;
use crate::plan::WorkItem;
use crate::runstate::{RunLog, RunMarker};
use crate::settings::Paths;
use crate::stages::{banner, drive_stage};

pub const STAGE_LOG: &str = "geant.log";

pub fn run(
    paths: &Paths,
    plan: &[WorkItem],
    marker: &RunMarker,
    run_log: &mut RunLog,
) -> Result<()> {
    banner(run_log, " - - - Starting detector simulation - - - ")?;
    let log_path = paths.output_root.join(STAGE_LOG);
    let stage_log =
        File::create(&log_path).with_context(|| format!("create {}", log_path.display()))?;

    // The macro template dir may be relative; pin it down before chdir.
    let macro_dir = absolute(&paths.macro_dir)?;
    let run_macro = paths.geant_path.join("macros").join("g4run_multi.mac");

    let cwd_guard = WorkingDir::change_to(&paths.geant_path)?;
    drive_stage(
        Stage::DetectorSim,
        plan,
        marker,
        run_log,
        &stage_log,
        |item, sequence, stage_log, run_log| {
            let input = paths
                .pluto_data
                .join(Stage::Generated.file_name(&item.channel, sequence));
            tracing::info!("Performing simulation for file {}", input.display());
            run_log.entry(&format!(
                "Performing simulation for file {}",
                input.display()
            ))?;

            let template = macro_dir.join(format!("g4run_{}.mac", item.channel));
            std::fs::copy(&template, &run_macro).with_context(|| {
                format!(
                    "copy macro {} to {}",
                    template.display(),
                    run_macro.display()
                )
            })?;
            let mut macro_file = OpenOptions::new()
                .append(true)
                .open(&run_macro)
                .with_context(|| format!("open {}", run_macro.display()))?;
            writeln!(
                macro_file,
                "/A2/generator/InputFile {}",
                paths
                    .pluto_data
                    .join(Stage::Converted.file_name(&item.channel, sequence))
                    .display()
            )?;
            writeln!(
                macro_file,
                "/A2/event/setOutputFile {}",
                paths
                    .geant_data
                    .join(Stage::DetectorSim.file_name(&item.channel, sequence))
                    .display()
            )?;
            drop(macro_file);

            // Geant prints warnings to stderr; keep them in the stage log.
            ToolCommand::new(paths.geant_path.join("A2"))
                .arg("macros/vis.mac")
                .log_stderr()
                .run(stage_log)
        },
    )?;
    drop(cwd_guard);

    banner(run_log, "Finished the detector simulation")
}

fn absolute(path: &std::path::Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf())
    } else {
        Ok(std::env::current_dir()
            .context("read working directory")?
            .join(path))
    }
}
