//! Particle reconstruction with AcquRoot.
//!
//! AcquRoot takes its input file from a `TreeFile:` line in its config,
//! so the driver rewrites that single line before every invocation. The
//! driver and the engine are coupled through this file; reconstruction is
//! strictly serial and the rewrite goes through a temp file plus atomic
//! rename so no reader ever sees a partial config.

use anyhow::{anyhow, Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::exec::{ToolCommand, WorkingDir};
use crate::naming::Stage;
use crate::plan::WorkItem;
use crate::runstate::{RunLog, RunMarker};
use crate::settings::Paths;
use crate::stages::{banner, drive_stage};

pub const STAGE_LOG: &str = "acqu.log";
const DERIVED_CONFIG: &str = "AR.sim_chain";

pub fn run(
    paths: &Paths,
    plan: &[WorkItem],
    marker: &RunMarker,
    run_log: &mut RunLog,
) -> Result<()> {
    banner(
        run_log,
        " - - - Starting particle reconstruction with AcquRoot - - - ",
    )?;
    let config = prepare_config(paths)?;
    let config_arg = match Path::new(&paths.acqu_config).parent() {
        Some(dir) if !dir.as_os_str().is_empty() => {
            format!("{}/{DERIVED_CONFIG}", dir.display())
        }
        _ => DERIVED_CONFIG.to_string(),
    };
    let log_path = paths.output_root.join(STAGE_LOG);
    let stage_log =
        File::create(&log_path).with_context(|| format!("create {}", log_path.display()))?;

    let cwd_guard = WorkingDir::change_to(&paths.acqu_user)?;
    drive_stage(
        Stage::Reconstructed,
        plan,
        marker,
        run_log,
        &stage_log,
        |item, sequence, stage_log, run_log| {
            let input = paths
                .geant_data
                .join(Stage::DetectorSim.file_name(&item.channel, sequence));
            tracing::info!("Reconstructing file {}", input.display());
            run_log.entry(&format!("Reconstructing file {}", input.display()))?;

            replace_line(
                &config,
                "TreeFile:",
                &format!("TreeFile:\t{}", input.display()),
            )?;
            ToolCommand::new(paths.acqu_bin.join("AcquRoot"))
                .arg(&config_arg)
                .run(stage_log)
        },
    )?;
    drop(cwd_guard);

    banner(run_log, "Finished particle reconstruction")
}

/// Derive the chain's own AcquRoot config from the operator's template.
///
/// A fresh copy drops any existing `TreeFile:`/`Directory:` lines and
/// appends the chain's output directory plus a `TreeFile:` placeholder;
/// an existing derived config only gets its `Directory:` line refreshed.
pub(crate) fn prepare_config(paths: &Paths) -> Result<PathBuf> {
    let original = paths.acqu_user.join(&paths.acqu_config);
    let config_dir = original
        .parent()
        .ok_or_else(|| anyhow!("AcquRoot config has no parent directory"))?;
    let derived = config_dir.join(DERIVED_CONFIG);

    if derived.is_file() {
        replace_line(
            &derived,
            "Directory:",
            &format!("Directory:\t{}", paths.acqu_data.display()),
        )?;
        return Ok(derived);
    }

    let template = std::fs::read_to_string(&original)
        .with_context(|| format!("read {}", original.display()))?;
    let mut text = String::new();
    for line in template.lines() {
        if line.contains("TreeFile:") || line.contains("Directory:") {
            continue;
        }
        text.push_str(line);
        text.push('\n');
    }
    text.push_str(&format!("\nDirectory:\t{}\n", paths.acqu_data.display()));
    text.push_str("\nTreeFile:\tpath/file.root\n");
    write_atomic(&derived, &text)?;
    Ok(derived)
}

/// Replace every line containing `needle` with `replacement`, writing the
/// result to a temp file and renaming it over the original.
pub(crate) fn replace_line(path: &Path, needle: &str, replacement: &str) -> Result<()> {
    let original =
        std::fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let mut text = String::new();
    for line in original.lines() {
        if line.contains(needle) {
            text.push_str(replacement);
        } else {
            text.push_str(line);
        }
        text.push('\n');
    }
    write_atomic(path, &text)
}

fn write_atomic(path: &Path, text: &str) -> Result<()> {
    let dir = path
        .parent()
        .ok_or_else(|| anyhow!("no parent directory for {}", path.display()))?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)
        .with_context(|| format!("create temp file in {}", dir.display()))?;
    tmp.write_all(text.as_bytes())
        .with_context(|| format!("write temp file for {}", path.display()))?;
    tmp.persist(path)
        .map_err(|err| err.error)
        .with_context(|| format!("replace {}", path.display()))?;
    Ok(())
}
