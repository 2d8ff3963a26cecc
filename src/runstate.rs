//! Run-state marker and aggregate run log.
//!
//! The marker file names the unit of work currently in flight. It is
//! overwritten before every unit and removed only after all stages have
//! returned, so a marker left behind after process exit is the crash
//! signal an operator looks for. Resumption itself relies purely on the
//! inventory rescan; the marker carries no machine-readable resume point.

use anyhow::{Context, Result};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

pub const MARKER_FILE: &str = "current_file";
pub const RUN_LOG_FILE: &str = "simulation.log";

pub fn timestamp() -> String {
    format!("[{}] ", chrono::Local::now().format("%Y-%m-%d %H:%M:%S"))
}

/// Marker file for the in-flight unit of work.
pub struct RunMarker {
    path: PathBuf,
}

impl RunMarker {
    pub fn new(output_root: &Path) -> RunMarker {
        RunMarker {
            path: output_root.join(MARKER_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Overwrite the marker. Failure propagates; silently losing crash
    /// visibility is not allowed.
    pub fn write(&self, text: &str) -> Result<()> {
        std::fs::write(&self.path, text)
            .with_context(|| format!("write run marker {}", self.path.display()))
    }

    /// Remove the marker after a successful run.
    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(err) => {
                Err(err).with_context(|| format!("remove run marker {}", self.path.display()))
            }
        }
    }
}

/// Append-only timestamped record of one run, flushed after each entry.
pub struct RunLog {
    file: File,
}

impl RunLog {
    pub fn create(output_root: &Path) -> Result<RunLog> {
        let path = output_root.join(RUN_LOG_FILE);
        let file =
            File::create(&path).with_context(|| format!("create run log {}", path.display()))?;
        Ok(RunLog { file })
    }

    /// Timestamped entry.
    pub fn entry(&mut self, text: &str) -> Result<()> {
        writeln!(self.file, "{}{text}", timestamp()).context("write run log entry")?;
        self.file.flush().context("flush run log")
    }

    /// Raw line without a timestamp, for summary blocks.
    pub fn plain(&mut self, text: &str) -> Result<()> {
        writeln!(self.file, "{text}").context("write run log line")?;
        self.file.flush().context("flush run log")
    }
}
