//! Blocking external process invocation.
//!
//! Every stage drives exactly one subprocess per file and consumes only
//! its exit code; stdout goes to the stage log, and stderr joins it for
//! the tools known to write informational text there.

use anyhow::{Context, Result};
use std::ffi::OsStr;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::Instant;

/// One external invocation with its log routing.
pub struct ToolCommand {
    program: PathBuf,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    /// Route stderr into the stage log; used for tools that emit
    /// informational noise there rather than true errors.
    log_stderr: bool,
}

impl ToolCommand {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        ToolCommand {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
            log_stderr: false,
        }
    }

    /// Build from a configured command line (program plus leading args).
    pub fn from_words(words: &[String]) -> Self {
        let mut command = ToolCommand::new(&words[0]);
        for word in &words[1..] {
            command = command.arg(word);
        }
        command
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    pub fn log_stderr(mut self) -> Self {
        self.log_stderr = true;
        self
    }

    pub fn describe(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().cloned());
        parts.join(" ")
    }

    /// Run to completion with stdout captured into the stage log.
    ///
    /// Returns the exit code; a signal termination is reported as -1 so
    /// callers treat it like any other failed file.
    pub fn run(&self, log: &File) -> Result<i32> {
        let mut command = Command::new(&self.program);
        command.args(&self.args);
        if let Some(cwd) = &self.cwd {
            command.current_dir(cwd);
        }
        command.stdout(Stdio::from(log.try_clone().context("clone stage log handle")?));
        if self.log_stderr {
            command.stderr(Stdio::from(log.try_clone().context("clone stage log handle")?));
        }

        let start = Instant::now();
        let status = command
            .status()
            .with_context(|| format!("run {}", self.describe()))?;
        let elapsed_ms = start.elapsed().as_millis();
        let code = status.code().unwrap_or(-1);
        tracing::debug!(elapsed_ms, code, command = %self.describe(), "subprocess finished");
        Ok(code)
    }
}

/// RAII guard around the process working directory.
///
/// Some tools resolve their macros relative to their install root, so a
/// stage must chdir for its whole duration; the guard restores the
/// original directory on every exit path, early warnings included.
pub struct WorkingDir {
    original: PathBuf,
}

impl WorkingDir {
    pub fn change_to(dir: &Path) -> Result<WorkingDir> {
        let original = std::env::current_dir().context("read working directory")?;
        std::env::set_current_dir(dir)
            .with_context(|| format!("change working directory to {}", dir.display()))?;
        Ok(WorkingDir { original })
    }
}

impl Drop for WorkingDir {
    fn drop(&mut self) {
        if let Err(err) = std::env::set_current_dir(&self.original) {
            tracing::error!(
                dir = %self.original.display(),
                "failed to restore working directory: {err}"
            );
        }
    }
}
