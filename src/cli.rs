//! CLI argument parsing for the simulation chain driver.
//!
//! The surface is deliberately small: no argument means interactive
//! planning, one positional argument points at a declarative work plan,
//! and the listing flags are read-only queries. Anything else is a usage
//! error.

use clap::Parser;
use std::path::PathBuf;

/// Root CLI for the simulation chain.
#[derive(Parser, Debug)]
#[command(
    name = "simchain",
    version,
    about = "Serial batch driver for the A2 Monte Carlo simulation chain",
    after_help = "Examples:\n  simchain                 Plan interactively, then run the chain\n  simchain plan.txt        Run the plan from a declarative config\n  simchain --list          Show existing files per channel and stage\n  simchain --list-events   Show estimated event totals per channel"
)]
pub struct Cli {
    /// Declarative work plan: one '<channel> <files> <events>' per line
    #[arg(value_name = "PLAN", conflicts_with_all = ["list", "list_events"])]
    pub plan: Option<PathBuf>,

    /// List existing simulation files per channel and stage
    #[arg(long, conflicts_with = "list_events")]
    pub list: bool,

    /// List estimated total event counts per channel
    #[arg(long)]
    pub list_events: bool,

    /// Settings file (JSON); defaults to simchain.json when present
    #[arg(long, value_name = "FILE", env = "SIMCHAIN_SETTINGS")]
    pub settings: Option<PathBuf>,
}
