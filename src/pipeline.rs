//! Top-level run sequencing: preflight, inventory, plan, stages, report.

use anyhow::{Context, Result};
use std::path::Path;
use std::time::Instant;

use crate::channel::{display_channel, unit_prefix, CHANNELS};
use crate::cli::Cli;
use crate::inventory::StageInventory;
use crate::plan::{self, WorkItem};
use crate::prompt::{Prompt, Terminal};
use crate::runstate::{RunLog, RunMarker};
use crate::settings::{Paths, Settings};
use crate::stages;

pub fn run(cli: &Cli) -> Result<()> {
    let settings = Settings::load(cli.settings.as_deref())?;
    if cli.list || cli.list_events {
        return listing(&settings, cli.list_events);
    }
    run_chain(&settings, cli.plan.as_deref())
}

/// Read-only inventory listing; missing directories count as empty.
fn listing(settings: &Settings, events: bool) -> Result<()> {
    let inventory = scan_or_empty(&settings.pluto_data(), &settings.geant_data())?;
    if events {
        println!(
            "Estimated event totals per channel (files x {} nominal events):",
            settings.nominal_events_per_file
        );
        let mut total = 0u64;
        for &channel in CHANNELS {
            let (generated, _, _) = inventory.channel_counts(channel);
            let events = generated as u64 * settings.nominal_events_per_file;
            total += events;
            println!(
                "{:<24} {:>4} files  ~{:>6} events",
                display_channel(channel, false),
                generated,
                unit_prefix(events)
            );
        }
        println!(" Total ~{} events", unit_prefix(total));
    } else {
        println!("Existing simulation files per channel:");
        println!("{:<24} {:>6} {:>6} {:>6}", "channel", "pluto", "mkin", "geant");
        let mut totals = (0usize, 0usize, 0usize);
        for &channel in CHANNELS {
            let (generated, converted, detector) = inventory.channel_counts(channel);
            totals.0 += generated;
            totals.1 += converted;
            totals.2 += detector;
            println!(
                "{:<24} {:>6} {:>6} {:>6}",
                display_channel(channel, false),
                generated,
                converted,
                detector
            );
        }
        println!(
            "{:<24} {:>6} {:>6} {:>6}",
            "total", totals.0, totals.1, totals.2
        );
    }
    Ok(())
}

fn scan_or_empty(pluto_dir: &Path, geant_dir: &Path) -> Result<StageInventory> {
    if !pluto_dir.is_dir() || !geant_dir.is_dir() {
        return Ok(StageInventory::default());
    }
    StageInventory::scan(pluto_dir, geant_dir)
}

fn run_chain(settings: &Settings, plan_file: Option<&Path>) -> Result<()> {
    let paths = Paths::resolve(settings)?;

    if settings.reconstruct {
        println!("NOTE: Reconstruction is enabled, GoAT files will be produced");
        println!("IMPORTANT: Please make sure you enabled a FinishMacro in your");
        println!("           AcquRoot analysis config file which exits AcquRoot");
        println!();
    }

    let inventory = StageInventory::scan(&paths.pluto_data, &paths.geant_data)?;

    println!("The following {} channels can be simulated:", CHANNELS.len());
    for &channel in CHANNELS {
        println!("{}", display_channel(channel, true));
    }

    let mut terminal = Terminal;
    let items = match plan_file {
        Some(path) => {
            let text = std::fs::read_to_string(path)
                .with_context(|| format!("read work plan {}", path.display()))?;
            let parsed = plan::parse_plan_text(&text, &inventory, &mut terminal)?;
            for diagnostic in &parsed.diagnostics {
                tracing::warn!("{}: {diagnostic}", path.display());
            }
            parsed.items
        }
        None => plan::build_interactive(&inventory, &mut terminal)?,
    };

    if items.is_empty() {
        println!("\nNo channels configured, nothing to do.");
        return Ok(());
    }

    let summary = plan::summarize(&items);
    println!();
    println!(
        "{} channels configured. The following simulation will take place:",
        items.len()
    );
    for line in &summary {
        println!("{line}");
    }
    println!(" Files will be stored in {}", paths.output_root.display());
    println!("Pretty rough time estimation (based on a 3.2GHz Intel Dual-Core and 4GB RAM):");
    println!("{}", plan::estimate(&items));

    // The declarative config is already an explicit instruction to run;
    // only the interactive path gets the final confirmation.
    if plan_file.is_none() {
        terminal.ask("\nStart the whole simulation process by hitting enter.")?;
    }

    execute(settings, &paths, &items, &summary)
}

fn execute(
    settings: &Settings,
    paths: &Paths,
    items: &[WorkItem],
    summary: &[String],
) -> Result<()> {
    let marker = RunMarker::new(&paths.output_root);
    let mut run_log = RunLog::create(&paths.output_root)?;
    run_log.entry(&format!(
        "{} channels configured. The following simulation will take place:",
        items.len()
    ))?;
    for line in summary {
        run_log.plain(line)?;
    }
    run_log.plain(&format!(
        " Files will be stored in {}",
        paths.output_root.display()
    ))?;

    let start_date = chrono::Local::now();
    let clock = Instant::now();

    stages::generate::run(paths, items, &marker, &mut run_log)?;
    stages::convert::run(settings, paths, items, &marker, &mut run_log)?;
    stages::detector::run(paths, items, &marker, &mut run_log)?;
    if settings.reconstruct {
        stages::reconstruct::run(paths, items, &marker, &mut run_log)?;
        stages::sortfiles::run(paths, items, &marker, &mut run_log)?;
        stages::merge::run(paths, items, &marker, &mut run_log)?;
    }

    let stop_date = chrono::Local::now();
    let elapsed = clock.elapsed();
    run_log.plain(&format!(
        "--- Finished after {:.2} seconds ---",
        elapsed.as_secs_f64()
    ))?;

    marker.clear()?;

    println!("--- {:.2} seconds ---", elapsed.as_secs_f64());
    println!(
        "Simulation for {} channels done (total {} events)",
        items.len(),
        unit_prefix(plan::total_events(items))
    );
    println!(
        "Start time: {}",
        start_date.format("%A, %e. %B %Y %H:%M:%S")
    );
    println!(
        "Stop time:  {}",
        stop_date.format("%A, %e. %B %Y %H:%M:%S")
    );
    println!("Elapsed:    {} s", elapsed.as_secs());
    println!("\n - - - F I N I S H E D - - -\n");
    Ok(())
}
