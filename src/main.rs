use clap::Parser;
use tracing_subscriber::EnvFilter;

mod channel;
mod cli;
mod exec;
mod fsguard;
mod inventory;
mod naming;
mod pipeline;
mod plan;
mod prompt;
mod runstate;
mod settings;
mod stages;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = match cli::Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let exiting_cleanly = matches!(
                err.kind(),
                clap::error::ErrorKind::DisplayHelp | clap::error::ErrorKind::DisplayVersion
            );
            let _ = err.print();
            std::process::exit(if exiting_cleanly { 0 } else { 1 });
        }
    };

    match pipeline::run(&cli) {
        Ok(()) => {}
        Err(err) if err.downcast_ref::<prompt::Aborted>().is_some() => {
            println!("\nSimulation aborted.");
        }
        Err(err) => {
            eprintln!("[ERROR] {err:#}");
            std::process::exit(1);
        }
    }
}
