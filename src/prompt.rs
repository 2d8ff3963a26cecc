//! Terminal front end for prompts and blocking confirmations.
//!
//! Decision logic never reads stdin directly; it talks to the [`Prompt`]
//! and [`crate::inventory::Confirm`] ports so tests can script answers.

use anyhow::Result;
use std::fmt;
use std::io::{self, BufRead, Write};

use crate::inventory::Confirm;

/// Sentinel error for an operator abort (closed stdin, declined start).
/// The top level downcasts it and exits 0 after an abort message.
#[derive(Debug)]
pub struct Aborted;

impl fmt::Display for Aborted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "aborted by operator")
    }
}

impl std::error::Error for Aborted {}

/// Line-input port used by the interactive plan builder.
pub trait Prompt {
    fn ask(&mut self, message: &str) -> Result<String>;
}

/// Stdin/stdout implementation of both ports.
pub struct Terminal;

impl Terminal {
    fn read_line(&self) -> Result<String> {
        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(Aborted.into());
        }
        Ok(line.trim().to_string())
    }
}

impl Prompt for Terminal {
    fn ask(&mut self, message: &str) -> Result<String> {
        print!("{message} ");
        io::stdout().flush()?;
        self.read_line()
    }
}

impl Confirm for Terminal {
    fn acknowledge(&mut self, message: &str) -> Result<()> {
        println!("\tWarning");
        println!("{message}");
        print!("Will continue by pressing enter ");
        io::stdout().flush()?;
        self.read_line().map(|_| ())
    }
}
