//! `cp` and `mv` across volumes.

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use crate::formatters::format_output;
use crate::session::Session;
use crate::types::{ExitCode, OutputFormat};

/// Outcome of a copy or move.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct TransferReport {
    /// `copy` or `move`
    pub operation: &'static str,
    /// Resolved source
    pub from: String,
    /// Resolved destination
    pub to: String,
    /// `false` when the destination ran out of room
    pub completed: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Transfer {
    Copy,
    Move,
}

impl Transfer {
    const fn as_str(self) -> &'static str {
        match self {
            Self::Copy => "copy",
            Self::Move => "move",
        }
    }
}

fn transfer(
    session: &Session,
    kind: Transfer,
    source: &str,
    destination: &str,
    output_format: OutputFormat,
) -> Result<ExitCode> {
    let from = session.resolve(source)?;
    let to = session.resolve(destination)?;
    let manager = session.manager();

    let outcome = match kind {
        Transfer::Copy => manager.copy(&from, &to, true),
        Transfer::Move => manager.move_path(&from, &to),
    };
    // A partial tree copy still changed the destination.
    session.persist()?;
    let completed = outcome.with_context(|| format!("failed to {} '{source}' to '{destination}'", kind.as_str()))?;

    let report = TransferReport {
        operation: kind.as_str(),
        from: from.to_string(),
        to: to.to_string(),
        completed,
    };
    println!("{}", format_output(&report, output_format)?);

    if completed {
        info!("Finished {} of {from} to {to}", kind.as_str());
        Ok(ExitCode::SUCCESS)
    } else {
        warn!("Not enough room to {} {from} to {to}", kind.as_str());
        Ok(ExitCode::NO_ROOM)
    }
}

/// Runs the `cp` command.
///
/// # Errors
///
/// Returns an error if the source is missing or the copy is illegal, such
/// as a directory into its own subdirectory.
pub fn cp(session: &Session, source: &str, destination: &str, output_format: OutputFormat) -> Result<ExitCode> {
    transfer(session, Transfer::Copy, source, destination, output_format)
}

/// Runs the `mv` command.
///
/// # Errors
///
/// Returns an error if the source is missing, is a volume root, or the
/// source could not be deleted after copying.
pub fn mv(session: &Session, source: &str, destination: &str, output_format: OutputFormat) -> Result<ExitCode> {
    transfer(session, Transfer::Move, source, destination, output_format)
}
