//! Command execution and runtime logic.
//!
//! Contains the command dispatch and logging initialization.

use anyhow::Result;
use clap::CommandFactory;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::{Cli, Commands};
use crate::commands;
use crate::session::{Session, SessionOptions};
use crate::types::{ExitCode, OutputFormat};

/// Initializes logging infrastructure.
///
/// `RUST_LOG` picks the filter, defaulting to `info`. The verbose flag
/// forces `debug`. Logs go to stderr so command output stays clean.
///
/// # Errors
///
/// Returns an error if a global subscriber is already installed.
pub fn init_logging(verbose: bool) -> Result<()> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()?;

    Ok(())
}

/// Executes the specified CLI command.
///
/// Every command except `completions` runs against a freshly mounted
/// session.
///
/// # Errors
///
/// Returns an error if mounting or the command fails.
pub fn execute_command(command: Commands, options: &SessionOptions, output_format: OutputFormat) -> Result<ExitCode> {
    if let Commands::Completions { shell } = &command {
        let mut cmd = Cli::command();
        return commands::completions::run(*shell, &mut cmd);
    }

    let session = Session::open(options)?;
    match command {
        Commands::Volumes => commands::volumes::run(&session, output_format),
        Commands::Ls { path } => commands::files::ls(&session, path.as_deref(), output_format),
        Commands::Cat { path, compiled } => commands::files::cat(&session, &path, compiled, output_format),
        Commands::Write {
            path,
            text,
            append,
            no_verify,
        } => commands::files::write(&session, &path, &text, append, !no_verify, output_format),
        Commands::Mkdir { path } => commands::files::mkdir(&session, &path, output_format),
        Commands::Touch { path } => commands::files::touch(&session, &path, output_format),
        Commands::Rm { path, compiled } => commands::files::rm(&session, &path, compiled, output_format),
        Commands::Cp { source, destination } => commands::transfer::cp(&session, &source, &destination, output_format),
        Commands::Mv { source, destination } => commands::transfer::mv(&session, &source, &destination, output_format),
        Commands::Stat { path } => commands::files::stat(&session, &path, output_format),
        Commands::RenameVolume { volume, name } => commands::volumes::rename(&session, &volume, &name, output_format),
        Commands::Completions { .. } => Ok(ExitCode::SUCCESS),
    }
}
