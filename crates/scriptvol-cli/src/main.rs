//! scriptvol command-line interface.
//!
//! Inspects and edits the volumes described by the storage configuration.
//!
//! # Examples
//!
//! ```bash
//! # List volumes
//! scriptvol volumes
//!
//! # Copy a directory from the archive to a harddisk
//! scriptvol cp /lib scratch:/
//!
//! # Print a script, guessing its extension
//! scriptvol --volume scratch cat boot
//! ```

use anyhow::Result;
use clap::Parser;
use scriptvol_cli::{Cli, ExitCode, OutputFormat, SessionOptions, execute_command, init_logging};

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose)?;

    let output_format = cli.format.parse::<OutputFormat>()?;
    let options = SessionOptions {
        config: cli.config,
        volume: cli.volume,
        directory: cli.directory,
    };

    let exit_code = execute_command(cli.command, &options, output_format).unwrap_or_else(|err| {
        eprintln!("Error: {err:#}");
        ExitCode::from_error(&err)
    });

    std::process::exit(exit_code.as_i32());
}
