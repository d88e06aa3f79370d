//! CLI argument definitions and parsing.
//!
//! Defines the command-line interface structure using clap:
//! - `Cli` - Main CLI entry point
//! - `Commands` - Available subcommands

use clap::{Parser, Subcommand};
use clap_complete::Shell;
use std::path::PathBuf;

/// Inspect and edit scriptvol volumes.
///
/// Paths are `[VOLUME:]PATH`, where VOLUME is a volume id or name. Paths
/// without a volume are resolved against the current directory.
#[derive(Parser, Debug)]
#[command(name = "scriptvol")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (default: <config dir>/scriptvol/config.toml)
    #[arg(long, global = true, env = "SCRIPTVOL_CONFIG")]
    pub config: Option<PathBuf>,

    /// Volume id or name to start in
    #[arg(long, global = true)]
    pub volume: Option<String>,

    /// Directory to start in
    #[arg(long = "cd", global = true)]
    pub directory: Option<String>,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format (json, text, pretty)
    #[arg(long = "format", global = true, default_value = "pretty")]
    pub format: String,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List mounted volumes.
    ///
    /// Shows id, name, capacity and usage of every volume along with the
    /// current directory and the total power draw.
    Volumes,

    /// List a directory.
    ///
    /// # Examples
    ///
    /// ```bash
    /// scriptvol ls
    /// scriptvol ls scratch:/lib
    /// ```
    Ls {
        /// Directory to list (default: current directory)
        path: Option<String>,
    },

    /// Print a file.
    ///
    /// Without an extension, `boot` finds `boot.ks` or `boot.ksm`.
    Cat {
        /// File to print
        path: String,

        /// Prefer the compiled file when guessing the extension
        #[arg(long)]
        compiled: bool,
    },

    /// Write text to a file, creating it and its parents.
    ///
    /// # Examples
    ///
    /// ```bash
    /// scriptvol write /boot.ks "print 1."
    /// scriptvol write /log.txt "line" --append
    /// ```
    Write {
        /// File to write
        path: String,

        /// Text to write
        text: String,

        /// Append instead of replacing the content
        #[arg(long)]
        append: bool,

        /// Skip the free space check
        #[arg(long)]
        no_verify: bool,
    },

    /// Create a directory and its parents.
    Mkdir {
        /// Directory to create
        path: String,
    },

    /// Create an empty file unless something is already there.
    Touch {
        /// File to create
        path: String,
    },

    /// Delete a file or a directory tree.
    Rm {
        /// Item to delete
        path: String,

        /// Prefer the compiled file when guessing the extension
        #[arg(long)]
        compiled: bool,
    },

    /// Copy a file or directory tree, possibly across volumes.
    ///
    /// A directory copied onto an existing directory lands inside it.
    Cp {
        /// Source item
        source: String,

        /// Destination
        destination: String,
    },

    /// Move a file or directory tree, possibly across volumes.
    Mv {
        /// Source item
        source: String,

        /// Destination
        destination: String,
    },

    /// Show details about a file or directory.
    Stat {
        /// Item to inspect
        path: String,
    },

    /// Rename a volume.
    RenameVolume {
        /// Volume id or current name
        volume: String,

        /// New name
        name: String,
    },

    /// Generate shell completions.
    ///
    /// Generates completion scripts for various shells that can be
    /// sourced or saved to enable tab completion for this CLI.
    Completions {
        /// Target shell for completion generation
        #[arg(value_enum)]
        shell: Shell,
    },
}
