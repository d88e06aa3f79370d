//! scriptvol CLI library.
//!
//! Exposes the argument definitions, commands and formatters behind the
//! `scriptvol` binary so they can be tested without spawning a process.

#![deny(unsafe_code)]
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod commands;
pub mod formatters;
pub mod runner;
pub mod session;
pub mod types;

pub use cli::{Cli, Commands};
pub use runner::{execute_command, init_logging};
pub use session::{Session, SessionOptions};
pub use types::{ExitCode, OutputFormat};
