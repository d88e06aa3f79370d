//! Shell completion generation command.
//!
//! Generates shell completion scripts for bash, zsh, fish, and `PowerShell`.

use anyhow::Result;
use clap::Command;
use clap_complete::{Shell, generate};
use std::io::{self, Write};
use tracing::info;

use crate::types::ExitCode;

/// Writes the completion script for `shell` to `out`.
///
/// # Examples
///
/// ```
/// use clap::Command;
/// use clap_complete::Shell;
/// use scriptvol_cli::commands::completions;
///
/// let mut script = Vec::new();
/// completions::generate_completions(Shell::Bash, &mut Command::new("scriptvol"), &mut script);
/// assert!(!script.is_empty());
/// ```
pub fn generate_completions(shell: Shell, cmd: &mut Command, out: &mut dyn Write) {
    info!("Generating {shell} completions");
    let name = cmd.get_name().to_string();
    generate(shell, cmd, name, out);
}

/// Runs the completions command, printing the script to stdout.
///
/// # Errors
///
/// Never fails; the `Result` keeps the command signatures uniform.
pub fn run(shell: Shell, cmd: &mut Command) -> Result<ExitCode> {
    generate_completions(shell, cmd, &mut io::stdout());
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;
    use clap::CommandFactory;

    fn script(shell: Shell) -> String {
        let mut out = Vec::new();
        generate_completions(shell, &mut Cli::command(), &mut out);
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_generate_completions_bash() {
        let script = script(Shell::Bash);
        assert!(script.contains("scriptvol"));
        assert!(script.contains("rename-volume"));
    }

    #[test]
    fn test_generate_completions_zsh() {
        assert!(script(Shell::Zsh).contains("#compdef scriptvol"));
    }

    #[test]
    fn test_generate_completions_fish() {
        assert!(script(Shell::Fish).contains("complete -c scriptvol"));
    }

    #[test]
    fn test_generate_completions_powershell() {
        assert!(!script(Shell::PowerShell).is_empty());
    }
}
