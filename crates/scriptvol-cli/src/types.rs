//! CLI-specific types.
//!
//! # Examples
//!
//! ```
//! use scriptvol_cli::types::{ExitCode, OutputFormat};
//!
//! let format: OutputFormat = "json".parse().unwrap();
//! assert_eq!(format.as_str(), "json");
//! assert!(ExitCode::SUCCESS.is_success());
//! ```

use std::fmt;
use std::str::FromStr;

use scriptvol::VolumeError;

/// CLI output format.
///
/// All formats carry the same information with different presentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum OutputFormat {
    /// JSON output for machine parsing
    Json,
    /// Plain text output for scripts
    Text,
    /// Pretty-printed output with colors for human reading
    #[default]
    Pretty,
}

impl OutputFormat {
    /// Returns the string representation of the format.
    ///
    /// # Examples
    ///
    /// ```
    /// use scriptvol_cli::types::OutputFormat;
    ///
    /// assert_eq!(OutputFormat::Json.as_str(), "json");
    /// assert_eq!(OutputFormat::Pretty.as_str(), "pretty");
    /// ```
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Text => "text",
            Self::Pretty => "pretty",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "json" => Ok(Self::Json),
            "text" => Ok(Self::Text),
            "pretty" => Ok(Self::Pretty),
            _ => Err(anyhow::anyhow!(
                "invalid output format: '{s}' (expected: json, text, or pretty)"
            )),
        }
    }
}

/// CLI exit code with semantic meaning.
///
/// # Examples
///
/// ```
/// use scriptvol_cli::types::ExitCode;
///
/// assert_eq!(ExitCode::NO_ROOM.as_i32(), 4);
/// assert!(!ExitCode::from_i32(1).is_success());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Successful execution (exit code 0).
    pub const SUCCESS: Self = Self(0);

    /// General error (exit code 1).
    pub const ERROR: Self = Self(1);

    /// Invalid path or arguments (exit code 2).
    pub const INVALID_INPUT: Self = Self(2);

    /// Missing file, directory or volume (exit code 3).
    pub const NOT_FOUND: Self = Self(3);

    /// Destination volume ran out of room (exit code 4).
    pub const NO_ROOM: Self = Self(4);

    /// Creates an exit code from an integer value.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        Self(code)
    }

    /// Returns the exit code as an integer.
    #[must_use]
    pub const fn as_i32(&self) -> i32 {
        self.0
    }

    /// Checks if the exit code represents success.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.0 == 0
    }

    /// Picks the exit code for a failed command.
    ///
    /// The first [`VolumeError`] in the error chain decides. Anything else
    /// is a general error.
    ///
    /// # Examples
    ///
    /// ```
    /// use anyhow::Context;
    /// use scriptvol::VolumePath;
    /// use scriptvol_cli::types::ExitCode;
    ///
    /// let err = VolumePath::from_string("/a\\b").context("bad input").unwrap_err();
    /// assert_eq!(ExitCode::from_error(&err), ExitCode::INVALID_INPUT);
    /// ```
    #[must_use]
    pub fn from_error(err: &anyhow::Error) -> Self {
        let Some(volume_error) = err.chain().find_map(|cause| cause.downcast_ref::<VolumeError>()) else {
            return Self::ERROR;
        };
        if volume_error.is_invalid_path() {
            Self::INVALID_INPUT
        } else if volume_error.is_not_found() {
            Self::NOT_FOUND
        } else {
            Self::ERROR
        }
    }
}

impl Default for ExitCode {
    fn default() -> Self {
        Self::SUCCESS
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

impl fmt::Display for ExitCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("TEXT".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("Pretty".parse::<OutputFormat>().unwrap(), OutputFormat::Pretty);
        assert!("yaml".parse::<OutputFormat>().is_err());
    }

    #[test]
    fn test_output_format_display() {
        assert_eq!(OutputFormat::default().to_string(), "pretty");
    }

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::default(), ExitCode::SUCCESS);
        assert_eq!(i32::from(ExitCode::NOT_FOUND), 3);
        assert_eq!(ExitCode::from_i32(2), ExitCode::INVALID_INPUT);
        assert_eq!(ExitCode::ERROR.to_string(), "1");
    }

    #[test]
    fn test_exit_code_from_volume_errors() {
        let not_found = anyhow::Error::new(VolumeError::NotFound {
            path: "0:/x".to_string(),
        });
        assert_eq!(ExitCode::from_error(&not_found), ExitCode::NOT_FOUND);

        let no_volume: anyhow::Result<()> = Err(VolumeError::VolumeNotFound {
            volume: "9".to_string(),
        })
        .context("failed to resolve path");
        assert_eq!(ExitCode::from_error(&no_volume.unwrap_err()), ExitCode::NOT_FOUND);

        let structural = anyhow::Error::new(VolumeError::NotRenameable {
            volume: "Archive".to_string(),
        });
        assert_eq!(ExitCode::from_error(&structural), ExitCode::ERROR);
    }

    #[test]
    fn test_exit_code_from_other_errors() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(ExitCode::from_error(&err), ExitCode::ERROR);
    }
}
