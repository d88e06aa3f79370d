//! Output formatters for CLI commands.
//!
//! Every command hands a serializable report to [`format_output`], so the
//! three output modes stay consistent across commands.

use anyhow::Result;
use colored::Colorize;
use serde::Serialize;

use crate::types::OutputFormat;

/// Format data according to the specified output format.
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
///
/// # Examples
///
/// ```
/// use scriptvol_cli::formatters::format_output;
/// use scriptvol_cli::types::OutputFormat;
/// use serde::Serialize;
///
/// #[derive(Serialize)]
/// struct Entry {
///     name: String,
///     size: usize,
/// }
///
/// let entry = Entry { name: "boot.ks".to_string(), size: 12 };
/// let output = format_output(&entry, OutputFormat::Text)?;
/// assert_eq!(output, "name=boot.ks\nsize=12");
/// # Ok::<(), anyhow::Error>(())
/// ```
pub fn format_output<T: Serialize>(data: &T, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Json => json::format(data),
        OutputFormat::Text => text::format(data),
        OutputFormat::Pretty => pretty::format(data),
    }
}

/// JSON output formatting.
pub mod json {
    use super::{Result, Serialize};

    /// Format data as JSON with 2-space indentation.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        Ok(serde_json::to_string_pretty(data)?)
    }
}

/// Plain text output formatting.
///
/// Objects flatten into `key=value` lines with dotted keys for nesting and
/// indexed keys for arrays, which keeps the output greppable.
pub mod text {
    use super::{Result, Serialize};
    use serde_json::Value;

    /// Format data as `key=value` lines.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        let value = serde_json::to_value(data)?;
        let mut lines = Vec::new();
        flatten(&value, String::new(), &mut lines);
        Ok(lines.join("\n"))
    }

    fn flatten(value: &Value, prefix: String, lines: &mut Vec<String>) {
        let child = |key: &str| {
            if prefix.is_empty() {
                key.to_string()
            } else {
                format!("{prefix}.{key}")
            }
        };
        match value {
            Value::Object(map) => {
                for (key, inner) in map {
                    flatten(inner, child(key), lines);
                }
            }
            Value::Array(items) => {
                for (index, inner) in items.iter().enumerate() {
                    flatten(inner, child(&index.to_string()), lines);
                }
            }
            Value::String(s) if prefix.is_empty() => lines.push(s.clone()),
            Value::String(s) => lines.push(format!("{prefix}={s}")),
            scalar if prefix.is_empty() => lines.push(scalar.to_string()),
            scalar => lines.push(format!("{prefix}={scalar}")),
        }
    }
}

/// Pretty (human-readable) output formatting.
pub mod pretty {
    use super::{Colorize, Result, Serialize};
    use serde_json::Value;

    /// Format data as colorized, indented output.
    pub fn format<T: Serialize>(data: &T) -> Result<String> {
        let value = serde_json::to_value(data)?;
        let mut out = String::new();
        write_value(&value, 0, &mut out);
        Ok(out.trim_end().to_string())
    }

    fn write_value(value: &Value, indent: usize, out: &mut String) {
        let pad = "  ".repeat(indent);
        match value {
            Value::Object(map) => {
                for (key, inner) in map {
                    out.push_str(&pad);
                    out.push_str(&key.blue().bold().to_string());
                    out.push(':');
                    if is_nested(inner) {
                        out.push('\n');
                        write_value(inner, indent + 1, out);
                    } else {
                        out.push(' ');
                        out.push_str(&scalar(inner));
                        out.push('\n');
                    }
                }
            }
            Value::Array(items) if items.is_empty() => {
                out.push_str(&pad);
                out.push_str(&"(empty)".dimmed().to_string());
                out.push('\n');
            }
            Value::Array(items) => {
                for inner in items {
                    if is_nested(inner) {
                        out.push_str(&pad);
                        out.push_str("-\n");
                        write_value(inner, indent + 1, out);
                    } else {
                        out.push_str(&pad);
                        out.push_str("- ");
                        out.push_str(&scalar(inner));
                        out.push('\n');
                    }
                }
            }
            other => {
                out.push_str(&pad);
                out.push_str(&scalar(other));
                out.push('\n');
            }
        }
    }

    fn is_nested(value: &Value) -> bool {
        match value {
            Value::Object(map) => !map.is_empty(),
            Value::Array(items) => !items.is_empty(),
            _ => false,
        }
    }

    fn scalar(value: &Value) -> String {
        match value {
            Value::Null => "none".dimmed().to_string(),
            Value::Bool(b) => b.to_string().yellow().to_string(),
            Value::Number(n) => n.to_string().cyan().to_string(),
            Value::String(s) => s.green().to_string(),
            Value::Array(_) => "[]".to_string(),
            Value::Object(_) => "{}".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Serialize;

    #[derive(Serialize)]
    struct Entry {
        name: String,
        size: usize,
    }

    #[derive(Serialize)]
    struct Listing {
        path: String,
        entries: Vec<Entry>,
        total: Option<usize>,
    }

    fn listing() -> Listing {
        Listing {
            path: "0:/lib".to_string(),
            entries: vec![
                Entry {
                    name: "a.ks".to_string(),
                    size: 3,
                },
                Entry {
                    name: "b.ks".to_string(),
                    size: 7,
                },
            ],
            total: None,
        }
    }

    #[test]
    fn test_json_format() {
        let output = json::format(&listing()).unwrap();
        assert!(output.contains("\"path\": \"0:/lib\""));
        assert!(output.contains("\"name\": \"b.ks\""));
        assert!(output.contains("\"total\": null"));
    }

    #[test]
    fn test_text_format_flattens_keys() {
        let output = text::format(&listing()).unwrap();
        let lines: Vec<&str> = output.lines().collect();
        assert_eq!(
            lines,
            [
                "entries.0.name=a.ks",
                "entries.0.size=3",
                "entries.1.name=b.ks",
                "entries.1.size=7",
                "path=0:/lib",
                "total=null",
            ]
        );
    }

    #[test]
    fn test_text_format_scalar() {
        assert_eq!(text::format(&"plain").unwrap(), "plain");
        assert_eq!(text::format(&42).unwrap(), "42");
    }

    #[test]
    fn test_pretty_format() {
        colored::control::set_override(false);
        let output = pretty::format(&listing()).unwrap();
        assert!(output.starts_with("entries:\n  -\n    name: a.ks\n    size: 3\n"));
        assert!(output.contains("\npath: 0:/lib\n"));
        assert!(output.ends_with("total: none"));
    }

    #[test]
    fn test_pretty_format_empty_list() {
        colored::control::set_override(false);
        let output = pretty::format(&Vec::<Entry>::new()).unwrap();
        assert_eq!(output, "(empty)");
    }

    #[test]
    fn test_format_output_dispatch() {
        let data = listing();
        assert!(format_output(&data, OutputFormat::Json).unwrap().starts_with('{'));
        assert!(format_output(&data, OutputFormat::Text).unwrap().contains("\npath=0:/lib"));
        assert!(format_output(&data, OutputFormat::Pretty).unwrap().contains("path"));
    }
}
