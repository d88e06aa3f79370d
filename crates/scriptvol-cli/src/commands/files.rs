//! File and directory commands: `ls`, `cat`, `stat`, `write`, `mkdir`,
//! `touch` and `rm`.

use anyhow::{Context, Result};
use scriptvol::{EntryKind, FileContent, GlobalPath, Volume, VolumeError, VolumeItem};
use serde::Serialize;
use tracing::{debug, warn};

use crate::formatters::format_output;
use crate::session::Session;
use crate::types::{ExitCode, OutputFormat};

/// One directory entry.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct EntryReport {
    /// Entry name with extension
    pub name: String,
    /// File or directory
    pub kind: EntryKind,
    /// Bytes, recursive for directories
    pub size: usize,
}

/// Directory listing.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ListingReport {
    /// Listed location
    pub path: String,
    /// Entries sorted by name
    pub entries: Vec<EntryReport>,
}

/// Details about one item.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ItemReport {
    /// Where the item was found, after extension guessing
    pub path: String,
    /// Item name
    pub name: String,
    /// File or directory
    pub kind: EntryKind,
    /// Extension, empty when there is none
    pub extension: String,
    /// Bytes, recursive for directories
    pub size: usize,
    /// Content category for files
    pub category: Option<&'static str>,
}

/// File content as printed by `cat --format json`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ContentReport {
    /// File location
    pub path: String,
    /// Content category
    pub category: &'static str,
    /// Content as lossy UTF-8
    pub content: String,
}

/// Result of a command that changes one location.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ChangeReport {
    /// What was done
    pub operation: &'static str,
    /// Affected location
    pub path: String,
    /// Whether anything changed
    pub changed: bool,
    /// Bytes written, for file writes
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bytes: Option<usize>,
}

fn print_report<T: Serialize>(report: &T, output_format: OutputFormat) -> Result<()> {
    let formatted = format_output(report, output_format).context("failed to format output")?;
    println!("{formatted}");
    Ok(())
}

fn volume_of<'a>(session: &'a Session, path: &GlobalPath) -> Result<&'a Volume> {
    Ok(session.manager().get_volume(path.volume_id())?)
}

fn located(path: &GlobalPath, item: &VolumeItem) -> Result<GlobalPath> {
    Ok(GlobalPath::from_volume_path(item.path(), path.volume_id().clone())?)
}

/// Builds the listing for a directory, or a one-entry listing for a file.
///
/// # Errors
///
/// Returns an error wrapping [`VolumeError::NotFound`] if nothing is at
/// `text`.
pub fn listing(session: &Session, text: &str) -> Result<ListingReport> {
    let (path, item) = session.open_item(text, session.prefer_compiled())?;
    let path = located(&path, &item)?;
    let entries = match item {
        VolumeItem::Directory(directory) => directory
            .list()?
            .into_values()
            .map(|entry| {
                Ok(EntryReport {
                    name: entry.name().to_string(),
                    kind: entry.kind(),
                    size: entry.size()?,
                })
            })
            .collect::<scriptvol::Result<Vec<_>>>()?,
        VolumeItem::File(file) => vec![EntryReport {
            name: file.name().to_string(),
            kind: EntryKind::File,
            size: file.size()?,
        }],
    };
    Ok(ListingReport {
        path: path.to_string(),
        entries,
    })
}

/// Runs the `ls` command.
///
/// # Errors
///
/// Returns an error if the path doesn't resolve to an item.
pub fn ls(session: &Session, path: Option<&str>, output_format: OutputFormat) -> Result<ExitCode> {
    let report = listing(session, path.unwrap_or("."))?;
    debug!("Listed {} entries in {}", report.entries.len(), report.path);
    print_report(&report, output_format)?;
    Ok(ExitCode::SUCCESS)
}

/// Runs the `cat` command.
///
/// Text output prints the raw content; JSON wraps it with its category.
///
/// # Errors
///
/// Returns an error if no file is at `text` or a directory is.
pub fn cat(session: &Session, text: &str, compiled: bool, output_format: OutputFormat) -> Result<ExitCode> {
    let prefer_compiled = compiled || session.prefer_compiled();
    let (path, item) = session.open_item(text, prefer_compiled)?;
    let path = located(&path, &item)?;
    let file = item
        .into_file()
        .ok_or_else(|| VolumeError::TypeMismatch {
            path: path.to_string(),
            expected: "file",
        })
        .with_context(|| format!("can't print '{text}'"))?;
    let content = file.read_all()?;

    match output_format {
        OutputFormat::Json => print_report(
            &ContentReport {
                path: path.to_string(),
                category: content.category().as_str(),
                content: content.as_string().into_owned(),
            },
            output_format,
        )?,
        OutputFormat::Text | OutputFormat::Pretty => {
            let text = content.as_string();
            if text.ends_with('\n') {
                print!("{text}");
            } else {
                println!("{text}");
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Collects details about the item at `text`.
///
/// # Errors
///
/// Returns an error wrapping [`VolumeError::NotFound`] if nothing is there.
pub fn describe(session: &Session, text: &str) -> Result<ItemReport> {
    let (path, item) = session.open_item(text, session.prefer_compiled())?;
    let path = located(&path, &item)?;
    let category = match &item {
        VolumeItem::File(file) => Some(file.read_all()?.category().as_str()),
        VolumeItem::Directory(_) => None,
    };
    Ok(ItemReport {
        path: path.to_string(),
        name: item.name().to_string(),
        kind: item.kind(),
        extension: item.extension().to_string(),
        size: item.size()?,
        category,
    })
}

/// Runs the `stat` command.
///
/// # Errors
///
/// Returns an error if nothing is at `text`.
pub fn stat(session: &Session, text: &str, output_format: OutputFormat) -> Result<ExitCode> {
    print_report(&describe(session, text)?, output_format)?;
    Ok(ExitCode::SUCCESS)
}

/// Runs the `write` command.
///
/// Replaces the file content, or appends to it with `append`. Missing
/// parents are created. Returns [`ExitCode::NO_ROOM`] when the volume is
/// full and `verify` is set.
///
/// # Errors
///
/// Returns an error if a directory is in the way or the path is invalid.
pub fn write(
    session: &Session,
    text: &str,
    data: &str,
    append: bool,
    verify: bool,
    output_format: OutputFormat,
) -> Result<ExitCode> {
    let path = session.resolve(text)?;
    let volume = volume_of(session, &path)?;

    let (target, content) = if append {
        let file = volume
            .open_or_create(path.path(), session.prefer_compiled())
            .with_context(|| format!("failed to open '{text}' for appending"))?;
        let mut content = file.read_all()?;
        content.write_str(data);
        (file.path().clone(), content)
    } else {
        (path.path().clone(), FileContent::from_string(data))
    };

    let saved = volume
        .save_file(&target, &content, verify)
        .with_context(|| format!("failed to write '{text}'"))?;
    session.persist()?;

    let report = ChangeReport {
        operation: "write",
        path: GlobalPath::from_volume_path(&target, path.volume_id().clone())?.to_string(),
        changed: saved.is_some(),
        bytes: Some(content.size()),
    };
    print_report(&report, output_format)?;
    if saved.is_none() {
        warn!("Not enough room on '{}' for {} bytes", volume.name(), content.size());
        return Ok(ExitCode::NO_ROOM);
    }
    Ok(ExitCode::SUCCESS)
}

/// Runs the `mkdir` command.
///
/// # Errors
///
/// Returns an error if something already exists at `text`.
pub fn mkdir(session: &Session, text: &str, output_format: OutputFormat) -> Result<ExitCode> {
    let path = session.resolve(text)?;
    volume_of(session, &path)?
        .create_directory(path.path())
        .with_context(|| format!("failed to create directory '{text}'"))?;
    session.persist()?;
    print_report(
        &ChangeReport {
            operation: "mkdir",
            path: path.to_string(),
            changed: true,
            bytes: None,
        },
        output_format,
    )?;
    Ok(ExitCode::SUCCESS)
}

/// Runs the `touch` command. An existing file or directory is left alone.
///
/// # Errors
///
/// Returns an error if the file can't be created.
pub fn touch(session: &Session, text: &str, output_format: OutputFormat) -> Result<ExitCode> {
    let path = session.resolve(text)?;
    let volume = volume_of(session, &path)?;
    let changed = if volume.open(path.path(), session.prefer_compiled())?.is_some() {
        false
    } else {
        volume
            .create_file(path.path())
            .with_context(|| format!("failed to create file '{text}'"))?;
        session.persist()?;
        true
    };
    print_report(
        &ChangeReport {
            operation: "touch",
            path: path.to_string(),
            changed,
            bytes: None,
        },
        output_format,
    )?;
    Ok(ExitCode::SUCCESS)
}

/// Runs the `rm` command. An extensionless file name is guessed like
/// `cat` does.
///
/// # Errors
///
/// Returns an error wrapping [`VolumeError::NotFound`] if nothing was
/// there, or [`VolumeError::RootOperation`] for a volume root.
pub fn rm(session: &Session, text: &str, compiled: bool, output_format: OutputFormat) -> Result<ExitCode> {
    let path = session.resolve(text)?;
    let removed = volume_of(session, &path)?
        .delete(path.path(), compiled || session.prefer_compiled())
        .with_context(|| format!("failed to delete '{text}'"))?;
    if !removed {
        return Err(VolumeError::NotFound {
            path: path.to_string(),
        })
        .with_context(|| format!("nothing to delete at '{text}'"));
    }
    session.persist()?;
    print_report(
        &ChangeReport {
            operation: "rm",
            path: path.to_string(),
            changed: true,
            bytes: None,
        },
        output_format,
    )?;
    Ok(ExitCode::SUCCESS)
}
