//! Volume listing and renaming.

use anyhow::{Context, Result};
use scriptvol::{INFINITE_CAPACITY, VolumeId, VolumeKind};
use serde::Serialize;
use tracing::info;

use crate::formatters::format_output;
use crate::session::Session;
use crate::types::{ExitCode, OutputFormat};

/// One mounted volume.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VolumeReport {
    /// Registry id
    pub id: usize,
    /// Display identifier such as `#0: "Archive"`
    pub identifier: String,
    /// Volume name
    pub name: String,
    /// Backing kind
    pub kind: VolumeKind,
    /// Capacity in bytes, `None` when unlimited
    pub capacity: Option<i64>,
    /// Bytes used
    pub size: usize,
    /// Bytes left, `None` when unlimited
    pub free_space: Option<i64>,
    /// Whether the name can change
    pub renameable: bool,
    /// Whether the current directory is on this volume
    pub current: bool,
}

/// All mounted volumes.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct VolumesReport {
    /// Current directory
    pub current_directory: Option<String>,
    /// Power drawn by the current volume
    pub required_power: f64,
    /// Volumes in id order
    pub volumes: Vec<VolumeReport>,
}

fn limit(value: i64) -> Option<i64> {
    (value != INFINITE_CAPACITY).then_some(value)
}

/// Collects the report for every mounted volume.
///
/// # Errors
///
/// Returns an error if an identifier can't be built.
pub fn collect(session: &Session) -> Result<VolumesReport> {
    let manager = session.manager();
    let current = manager.current_volume_id();
    let volumes = manager
        .volumes()
        .map(|(id, volume)| {
            Ok(VolumeReport {
                id,
                identifier: manager.best_identifier(id)?,
                name: volume.name(),
                kind: volume.kind(),
                capacity: limit(volume.capacity()),
                size: volume.size(),
                free_space: limit(volume.free_space()),
                renameable: volume.renameable(),
                current: current == Some(id),
            })
        })
        .collect::<scriptvol::Result<Vec<_>>>()?;
    Ok(VolumesReport {
        current_directory: manager.current_directory().map(ToString::to_string),
        required_power: manager.current_required_power(),
        volumes,
    })
}

/// Runs the `volumes` command.
///
/// # Errors
///
/// Returns an error if the report can't be built or formatted.
pub fn run(session: &Session, output_format: OutputFormat) -> Result<ExitCode> {
    let report = collect(session)?;
    let formatted = format_output(&report, output_format).context("failed to format volume list")?;
    println!("{formatted}");
    Ok(ExitCode::SUCCESS)
}

/// Renamed volume.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RenameReport {
    /// Registry id
    pub id: usize,
    /// Name before the rename
    pub old_name: String,
    /// Name after the rename
    pub name: String,
}

/// Runs the `rename-volume` command.
///
/// # Errors
///
/// Returns an error if the volume is unknown or can't be renamed.
pub fn rename(session: &Session, volume: &str, name: &str, output_format: OutputFormat) -> Result<ExitCode> {
    let manager = session.manager();
    let id = manager
        .index_of(&VolumeId::parse(volume)?)
        .with_context(|| format!("unknown volume '{volume}'"))?;
    let old_name = manager.raw_identifier(id)?;
    manager
        .rename_volume(&VolumeId::from(id), name)
        .with_context(|| format!("failed to rename volume '{volume}'"))?;
    session.persist()?;
    info!("Renamed volume #{id} from {old_name} to {name}");

    let report = RenameReport {
        id,
        old_name,
        name: name.to_string(),
    };
    println!("{}", format_output(&report, output_format)?);
    Ok(ExitCode::SUCCESS)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionOptions;
    use scriptvol::{ArchiveConfig, GeneralConfig, HarddiskConfig, NewlineStyle, StorageConfig};
    use tempfile::TempDir;

    fn config(temp: &TempDir) -> StorageConfig {
        StorageConfig {
            general: GeneralConfig::default(),
            archive: ArchiveConfig {
                root: temp.path().join("archive").display().to_string(),
                newline: NewlineStyle::Lf,
            },
            harddisks: vec![HarddiskConfig {
                name: "scratch".to_string(),
                capacity: 20_000,
                image: Some(temp.path().join("scratch.json").display().to_string()),
            }],
        }
    }

    fn session(temp: &TempDir) -> Session {
        Session::mount(&config(temp), &SessionOptions::default()).unwrap()
    }

    #[test]
    fn test_collect_reports_every_volume() {
        let temp = TempDir::new().unwrap();
        let report = collect(&session(&temp)).unwrap();

        assert_eq!(report.current_directory.as_deref(), Some("0:/"));
        assert_eq!(report.volumes.len(), 2);

        let archive = &report.volumes[0];
        assert_eq!(archive.identifier, "#0: \"Archive\"");
        assert_eq!(archive.capacity, None);
        assert!(archive.current);
        assert!(!archive.renameable);

        let disk = &report.volumes[1];
        assert_eq!(disk.kind, VolumeKind::Harddisk);
        assert_eq!(disk.capacity, Some(20_000));
        assert_eq!(disk.free_space, Some(20_000));
        assert!(!disk.current);

        assert!((report.required_power - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_required_power_is_for_current_volume() {
        let temp = TempDir::new().unwrap();
        let config = config(&temp);
        let options = SessionOptions {
            volume: Some("scratch".to_string()),
            ..SessionOptions::default()
        };
        let report = collect(&Session::mount(&config, &options).unwrap()).unwrap();
        assert!((report.required_power - 0.08).abs() < 1e-9);
    }

    #[test]
    fn test_rename_harddisk() {
        let temp = TempDir::new().unwrap();
        let session = session(&temp);
        assert_eq!(rename(&session, "scratch", "backup", OutputFormat::Json).unwrap(), ExitCode::SUCCESS);
        assert_eq!(session.manager().raw_identifier(1).unwrap(), "backup");

        let image = std::fs::read_to_string(temp.path().join("scratch.json")).unwrap();
        assert!(image.contains("\"backup\""));
    }

    #[test]
    fn test_rename_archive_fails() {
        let temp = TempDir::new().unwrap();
        assert!(rename(&session(&temp), "0", "other", OutputFormat::Json).is_err());
    }

    #[test]
    fn test_rename_unknown_volume_is_not_found() {
        let temp = TempDir::new().unwrap();
        let err = rename(&session(&temp), "nope", "x", OutputFormat::Json).unwrap_err();
        assert_eq!(ExitCode::from_error(&err), ExitCode::NOT_FOUND);
    }
}
