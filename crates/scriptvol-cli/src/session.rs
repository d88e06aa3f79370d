//! Mounted storage for one CLI invocation.
//!
//! A session loads the storage configuration, mounts every volume, applies
//! the global `--volume` and `--cd` options and writes harddisk images back
//! after mutating commands.

use std::path::PathBuf;

use anyhow::{Context, Result};
use scriptvol::{GlobalPath, MountedStorage, StorageConfig, VolumeId, VolumeItem, VolumeManager};
use tracing::debug;

/// Global options that shape a session.
#[derive(Debug, Clone, Default)]
pub struct SessionOptions {
    /// Configuration file, or the default location when `None`
    pub config: Option<PathBuf>,
    /// Volume to switch to after mounting
    pub volume: Option<String>,
    /// Directory to change into after mounting
    pub directory: Option<String>,
}

/// Mounted volumes plus the preferences from the configuration.
#[derive(Debug)]
pub struct Session {
    storage: MountedStorage,
}

impl Session {
    /// Loads the configuration and mounts its volumes.
    ///
    /// A missing configuration file falls back to the defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid, a volume can't be
    /// mounted or the `--volume`/`--cd` options don't resolve.
    pub fn open(options: &SessionOptions) -> Result<Self> {
        let path = match &options.config {
            Some(path) => path.clone(),
            None => StorageConfig::default_path().context("failed to locate the configuration file")?,
        };
        debug!("Loading configuration from {}", path.display());
        let config = StorageConfig::load_or_default(&path)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;
        Self::mount(&config, options)
    }

    /// Mounts an already loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a volume can't be mounted or the `--volume`/`--cd`
    /// options don't resolve.
    pub fn mount(config: &StorageConfig, options: &SessionOptions) -> Result<Self> {
        let mut storage = config.mount().context("failed to mount volumes")?;
        if let Some(volume) = &options.volume {
            let id = VolumeId::parse(volume).with_context(|| format!("invalid volume '{volume}'"))?;
            storage
                .manager
                .switch_to(&id)
                .with_context(|| format!("failed to switch to volume '{volume}'"))?;
        }
        if let Some(directory) = &options.directory {
            storage
                .manager
                .change_directory(directory)
                .with_context(|| format!("failed to change directory to '{directory}'"))?;
        }
        Ok(Self { storage })
    }

    /// The volume registry.
    #[must_use]
    pub const fn manager(&self) -> &VolumeManager {
        &self.storage.manager
    }

    /// Whether lookups pick compiled files over sources.
    #[must_use]
    pub const fn prefer_compiled(&self) -> bool {
        self.storage.prefer_compiled()
    }

    /// Resolves path text against the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not a valid path or names an unknown
    /// volume.
    pub fn resolve(&self, text: &str) -> Result<GlobalPath> {
        self.manager()
            .resolve(text)
            .with_context(|| format!("failed to resolve path '{text}'"))
    }

    /// Resolves and opens a path, failing if nothing is there.
    ///
    /// # Errors
    ///
    /// Returns an error wrapping [`scriptvol::VolumeError::NotFound`] if the
    /// path holds no item.
    pub fn open_item(&self, text: &str, prefer_compiled: bool) -> Result<(GlobalPath, VolumeItem)> {
        let path = self.resolve(text)?;
        let item = self
            .manager()
            .open(&path, prefer_compiled)?
            .ok_or_else(|| scriptvol::VolumeError::NotFound {
                path: path.to_string(),
            })
            .with_context(|| format!("failed to open '{text}'"))?;
        Ok((path, item))
    }

    /// Writes harddisk images back to their files.
    ///
    /// # Errors
    ///
    /// Returns an error if an image can't be written.
    pub fn persist(&self) -> Result<()> {
        self.storage.persist().context("failed to save harddisk images")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use scriptvol::{ArchiveConfig, GeneralConfig, HarddiskConfig, NewlineStyle};
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
                capacity: 500,
                image: Some(temp.path().join("scratch.json").display().to_string()),
            }],
        }
    }

    #[test]
    fn test_mount_defaults_to_archive() {
        let temp = TempDir::new().unwrap();
        let session = Session::mount(&config(&temp), &SessionOptions::default()).unwrap();
        assert_eq!(session.manager().len(), 2);
        assert_eq!(session.resolve("boot").unwrap().to_string(), "0:/boot");
    }

    #[test]
    fn test_mount_switches_volume() {
        let temp = TempDir::new().unwrap();
        let options = SessionOptions {
            volume: Some("scratch".to_string()),
            ..SessionOptions::default()
        };
        let session = Session::mount(&config(&temp), &options).unwrap();
        assert_eq!(session.resolve("/a").unwrap().to_string(), "1:/a");
    }

    #[test]
    fn test_mount_rejects_unknown_volume() {
        let temp = TempDir::new().unwrap();
        let options = SessionOptions {
            volume: Some("missing".to_string()),
            ..SessionOptions::default()
        };
        assert!(Session::mount(&config(&temp), &options).is_err());
    }

    #[test]
    fn test_change_directory_option() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("archive/lib")).unwrap();
        let options = SessionOptions {
            directory: Some("/lib".to_string()),
            ..SessionOptions::default()
        };
        let session = Session::mount(&config(&temp), &options).unwrap();
        assert_eq!(session.resolve("util.ks").unwrap().to_string(), "0:/lib/util.ks");
    }

    #[test]
    fn test_open_item_missing() {
        let temp = TempDir::new().unwrap();
        let session = Session::mount(&config(&temp), &SessionOptions::default()).unwrap();
        let err = session.open_item("/nothing", false).unwrap_err();
        assert_eq!(crate::types::ExitCode::from_error(&err), crate::types::ExitCode::NOT_FOUND);
    }

    #[test]
    fn test_persist_writes_image() {
        let temp = TempDir::new().unwrap();
        let session = Session::mount(&config(&temp), &SessionOptions::default()).unwrap();
        session.persist().unwrap();
        assert!(temp.path().join("scratch.json").exists());
    }

    #[test]
    fn test_open_reads_config_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            format!("[archive]\nroot = \"{}\"\n", temp.path().join("arch").display()),
        )
        .unwrap();
        let session = Session::open(&SessionOptions {
            config: Some(path),
            ..SessionOptions::default()
        })
        .unwrap();
        assert_eq!(session.manager().len(), 1);
        assert!(!session.prefer_compiled());
    }
}
