//! Storage configuration.
//!
//! Describes which volumes to mount. Stored in TOML format at:
//! - Linux: `~/.config/scriptvol/config.toml`
//! - macOS: `~/Library/Application Support/scriptvol/config.toml`
//! - Windows: `%APPDATA%\scriptvol\config.toml`
//!
//! ```toml
//! [general]
//! default_volume = "scratch"
//! prefer_compiled = false
//!
//! [archive]
//! root = "~/.local/share/scriptvol/archive"
//! newline = "host"
//!
//! [[harddisk]]
//! name = "scratch"
//! capacity = 10000
//! image = "~/.local/share/scriptvol/scratch.json"
//! ```

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::archive::{ARCHIVE_NAME, Archive};
use crate::content::NewlineStyle;
use crate::error::{Result, VolumeError};
use crate::harddisk::Harddisk;
use crate::image::HarddiskImage;
use crate::path::VolumeId;
use crate::registry::VolumeManager;
use crate::volume::Volume;

/// Volumes to mount and how to present them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StorageConfig {
    /// General settings
    #[serde(default)]
    pub general: GeneralConfig,

    /// Archive settings
    #[serde(default)]
    pub archive: ArchiveConfig,

    /// Harddisks, registered in order after the archive
    #[serde(default, rename = "harddisk")]
    pub harddisks: Vec<HarddiskConfig>,
}

/// General settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(default)]
pub struct GeneralConfig {
    /// Volume id or name to start in, the archive when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default_volume: Option<String>,

    /// Whether extension guessing picks compiled files over sources
    pub prefer_compiled: bool,
}

/// Archive settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ArchiveConfig {
    /// Host directory, `~` expands to the home directory
    pub root: String,

    /// Newline convention for text files
    pub newline: NewlineStyle,
}

impl Default for ArchiveConfig {
    fn default() -> Self {
        Self {
            root: default_archive_root(),
            newline: NewlineStyle::Host,
        }
    }
}

/// One harddisk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HarddiskConfig {
    /// Volume name
    pub name: String,

    /// Capacity in bytes
    pub capacity: i64,

    /// JSON file that keeps the contents between runs
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
}

fn default_archive_root() -> String {
    dirs::data_dir().map_or_else(
        || "~/.local/share/scriptvol/archive".to_string(),
        |p| p.join("scriptvol").join("archive").display().to_string(),
    )
}

/// Expands a leading `~` to the home directory.
fn expand_home(text: &str) -> PathBuf {
    let home = dirs::home_dir();
    match (text.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home,
        (Some(rest), Some(home)) if rest.starts_with(['/', '\\']) => home.join(&rest[1..]),
        _ => PathBuf::from(text),
    }
}

fn config_error(message: impl Into<String>) -> VolumeError {
    VolumeError::Config {
        message: message.into(),
    }
}

impl StorageConfig {
    /// Platform config file location.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Config`] if the platform has no config
    /// directory.
    pub fn default_path() -> Result<PathBuf> {
        let config_dir =
            dirs::config_dir().ok_or_else(|| config_error("failed to determine config directory"))?;
        Ok(config_dir.join("scriptvol").join("config.toml"))
    }

    /// Parses and validates TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Config`] for malformed or invalid settings.
    ///
    /// # Examples
    ///
    /// ```
    /// use scriptvol::StorageConfig;
    ///
    /// let config = StorageConfig::from_toml_str(r#"
    ///     [archive]
    ///     root = "/tmp/archive"
    ///
    ///     [[harddisk]]
    ///     name = "scratch"
    ///     capacity = 5000
    /// "#)?;
    /// assert_eq!(config.harddisks[0].capacity, 5000);
    ///
    /// assert!(StorageConfig::from_toml_str("[[harddisk]]\nname = \"x\"\ncapacity = 0").is_err());
    /// # Ok::<(), scriptvol::VolumeError>(())
    /// ```
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| config_error(format!("failed to parse config: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Serializes to pretty TOML.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Config`] if serialization fails.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| config_error(format!("failed to serialize config: {e}")))
    }

    /// Reads a config file.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Io`] if the file can't be read and
    /// [`VolumeError::Config`] if it is invalid.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| VolumeError::io(path, e))?;
        debug!("Loaded config from {}", path.display());
        Self::from_toml_str(&text)
    }

    /// Reads a config file, falling back to defaults if it does not exist.
    ///
    /// # Errors
    ///
    /// Same as [`load`](Self::load) for an existing file.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!("Config file {} not found, using defaults", path.display());
            return Ok(Self::default());
        }
        Self::load(path)
    }

    /// Writes the config file, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Config`] for invalid settings and
    /// [`VolumeError::Io`] if the file can't be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        self.validate()?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| VolumeError::io(parent, e))?;
        }
        fs::write(path, self.to_toml_string()?).map_err(|e| VolumeError::io(path, e))?;
        debug!("Saved config to {}", path.display());
        Ok(())
    }

    /// Checks the settings for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Config`] if:
    /// - the archive root is empty
    /// - a harddisk has an empty name or a capacity below one byte
    /// - two volumes share a name, ignoring case
    pub fn validate(&self) -> Result<()> {
        if self.archive.root.trim().is_empty() {
            return Err(config_error("archive root cannot be empty"));
        }

        let mut names = HashSet::from([ARCHIVE_NAME.to_lowercase()]);
        for disk in &self.harddisks {
            if disk.name.trim().is_empty() {
                return Err(config_error("harddisk name cannot be empty"));
            }
            if disk.capacity < 1 {
                return Err(config_error(format!(
                    "harddisk '{}' must have a capacity of at least one byte",
                    disk.name
                )));
            }
            if !names.insert(disk.name.to_lowercase()) {
                return Err(config_error(format!("duplicate volume name '{}'", disk.name)));
            }
        }

        if let Some(default_volume) = &self.general.default_volume
            && default_volume.trim().is_empty()
        {
            return Err(config_error("default volume cannot be empty"));
        }

        Ok(())
    }

    /// Host directory of the archive.
    #[must_use]
    pub fn archive_root(&self) -> PathBuf {
        expand_home(&self.archive.root)
    }

    /// Mounts the archive as volume 0 followed by the harddisks.
    ///
    /// Harddisks with an existing image file are restored from it. The
    /// configured capacity always wins over the one stored in the image.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Io`] if the archive root can't be created,
    /// [`VolumeError::Serialization`] for a broken image and
    /// [`VolumeError::VolumeNotFound`] if the default volume is unknown.
    pub fn mount(&self) -> Result<MountedStorage> {
        self.validate()?;
        let mut manager = VolumeManager::new();
        manager.add(Volume::new(Archive::with_newline(self.archive_root(), self.archive.newline)?));

        let mut persisted = Vec::new();
        for config in &self.harddisks {
            let image_path = config.image.as_deref().map(expand_home);
            let disk = match &image_path {
                Some(path) if path.exists() => {
                    let mut image = HarddiskImage::load(path)?;
                    image.capacity = config.capacity;
                    Harddisk::from_image(&image)?
                }
                _ => Harddisk::new(config.name.clone(), config.capacity),
            };
            let disk = Arc::new(disk);
            manager.add(Volume::from_storage(disk.clone()));
            if let Some(image) = image_path {
                persisted.push(PersistedDisk { disk, image });
            }
        }

        if let Some(default_volume) = &self.general.default_volume {
            manager.switch_to(&VolumeId::parse(default_volume)?)?;
        }
        info!("Mounted {} volumes", manager.len());
        Ok(MountedStorage {
            manager,
            persisted,
            prefer_compiled: self.general.prefer_compiled,
        })
    }
}

#[derive(Debug)]
struct PersistedDisk {
    disk: Arc<Harddisk>,
    image: PathBuf,
}

/// Registry built from a [`StorageConfig`], remembering where each
/// harddisk image lives.
#[derive(Debug)]
pub struct MountedStorage {
    /// The mounted volumes
    pub manager: VolumeManager,
    persisted: Vec<PersistedDisk>,
    prefer_compiled: bool,
}

impl MountedStorage {
    /// Whether lookups should prefer compiled files.
    #[must_use]
    pub const fn prefer_compiled(&self) -> bool {
        self.prefer_compiled
    }

    /// Writes every harddisk that has an image path back to its file.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Io`] if an image can't be written.
    pub fn persist(&self) -> Result<()> {
        for entry in &self.persisted {
            entry.disk.to_image().save(&entry.image)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::VolumePath;
    use crate::volume::VolumeKind;
    use tempfile::TempDir;

    fn config_in(temp: &TempDir) -> StorageConfig {
        StorageConfig {
            general: GeneralConfig::default(),
            archive: ArchiveConfig {
                root: temp.path().join("archive").display().to_string(),
                newline: NewlineStyle::Lf,
            },
            harddisks: vec![HarddiskConfig {
                name: "scratch".to_string(),
                capacity: 100,
                image: Some(temp.path().join("scratch.json").display().to_string()),
            }],
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = StorageConfig::default();
        assert!(config.validate().is_ok());
        assert!(config.harddisks.is_empty());
        assert!(!config.general.prefer_compiled);
    }

    #[test]
    fn test_validate_rejects_bad_harddisks() {
        let mut config = StorageConfig::default();
        config.harddisks.push(HarddiskConfig {
            name: "archive".to_string(),
            capacity: 10,
            image: None,
        });
        assert!(config.validate().is_err());

        config.harddisks[0].name = " ".to_string();
        assert!(config.validate().is_err());

        config.harddisks[0].name = "a".to_string();
        config.harddisks[0].capacity = -1;
        assert!(config.validate().is_err());

        config.harddisks[0].capacity = 1;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_round_trip() {
        let temp = TempDir::new().unwrap();
        let config = config_in(&temp);
        let text = config.to_toml_string().unwrap();
        assert!(text.contains("[[harddisk]]"));
        assert_eq!(StorageConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn test_newline_parses_lowercase() {
        let config = StorageConfig::from_toml_str("[archive]\nroot = \"/x\"\nnewline = \"crlf\"").unwrap();
        assert_eq!(config.archive.newline, NewlineStyle::CrLf);
        assert!(StorageConfig::from_toml_str("[archive]\nroot = \"/x\"\nnewline = \"cr\"").is_err());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("/abs/path"), PathBuf::from("/abs/path"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~"), home);
            assert_eq!(expand_home("~/x"), home.join("x"));
        }
    }

    #[test]
    fn test_save_and_load() {
        let temp = TempDir::new().unwrap();
        let config = config_in(&temp);
        let path = temp.path().join("conf").join("config.toml");
        config.save(&path).unwrap();
        assert_eq!(StorageConfig::load(&path).unwrap(), config);
        assert_eq!(
            StorageConfig::load_or_default(&temp.path().join("none.toml")).unwrap(),
            StorageConfig::default()
        );
    }

    #[test]
    fn test_mount_and_persist() {
        let temp = TempDir::new().unwrap();
        let config = config_in(&temp);

        let mounted = config.mount().unwrap();
        assert_eq!(mounted.manager.len(), 2);
        assert_eq!(mounted.manager.volume(0).unwrap().kind(), VolumeKind::Archive);
        assert_eq!(mounted.manager.current_volume_id(), Some(0));

        let scratch = mounted.manager.volume(1).unwrap();
        scratch
            .save_file(&VolumePath::from_string("/keep.txt").unwrap(), &"kept".into(), true)
            .unwrap();
        scratch.rename("renamed").unwrap();
        mounted.persist().unwrap();

        let remounted = config.mount().unwrap();
        let scratch = remounted.manager.volume(1).unwrap();
        assert_eq!(scratch.name(), "renamed");
        assert_eq!(scratch.size(), 4);
    }

    #[test]
    fn test_mount_switches_to_default_volume() {
        let temp = TempDir::new().unwrap();
        let mut config = config_in(&temp);
        config.general.default_volume = Some("scratch".to_string());
        assert_eq!(config.mount().unwrap().manager.current_volume_id(), Some(1));

        config.general.default_volume = Some("missing".to_string());
        assert!(config.mount().unwrap_err().is_not_found());
    }
}
