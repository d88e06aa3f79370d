//! Volume backed by a host directory.
//!
//! The [`Archive`] maps volume paths onto a directory of the host
//! filesystem. It has no capacity limit, can't be renamed and converts
//! newlines of text files to the configured host convention.
//!
//! Every path is resolved inside the archive root. The deepest existing
//! part of a path is canonicalized, so symlinks that lead out of the root
//! are refused even when creating new entries below them.

use std::fs;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::content::{FileContent, NewlineStyle};
use crate::error::{Result, VolumeError};
use crate::path::VolumePath;
use crate::volume::{BASE_POWER, EntryKind, INFINITE_CAPACITY, Storage, VolumeKind};

/// Fixed name of the archive volume.
pub const ARCHIVE_NAME: &str = "Archive";

/// Host directory exposed as a volume.
///
/// # Examples
///
/// ```
/// use scriptvol::{Archive, Volume, VolumePath};
///
/// let dir = tempfile::tempdir()?;
/// let volume = Volume::new(Archive::new(dir.path())?);
/// volume.save_file(&VolumePath::from_string("/boot/launch.ks")?, &"print 1.".into(), true)?;
///
/// assert!(dir.path().join("boot").join("launch.ks").is_file());
/// assert_eq!(volume.capacity(), -1);
/// assert!(!volume.renameable());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct Archive {
    root: PathBuf,
    newline: NewlineStyle,
}

impl Archive {
    /// Opens or creates an archive at `root` using host newlines.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Io`] if the directory can't be created.
    pub fn new(root: impl AsRef<Path>) -> Result<Self> {
        Self::with_newline(root, NewlineStyle::Host)
    }

    /// Opens or creates an archive with an explicit newline style.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Io`] if the directory can't be created.
    pub fn with_newline(root: impl AsRef<Path>, newline: NewlineStyle) -> Result<Self> {
        let root = root.as_ref();
        fs::create_dir_all(root).map_err(|e| VolumeError::io(root, e))?;
        let root = root.canonicalize().map_err(|e| VolumeError::io(root, e))?;
        debug!("Opened archive at {} ({} newlines)", root.display(), newline.as_str());
        Ok(Self { root, newline })
    }

    /// Host directory of the archive root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Newline style used for text files.
    #[must_use]
    pub const fn newline(&self) -> NewlineStyle {
        self.newline
    }

    /// Maps a volume path to a host path below the root.
    fn resolve(&self, path: &VolumePath) -> Result<PathBuf> {
        let mut host = self.root.clone();
        for segment in path.segments() {
            let mut components = Path::new(segment).components();
            match (components.next(), components.next()) {
                (Some(Component::Normal(_)), None) => host.push(segment),
                _ => {
                    warn!("Refusing archive path segment '{segment}' in '{path}'");
                    return Err(VolumeError::invalid_path(
                        path.to_string(),
                        format!("segment '{segment}' is not a plain name on this host"),
                    ));
                }
            }
        }
        let existing = host
            .ancestors()
            .find(|candidate| fs::symlink_metadata(candidate).is_ok())
            .unwrap_or(self.root.as_path());
        if existing != self.root.as_path() {
            let target = existing.canonicalize().map_err(|e| VolumeError::io(existing, e))?;
            if !target.starts_with(&self.root) {
                warn!(
                    "Refusing '{path}': {} resolves outside the archive root",
                    host.display()
                );
                return Err(VolumeError::invalid_path(
                    path.to_string(),
                    "This path points to something outside of volume",
                ));
            }
        }
        Ok(host)
    }
}

fn host_kind(path: &Path) -> Option<EntryKind> {
    let metadata = fs::metadata(path).ok()?;
    if metadata.is_dir() {
        Some(EntryKind::Directory)
    } else if metadata.is_file() {
        Some(EntryKind::File)
    } else {
        None
    }
}

impl Storage for Archive {
    fn kind(&self) -> VolumeKind {
        VolumeKind::Archive
    }

    fn name(&self) -> String {
        ARCHIVE_NAME.to_string()
    }

    fn set_name(&self, _name: &str) -> Result<()> {
        Err(VolumeError::NotRenameable {
            volume: ARCHIVE_NAME.to_string(),
        })
    }

    fn renameable(&self) -> bool {
        false
    }

    fn capacity(&self) -> i64 {
        INFINITE_CAPACITY
    }

    fn size(&self) -> usize {
        WalkDir::new(&self.root)
            .into_iter()
            .filter_map(std::result::Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| entry.metadata().ok())
            .map(|metadata| usize::try_from(metadata.len()).unwrap_or(usize::MAX))
            .fold(0, usize::saturating_add)
    }

    fn entry_kind(&self, path: &VolumePath) -> Result<Option<EntryKind>> {
        Ok(host_kind(&self.resolve(path)?))
    }

    fn list(&self, path: &VolumePath) -> Result<Vec<(String, EntryKind)>> {
        let host = self.resolve(path)?;
        if host_kind(&host) != Some(EntryKind::Directory) {
            return Err(VolumeError::not_found(path));
        }
        let mut entries = Vec::new();
        for entry in fs::read_dir(&host).map_err(|e| VolumeError::io(&host, e))? {
            let entry = entry.map_err(|e| VolumeError::io(&host, e))?;
            let Ok(name) = entry.file_name().into_string() else {
                warn!("Skipping non UTF-8 entry in {}", host.display());
                continue;
            };
            if let Some(kind) = host_kind(&entry.path()) {
                entries.push((name, kind));
            }
        }
        entries.sort();
        Ok(entries)
    }

    fn read(&self, path: &VolumePath) -> Result<FileContent> {
        let host = self.resolve(path)?;
        if host_kind(&host) != Some(EntryKind::File) {
            return Err(VolumeError::not_found(path));
        }
        let bytes = fs::read(&host).map_err(|e| VolumeError::io(&host, e))?;
        Ok(FileContent::from_host_bytes(bytes, self.newline))
    }

    fn make_directory(&self, path: &VolumePath) -> Result<()> {
        let host = self.resolve(path)?;
        if host.exists() {
            return Err(VolumeError::already_exists(path, "directory or file already exists"));
        }
        fs::create_dir(&host).map_err(|e| VolumeError::io(&host, e))
    }

    fn store(&self, path: &VolumePath, content: &FileContent) -> Result<()> {
        let host = self.resolve(path)?;
        if host.is_dir() {
            return Err(VolumeError::already_exists(path, "can't save a file over a directory"));
        }
        fs::write(&host, content.to_host_bytes(self.newline)).map_err(|e| VolumeError::io(&host, e))
    }

    fn remove(&self, path: &VolumePath) -> Result<bool> {
        let host = self.resolve(path)?;
        let result = match host_kind(&host) {
            Some(EntryKind::Directory) => fs::remove_dir_all(&host),
            Some(EntryKind::File) => fs::remove_file(&host),
            None => return Ok(false),
        };
        result.map_err(|e| VolumeError::io(&host, e))?;
        Ok(true)
    }

    fn clear(&self) -> Result<()> {
        fs::remove_dir_all(&self.root).map_err(|e| VolumeError::io(&self.root, e))?;
        fs::create_dir_all(&self.root).map_err(|e| VolumeError::io(&self.root, e))
    }

    fn required_power(&self) -> f64 {
        BASE_POWER * 5.0
    }

    fn same_entry(&self, a: &VolumePath, b: &VolumePath) -> Result<bool> {
        if a == b {
            return Ok(true);
        }
        let (left, right) = (self.resolve(a)?, self.resolve(b)?);
        // Case-insensitive hosts and symlinks inside the root alias entries.
        Ok(match (left.canonicalize(), right.canonicalize()) {
            (Ok(left), Ok(right)) => left == right,
            _ => false,
        })
    }
}
