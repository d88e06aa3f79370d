//! Registry of mounted volumes.
//!
//! [`VolumeManager`] assigns integer ids to volumes in registration order,
//! tracks the current directory, turns path strings into [`GlobalPath`]s
//! and performs copy and move across volumes.
//!
//! # Examples
//!
//! ```
//! use scriptvol::{Harddisk, Volume, VolumeManager};
//!
//! let mut manager = VolumeManager::new();
//! let first = manager.add(Volume::new(Harddisk::new("main", 1000)));
//! let second = manager.add(Volume::new(Harddisk::new("backup", 1000)));
//!
//! let source = manager.resolve("/notes.txt")?;
//! manager
//!     .get_volume(source.volume_id())?
//!     .save_file(source.path(), &"hello".into(), true)?;
//!
//! let target = manager.resolve("backup:/notes.txt")?;
//! assert!(manager.move_path(&source, &target)?);
//! assert!(!manager.volume(first).unwrap().exists(source.path(), false)?);
//! assert_eq!(target.to_string(), format!("{second}:/notes.txt"));
//! # Ok::<(), scriptvol::VolumeError>(())
//! ```

use std::collections::BTreeMap;

use tracing::{debug, info};

use crate::error::{Result, VolumeError};
use crate::item::{VolumeDirectory, VolumeFile, VolumeItem};
use crate::path::{GlobalPath, VolumeId, VolumePath};
use crate::volume::{Volume, VolumeKind};

/// Mounted volumes and the current directory.
#[derive(Debug, Default)]
pub struct VolumeManager {
    volumes: BTreeMap<usize, Volume>,
    next_id: usize,
    current_directory: Option<GlobalPath>,
}

impl VolumeManager {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of registered volumes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.volumes.len()
    }

    /// Returns `true` if no volume is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.volumes.is_empty()
    }

    /// Registered volumes in id order.
    pub fn volumes(&self) -> impl Iterator<Item = (usize, &Volume)> {
        self.volumes.iter().map(|(id, volume)| (*id, volume))
    }

    /// Registers a volume and returns its id. The first volume becomes
    /// current.
    pub fn add(&mut self, volume: Volume) -> usize {
        let id = self.next_id;
        self.next_id += 1;
        info!("Registered volume {} as #{id}", volume.name());
        self.volumes.insert(id, volume);
        if self.current_directory.is_none() {
            self.current_directory = Some(GlobalPath::root_of(id));
        }
        id
    }

    /// Unregisters a volume. If it was current, the lowest remaining id
    /// becomes current.
    pub fn remove(&mut self, id: usize) -> Option<Volume> {
        let removed = self.volumes.remove(&id)?;
        info!("Removed volume #{id} ({})", removed.name());
        if self.current_volume_id() == Some(id) {
            self.current_directory = self.volumes.keys().next().map(|first| GlobalPath::root_of(*first));
            match &self.current_directory {
                Some(directory) => info!("Current directory is now {directory}"),
                None => info!("No volumes left, current directory cleared"),
            }
        }
        Some(removed)
    }

    /// Unregisters the volume called `name`, ignoring case.
    pub fn remove_by_name(&mut self, name: &str) -> Option<Volume> {
        let id = self.id_by_name(name)?;
        self.remove(id)
    }

    /// Volume registered under `id`.
    #[must_use]
    pub fn volume(&self, id: usize) -> Option<&Volume> {
        self.volumes.get(&id)
    }

    /// Volume called `name`, ignoring case. The lowest id wins if several
    /// share a name.
    #[must_use]
    pub fn volume_by_name(&self, name: &str) -> Option<&Volume> {
        self.id_by_name(name).and_then(|id| self.volume(id))
    }

    fn id_by_name(&self, name: &str) -> Option<usize> {
        let wanted = name.to_lowercase();
        self.volumes
            .iter()
            .find(|(_, volume)| volume.name().to_lowercase() == wanted)
            .map(|(id, _)| *id)
    }

    /// Id of a registered volume handle.
    #[must_use]
    pub fn volume_id_of(&self, volume: &Volume) -> Option<usize> {
        self.volumes
            .iter()
            .find(|(_, registered)| registered.same_volume(volume))
            .map(|(id, _)| *id)
    }

    /// Resolves a volume identifier to its integer id.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::VolumeNotFound`] if nothing matches.
    pub fn index_of(&self, id: &VolumeId) -> Result<usize> {
        let found = match id {
            VolumeId::Index(index) => self.volumes.contains_key(index).then_some(*index),
            VolumeId::Name(name) => self.id_by_name(name),
        };
        found.ok_or_else(|| VolumeError::VolumeNotFound {
            volume: id.to_string(),
        })
    }

    /// Looks up a volume by id or name.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::VolumeNotFound`] if nothing matches.
    pub fn get_volume(&self, id: &VolumeId) -> Result<&Volume> {
        let index = self.index_of(id)?;
        self.volume(index).ok_or_else(|| VolumeError::VolumeNotFound {
            volume: id.to_string(),
        })
    }

    /// Current directory, if any volume is registered.
    #[must_use]
    pub const fn current_directory(&self) -> Option<&GlobalPath> {
        self.current_directory.as_ref()
    }

    /// Id of the volume holding the current directory.
    #[must_use]
    pub fn current_volume_id(&self) -> Option<usize> {
        self.current_directory.as_ref()?.volume_id().as_index()
    }

    /// Volume holding the current directory.
    #[must_use]
    pub fn current_volume(&self) -> Option<&Volume> {
        self.volume(self.current_volume_id()?)
    }

    /// Makes the root of another volume the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::VolumeNotFound`] if nothing matches.
    pub fn switch_to(&mut self, id: &VolumeId) -> Result<()> {
        let index = self.index_of(id)?;
        info!("Switching to volume {}", self.best_identifier(index)?);
        self.current_directory = Some(GlobalPath::root_of(index));
        Ok(())
    }

    /// Changes the current directory to the directory `text` resolves to.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::NotFound`] if no directory is there and
    /// [`VolumeError::TypeMismatch`] if a file is.
    pub fn change_directory(&mut self, text: &str) -> Result<()> {
        let target = self.resolve(text)?;
        match self.open(&target, false)? {
            Some(VolumeItem::Directory(_)) => {
                debug!("Current directory is now {target}");
                self.current_directory = Some(target);
                Ok(())
            }
            Some(VolumeItem::File(_)) => Err(VolumeError::type_mismatch(&target, "directory")),
            None => Err(VolumeError::not_found(&target)),
        }
    }

    /// Reconciles the registry with the volumes currently attached.
    ///
    /// Registered volumes that are neither an archive nor attached are
    /// removed. Attached volumes not yet registered are added.
    pub fn update_volumes(&mut self, attached: &[Volume]) {
        let stale: Vec<usize> = self
            .volumes
            .iter()
            .filter(|(_, volume)| {
                volume.kind() != VolumeKind::Archive
                    && !attached.iter().any(|candidate| candidate.same_volume(volume))
            })
            .map(|(id, _)| *id)
            .collect();
        for id in stale {
            self.remove(id);
        }
        for volume in attached {
            if self.volume_id_of(volume).is_none() {
                self.add(volume.clone());
            }
        }
    }

    /// `#id: "name"`, or `#id` for an unnamed volume.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::VolumeNotFound`] for an unknown id.
    pub fn best_identifier(&self, id: usize) -> Result<String> {
        let name = self.registered(id)?.name();
        Ok(if name.is_empty() {
            format!("#{id}")
        } else {
            format!("#{id}: \"{name}\"")
        })
    }

    /// The name, or the id for an unnamed volume.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::VolumeNotFound`] for an unknown id.
    pub fn raw_identifier(&self, id: usize) -> Result<String> {
        let name = self.registered(id)?.name();
        Ok(if name.is_empty() { id.to_string() } else { name })
    }

    fn registered(&self, id: usize) -> Result<&Volume> {
        self.volume(id).ok_or_else(|| VolumeError::VolumeNotFound {
            volume: id.to_string(),
        })
    }

    /// Power drawn by the current volume, rounded to four decimals. Zero
    /// without a current volume.
    #[must_use]
    pub fn current_required_power(&self) -> f64 {
        let power = self.current_volume().map_or(0.0, Volume::required_power);
        (power * 10_000.0).round() / 10_000.0
    }

    /// Renames a volume.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::VolumeNotFound`] for an unknown volume and
    /// [`VolumeError::NotRenameable`] for a fixed name.
    pub fn rename_volume(&self, id: &VolumeId, name: &str) -> Result<()> {
        self.get_volume(id)?.rename(name)
    }

    /// Turns path text into a [`GlobalPath`] with an integer volume id.
    ///
    /// Text with a volume prefix names its volume directly, text starting
    /// with `/` refers to the current volume and anything else is relative
    /// to the current directory.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] for malformed text,
    /// [`VolumeError::VolumeNotFound`] for an unknown volume and
    /// [`VolumeError::NoCurrentDirectory`] if a relative path is given with
    /// nothing registered.
    pub fn resolve(&self, text: &str) -> Result<GlobalPath> {
        if GlobalPath::has_volume_id(text) {
            return self.canonical(&GlobalPath::from_string(text)?);
        }
        let current = self
            .current_directory
            .as_ref()
            .ok_or(VolumeError::NoCurrentDirectory)?;
        if VolumePath::is_absolute(text) {
            return GlobalPath::new(current.volume_id().clone(), VolumePath::from_string(text)?);
        }
        GlobalPath::from_string_and_base(text, current)
    }

    /// Same location with the volume id in integer form.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::VolumeNotFound`] for an unknown volume.
    pub fn canonical(&self, path: &GlobalPath) -> Result<GlobalPath> {
        Ok(path.with_volume_id(self.index_of(path.volume_id())?))
    }

    /// Looks up the item at a global path.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::VolumeNotFound`] for an unknown volume.
    pub fn open(&self, path: &GlobalPath, prefer_compiled: bool) -> Result<Option<VolumeItem>> {
        self.get_volume(path.volume_id())?.open(path.path(), prefer_compiled)
    }

    /// Copies a file or directory tree.
    ///
    /// A directory copied onto an existing directory lands inside it under
    /// its own name, unless the source is a volume root. A file copied onto
    /// a directory lands inside it. Returns `false` if the destination ran
    /// out of room, in which case part of a tree may already be copied.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::NotFound`] if the source is missing,
    /// [`VolumeError::TypeMismatch`] when copying a directory onto a file
    /// and [`VolumeError::CopyIntoDescendant`] when copying a directory
    /// into itself.
    pub fn copy(&self, from: &GlobalPath, to: &GlobalPath, verify_free_space: bool) -> Result<bool> {
        let from = self.canonical(from)?;
        let to = self.canonical(to)?;
        let source = self
            .open(&from, false)?
            .ok_or_else(|| VolumeError::not_found(&from))?;
        let target = self.copy_target(&from, &source, &to)?;
        debug!("Copying {from} to {target}");

        match source {
            VolumeItem::Directory(_) => self.copy_directory(&from, &target, verify_free_space),
            VolumeItem::File(file) => self.copy_file(&file, &target, verify_free_space),
        }
    }

    /// Path that [`copy`](Self::copy) writes `source` to when asked to copy
    /// `from` onto `to`. Both paths are canonical.
    fn copy_target(&self, from: &GlobalPath, source: &VolumeItem, to: &GlobalPath) -> Result<GlobalPath> {
        match (source, self.open(to, false)?) {
            (VolumeItem::Directory(_), Some(VolumeItem::File(_))) => {
                Err(VolumeError::type_mismatch(to, "directory"))
            }
            (VolumeItem::Directory(_), Some(VolumeItem::Directory(_))) if !from.is_root() => {
                to.combine(&[from.name()])
            }
            (VolumeItem::File(file), Some(VolumeItem::Directory(directory))) => GlobalPath::new(
                to.volume_id().clone(),
                directory.path().combine(&[file.name()])?,
            ),
            _ => Ok(to.clone()),
        }
    }

    /// Whether `inner` lies strictly below `outer` on the same volume. Both
    /// paths are canonical.
    fn is_below(&self, outer: &GlobalPath, inner: &GlobalPath) -> Result<bool> {
        if outer.volume_id() != inner.volume_id() {
            return Ok(false);
        }
        self.get_volume(outer.volume_id())?.is_below(outer.path(), inner.path())
    }

    fn copy_file(&self, file: &VolumeFile, to: &GlobalPath, verify_free_space: bool) -> Result<bool> {
        let content = file.read_all()?;
        let saved = self
            .get_volume(to.volume_id())?
            .save_file(to.path(), &content, verify_free_space)?;
        Ok(saved.is_some())
    }

    /// Copies the contents of the directory `from` into the directory `to`,
    /// creating it if needed. Returns `false` if the destination ran out of
    /// room.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::CopyIntoDescendant`] if `to` is inside
    /// `from`, [`VolumeError::TypeMismatch`] if `to` is a file and
    /// [`VolumeError::NotFound`] if `from` is not a directory.
    pub fn copy_directory(&self, from: &GlobalPath, to: &GlobalPath, verify_free_space: bool) -> Result<bool> {
        let from = self.canonical(from)?;
        let to = self.canonical(to)?;
        if self.is_below(&from, &to)? {
            return Err(VolumeError::CopyIntoDescendant {
                from: from.to_string(),
                to: to.to_string(),
            });
        }
        let source = self
            .get_volume(from.volume_id())?
            .open_directory(from.path())?
            .ok_or_else(|| VolumeError::not_found(&from))?;
        let destination_volume = self.get_volume(to.volume_id())?;
        let destination: VolumeDirectory = match destination_volume.open(to.path(), false)? {
            Some(VolumeItem::File(_)) => return Err(VolumeError::type_mismatch(&to, "directory")),
            Some(VolumeItem::Directory(directory)) => directory,
            None => destination_volume.create_directory(to.path())?,
        };

        for (name, item) in source.list()? {
            let target = GlobalPath::new(
                to.volume_id().clone(),
                destination.path().combine(&[name.as_str()])?,
            )?;
            let copied = match item {
                VolumeItem::Directory(directory) => {
                    let child = GlobalPath::new(from.volume_id().clone(), directory.path().clone())?;
                    self.copy_directory(&child, &target, verify_free_space)?
                }
                VolumeItem::File(file) => self.copy_file(&file, &target, verify_free_space)?,
            };
            if !copied {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Copies then deletes the source. Free space is only checked when
    /// moving between volumes. Returns `false` if the destination ran out
    /// of room, leaving the source in place.
    ///
    /// A destination that resolves to the source entry itself, such as its
    /// own parent directory or a different spelling of a case-insensitive
    /// name, leaves everything untouched and returns `true`.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::RootOperation`] for a root source,
    /// [`VolumeError::CopyIntoDescendant`] when moving a directory into
    /// itself, any [`copy`](Self::copy) error, and
    /// [`VolumeError::MoveIncomplete`] if the copy succeeded but the source
    /// could not be deleted.
    pub fn move_path(&self, from: &GlobalPath, to: &GlobalPath) -> Result<bool> {
        let from = self.canonical(from)?;
        let to = self.canonical(to)?;
        if from.is_root() {
            return Err(VolumeError::RootOperation {
                operation: "move",
                path: from.to_string(),
            });
        }
        if self.is_below(&from, &to)? {
            return Err(VolumeError::CopyIntoDescendant {
                from: from.to_string(),
                to: to.to_string(),
            });
        }

        let source_volume = self.get_volume(from.volume_id())?;
        if from.volume_id() == to.volume_id() && source_volume.same_entry(from.path(), to.path())? {
            return Ok(true);
        }
        let source = source_volume
            .open(from.path(), false)?
            .ok_or_else(|| VolumeError::not_found(&from))?;
        let target = self.copy_target(&from, &source, &to)?;
        if target.volume_id() == from.volume_id() && source_volume.same_entry(source.path(), target.path())? {
            debug!("{from} already is {target}, nothing to move");
            return Ok(true);
        }

        let verify_free_space = from.volume_id() != to.volume_id();
        if !self.copy(&from, &to, verify_free_space)? {
            return Ok(false);
        }

        let incomplete = |cause: VolumeError| VolumeError::MoveIncomplete {
            from: from.to_string(),
            to: to.to_string(),
            cause: Box::new(cause),
        };
        match source_volume.delete(source.path(), false) {
            Ok(true) => {
                info!("Moved {from} to {to}");
                Ok(true)
            }
            Ok(false) => Err(incomplete(VolumeError::not_found(&from))),
            Err(cause) => Err(incomplete(cause)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harddisk::Harddisk;

    fn disk(name: &str, capacity: i64) -> Volume {
        Volume::new(Harddisk::new(name, capacity))
    }

    fn manager() -> VolumeManager {
        let mut manager = VolumeManager::new();
        manager.add(disk("first", 1000));
        manager.add(disk("second", 1000));
        manager
    }

    #[test]
    fn test_ids_are_sequential_and_first_is_current() {
        let manager = manager();
        assert_eq!(manager.len(), 2);
        assert_eq!(manager.current_volume_id(), Some(0));
        assert_eq!(manager.current_directory().unwrap().to_string(), "0:/");
        assert_eq!(manager.volumes().map(|(id, _)| id).collect::<Vec<_>>(), [0, 1]);
    }

    #[test]
    fn test_ids_are_not_reused() {
        let mut manager = manager();
        manager.remove(1);
        assert_eq!(manager.add(disk("third", 1)), 2);
    }

    #[test]
    fn test_removing_current_falls_back_to_lowest() {
        let mut manager = manager();
        manager.add(disk("third", 1000));
        manager.switch_to(&VolumeId::Index(2)).unwrap();
        manager.remove(2);
        assert_eq!(manager.current_volume_id(), Some(0));

        manager.remove(0);
        assert_eq!(manager.current_volume_id(), Some(1));
        manager.remove(1);
        assert!(manager.current_directory().is_none());
        assert!(manager.resolve("a").unwrap_err().is_not_found());
    }

    #[test]
    fn test_lookup_by_name_ignores_case() {
        let mut manager = manager();
        assert!(manager.volume_by_name("SECOND").is_some());
        assert_eq!(manager.index_of(&VolumeId::parse("Second").unwrap()).unwrap(), 1);
        assert!(manager.get_volume(&VolumeId::parse("nope").unwrap()).unwrap_err().is_not_found());
        assert!(manager.remove_by_name("FIRST").is_some());
        assert_eq!(manager.len(), 1);
    }

    #[test]
    fn test_resolve_forms() {
        let mut manager = manager();
        manager
            .volume(0)
            .unwrap()
            .create_directory(&VolumePath::from_string("/home").unwrap())
            .unwrap();
        manager.change_directory("home").unwrap();

        assert_eq!(manager.resolve("file").unwrap().to_string(), "0:/home/file");
        assert_eq!(manager.resolve("../x").unwrap().to_string(), "0:/x");
        assert_eq!(manager.resolve("/x").unwrap().to_string(), "0:/x");
        assert_eq!(manager.resolve(".").unwrap().to_string(), "0:/home");
        assert_eq!(manager.resolve("second:/y").unwrap().to_string(), "1:/y");
        assert!(manager.resolve("../../x").unwrap_err().is_invalid_path());
        assert!(manager.resolve("missing:/y").unwrap_err().is_not_found());
    }

    #[test]
    fn test_change_directory_requires_directory() {
        let mut manager = manager();
        let volume = manager.volume(0).unwrap().clone();
        volume
            .save_file(&VolumePath::from_string("/f").unwrap(), &"x".into(), true)
            .unwrap();
        assert!(manager.change_directory("/f").unwrap_err().is_already_exists());
        assert!(manager.change_directory("/nope").unwrap_err().is_not_found());
        manager.change_directory("1:/").unwrap();
        assert_eq!(manager.current_volume_id(), Some(1));
    }

    #[test]
    fn test_identifiers() {
        let manager = manager();
        assert_eq!(manager.best_identifier(0).unwrap(), "#0: \"first\"");
        assert_eq!(manager.raw_identifier(0).unwrap(), "first");
        assert!(manager.best_identifier(9).unwrap_err().is_not_found());
    }

    #[test]
    fn test_unnamed_volume_identifiers() {
        let mut manager = VolumeManager::new();
        manager.add(disk("", 10));
        assert_eq!(manager.best_identifier(0).unwrap(), "#0");
        assert_eq!(manager.raw_identifier(0).unwrap(), "0");
    }

    #[test]
    fn test_current_required_power_follows_current_volume() {
        let mut manager = VolumeManager::new();
        manager.add(disk("a", 3333));
        manager.add(disk("b", 25_000));
        assert!((manager.current_required_power() - 0.0133).abs() < 1e-12);

        manager.switch_to(&VolumeId::Name("b".to_string())).unwrap();
        assert!((manager.current_required_power() - 0.1).abs() < 1e-12);

        manager.remove(0);
        manager.remove(1);
        assert!(manager.current_required_power().abs() < f64::EPSILON);
    }

    #[test]
    fn test_update_volumes_keeps_archive() {
        let temp = tempfile::TempDir::new().unwrap();
        let archive = Volume::new(crate::archive::Archive::new(temp.path()).unwrap());
        let kept = disk("kept", 10);
        let dropped = disk("dropped", 10);
        let fresh = disk("fresh", 10);

        let mut manager = VolumeManager::new();
        manager.add(archive);
        manager.add(kept.clone());
        manager.add(dropped);

        manager.update_volumes(&[kept.clone(), fresh.clone()]);
        let names: Vec<_> = manager.volumes().map(|(_, v)| v.name()).collect();
        assert_eq!(names, ["Archive", "kept", "fresh"]);
        assert_eq!(manager.volume_id_of(&fresh), Some(3));
        assert_eq!(manager.volume_id_of(&kept), Some(1));
    }

    #[test]
    fn test_rename_volume() {
        let manager = manager();
        manager.rename_volume(&VolumeId::Index(1), "renamed").unwrap();
        assert!(manager.volume_by_name("renamed").is_some());
    }

    #[test]
    fn test_move_root_fails() {
        let manager = manager();
        let root = manager.resolve("0:/").unwrap();
        let other = manager.resolve("1:/").unwrap();
        assert!(manager.move_path(&root, &other).unwrap_err().is_structural());
    }

    #[test]
    fn test_move_onto_itself_keeps_file() {
        let manager = manager();
        let path = manager.resolve("/a").unwrap();
        manager
            .volume(0)
            .unwrap()
            .save_file(path.path(), &"data".into(), true)
            .unwrap();
        let by_name = manager.resolve("first:/a").unwrap();
        assert!(manager.move_path(&path, &by_name).unwrap());
        assert!(manager.volume(0).unwrap().exists(path.path(), false).unwrap());
    }
}
