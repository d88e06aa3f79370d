//! Volume contract.
//!
//! A volume is a named tree of directories and files. Concrete backings
//! implement the small [`Storage`] trait: lookups, listing and single-step
//! mutations on already validated paths. [`Volume`] wraps a storage and
//! provides the operations scripts see, with the same semantics for every
//! backing:
//!
//! - paths that point outside the volume are rejected
//! - missing parent directories are created
//! - a file name without an extension may resolve to its source or
//!   compiled variant
//! - saves check free space first and report "no room" as `Ok(None)`
//!
//! # Examples
//!
//! ```
//! use scriptvol::{FileContent, Harddisk, Volume, VolumePath};
//!
//! let volume = Volume::new(Harddisk::new("scratch", 100));
//! let path = VolumePath::from_string("/lib/util.ks")?;
//!
//! let saved = volume.save_file(&path, &FileContent::from_string("print 1."), true)?;
//! assert!(saved.is_some());
//! assert!(volume.exists(&VolumePath::from_string("/lib/util")?, false)?);
//! assert_eq!(volume.free_space(), 92);
//!
//! let big = FileContent::from_bytes(vec![b'x'; 200]);
//! assert!(volume.save_file(&path, &big, true)?.is_none());
//! # Ok::<(), scriptvol::VolumeError>(())
//! ```

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, warn};

use crate::content::{FileContent, cooked_filename};
use crate::error::{Result, VolumeError};
use crate::item::{VolumeDirectory, VolumeFile, VolumeItem};
use crate::path::{VolumePath, extension_of};

/// Extension of plain text files.
pub const TEXT_EXTENSION: &str = "txt";

/// Extension of script source files.
pub const SOURCE_EXTENSION: &str = "ks";

/// Extension of compiled script files.
pub const COMPILED_EXTENSION: &str = "ksm";

/// Capacity that costs [`BASE_POWER`] to keep running.
pub const BASE_CAPACITY: i64 = 10_000;

/// Power drawn by a volume of [`BASE_CAPACITY`] bytes.
pub const BASE_POWER: f64 = 0.04;

/// Capacity value meaning "no limit".
pub const INFINITE_CAPACITY: i64 = -1;

/// Type of a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    /// Regular file
    File,
    /// Directory
    Directory,
}

/// Which backing a volume uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeKind {
    /// Host directory tree
    Archive,
    /// Capacity-limited in-memory tree
    Harddisk,
}

impl VolumeKind {
    /// Lowercase kind name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Archive => "archive",
            Self::Harddisk => "harddisk",
        }
    }
}

/// Primitive operations a volume backing provides.
///
/// Paths handed to these methods never point outside the volume and are
/// never the root unless stated. Parent directories of mutated paths exist.
/// Implementations use interior locking so a storage can be shared through
/// an [`Arc`].
pub trait Storage: Send + Sync + fmt::Debug {
    /// Backing kind.
    fn kind(&self) -> VolumeKind;

    /// Current volume name.
    fn name(&self) -> String;

    /// Changes the volume name.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::NotRenameable`] if the backing has a fixed
    /// name.
    fn set_name(&self, name: &str) -> Result<()>;

    /// Whether [`set_name`](Self::set_name) can succeed.
    fn renameable(&self) -> bool {
        true
    }

    /// Capacity in bytes, or [`INFINITE_CAPACITY`].
    fn capacity(&self) -> i64;

    /// Bytes used by all files.
    fn size(&self) -> usize;

    /// Type of the entry at `path`, or `None` if nothing is there.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing can't be queried.
    fn entry_kind(&self, path: &VolumePath) -> Result<Option<EntryKind>>;

    /// Names and types of the entries in the directory at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::NotFound`] if no directory is at `path`.
    fn list(&self, path: &VolumePath) -> Result<Vec<(String, EntryKind)>>;

    /// Content of the file at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::NotFound`] if no file is at `path`.
    fn read(&self, path: &VolumePath) -> Result<FileContent>;

    /// Creates one directory. The parent exists.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::AlreadyExists`] if something is at `path`.
    fn make_directory(&self, path: &VolumePath) -> Result<()>;

    /// Creates or replaces the file at `path` with a copy of `content`.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::AlreadyExists`] if a directory is at `path`.
    fn store(&self, path: &VolumePath, content: &FileContent) -> Result<()>;

    /// Removes the file or directory tree at `path`. Returns `false` if
    /// nothing was there.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing fails to remove the entry.
    fn remove(&self, path: &VolumePath) -> Result<bool>;

    /// Removes everything.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing fails to reset.
    fn clear(&self) -> Result<()>;

    /// Whether `a` and `b` name the same entry under the backing's name
    /// matching rules.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing can't be queried.
    fn same_entry(&self, a: &VolumePath, b: &VolumePath) -> Result<bool> {
        Ok(a == b)
    }

    /// Power needed to keep the volume running.
    #[allow(clippy::cast_precision_loss)]
    fn required_power(&self) -> f64 {
        BASE_POWER * self.capacity() as f64 / BASE_CAPACITY as f64
    }
}

/// A root-level file seen through the legacy flat-file interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramFile {
    /// File name including extension
    pub name: String,
    /// File content
    pub content: FileContent,
}

pub(crate) fn to_i64(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Shared handle to a volume.
///
/// Cloning is cheap; clones refer to the same storage.
#[derive(Clone)]
pub struct Volume {
    storage: Arc<dyn Storage>,
}

impl fmt::Debug for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Volume")
            .field("name", &self.name())
            .field("kind", &self.kind())
            .field("capacity", &self.capacity())
            .finish()
    }
}

impl Volume {
    /// Wraps a storage backing.
    pub fn new<S: Storage + 'static>(storage: S) -> Self {
        Self {
            storage: Arc::new(storage),
        }
    }

    /// Wraps an already shared storage backing.
    #[must_use]
    pub fn from_storage(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }

    /// Returns `true` if both handles refer to the same storage.
    #[must_use]
    pub fn same_volume(&self, other: &Self) -> bool {
        std::ptr::addr_eq(Arc::as_ptr(&self.storage), Arc::as_ptr(&other.storage))
    }

    /// Backing kind.
    #[must_use]
    pub fn kind(&self) -> VolumeKind {
        self.storage.kind()
    }

    /// Volume name.
    #[must_use]
    pub fn name(&self) -> String {
        self.storage.name()
    }

    /// Whether the volume can be renamed.
    #[must_use]
    pub fn renameable(&self) -> bool {
        self.storage.renameable()
    }

    /// Renames the volume.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::NotRenameable`] if the volume has a fixed
    /// name, or [`VolumeError::InvalidPath`] for an empty name.
    pub fn rename(&self, name: &str) -> Result<()> {
        if !self.renameable() {
            return Err(VolumeError::NotRenameable {
                volume: self.name(),
            });
        }
        if name.trim().is_empty() {
            return Err(VolumeError::invalid_path(name, "Volume name can't be empty"));
        }
        debug!("Renaming volume '{}' to '{name}'", self.name());
        self.storage.set_name(name)
    }

    /// Capacity in bytes, or [`INFINITE_CAPACITY`].
    #[must_use]
    pub fn capacity(&self) -> i64 {
        self.storage.capacity()
    }

    /// Bytes used by all files.
    #[must_use]
    pub fn size(&self) -> usize {
        self.storage.size()
    }

    /// Bytes left, or [`INFINITE_CAPACITY`] when unlimited.
    #[must_use]
    pub fn free_space(&self) -> i64 {
        let capacity = self.capacity();
        if capacity == INFINITE_CAPACITY {
            return INFINITE_CAPACITY;
        }
        capacity.saturating_sub(to_i64(self.size()))
    }

    /// Power needed to keep the volume running.
    #[must_use]
    pub fn required_power(&self) -> f64 {
        self.storage.required_power()
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> VolumeDirectory {
        VolumeDirectory::new(self.clone(), VolumePath::root())
    }

    fn check_location(path: &VolumePath) -> Result<()> {
        if path.points_outside() {
            return Err(VolumeError::invalid_path(
                path.to_string(),
                "This path points to something outside of volume",
            ));
        }
        Ok(())
    }

    /// Looks up the item at `path`.
    ///
    /// When nothing is at `path` and its name has no extension, the source
    /// and compiled variants are tried. If both exist, `prefer_compiled`
    /// picks the compiled one. Directories are never found this way.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] if the path points outside.
    pub fn open(&self, path: &VolumePath, prefer_compiled: bool) -> Result<Option<VolumeItem>> {
        Self::check_location(path)?;
        let item = match self.storage.entry_kind(path)? {
            Some(kind) => Some(self.item(path.clone(), kind)),
            None => self
                .search_variants(path, prefer_compiled)?
                .map(|found| VolumeItem::File(VolumeFile::new(self.clone(), found))),
        };
        debug!(
            "Opened '{path}' on '{}': {}",
            self.name(),
            item.as_ref().map_or_else(|| "not found".to_string(), |i| i.path().to_string())
        );
        Ok(item)
    }

    /// Like [`open`](Self::open), but only returns files.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] if the path points outside.
    pub fn open_file(&self, path: &VolumePath, prefer_compiled: bool) -> Result<Option<VolumeFile>> {
        Ok(self.open(path, prefer_compiled)?.and_then(VolumeItem::into_file))
    }

    /// Returns the directory at `path`, if there is one.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] if the path points outside.
    pub fn open_directory(&self, path: &VolumePath) -> Result<Option<VolumeDirectory>> {
        Self::check_location(path)?;
        Ok(match self.storage.entry_kind(path)? {
            Some(EntryKind::Directory) => Some(VolumeDirectory::new(self.clone(), path.clone())),
            _ => None,
        })
    }

    fn item(&self, path: VolumePath, kind: EntryKind) -> VolumeItem {
        match kind {
            EntryKind::File => VolumeItem::File(VolumeFile::new(self.clone(), path)),
            EntryKind::Directory => VolumeItem::Directory(VolumeDirectory::new(self.clone(), path)),
        }
    }

    fn search_variants(&self, path: &VolumePath, prefer_compiled: bool) -> Result<Option<VolumePath>> {
        let name = path.name();
        let Ok(source_name) = cooked_filename(name, SOURCE_EXTENSION) else {
            return Ok(None);
        };
        if source_name == name {
            return Ok(None);
        }
        let compiled_name = cooked_filename(name, COMPILED_EXTENSION)?;
        let source = path.change_name(&source_name)?;
        let compiled = path.change_name(&compiled_name)?;

        let has_source = self.storage.entry_kind(&source)? == Some(EntryKind::File);
        let has_compiled = self.storage.entry_kind(&compiled)? == Some(EntryKind::File);
        Ok(match (has_source, has_compiled) {
            (true, true) if prefer_compiled => Some(compiled),
            (true, _) => Some(source),
            (false, true) => Some(compiled),
            (false, false) => None,
        })
    }

    /// Returns `true` if [`open`](Self::open) finds something at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] if the path points outside.
    pub fn exists(&self, path: &VolumePath, prefer_compiled: bool) -> Result<bool> {
        Ok(self.open(path, prefer_compiled)?.is_some())
    }

    /// Returns `true` if `a` and `b` refer to the same entry of this
    /// volume, such as two spellings of a case-insensitive name.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] if either path points outside.
    pub fn same_entry(&self, a: &VolumePath, b: &VolumePath) -> Result<bool> {
        Self::check_location(a)?;
        Self::check_location(b)?;
        self.storage.same_entry(a, b)
    }

    /// Returns `true` if `inner` lies strictly below `outer`, matching names
    /// the way this volume does.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] if either path points outside.
    pub fn is_below(&self, outer: &VolumePath, inner: &VolumePath) -> Result<bool> {
        if inner.length() <= outer.length() {
            return Ok(false);
        }
        let prefix = VolumePath::from_segments(inner.segments()[..outer.length()].iter().cloned())?;
        self.same_entry(outer, &prefix)
    }

    /// Makes sure a directory exists at `path`, creating missing ancestors.
    fn ensure_directory(&self, path: &VolumePath) -> Result<()> {
        for depth in 1..=path.length() {
            let ancestor = VolumePath::from_segments(path.segments()[..depth].iter().cloned())?;
            match self.storage.entry_kind(&ancestor)? {
                Some(EntryKind::Directory) => {}
                Some(EntryKind::File) => {
                    return Err(VolumeError::type_mismatch(&ancestor, "directory"));
                }
                None => {
                    debug!("Creating directory '{ancestor}' on '{}'", self.name());
                    self.storage.make_directory(&ancestor)?;
                }
            }
        }
        Ok(())
    }

    /// Creates a directory, including missing ancestors.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::AlreadyExists`] if anything is at `path` or a
    /// file blocks an ancestor, [`VolumeError::RootOperation`] for the root
    /// and [`VolumeError::InvalidPath`] if the path points outside.
    pub fn create_directory(&self, path: &VolumePath) -> Result<VolumeDirectory> {
        Self::check_location(path)?;
        if path.is_root() {
            return Err(VolumeError::RootOperation {
                operation: "create",
                path: path.to_string(),
            });
        }
        if self.storage.entry_kind(path)?.is_some() {
            return Err(VolumeError::already_exists(path, "directory or file already exists"));
        }
        self.ensure_directory(path)?;
        Ok(VolumeDirectory::new(self.clone(), path.clone()))
    }

    /// Returns the directory at `path`, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::AlreadyExists`] if a file is at `path` or
    /// blocks an ancestor.
    pub fn get_or_create_directory(&self, path: &VolumePath) -> Result<VolumeDirectory> {
        Self::check_location(path)?;
        self.ensure_directory(path)?;
        Ok(VolumeDirectory::new(self.clone(), path.clone()))
    }

    /// Creates an empty file, including missing parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::AlreadyExists`] if anything is at `path` or a
    /// file blocks a parent, [`VolumeError::RootOperation`] for the root
    /// and [`VolumeError::InvalidPath`] if the path points outside.
    pub fn create_file(&self, path: &VolumePath) -> Result<VolumeFile> {
        Self::check_location(path)?;
        if path.is_root() {
            return Err(VolumeError::RootOperation {
                operation: "create a file at",
                path: path.to_string(),
            });
        }
        if self.storage.entry_kind(path)?.is_some() {
            return Err(VolumeError::already_exists(path, "directory or file already exists"));
        }
        self.ensure_directory(&path.parent()?)?;
        self.storage.store(path, &FileContent::new())?;
        debug!("Created file '{path}' on '{}'", self.name());
        Ok(VolumeFile::new(self.clone(), path.clone()))
    }

    /// Returns the file [`open`](Self::open) finds at `path`, or creates an
    /// empty one.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::AlreadyExists`] if a directory is at `path`.
    pub fn open_or_create(&self, path: &VolumePath, prefer_compiled: bool) -> Result<VolumeFile> {
        match self.open(path, prefer_compiled)? {
            Some(VolumeItem::File(file)) => Ok(file),
            Some(VolumeItem::Directory(_)) => Err(VolumeError::type_mismatch(path, "file")),
            None => self.create_file(path),
        }
    }

    /// Deletes the item [`open`](Self::open) finds at `path`, with
    /// directories removed recursively. Returns `false` if nothing was
    /// there.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::RootOperation`] for the root and
    /// [`VolumeError::InvalidPath`] if the path points outside.
    pub fn delete(&self, path: &VolumePath, prefer_compiled: bool) -> Result<bool> {
        Self::check_location(path)?;
        if path.is_root() {
            return Err(VolumeError::RootOperation {
                operation: "delete",
                path: path.to_string(),
            });
        }
        let Some(item) = self.open(path, prefer_compiled)? else {
            debug!("Nothing to delete at '{path}' on '{}'", self.name());
            return Ok(false);
        };
        debug!("Deleting '{}' on '{}'", item.path(), self.name());
        self.storage.remove(item.path())
    }

    /// Removes every file and directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing fails to reset.
    pub fn clear(&self) -> Result<()> {
        debug!("Clearing volume '{}'", self.name());
        self.storage.clear()
    }

    /// Returns `true` if `content` fits when written to `path`, counting
    /// the space released by a file already there.
    ///
    /// # Errors
    ///
    /// Returns an error if the existing file can't be read.
    pub fn is_room_for(&self, path: &VolumePath, content: &FileContent) -> Result<bool> {
        let free = self.free_space();
        if free == INFINITE_CAPACITY {
            return Ok(true);
        }
        let existing = match self.storage.entry_kind(path)? {
            Some(EntryKind::File) => self.storage.read(path)?.size(),
            _ => 0,
        };
        Ok(free.saturating_add(to_i64(existing)) >= to_i64(content.size()))
    }

    /// Writes `content` to `path`, replacing an existing file and creating
    /// missing parents.
    ///
    /// Returns `Ok(None)` without touching the volume if
    /// `verify_free_space` is set and the content does not fit.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::AlreadyExists`] if a directory is at `path`,
    /// [`VolumeError::RootOperation`] for the root and
    /// [`VolumeError::InvalidPath`] if the path points outside.
    pub fn save_file(
        &self,
        path: &VolumePath,
        content: &FileContent,
        verify_free_space: bool,
    ) -> Result<Option<VolumeFile>> {
        Self::check_location(path)?;
        if path.is_root() {
            return Err(VolumeError::RootOperation {
                operation: "save a file at",
                path: path.to_string(),
            });
        }
        if self.storage.entry_kind(path)? == Some(EntryKind::Directory) {
            return Err(VolumeError::already_exists(path, "can't save a file over a directory"));
        }
        if verify_free_space && !self.is_room_for(path, content)? {
            warn!(
                "No room for {} bytes at '{path}' on '{}' ({} free)",
                content.size(),
                self.name(),
                self.free_space()
            );
            return Ok(None);
        }
        self.ensure_directory(&path.parent()?)?;
        self.storage.store(path, content)?;
        debug!("Saved {} bytes to '{path}' on '{}'", content.size(), self.name());
        Ok(Some(VolumeFile::new(self.clone(), path.clone())))
    }

    pub(crate) fn entry_kind(&self, path: &VolumePath) -> Result<Option<EntryKind>> {
        self.storage.entry_kind(path)
    }

    pub(crate) fn read(&self, path: &VolumePath) -> Result<FileContent> {
        self.storage.read(path)
    }

    pub(crate) fn list(&self, path: &VolumePath) -> Result<Vec<(String, EntryKind)>> {
        self.storage.list(path)
    }

    /// Root-level files, sorted by name.
    ///
    /// # Errors
    ///
    /// Returns an error if the root can't be listed or a file can't be read.
    pub fn program_files(&self) -> Result<Vec<ProgramFile>> {
        let mut files = Vec::new();
        for (name, kind) in self.storage.list(&VolumePath::root())? {
            if kind != EntryKind::File {
                continue;
            }
            let content = self.storage.read(&VolumePath::root().combine(&[name.as_str()])?)?;
            files.push(ProgramFile { name, content });
        }
        files.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(files)
    }

    /// Saves a root-level file, checking free space.
    ///
    /// # Errors
    ///
    /// Same as [`save_file`](Self::save_file).
    pub fn save_program(&self, file: &ProgramFile) -> Result<Option<VolumeFile>> {
        let path = VolumePath::root().combine(&[file.name.as_str()])?;
        self.save_file(&path, &file.content, true)
    }

    /// Renames a root-level file. A new name without an extension keeps the
    /// old extension. Returns `false` if no such file exists.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::AlreadyExists`] if the new name is taken and
    /// [`VolumeError::InvalidPath`] for invalid names.
    pub fn rename_file(&self, name: &str, new_name: &str) -> Result<bool> {
        let Some(source) = self.open_file(&VolumePath::root().combine(&[name])?, false)? else {
            return Ok(false);
        };
        let mut target_name = new_name.to_string();
        if extension_of(new_name).is_empty() && !source.extension().is_empty() {
            target_name = format!("{new_name}.{}", source.extension());
        }
        let target = VolumePath::root().combine(&[target_name.as_str()])?;
        if self.storage.entry_kind(&target)?.is_some() {
            return Err(VolumeError::already_exists(&target, "target name is taken"));
        }
        let content = source.read_all()?;
        self.storage.store(&target, &content)?;
        self.storage.remove(source.path())?;
        debug!("Renamed '{}' to '{target}' on '{}'", source.path(), self.name());
        Ok(true)
    }

    /// Appends a line of text to a root-level file, creating the file if
    /// needed. A name without an extension gets the source extension. A
    /// newline is inserted first when the file does not already end with
    /// one. Returns `false` if the volume is full.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] for an invalid name.
    pub fn append_line(&self, name: &str, text: &str) -> Result<bool> {
        let name = cooked_filename(name, SOURCE_EXTENSION)?;
        let file = self.open_or_create(&VolumePath::root().combine(&[name.as_str()])?, false)?;
        let mut content = file.read_all()?;
        if !content.is_empty() && !content.bytes().ends_with(b"\n") {
            content.write_str("\n");
        }
        content.write_str(text);
        Ok(self.save_file(file.path(), &content, true)?.is_some())
    }
}
