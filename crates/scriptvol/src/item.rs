//! Files and directories as seen by scripts.
//!
//! Items are transient views: a volume handle plus a path. They are created
//! by lookups and hold no content themselves, so an item can outlive the
//! entry it names. Reading a deleted file fails with
//! [`VolumeError::NotFound`](crate::VolumeError::NotFound).

use std::collections::BTreeMap;

use crate::codec::ProgramCodec;
use crate::content::FileContent;
use crate::error::{Result, VolumeError};
use crate::path::VolumePath;
use crate::volume::{EntryKind, Volume};

/// A file or a directory.
#[derive(Debug, Clone)]
pub enum VolumeItem {
    /// A file
    File(VolumeFile),
    /// A directory
    Directory(VolumeDirectory),
}

impl VolumeItem {
    /// Location inside the volume.
    #[must_use]
    pub const fn path(&self) -> &VolumePath {
        match self {
            Self::File(file) => file.path(),
            Self::Directory(directory) => directory.path(),
        }
    }

    /// Volume holding the item.
    #[must_use]
    pub const fn volume(&self) -> &Volume {
        match self {
            Self::File(file) => file.volume(),
            Self::Directory(directory) => directory.volume(),
        }
    }

    /// Last path segment.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path().name()
    }

    /// Extension of the name.
    #[must_use]
    pub fn extension(&self) -> &str {
        self.path().extension()
    }

    /// Entry type.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        match self {
            Self::File(_) => EntryKind::File,
            Self::Directory(_) => EntryKind::Directory,
        }
    }

    /// Returns `true` for files.
    #[must_use]
    pub const fn is_file(&self) -> bool {
        matches!(self, Self::File(_))
    }

    /// Returns `true` for directories.
    #[must_use]
    pub const fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }

    /// Converts into a file, if this is one.
    #[must_use]
    pub fn into_file(self) -> Option<VolumeFile> {
        match self {
            Self::File(file) => Some(file),
            Self::Directory(_) => None,
        }
    }

    /// Converts into a directory, if this is one.
    #[must_use]
    pub fn into_directory(self) -> Option<VolumeDirectory> {
        match self {
            Self::Directory(directory) => Some(directory),
            Self::File(_) => None,
        }
    }

    /// File size, or the total size of the files below a directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the item no longer exists.
    pub fn size(&self) -> Result<usize> {
        match self {
            Self::File(file) => file.size(),
            Self::Directory(directory) => directory.size(),
        }
    }
}

/// A file on a volume.
///
/// # Examples
///
/// ```
/// use scriptvol::{Harddisk, Volume, VolumePath};
///
/// let volume = Volume::new(Harddisk::new("disk", 64));
/// let file = volume.create_file(&VolumePath::from_string("/notes.txt")?)?;
///
/// assert!(file.write_line("first")?);
/// assert!(file.write("second")?);
/// assert_eq!(file.read_all()?.as_string(), "first\nsecond");
/// assert_eq!(file.size()?, 12);
/// # Ok::<(), scriptvol::VolumeError>(())
/// ```
#[derive(Debug, Clone)]
pub struct VolumeFile {
    volume: Volume,
    path: VolumePath,
}

impl VolumeFile {
    pub(crate) const fn new(volume: Volume, path: VolumePath) -> Self {
        Self { volume, path }
    }

    /// Volume holding the file.
    #[must_use]
    pub const fn volume(&self) -> &Volume {
        &self.volume
    }

    /// Location inside the volume.
    #[must_use]
    pub const fn path(&self) -> &VolumePath {
        &self.path
    }

    /// File name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Extension of the file name.
    #[must_use]
    pub fn extension(&self) -> &str {
        self.path.extension()
    }

    /// Reads the whole file.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::NotFound`](crate::VolumeError::NotFound) if
    /// the file was deleted.
    pub fn read_all(&self) -> Result<FileContent> {
        self.volume.read(&self.path)
    }

    /// Size in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read.
    pub fn size(&self) -> Result<usize> {
        Ok(self.read_all()?.size())
    }

    /// Appends raw bytes. Returns `false` if the volume has no room.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read or written.
    pub fn write_bytes(&self, bytes: &[u8]) -> Result<bool> {
        let mut content = self.read_all()?;
        content.write(bytes);
        Ok(self.volume.save_file(&self.path, &content, true)?.is_some())
    }

    /// Appends UTF-8 text. Returns `false` if the volume has no room.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read or written.
    pub fn write(&self, text: &str) -> Result<bool> {
        self.write_bytes(text.as_bytes())
    }

    /// Appends UTF-8 text and a newline. Returns `false` if the volume has
    /// no room.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can't be read or written.
    pub fn write_line(&self, text: &str) -> Result<bool> {
        let mut line = String::with_capacity(text.len() + 1);
        line.push_str(text);
        line.push('\n');
        self.write(&line)
    }

    /// Truncates the file to zero bytes.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::NotFound`] if the file was deleted, or an
    /// error if it can't be written.
    pub fn clear(&self) -> Result<()> {
        if self.volume.entry_kind(&self.path)? != Some(EntryKind::File) {
            return Err(VolumeError::not_found(&self.path));
        }
        self.volume.save_file(&self.path, &FileContent::new(), false)?;
        Ok(())
    }

    /// Decodes the file as a compiled program.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Codec`](crate::VolumeError::Codec) if the
    /// content is not a compiled program.
    pub fn read_program<C: ProgramCodec>(&self, codec: &C) -> Result<C::Program> {
        self.read_all()?.as_program(codec, self.name())
    }
}

/// A directory on a volume.
#[derive(Debug, Clone)]
pub struct VolumeDirectory {
    volume: Volume,
    path: VolumePath,
}

impl VolumeDirectory {
    pub(crate) const fn new(volume: Volume, path: VolumePath) -> Self {
        Self { volume, path }
    }

    /// Volume holding the directory.
    #[must_use]
    pub const fn volume(&self) -> &Volume {
        &self.volume
    }

    /// Location inside the volume.
    #[must_use]
    pub const fn path(&self) -> &VolumePath {
        &self.path
    }

    /// Directory name, empty for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Direct children keyed by name.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::NotFound`](crate::VolumeError::NotFound) if
    /// the directory was deleted.
    pub fn list(&self) -> Result<BTreeMap<String, VolumeItem>> {
        let mut items = BTreeMap::new();
        for (name, kind) in self.volume.list(&self.path)? {
            let path = self.path.combine(&[name.as_str()])?;
            let item = match kind {
                EntryKind::File => VolumeItem::File(VolumeFile::new(self.volume.clone(), path)),
                EntryKind::Directory => {
                    VolumeItem::Directory(Self::new(self.volume.clone(), path))
                }
            };
            items.insert(name, item);
        }
        Ok(items)
    }

    /// Total size of all files below this directory.
    ///
    /// # Errors
    ///
    /// Returns an error if a child can't be read.
    pub fn size(&self) -> Result<usize> {
        self.list()?
            .values()
            .try_fold(0usize, |total, item| Ok(total.saturating_add(item.size()?)))
    }

    /// Opens a direct child.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`](crate::VolumeError::InvalidPath)
    /// for an invalid name.
    pub fn open(&self, name: &str) -> Result<Option<VolumeItem>> {
        self.volume.open(&self.path.combine(&[name])?, false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tests::LineCodec;
    use crate::harddisk::Harddisk;

    fn volume() -> Volume {
        Volume::new(Harddisk::new("disk", 1000))
    }

    fn path(text: &str) -> VolumePath {
        VolumePath::from_string(text).unwrap()
    }

    #[test]
    fn test_directory_list_and_size() {
        let volume = volume();
        volume.save_file(&path("/d/a.txt"), &"abc".into(), true).unwrap();
        volume.save_file(&path("/d/sub/b.txt"), &"de".into(), true).unwrap();

        let dir = volume.open_directory(&path("/d")).unwrap().unwrap();
        let children = dir.list().unwrap();
        assert_eq!(children.keys().collect::<Vec<_>>(), ["a.txt", "sub"]);
        assert!(children["a.txt"].is_file());
        assert!(children["sub"].is_directory());
        assert_eq!(children["sub"].path(), &path("/d/sub"));
        assert_eq!(dir.size().unwrap(), 5);
        assert_eq!(volume.root().size().unwrap(), 5);
    }

    #[test]
    fn test_file_write_and_clear() {
        let volume = volume();
        let file = volume.create_file(&path("/f.txt")).unwrap();
        assert!(file.write_bytes(&[1, 2, 3]).unwrap());
        assert_eq!(file.size().unwrap(), 3);
        file.clear().unwrap();
        assert_eq!(file.size().unwrap(), 0);
        assert_eq!(volume.size(), 0);
    }

    #[test]
    fn test_file_write_without_room() {
        let volume = Volume::new(Harddisk::new("tiny", 4));
        let file = volume.create_file(&path("/f")).unwrap();
        assert!(file.write("1234").unwrap());
        assert!(!file.write("5").unwrap());
        assert_eq!(file.read_all().unwrap().as_string(), "1234");
    }

    #[test]
    fn test_deleted_file_read_fails() {
        let volume = volume();
        let file = volume.create_file(&path("/gone")).unwrap();
        volume.delete(file.path(), false).unwrap();
        assert!(file.read_all().unwrap_err().is_not_found());
    }

    #[test]
    fn test_clear_deleted_file_does_not_recreate_it() {
        let volume = volume();
        let file = volume.create_file(&path("/gone")).unwrap();
        file.write("abc").unwrap();
        volume.delete(file.path(), false).unwrap();

        assert!(file.clear().unwrap_err().is_not_found());
        assert!(!volume.exists(file.path(), false).unwrap());
    }

    #[test]
    fn test_read_program() {
        let volume = volume();
        let program = vec!["push 2".to_string()];
        let content = FileContent::from_program(&LineCodec, &program).unwrap();
        let file = volume.save_file(&path("/p.ksm"), &content, true).unwrap().unwrap();
        assert_eq!(file.read_program(&LineCodec).unwrap(), program);
    }

    #[test]
    fn test_item_accessors() {
        let volume = volume();
        volume.create_directory(&path("/dir")).unwrap();
        let item = volume.open(&path("/dir"), false).unwrap().unwrap();
        assert_eq!(item.kind(), EntryKind::Directory);
        assert_eq!(item.name(), "dir");
        assert!(item.volume().same_volume(&volume));
        assert!(item.clone().into_file().is_none());
        assert!(item.into_directory().is_some());
    }
}
