//! Capacity-limited in-memory volume.
//!
//! A [`Harddisk`] keeps its whole tree in memory. Names are matched
//! case-insensitively but listed with the spelling they were created with.
//! Used space is tracked incrementally as files are stored and removed.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

use crate::content::FileContent;
use crate::error::{Result, VolumeError};
use crate::path::VolumePath;
use crate::volume::{EntryKind, Storage, VolumeKind};

#[derive(Debug, Clone)]
pub(crate) enum Node {
    File(FileContent),
    Directory(DirectoryNode),
}

impl Node {
    const fn kind(&self) -> EntryKind {
        match self {
            Self::File(_) => EntryKind::File,
            Self::Directory(_) => EntryKind::Directory,
        }
    }

    fn size(&self) -> usize {
        match self {
            Self::File(content) => content.size(),
            Self::Directory(directory) => directory.size(),
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct Child {
    pub(crate) name: String,
    pub(crate) node: Node,
}

#[derive(Debug, Clone, Default)]
pub(crate) struct DirectoryNode {
    pub(crate) children: BTreeMap<String, Child>,
}

pub(crate) fn key(name: &str) -> String {
    name.to_lowercase()
}

impl DirectoryNode {
    fn size(&self) -> usize {
        self.children
            .values()
            .map(|child| child.node.size())
            .fold(0, usize::saturating_add)
    }

    fn find(&self, segments: &[String]) -> Option<&Node> {
        let (first, rest) = segments.split_first()?;
        let child = self.children.get(&key(first))?;
        match (&child.node, rest.is_empty()) {
            (node, true) => Some(node),
            (Node::Directory(directory), false) => directory.find(rest),
            (Node::File(_), false) => None,
        }
    }

    fn find_directory_mut(&mut self, segments: &[String]) -> Option<&mut Self> {
        let Some((first, rest)) = segments.split_first() else {
            return Some(self);
        };
        match &mut self.children.get_mut(&key(first))?.node {
            Node::Directory(directory) => directory.find_directory_mut(rest),
            Node::File(_) => None,
        }
    }
}

#[derive(Debug, Default)]
struct DiskState {
    root: DirectoryNode,
    used: usize,
}

/// In-memory volume with a fixed capacity.
///
/// # Examples
///
/// ```
/// use scriptvol::{Harddisk, Volume, VolumePath};
///
/// let volume = Volume::new(Harddisk::new("scratch", 5000));
/// volume.create_file(&VolumePath::from_string("/Boot.ks")?)?;
///
/// assert!(volume.exists(&VolumePath::from_string("/BOOT.KS")?, false)?);
/// assert_eq!(volume.root().list()?.keys().next().map(String::as_str), Some("Boot.ks"));
/// # Ok::<(), scriptvol::VolumeError>(())
/// ```
#[derive(Debug)]
pub struct Harddisk {
    name: RwLock<String>,
    capacity: i64,
    state: RwLock<DiskState>,
}

impl Harddisk {
    /// Creates an empty harddisk.
    pub fn new(name: impl Into<String>, capacity: i64) -> Self {
        let name = name.into();
        debug!("Creating harddisk '{name}' with capacity {capacity}");
        Self {
            name: RwLock::new(name),
            capacity,
            state: RwLock::new(DiskState::default()),
        }
    }

    pub(crate) fn with_root(name: impl Into<String>, capacity: i64, root: DirectoryNode) -> Self {
        let used = root.size();
        Self {
            name: RwLock::new(name.into()),
            capacity,
            state: RwLock::new(DiskState { root, used }),
        }
    }

    pub(crate) fn snapshot(&self) -> DirectoryNode {
        self.read_state().root.clone()
    }

    fn read_state(&self) -> RwLockReadGuard<'_, DiskState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, DiskState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn split_leaf(path: &VolumePath) -> Result<(&[String], &String)> {
    let (leaf, parent) = path.segments().split_last().ok_or_else(|| VolumeError::RootOperation {
        operation: "modify",
        path: path.to_string(),
    })?;
    Ok((parent, leaf))
}

impl Storage for Harddisk {
    fn kind(&self) -> VolumeKind {
        VolumeKind::Harddisk
    }

    fn name(&self) -> String {
        self.name.read().unwrap_or_else(PoisonError::into_inner).clone()
    }

    fn set_name(&self, name: &str) -> Result<()> {
        *self.name.write().unwrap_or_else(PoisonError::into_inner) = name.to_string();
        Ok(())
    }

    fn capacity(&self) -> i64 {
        self.capacity
    }

    fn size(&self) -> usize {
        self.read_state().used
    }

    fn entry_kind(&self, path: &VolumePath) -> Result<Option<EntryKind>> {
        if path.is_root() {
            return Ok(Some(EntryKind::Directory));
        }
        Ok(self.read_state().root.find(path.segments()).map(Node::kind))
    }

    fn list(&self, path: &VolumePath) -> Result<Vec<(String, EntryKind)>> {
        let state = self.read_state();
        let directory = if path.is_root() {
            &state.root
        } else {
            match state.root.find(path.segments()) {
                Some(Node::Directory(directory)) => directory,
                _ => return Err(VolumeError::not_found(path)),
            }
        };
        Ok(directory
            .children
            .values()
            .map(|child| (child.name.clone(), child.node.kind()))
            .collect())
    }

    fn read(&self, path: &VolumePath) -> Result<FileContent> {
        match self.read_state().root.find(path.segments()) {
            Some(Node::File(content)) => Ok(content.clone()),
            _ => Err(VolumeError::not_found(path)),
        }
    }

    fn make_directory(&self, path: &VolumePath) -> Result<()> {
        let (parent, leaf) = split_leaf(path)?;
        let mut state = self.write_state();
        let directory = state
            .root
            .find_directory_mut(parent)
            .ok_or_else(|| VolumeError::not_found(path))?;
        if directory.children.contains_key(&key(leaf)) {
            return Err(VolumeError::already_exists(path, "directory or file already exists"));
        }
        directory.children.insert(
            key(leaf),
            Child {
                name: leaf.clone(),
                node: Node::Directory(DirectoryNode::default()),
            },
        );
        Ok(())
    }

    fn store(&self, path: &VolumePath, content: &FileContent) -> Result<()> {
        let (parent, leaf) = split_leaf(path)?;
        let mut state = self.write_state();
        let directory = state
            .root
            .find_directory_mut(parent)
            .ok_or_else(|| VolumeError::not_found(path))?;
        let released = match directory.children.get_mut(&key(leaf)) {
            Some(Child {
                node: Node::Directory(_),
                ..
            }) => {
                return Err(VolumeError::already_exists(path, "can't save a file over a directory"));
            }
            Some(Child {
                node: Node::File(existing),
                ..
            }) => {
                let released = existing.size();
                *existing = content.clone();
                released
            }
            None => {
                directory.children.insert(
                    key(leaf),
                    Child {
                        name: leaf.clone(),
                        node: Node::File(content.clone()),
                    },
                );
                0
            }
        };
        state.used = state.used.saturating_sub(released).saturating_add(content.size());
        Ok(())
    }

    fn remove(&self, path: &VolumePath) -> Result<bool> {
        let (parent, leaf) = split_leaf(path)?;
        let mut state = self.write_state();
        let Some(directory) = state.root.find_directory_mut(parent) else {
            return Ok(false);
        };
        let Some(removed) = directory.children.remove(&key(leaf)) else {
            return Ok(false);
        };
        state.used = state.used.saturating_sub(removed.node.size());
        Ok(true)
    }

    fn same_entry(&self, a: &VolumePath, b: &VolumePath) -> Result<bool> {
        Ok(a.length() == b.length()
            && a.segments()
                .iter()
                .zip(b.segments())
                .all(|(left, right)| key(left) == key(right)))
    }

    fn clear(&self) -> Result<()> {
        *self.write_state() = DiskState::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::volume::Volume;

    fn path(text: &str) -> VolumePath {
        VolumePath::from_string(text).unwrap()
    }

    #[test]
    fn test_used_space_tracks_store_and_remove() {
        let disk = Harddisk::new("d", 100);
        disk.make_directory(&path("/a")).unwrap();
        disk.store(&path("/a/f"), &"12345".into()).unwrap();
        disk.store(&path("/g"), &"12".into()).unwrap();
        assert_eq!(disk.size(), 7);

        disk.store(&path("/a/f"), &"1".into()).unwrap();
        assert_eq!(disk.size(), 3);

        assert!(disk.remove(&path("/a")).unwrap());
        assert_eq!(disk.size(), 2);
        assert!(!disk.remove(&path("/a")).unwrap());
    }

    #[test]
    fn test_store_copies_content() {
        let disk = Harddisk::new("d", 100);
        let mut content = FileContent::from_string("abc");
        disk.store(&path("/f"), &content).unwrap();
        content.write_str("def");
        assert_eq!(disk.read(&path("/f")).unwrap().as_string(), "abc");
    }

    #[test]
    fn test_names_are_case_insensitive() {
        let disk = Harddisk::new("d", 100);
        disk.make_directory(&path("/Dir")).unwrap();
        assert_eq!(disk.entry_kind(&path("/dir")).unwrap(), Some(EntryKind::Directory));
        assert!(disk.make_directory(&path("/DIR")).unwrap_err().is_already_exists());

        disk.store(&path("/dir/File.TXT"), &"x".into()).unwrap();
        disk.store(&path("/DIR/file.txt"), &"yy".into()).unwrap();
        let listing = disk.list(&path("/dir")).unwrap();
        assert_eq!(listing, [("File.TXT".to_string(), EntryKind::File)]);
        assert_eq!(disk.size(), 2);
    }

    #[test]
    fn test_store_over_directory_fails() {
        let disk = Harddisk::new("d", 100);
        disk.make_directory(&path("/d")).unwrap();
        assert!(disk.store(&path("/d"), &"x".into()).unwrap_err().is_already_exists());
    }

    #[test]
    fn test_missing_parent_is_not_found() {
        let disk = Harddisk::new("d", 100);
        assert!(disk.make_directory(&path("/a/b")).unwrap_err().is_not_found());
        assert!(disk.list(&path("/a")).unwrap_err().is_not_found());
        assert!(disk.read(&path("/a")).unwrap_err().is_not_found());
    }

    #[test]
    fn test_clear_resets_usage() {
        let volume = Volume::new(Harddisk::new("d", 100));
        volume.save_file(&path("/a/b/c"), &"1234".into(), true).unwrap();
        volume.clear().unwrap();
        assert_eq!(volume.size(), 0);
        assert_eq!(volume.free_space(), 100);
        assert!(volume.root().list().unwrap().is_empty());
    }

    #[test]
    fn test_rename_harddisk() {
        let disk = Harddisk::new("old", 1);
        disk.set_name("new").unwrap();
        assert_eq!(disk.name(), "new");
        assert!(disk.renameable());
    }
}
