//! Persistent snapshots of harddisks.
//!
//! A harddisk lives only in memory. [`HarddiskImage`] captures its name,
//! capacity and full tree so it can be written to a JSON file and restored
//! later. File bytes are stored as base64.
//!
//! ```json
//! {
//!   "name": "scratch",
//!   "capacity": 5000,
//!   "root": {
//!     "boot.ks": { "type": "file", "content": "cHJpbnQgMS4=" },
//!     "lib": { "type": "directory", "entries": {} }
//!   }
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::content::FileContent;
use crate::error::{Result, VolumeError};
use crate::harddisk::{Child, DirectoryNode, Harddisk, Node, key};
use crate::path::{CURRENT_DIRECTORY, UP_SEGMENT, VolumePath};
use crate::volume::Storage;

/// One tree entry of an image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum NodeImage {
    /// File with base64 content
    File {
        /// Base64 encoded bytes
        content: String,
    },
    /// Directory with named children
    Directory {
        /// Children keyed by name
        entries: BTreeMap<String, NodeImage>,
    },
}

/// Serializable snapshot of a [`Harddisk`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarddiskImage {
    /// Volume name
    pub name: String,
    /// Capacity in bytes
    pub capacity: i64,
    /// Root directory entries keyed by name
    #[serde(default)]
    pub root: BTreeMap<String, NodeImage>,
}

fn directory_image(directory: &DirectoryNode) -> BTreeMap<String, NodeImage> {
    directory
        .children
        .values()
        .map(|child| {
            let image = match &child.node {
                Node::File(content) => NodeImage::File {
                    content: content.to_base64(),
                },
                Node::Directory(sub) => NodeImage::Directory {
                    entries: directory_image(sub),
                },
            };
            (child.name.clone(), image)
        })
        .collect()
}

fn directory_node(entries: &BTreeMap<String, NodeImage>, location: &str) -> Result<DirectoryNode> {
    let mut directory = DirectoryNode::default();
    for (name, image) in entries {
        let path = format!("{location}/{name}");
        if !VolumePath::is_valid_segment(name) || name == UP_SEGMENT || name == CURRENT_DIRECTORY {
            return Err(VolumeError::Serialization {
                message: format!("invalid entry name in image: '{path}'"),
            });
        }
        let node = match image {
            NodeImage::File { content } => Node::File(FileContent::from_base64(content)?),
            NodeImage::Directory { entries } => Node::Directory(directory_node(entries, &path)?),
        };
        let previous = directory.children.insert(
            key(name),
            Child {
                name: name.clone(),
                node,
            },
        );
        if previous.is_some() {
            return Err(VolumeError::Serialization {
                message: format!("duplicate entry in image: '{path}' differs only by case"),
            });
        }
    }
    Ok(directory)
}

impl HarddiskImage {
    /// Serializes the image as pretty-printed JSON.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| VolumeError::Serialization {
            message: e.to_string(),
        })
    }

    /// Parses an image from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Serialization`] for malformed JSON.
    pub fn from_json(text: &str) -> Result<Self> {
        serde_json::from_str(text).map_err(|e| VolumeError::Serialization {
            message: e.to_string(),
        })
    }

    /// Reads an image file.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Io`] if the file can't be read and
    /// [`VolumeError::Serialization`] if it is malformed.
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| VolumeError::io(path, e))?;
        debug!("Loaded harddisk image from {}", path.display());
        Self::from_json(&text)
    }

    /// Writes the image to a file, creating parent directories.
    ///
    /// The file is written next to its destination first and then moved
    /// into place, so a crash never leaves a truncated image.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Io`] if the file can't be written.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| VolumeError::io(parent, e))?;
        }
        let staging = path.with_extension("tmp");
        fs::write(&staging, self.to_json()?).map_err(|e| VolumeError::io(&staging, e))?;
        fs::rename(&staging, path).map_err(|e| VolumeError::io(path, e))?;
        info!("Saved harddisk image '{}' to {}", self.name, path.display());
        Ok(())
    }
}

impl Harddisk {
    /// Captures the current state.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::sync::Arc;
    /// use scriptvol::{Harddisk, Storage, Volume, VolumePath};
    ///
    /// let disk = Arc::new(Harddisk::new("scratch", 100));
    /// let volume = Volume::from_storage(disk.clone());
    /// volume.save_file(&VolumePath::from_string("/lib/a.ks")?, &"print 1.".into(), true)?;
    ///
    /// let image = disk.to_image();
    /// assert_eq!(image.name, "scratch");
    /// assert!(image.root.contains_key("lib"));
    ///
    /// let restored = Harddisk::from_image(&image)?;
    /// assert_eq!(restored.size(), 8);
    /// # Ok::<(), scriptvol::VolumeError>(())
    /// ```
    #[must_use]
    pub fn to_image(&self) -> HarddiskImage {
        HarddiskImage {
            name: self.name(),
            capacity: self.capacity(),
            root: directory_image(&self.snapshot()),
        }
    }

    /// Rebuilds a harddisk from an image.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Serialization`] for invalid entry names,
    /// names that collide case-insensitively, or invalid base64.
    pub fn from_image(image: &HarddiskImage) -> Result<Self> {
        let root = directory_node(&image.root, "")?;
        Ok(Self::with_root(image.name.clone(), image.capacity, root))
    }
}
