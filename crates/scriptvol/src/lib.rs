//! Volume-based virtual filesystem for embedded scripting environments.
//!
//! Scripts see named, addressable storage ("volumes") holding directories
//! and files, independent of the medium behind each volume. Two backings
//! share one contract:
//!
//! - [`Archive`]: a host directory, sandboxed under its root, with no
//!   capacity limit
//! - [`Harddisk`]: a capacity-limited in-memory tree that can be persisted
//!   as a JSON [`HarddiskImage`]
//!
//! # Features
//!
//! - **Path model**: [`VolumePath`] and [`GlobalPath`] are validated,
//!   canonical values that never escape their volume
//! - **Extension guessing**: `boot` finds `boot.ks` or `boot.ksm`
//! - **Registry**: [`VolumeManager`] resolves path strings against the
//!   current directory and copies or moves across volumes
//! - **Soft capacity errors**: running out of room is a result, not an error
//! - **Thread-safe**: all types are `Send + Sync`
//!
//! # Examples
//!
//! ## Basic usage
//!
//! ```
//! use scriptvol::{FileContent, Harddisk, Volume, VolumePath};
//!
//! let volume = Volume::new(Harddisk::new("scratch", 1000));
//! let path = VolumePath::from_string("/lib/util.ks")?;
//!
//! volume.save_file(&path, &FileContent::from_string("print 1."), true)?;
//! let file = volume.open_file(&VolumePath::from_string("/lib/util")?, false)?.unwrap();
//! assert_eq!(file.read_all()?.as_string(), "print 1.");
//! # Ok::<(), scriptvol::VolumeError>(())
//! ```
//!
//! ## Copying between volumes
//!
//! ```
//! use scriptvol::{Harddisk, Volume, VolumeManager};
//!
//! let mut manager = VolumeManager::new();
//! manager.add(Volume::new(Harddisk::new("main", 1000)));
//! manager.add(Volume::new(Harddisk::new("backup", 1000)));
//!
//! let source = manager.resolve("/data/log.txt")?;
//! manager.get_volume(source.volume_id())?.save_file(source.path(), &"x".into(), true)?;
//!
//! let target = manager.resolve("backup:/")?;
//! assert!(manager.copy(&manager.resolve("/data")?, &target, true)?);
//! assert!(manager.open(&manager.resolve("1:/data/log.txt")?, false)?.is_some());
//! # Ok::<(), scriptvol::VolumeError>(())
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs, missing_debug_implementations)]

pub mod archive;
pub mod codec;
pub mod config;
pub mod content;
pub mod error;
pub mod harddisk;
pub mod image;
pub mod item;
pub mod path;
pub mod registry;
pub mod volume;

// Re-export main types
pub use archive::{ARCHIVE_NAME, Archive};
pub use codec::ProgramCodec;
pub use config::{ArchiveConfig, GeneralConfig, HarddiskConfig, MountedStorage, StorageConfig};
pub use content::{COMPILED_MAGIC, FileCategory, FileContent, NewlineStyle, cooked_filename, identify_category};
pub use error::{Result, VolumeError};
pub use harddisk::Harddisk;
pub use image::{HarddiskImage, NodeImage};
pub use item::{VolumeDirectory, VolumeFile, VolumeItem};
pub use path::{GlobalPath, VolumeId, VolumePath};
pub use registry::VolumeManager;
pub use volume::{
    BASE_CAPACITY, BASE_POWER, COMPILED_EXTENSION, EntryKind, INFINITE_CAPACITY, ProgramFile,
    SOURCE_EXTENSION, Storage, TEXT_EXTENSION, Volume, VolumeKind,
};
