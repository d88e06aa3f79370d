//! Error types for volume operations.
//!
//! Every fallible operation in this crate returns [`VolumeError`]. Variants
//! carry the offending path, volume identifier or colliding name so callers
//! can report failures without extra bookkeeping.
//!
//! Running out of space is not an error: saves report it as `Ok(None)` and
//! copies as `Ok(false)`.
//!
//! # Examples
//!
//! ```
//! use scriptvol::VolumeError;
//!
//! let err = VolumeError::NotFound {
//!     path: "0:/boot.ks".to_string(),
//! };
//!
//! assert!(err.is_not_found());
//! assert_eq!(err.to_string(), "Not found: 0:/boot.ks");
//! ```

use thiserror::Error;

/// Errors that can occur while working with volumes and paths.
#[derive(Error, Debug)]
pub enum VolumeError {
    /// A path string could not be parsed or points somewhere illegal
    #[error("Invalid path '{path}': {reason}")]
    InvalidPath {
        /// The rejected path text
        path: String,
        /// Why the path was rejected
        reason: String,
    },

    /// An item already occupies the target location, or the item found
    /// there has the wrong type
    #[error("Already exists: {path} ({reason})")]
    AlreadyExists {
        /// Location of the colliding item
        path: String,
        /// What collided
        reason: String,
    },

    /// The item at a location has the other entry type than the operation
    /// needs
    #[error("Type mismatch at {path}: expected a {expected}")]
    TypeMismatch {
        /// Location of the item
        path: String,
        /// Entry type the operation needed
        expected: &'static str,
    },

    /// No file or directory at the given path
    #[error("Not found: {path}")]
    NotFound {
        /// The missing path
        path: String,
    },

    /// No volume registered under the given identifier
    #[error("Volume not found: {volume}")]
    VolumeNotFound {
        /// Identifier used for the lookup
        volume: String,
    },

    /// A relative path was given but no current directory is set
    #[error("No current directory")]
    NoCurrentDirectory,

    /// Operation is illegal on a root directory
    #[error("Can't {operation} the root directory: {path}")]
    RootOperation {
        /// Name of the attempted operation
        operation: &'static str,
        /// The root path
        path: String,
    },

    /// Copy or move would place a directory inside itself
    #[error("Can't copy or move '{from}' into its own subdirectory '{to}'")]
    CopyIntoDescendant {
        /// Source directory
        from: String,
        /// Destination located under the source
        to: String,
    },

    /// Volume refuses to be renamed
    #[error("Volume '{volume}' can't be renamed")]
    NotRenameable {
        /// Current volume name
        volume: String,
    },

    /// Move copied the data but could not delete the source. The data now
    /// exists in both places.
    #[error("Move from '{from}' to '{to}' copied the data but failed to delete the source: {cause}")]
    MoveIncomplete {
        /// Source that still exists
        from: String,
        /// Destination that now holds the copy
        to: String,
        /// The delete failure
        #[source]
        cause: Box<VolumeError>,
    },

    /// Content dump or image could not be encoded or decoded
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error description
        message: String,
    },

    /// Configuration is missing or invalid
    #[error("Configuration error: {message}")]
    Config {
        /// Error description
        message: String,
    },

    /// Compiled program codec failure
    #[error("Codec error: {message}")]
    Codec {
        /// Error description
        message: String,
    },

    /// Host filesystem failure
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Host path involved
        path: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },
}

impl VolumeError {
    pub(crate) fn invalid_path(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidPath {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub(crate) fn already_exists(path: &impl std::fmt::Display, reason: impl Into<String>) -> Self {
        Self::AlreadyExists {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub(crate) fn type_mismatch(path: &impl std::fmt::Display, expected: &'static str) -> Self {
        Self::TypeMismatch {
            path: path.to_string(),
            expected,
        }
    }

    pub(crate) fn not_found(path: &impl std::fmt::Display) -> Self {
        Self::NotFound {
            path: path.to_string(),
        }
    }

    pub(crate) fn io(path: &std::path::Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.display().to_string(),
            source,
        }
    }

    /// Returns `true` if this is an invalid path error.
    ///
    /// # Examples
    ///
    /// ```
    /// use scriptvol::VolumePath;
    ///
    /// let err = VolumePath::from_string("/a/b\\c").unwrap_err();
    /// assert!(err.is_invalid_path());
    /// ```
    #[must_use]
    pub const fn is_invalid_path(&self) -> bool {
        matches!(self, Self::InvalidPath { .. })
    }

    /// Returns `true` if an item already occupies the target location,
    /// including an item of the wrong type.
    #[must_use]
    pub const fn is_already_exists(&self) -> bool {
        matches!(self, Self::AlreadyExists { .. } | Self::TypeMismatch { .. })
    }

    /// Returns `true` for missing files, directories and volumes.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::NotFound { .. } | Self::VolumeNotFound { .. } | Self::NoCurrentDirectory
        )
    }

    /// Returns `true` if the operation is illegal given the tree layout.
    ///
    /// # Examples
    ///
    /// ```
    /// use scriptvol::VolumeError;
    ///
    /// let err = VolumeError::RootOperation {
    ///     operation: "delete",
    ///     path: "/".to_string(),
    /// };
    /// assert!(err.is_structural());
    /// ```
    #[must_use]
    pub const fn is_structural(&self) -> bool {
        matches!(
            self,
            Self::RootOperation { .. } | Self::CopyIntoDescendant { .. } | Self::NotRenameable { .. }
        )
    }

    /// Returns `true` if this is a serialization error.
    #[must_use]
    pub const fn is_serialization(&self) -> bool {
        matches!(self, Self::Serialization { .. })
    }

    /// Returns `true` if the failure left data duplicated and needs manual
    /// attention.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::MoveIncomplete { .. })
    }

    /// Returns `true` if this is a host I/O error.
    #[must_use]
    pub const fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

/// Type alias for results of volume operations.
pub type Result<T> = std::result::Result<T, VolumeError>;
