//! Path model for volumes.
//!
//! A [`VolumePath`] locates a file or directory inside one volume. A
//! [`GlobalPath`] adds the [`VolumeId`] of the volume it belongs to and has
//! the string form `<volumeId>:<path>`, for example `0:/boot/launch.ks` or
//! `scratch:/data`.
//!
//! Both types are immutable values: every operation that changes a path
//! returns a new one. Paths are validated and canonicalized on construction:
//! `.` segments disappear and `..` collapses against the preceding segment.
//!
//! # Examples
//!
//! ```
//! use scriptvol::{GlobalPath, VolumeId, VolumePath};
//!
//! let path = VolumePath::from_string("/a/b/../c")?;
//! assert_eq!(path.to_string(), "/a/c");
//!
//! let global = GlobalPath::from_string("1:/a/c")?;
//! assert_eq!(global.volume_id(), &VolumeId::Index(1));
//! assert_eq!(global.path(), &path);
//! # Ok::<(), scriptvol::VolumeError>(())
//! ```

use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, VolumeError};

/// Separator between path segments.
pub const PATH_SEPARATOR: char = '/';

/// Segment that refers to the parent directory.
pub const UP_SEGMENT: &str = "..";

/// Segment that refers to the current directory.
pub const CURRENT_DIRECTORY: &str = ".";

/// Maximum length of a single segment, in characters.
pub const MAX_SEGMENT_LENGTH: usize = 255;

static SEGMENT_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\A[^/\\]+\z").expect("valid regex"));

static VOLUME_ID_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)\A(?P<id>[\w.]+):(?P<rest>.*)\z").expect("valid regex")
});

/// Location of a directory or file inside a single volume.
///
/// The canonical form never contains `.` segments. `..` segments only
/// survive at the start of the path, in which case the path
/// [points outside](Self::points_outside) its volume. Such a path can be
/// built and inspected but every operation that needs a concrete location
/// rejects it.
///
/// # Examples
///
/// ```
/// use scriptvol::VolumePath;
///
/// let path = VolumePath::from_string("/scripts/launch.ks")?;
/// assert_eq!(path.length(), 2);
/// assert_eq!(path.name(), "launch.ks");
/// assert_eq!(path.extension(), "ks");
///
/// let outside = VolumePath::from_string("../x")?;
/// assert!(outside.points_outside());
/// assert_eq!(outside.depth(), 0);
/// # Ok::<(), scriptvol::VolumeError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VolumePath {
    segments: Vec<String>,
}

impl VolumePath {
    /// Returns the root path `/`.
    #[must_use]
    pub const fn root() -> Self {
        Self {
            segments: Vec::new(),
        }
    }

    /// Parses a path string.
    ///
    /// A leading separator is optional: the result is always relative to
    /// the volume root.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] if any segment is invalid.
    pub fn from_string(text: &str) -> Result<Self> {
        Self::canonical(parse_segments(text)?, text)
    }

    /// Parses a relative path string and appends it to `base`.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] if `text` is absolute or any
    /// segment is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use scriptvol::VolumePath;
    ///
    /// let base = VolumePath::from_string("/lib")?;
    /// let path = VolumePath::from_string_with_base("../bin/run.ks", &base)?;
    /// assert_eq!(path.to_string(), "/bin/run.ks");
    ///
    /// assert!(VolumePath::from_string_with_base("/abs", &base).is_err());
    /// # Ok::<(), scriptvol::VolumeError>(())
    /// ```
    pub fn from_string_with_base(text: &str, base: &Self) -> Result<Self> {
        if Self::is_absolute(text) {
            return Err(VolumeError::invalid_path(text, "Relative path expected"));
        }
        let mut segments = base.segments.clone();
        segments.extend(parse_segments(text)?);
        Self::canonical(segments, text)
    }

    /// Builds a path from individual segments.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] if a segment contains the
    /// separator or is otherwise invalid.
    pub fn from_segments<I, S>(segments: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let raw: Vec<String> = segments.into_iter().map(Into::into).collect();
        let display = raw.join("/");
        Self::canonical(raw, &display)
    }

    /// Returns `true` if `text` starts with the separator.
    #[must_use]
    pub fn is_absolute(text: &str) -> bool {
        text.starts_with(PATH_SEPARATOR)
    }

    /// Returns `true` if `segment` may appear in a path.
    ///
    /// # Examples
    ///
    /// ```
    /// use scriptvol::VolumePath;
    ///
    /// assert!(VolumePath::is_valid_segment("launch.ks"));
    /// assert!(!VolumePath::is_valid_segment(""));
    /// assert!(!VolumePath::is_valid_segment("a\\b"));
    /// assert!(!VolumePath::is_valid_segment(&"x".repeat(256)));
    /// ```
    #[must_use]
    pub fn is_valid_segment(segment: &str) -> bool {
        let length = segment.chars().count();
        length > 0 && length <= MAX_SEGMENT_LENGTH && SEGMENT_REGEX.is_match(segment)
    }

    fn canonical(raw: Vec<String>, original: &str) -> Result<Self> {
        let mut segments: Vec<String> = Vec::with_capacity(raw.len());
        for segment in raw {
            if segment.is_empty() || segment == CURRENT_DIRECTORY {
                continue;
            }
            if segment.contains(PATH_SEPARATOR) {
                return Err(VolumeError::invalid_path(
                    original,
                    format!("Segment can't contain '{PATH_SEPARATOR}'"),
                ));
            }
            if !Self::is_valid_segment(&segment) {
                return Err(VolumeError::invalid_path(
                    original,
                    format!("Invalid path segment: '{segment}'"),
                ));
            }
            if segment == UP_SEGMENT && segments.last().is_some_and(|top| top != UP_SEGMENT) {
                segments.pop();
            } else {
                segments.push(segment);
            }
        }
        Ok(Self { segments })
    }

    /// Returns the canonical segments.
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Number of segments, including leading `..` segments.
    #[must_use]
    pub const fn length(&self) -> usize {
        self.segments.len()
    }

    /// Number of segments netted against `..` segments.
    ///
    /// Equal to [`length`](Self::length) unless the path points outside.
    #[must_use]
    pub fn depth(&self) -> isize {
        self.segments
            .iter()
            .map(|segment| if segment == UP_SEGMENT { -1 } else { 1 })
            .sum()
    }

    /// Returns `true` for the root path.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Returns `true` if the path escapes the volume root.
    #[must_use]
    pub fn points_outside(&self) -> bool {
        self.segments.first().is_some_and(|first| first == UP_SEGMENT)
    }

    /// Last segment, or an empty string for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        self.segments.last().map_or("", String::as_str)
    }

    /// Text after the last `.` of the name, or an empty string.
    #[must_use]
    pub fn extension(&self) -> &str {
        extension_of(self.name())
    }

    /// Appends path fragments. Each fragment may contain separators.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] if a fragment is invalid.
    ///
    /// # Examples
    ///
    /// ```
    /// use scriptvol::VolumePath;
    ///
    /// let base = VolumePath::from_string("/a")?;
    /// let path = base.combine(&["b/c", "..", "d"])?;
    /// assert_eq!(path.to_string(), "/a/b/d");
    /// assert_eq!(base.to_string(), "/a");
    /// # Ok::<(), scriptvol::VolumeError>(())
    /// ```
    pub fn combine(&self, fragments: &[&str]) -> Result<Self> {
        let mut segments = self.segments.clone();
        for fragment in fragments {
            segments.extend(parse_segments(fragment)?);
        }
        let display = fragments.join("/");
        Self::canonical(segments, &display)
    }

    /// Returns the parent path.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] if the depth is below one.
    pub fn parent(&self) -> Result<Self> {
        if self.depth() < 1 {
            return Err(VolumeError::invalid_path(
                self.to_string(),
                "This path does not have a parent",
            ));
        }
        Ok(Self {
            segments: self.segments[..self.segments.len() - 1].to_vec(),
        })
    }

    /// Returns `true` if `other` is strictly longer and starts with this
    /// path.
    ///
    /// # Examples
    ///
    /// ```
    /// use scriptvol::VolumePath;
    ///
    /// let a = VolumePath::from_string("/a")?;
    /// let ab = VolumePath::from_string("/a/b")?;
    /// assert!(a.is_parent(&ab));
    /// assert!(!ab.is_parent(&a));
    /// assert!(!a.is_parent(&a));
    /// # Ok::<(), scriptvol::VolumeError>(())
    /// ```
    #[must_use]
    pub fn is_parent(&self, other: &Self) -> bool {
        other.segments.len() > self.segments.len() && other.segments.starts_with(&self.segments)
    }

    /// Replaces the last segment.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] for the root path or an invalid
    /// name.
    pub fn change_name(&self, name: &str) -> Result<Self> {
        if self.is_root() {
            return Err(VolumeError::invalid_path(
                self.to_string(),
                "This path points to the root directory, you can't change its name",
            ));
        }
        let mut segments = self.segments.clone();
        segments.pop();
        segments.push(name.to_string());
        Self::canonical(segments, name)
    }

    /// Replaces the text after the last `.` of the name, or appends an
    /// extension if the name has none.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] for the root path.
    ///
    /// # Examples
    ///
    /// ```
    /// use scriptvol::VolumePath;
    ///
    /// let path = VolumePath::from_string("/dir/complex.file..name..")?;
    /// assert_eq!(path.change_extension("txt")?.name(), "complex.file..name..txt");
    /// assert!(VolumePath::root().change_extension("txt").is_err());
    /// # Ok::<(), scriptvol::VolumeError>(())
    /// ```
    pub fn change_extension(&self, extension: &str) -> Result<Self> {
        if self.is_root() {
            return Err(VolumeError::invalid_path(
                self.to_string(),
                "This path points to the root directory, you can't change its extension",
            ));
        }
        let mut parts: Vec<&str> = self.name().split('.').collect();
        if parts.len() > 1 {
            parts.pop();
        }
        parts.push(extension);
        self.change_name(&parts.join("."))
    }
}

impl fmt::Display for VolumePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{PATH_SEPARATOR}{}", self.segments.join("/"))
    }
}

impl FromStr for VolumePath {
    type Err = VolumeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}

impl Serialize for VolumePath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

fn parse_segments(text: &str) -> Result<Vec<String>> {
    text.split(PATH_SEPARATOR)
        .filter(|segment| !segment.is_empty())
        .map(|segment| {
            if VolumePath::is_valid_segment(segment) {
                Ok(segment.to_string())
            } else {
                Err(VolumeError::invalid_path(
                    text,
                    format!("Invalid path segment: '{segment}'"),
                ))
            }
        })
        .collect()
}

pub(crate) fn extension_of(name: &str) -> &str {
    name.rsplit_once('.').map_or("", |(_, extension)| extension)
}

/// Identifier of a registered volume: its integer id or its name.
///
/// Numeric text always parses to [`VolumeId::Index`].
///
/// # Examples
///
/// ```
/// use scriptvol::VolumeId;
///
/// assert_eq!(VolumeId::parse("1")?, VolumeId::Index(1));
/// assert_eq!(VolumeId::parse("scratch")?, VolumeId::Name("scratch".to_string()));
/// assert!(VolumeId::parse("").is_err());
/// # Ok::<(), scriptvol::VolumeError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VolumeId {
    /// Registry id
    Index(usize),
    /// Volume name
    Name(String),
}

impl VolumeId {
    /// Parses volume id text.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] for empty text.
    pub fn parse(text: &str) -> Result<Self> {
        if text.is_empty() {
            return Err(VolumeError::invalid_path(text, "Invalid volumeId: ''"));
        }
        Ok(text
            .parse::<usize>()
            .map_or_else(|_| Self::Name(text.to_string()), Self::Index))
    }

    /// Returns the integer id, if this is one.
    #[must_use]
    pub const fn as_index(&self) -> Option<usize> {
        match self {
            Self::Index(index) => Some(*index),
            Self::Name(_) => None,
        }
    }
}

impl From<usize> for VolumeId {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

impl fmt::Display for VolumeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Index(index) => write!(f, "{index}"),
            Self::Name(name) => f.write_str(name),
        }
    }
}

/// A [`VolumePath`] qualified by the volume it belongs to.
///
/// A global path never points outside its volume.
///
/// # Examples
///
/// ```
/// use scriptvol::GlobalPath;
///
/// let path = GlobalPath::from_string("othervolume:/level1/level2")?;
/// assert_eq!(path.to_string(), "othervolume:/level1/level2");
/// assert_eq!(path.parent()?.to_string(), "othervolume:/level1");
/// assert!(path.root_path().is_parent(&path));
///
/// assert!(GlobalPath::from_string("/no/volume").is_err());
/// assert!(GlobalPath::from_string("vol:/a/../..").is_err());
/// # Ok::<(), scriptvol::VolumeError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GlobalPath {
    volume_id: VolumeId,
    path: VolumePath,
}

impl GlobalPath {
    /// Qualifies `path` with a volume id.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] if the path points outside.
    pub fn new(volume_id: impl Into<VolumeId>, path: VolumePath) -> Result<Self> {
        let volume_id = volume_id.into();
        if path.points_outside() {
            return Err(VolumeError::invalid_path(
                format!("{volume_id}:{path}"),
                "This path points to something outside of volume",
            ));
        }
        Ok(Self { volume_id, path })
    }

    /// Root directory of a volume.
    #[must_use]
    pub fn root_of(volume_id: impl Into<VolumeId>) -> Self {
        Self {
            volume_id: volume_id.into(),
            path: VolumePath::root(),
        }
    }

    /// Same as [`new`](Self::new), cloning the path.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] if the path points outside.
    pub fn from_volume_path(path: &VolumePath, volume_id: impl Into<VolumeId>) -> Result<Self> {
        Self::new(volume_id, path.clone())
    }

    /// Returns `true` if `text` starts with a `<volumeId>:` prefix.
    #[must_use]
    pub fn has_volume_id(text: &str) -> bool {
        VOLUME_ID_REGEX.is_match(text)
    }

    /// Parses `<volumeId>:<path>`.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] if the prefix is missing, the
    /// path is malformed, or it points outside the volume.
    pub fn from_string(text: &str) -> Result<Self> {
        let captures = VOLUME_ID_REGEX
            .captures(text)
            .ok_or_else(|| VolumeError::invalid_path(text, "GlobalPath should contain a volumeId"))?;
        let volume_id = VolumeId::parse(&captures["id"])?;
        let path = VolumePath::from_string(&captures["rest"])?;
        Self::new(volume_id, path)
    }

    /// Resolves a relative path string against `base`. `.` yields `base`
    /// itself.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] for absolute or malformed text,
    /// or when the result points outside the volume.
    pub fn from_string_and_base(text: &str, base: &Self) -> Result<Self> {
        if VolumePath::is_absolute(text) {
            return Err(VolumeError::invalid_path(text, "Relative path expected"));
        }
        if text == CURRENT_DIRECTORY {
            return Ok(base.clone());
        }
        let path = VolumePath::from_string_with_base(text, &base.path)?;
        Self::new(base.volume_id.clone(), path)
    }

    /// Volume this path belongs to.
    #[must_use]
    pub const fn volume_id(&self) -> &VolumeId {
        &self.volume_id
    }

    /// Location inside the volume.
    #[must_use]
    pub const fn path(&self) -> &VolumePath {
        &self.path
    }

    /// Same location on another volume id.
    #[must_use]
    pub fn with_volume_id(&self, volume_id: impl Into<VolumeId>) -> Self {
        Self {
            volume_id: volume_id.into(),
            path: self.path.clone(),
        }
    }

    /// Root of the same volume.
    #[must_use]
    pub fn root_path(&self) -> Self {
        Self {
            volume_id: self.volume_id.clone(),
            path: VolumePath::root(),
        }
    }

    /// Returns `true` for a volume root.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.path.is_root()
    }

    /// Last segment, or empty for the root.
    #[must_use]
    pub fn name(&self) -> &str {
        self.path.name()
    }

    /// Extension of the last segment.
    #[must_use]
    pub fn extension(&self) -> &str {
        self.path.extension()
    }

    /// Number of segments.
    #[must_use]
    pub const fn length(&self) -> usize {
        self.path.length()
    }

    /// Netted segment count.
    #[must_use]
    pub fn depth(&self) -> isize {
        self.path.depth()
    }

    /// Returns the parent path.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] for a root path.
    pub fn parent(&self) -> Result<Self> {
        Ok(Self {
            volume_id: self.volume_id.clone(),
            path: self.path.parent()?,
        })
    }

    /// Returns `true` if both ids match and this path is a strict prefix of
    /// `other`.
    #[must_use]
    pub fn is_parent(&self, other: &Self) -> bool {
        self.volume_id == other.volume_id && self.path.is_parent(&other.path)
    }

    /// Appends path fragments.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] if a fragment is invalid or the
    /// result points outside the volume.
    pub fn combine(&self, fragments: &[&str]) -> Result<Self> {
        Self::new(self.volume_id.clone(), self.path.combine(fragments)?)
    }

    /// Replaces the last segment.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] for the root path.
    pub fn change_name(&self, name: &str) -> Result<Self> {
        Self::new(self.volume_id.clone(), self.path.change_name(name)?)
    }

    /// Replaces the extension of the last segment.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::InvalidPath`] for the root path.
    pub fn change_extension(&self, extension: &str) -> Result<Self> {
        Self::new(self.volume_id.clone(), self.path.change_extension(extension)?)
    }
}

impl fmt::Display for GlobalPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.volume_id, self.path)
    }
}

impl FromStr for GlobalPath {
    type Err = VolumeError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_string(s)
    }
}

impl Serialize for GlobalPath {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for GlobalPath {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        Self::from_string(&text).map_err(serde::de::Error::custom)
    }
}
