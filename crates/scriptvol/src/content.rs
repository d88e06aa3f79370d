//! File content and content classification.
//!
//! [`FileContent`] is the byte buffer stored in a file. Its
//! [`FileCategory`] is sniffed from the first four bytes: compiled programs
//! start with a fixed magic number, text files contain only printable ASCII
//! and whitespace, everything else is binary.
//!
//! # Examples
//!
//! ```
//! use scriptvol::{FileCategory, FileContent};
//!
//! let mut content = FileContent::from_string("print 1.");
//! content.write_line("");
//! content.write_str("print 2.");
//!
//! assert_eq!(content.category(), FileCategory::Ascii);
//! assert_eq!(content.lines().collect::<Vec<_>>(), ["print 1.", "print 2."]);
//! ```

use std::borrow::Cow;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};

use crate::error::{Result, VolumeError};

/// First four bytes of a compiled program.
pub const COMPILED_MAGIC: [u8; 4] = [b'k', 0x03, b'X', b'E'];

/// Gzip header, also treated as a compiled program.
pub const GZIP_HEADER: [u8; 4] = [0x1f, 0x8b, 0x08, 0x00];

const DUMP_CONTENT: &str = "content";

/// Kind of data held by a file, derived from its first bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileCategory {
    /// Fewer than four bytes
    TooShort,
    /// Arbitrary binary data
    Binary,
    /// Printable ASCII text
    Ascii,
    /// Compiled program
    Compiled,
}

impl FileCategory {
    /// Returns `true` for binary and compiled content.
    #[must_use]
    pub const fn is_binary(&self) -> bool {
        matches!(self, Self::Binary | Self::Compiled)
    }

    /// Lowercase category name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::TooShort => "tooshort",
            Self::Binary => "binary",
            Self::Ascii => "ascii",
            Self::Compiled => "compiled",
        }
    }
}

/// Classifies content by its first four bytes.
///
/// # Examples
///
/// ```
/// use scriptvol::{FileCategory, identify_category};
///
/// assert_eq!(identify_category(b"abc"), FileCategory::TooShort);
/// assert_eq!(identify_category(b"abcd"), FileCategory::Ascii);
/// assert_eq!(identify_category(&[b'k', 3, b'X', b'E', 0]), FileCategory::Compiled);
/// assert_eq!(identify_category(&[0, 1, 2, 3]), FileCategory::Binary);
/// ```
#[must_use]
pub fn identify_category(bytes: &[u8]) -> FileCategory {
    let Some(first_four) = bytes.get(..4) else {
        return FileCategory::TooShort;
    };
    if first_four == COMPILED_MAGIC || first_four == GZIP_HEADER {
        FileCategory::Compiled
    } else if first_four
        .iter()
        .all(|&b| matches!(b, b'\n' | b'\t' | b'\r' | 32..=127))
    {
        FileCategory::Ascii
    } else {
        FileCategory::Binary
    }
}

/// Appends `extension` to `name` when the name has none.
///
/// A name ending in `.` gets the extension without an extra dot. Names that
/// already carry an extension are returned unchanged.
///
/// # Errors
///
/// Returns [`VolumeError::InvalidPath`] for empty names, names containing a
/// separator, and names starting with `.`.
///
/// # Examples
///
/// ```
/// use scriptvol::cooked_filename;
///
/// assert_eq!(cooked_filename("boot", "ks")?, "boot.ks");
/// assert_eq!(cooked_filename("boot.", "ks")?, "boot.ks");
/// assert_eq!(cooked_filename("boot.txt", "ks")?, "boot.txt");
/// assert!(cooked_filename(".ks", "ks").is_err());
/// # Ok::<(), scriptvol::VolumeError>(())
/// ```
pub fn cooked_filename(name: &str, extension: &str) -> Result<String> {
    if name.is_empty() {
        return Err(VolumeError::invalid_path(name, "Attempted to use an empty filename"));
    }
    if name.contains(['/', '\\']) {
        return Err(VolumeError::invalid_path(
            name,
            "Filenames can't contain path separators",
        ));
    }
    if name.starts_with('.') {
        return Err(VolumeError::invalid_path(
            name,
            "Attempted to use a filename beginning with a period",
        ));
    }
    Ok(if !name.contains('.') {
        format!("{name}.{extension}")
    } else if name.ends_with('.') {
        format!("{name}{extension}")
    } else {
        name.to_string()
    })
}

/// Newline convention used when text is stored on a host filesystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewlineStyle {
    /// `\n`
    Lf,
    /// `\r\n`
    CrLf,
    /// Whatever the host platform uses
    #[default]
    Host,
}

impl NewlineStyle {
    /// Resolves [`Host`](Self::Host) to a concrete style.
    #[must_use]
    pub const fn resolve(self) -> Self {
        match self {
            Self::Host if cfg!(windows) => Self::CrLf,
            Self::Host => Self::Lf,
            other => other,
        }
    }

    /// Lowercase style name.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Lf => "lf",
            Self::CrLf => "crlf",
            Self::Host => "host",
        }
    }
}

impl std::str::FromStr for NewlineStyle {
    type Err = VolumeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "lf" => Ok(Self::Lf),
            "crlf" => Ok(Self::CrLf),
            "host" => Ok(Self::Host),
            _ => Err(VolumeError::Config {
                message: format!("invalid newline style: '{s}' (expected: lf, crlf, or host)"),
            }),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct ContentDump {
    content: Option<String>,
}

/// Bytes stored in a file.
///
/// Equality compares bytes. Text helpers assume UTF-8.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct FileContent {
    bytes: Vec<u8>,
}

impl FileContent {
    /// Creates empty content.
    #[must_use]
    pub const fn new() -> Self {
        Self { bytes: Vec::new() }
    }

    /// Creates content from UTF-8 text.
    #[must_use]
    pub fn from_string(text: &str) -> Self {
        Self {
            bytes: text.as_bytes().to_vec(),
        }
    }

    /// Creates content from raw bytes.
    #[must_use]
    pub const fn from_bytes(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Raw bytes.
    #[must_use]
    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Consumes the content, returning its bytes.
    #[must_use]
    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Content decoded as UTF-8, with invalid sequences replaced.
    #[must_use]
    pub fn as_string(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Size in bytes.
    #[must_use]
    pub const fn size(&self) -> usize {
        self.bytes.len()
    }

    /// Returns `true` if there are no bytes.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Sniffed category.
    #[must_use]
    pub fn category(&self) -> FileCategory {
        identify_category(&self.bytes)
    }

    /// Appends raw bytes.
    pub fn write(&mut self, bytes: &[u8]) {
        self.bytes.extend_from_slice(bytes);
    }

    /// Appends UTF-8 text.
    pub fn write_str(&mut self, text: &str) {
        self.write(text.as_bytes());
    }

    /// Appends UTF-8 text followed by `\n`.
    pub fn write_line(&mut self, text: &str) {
        self.write_str(text);
        self.bytes.push(b'\n');
    }

    /// Removes all bytes.
    pub fn clear(&mut self) {
        self.bytes.clear();
    }

    /// Iterates over text lines. Line terminators (`\n` or `\r\n`) are
    /// stripped.
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        let text = self.as_string().into_owned();
        text.lines().map(str::to_string).collect::<Vec<_>>().into_iter()
    }

    /// Serializes the content as `{"content": "<base64>"}`.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Serialization`] if JSON encoding fails.
    ///
    /// # Examples
    ///
    /// ```
    /// use scriptvol::FileContent;
    ///
    /// let content = FileContent::from_string("hi");
    /// let dump = content.dump()?;
    /// assert_eq!(dump, r#"{"content":"aGk="}"#);
    /// assert_eq!(FileContent::load_dump(&dump)?, content);
    /// # Ok::<(), scriptvol::VolumeError>(())
    /// ```
    pub fn dump(&self) -> Result<String> {
        serde_json::to_string(&ContentDump {
            content: Some(self.to_base64()),
        })
        .map_err(|e| VolumeError::Serialization {
            message: e.to_string(),
        })
    }

    /// Restores content from [`dump`](Self::dump) output.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Serialization`] if the text is not JSON, the
    /// `content` field is missing, or it is not valid base64.
    pub fn load_dump(text: &str) -> Result<Self> {
        let dump: ContentDump = serde_json::from_str(text).map_err(|e| VolumeError::Serialization {
            message: e.to_string(),
        })?;
        let encoded = dump.content.ok_or_else(|| VolumeError::Serialization {
            message: format!("'{DUMP_CONTENT}' field not found or invalid"),
        })?;
        Self::from_base64(&encoded)
    }

    /// Base64 encoding of the bytes.
    #[must_use]
    pub fn to_base64(&self) -> String {
        BASE64.encode(&self.bytes)
    }

    /// Decodes base64 text.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Serialization`] for invalid base64.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        BASE64
            .decode(encoded)
            .map(Self::from_bytes)
            .map_err(|e| VolumeError::Serialization {
                message: format!("'{DUMP_CONTENT}' field is not valid base64: {e}"),
            })
    }

    /// Bytes as they should be stored on a host using `style`.
    ///
    /// Only ASCII content is rewritten, turning every `\n` into `\r\n` for
    /// [`NewlineStyle::CrLf`]. A `\r\n` already present becomes `\r\r\n`
    /// so that [`from_host_bytes`](Self::from_host_bytes) restores it.
    #[must_use]
    pub fn to_host_bytes(&self, style: NewlineStyle) -> Cow<'_, [u8]> {
        if style.resolve() != NewlineStyle::CrLf || self.category() != FileCategory::Ascii {
            return Cow::Borrowed(&self.bytes);
        }
        let mut out = Vec::with_capacity(self.bytes.len() + self.bytes.len() / 16);
        for &b in &self.bytes {
            if b == b'\n' {
                out.push(b'\r');
            }
            out.push(b);
        }
        Cow::Owned(out)
    }

    /// Inverse of [`to_host_bytes`](Self::to_host_bytes): turns `\r\n`
    /// back into `\n` for ASCII content read with [`NewlineStyle::CrLf`].
    #[must_use]
    pub fn from_host_bytes(bytes: Vec<u8>, style: NewlineStyle) -> Self {
        if style.resolve() != NewlineStyle::CrLf || identify_category(&bytes) != FileCategory::Ascii {
            return Self::from_bytes(bytes);
        }
        let mut out = Vec::with_capacity(bytes.len());
        let mut iter = bytes.iter().copied().peekable();
        while let Some(b) = iter.next() {
            if b == b'\r' && iter.peek() == Some(&b'\n') {
                continue;
            }
            out.push(b);
        }
        Self::from_bytes(out)
    }
}

impl From<&str> for FileContent {
    fn from(text: &str) -> Self {
        Self::from_string(text)
    }
}

impl From<Vec<u8>> for FileContent {
    fn from(bytes: Vec<u8>) -> Self {
        Self::from_bytes(bytes)
    }
}
