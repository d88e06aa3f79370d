//! Hook for the compiled program format.
//!
//! The volume layer never interprets compiled programs. It only recognizes
//! them by their magic number and hands the bytes to a [`ProgramCodec`]
//! supplied by the embedding runtime.

use std::fmt;

use crate::content::{FileCategory, FileContent};
use crate::error::{Result, VolumeError};

/// Encodes and decodes compiled programs.
///
/// Implementations must produce bytes starting with
/// [`COMPILED_MAGIC`](crate::COMPILED_MAGIC) so the content is recognized as
/// compiled.
pub trait ProgramCodec: Send + Sync + fmt::Debug {
    /// In-memory program representation.
    type Program;

    /// Packs a program into bytes.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Codec`] if the program can't be packed.
    fn encode(&self, program: &Self::Program) -> Result<Vec<u8>>;

    /// Unpacks a program read from the file called `name`.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Codec`] if the bytes are not a valid program.
    fn decode(&self, name: &str, bytes: &[u8]) -> Result<Self::Program>;
}

impl FileContent {
    /// Packs a program with `codec`.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Codec`] if encoding fails or the codec output
    /// is not recognized as compiled content.
    pub fn from_program<C: ProgramCodec>(codec: &C, program: &C::Program) -> Result<Self> {
        let content = Self::from_bytes(codec.encode(program)?);
        if content.category() != FileCategory::Compiled {
            return Err(VolumeError::Codec {
                message: "codec output does not start with the compiled magic number".to_string(),
            });
        }
        Ok(content)
    }

    /// Unpacks this content as a program.
    ///
    /// # Errors
    ///
    /// Returns [`VolumeError::Codec`] if the content is not compiled or the
    /// codec rejects it.
    pub fn as_program<C: ProgramCodec>(&self, codec: &C, name: &str) -> Result<C::Program> {
        if self.category() != FileCategory::Compiled {
            return Err(VolumeError::Codec {
                message: format!("'{name}' is not a compiled program"),
            });
        }
        codec.decode(name, self.bytes())
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::content::COMPILED_MAGIC;

    /// Stores a list of instructions after the magic number, one per line.
    #[derive(Debug, Default)]
    pub(crate) struct LineCodec;

    impl ProgramCodec for LineCodec {
        type Program = Vec<String>;

        fn encode(&self, program: &Self::Program) -> Result<Vec<u8>> {
            let mut bytes = COMPILED_MAGIC.to_vec();
            bytes.extend_from_slice(program.join("\n").as_bytes());
            Ok(bytes)
        }

        fn decode(&self, name: &str, bytes: &[u8]) -> Result<Self::Program> {
            let body = std::str::from_utf8(&bytes[COMPILED_MAGIC.len()..]).map_err(|e| {
                VolumeError::Codec {
                    message: format!("{name}: {e}"),
                }
            })?;
            Ok(body.lines().map(str::to_string).collect())
        }
    }

    #[derive(Debug)]
    struct BrokenCodec;

    impl ProgramCodec for BrokenCodec {
        type Program = ();

        fn encode(&self, _program: &()) -> Result<Vec<u8>> {
            Ok(b"plain text".to_vec())
        }

        fn decode(&self, _name: &str, _bytes: &[u8]) -> Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_program_round_trip() {
        let program = vec!["push 1".to_string(), "print".to_string()];
        let content = FileContent::from_program(&LineCodec, &program).unwrap();
        assert_eq!(content.category(), FileCategory::Compiled);
        assert_eq!(content.as_program(&LineCodec, "a.ksm").unwrap(), program);
    }

    #[test]
    fn test_as_program_rejects_text() {
        let content = FileContent::from_string("print 1.");
        let err = content.as_program(&LineCodec, "a.ks").unwrap_err();
        assert!(err.to_string().contains("'a.ks' is not a compiled program"));
    }

    #[test]
    fn test_from_program_checks_magic() {
        assert!(FileContent::from_program(&BrokenCodec, &()).is_err());
    }
}
