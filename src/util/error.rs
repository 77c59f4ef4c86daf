//! Error types for the tile codec.

use std::path::PathBuf;
use thiserror::Error;

/// Coarse classification of an [`Error`].
///
/// Callers that only need to know whether a tile is malformed, violates the
/// table schema, failed at the stream level or disagrees with its own size
/// bookkeeping can match on this instead of the individual variants.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad magic, truncated stream, unsupported flag.
    Format,
    /// Underlying reader/writer failure.
    Io,
    /// Malformed table JSON or a reference that cannot be resolved.
    Schema,
    /// Declared size disagrees with serialized size.
    Invariant,
}

/// Main error type for tile operations.
#[derive(Error, Debug)]
pub enum Error {
    /// File does not exist or cannot be accessed
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Magic bytes do not match the expected tile kind
    #[error("Invalid tile magic: expected {expected:?}, found {found:?}")]
    InvalidMagic { expected: String, found: String },

    /// Stream ended inside a fixed-size or length-prefixed section
    #[error("Unexpected end of data while reading {0}")]
    UnexpectedEof(&'static str),

    /// Structurally invalid tile
    #[error("Invalid tile structure: {0}")]
    InvalidStructure(String),

    /// Table JSON header could not be parsed
    #[error("Malformed table JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Table header is well-formed JSON but violates the table schema
    #[error("Schema error: {0}")]
    Schema(String),

    /// Binary body reference points outside its binary section
    #[error("Property '{property}' references bytes {start}..{end} but the binary body holds {len}")]
    ReferenceOutOfBounds {
        property: String,
        start: usize,
        end: usize,
        len: usize,
    },

    /// No codec registered for a tile magic
    #[error("No codec registered for tile magic {0:?}")]
    UnknownMagic(String),

    /// Declared byte length disagrees with the serialized byte length
    #[error("Size mismatch: declared {declared} bytes, serialized {actual} bytes")]
    SizeMismatch { declared: u64, actual: u64 },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// UTF-8 conversion error
    #[error("Invalid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

impl Error {
    /// Create an invalid structure error.
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidStructure(msg.into())
    }

    /// Create a schema error.
    pub fn schema(msg: impl Into<String>) -> Self {
        Self::Schema(msg.into())
    }

    /// Build an [`Error::InvalidMagic`] from raw magic bytes.
    pub fn invalid_magic(expected: &[u8; 4], found: &[u8; 4]) -> Self {
        Self::InvalidMagic {
            expected: magic_str(expected),
            found: magic_str(found),
        }
    }

    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InvalidMagic { .. }
            | Self::UnexpectedEof(_)
            | Self::InvalidStructure(_)
            | Self::Utf8(_) => ErrorKind::Format,
            Self::FileNotFound(_) | Self::Io(_) => ErrorKind::Io,
            Self::Json(_)
            | Self::Schema(_)
            | Self::ReferenceOutOfBounds { .. }
            | Self::UnknownMagic(_) => ErrorKind::Schema,
            Self::SizeMismatch { .. } => ErrorKind::Invariant,
        }
    }
}

/// Render a 4-byte magic for messages.
pub fn magic_str(magic: &[u8; 4]) -> String {
    String::from_utf8_lossy(magic).into_owned()
}

/// Map an I/O failure inside a section read, turning a short read into
/// [`Error::UnexpectedEof`].
pub(crate) fn eof_or_io(err: std::io::Error, section: &'static str) -> Error {
    if err.kind() == std::io::ErrorKind::UnexpectedEof {
        Error::UnexpectedEof(section)
    } else {
        Error::Io(err)
    }
}

/// Result type alias for tile operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let e = Error::invalid_magic(b"b3dm", b"pnts");
        assert!(e.to_string().contains("b3dm"));
        assert!(e.to_string().contains("pnts"));

        let e = Error::ReferenceOutOfBounds {
            property: "POSITION".into(),
            start: 8,
            end: 32,
            len: 16,
        };
        assert!(e.to_string().contains("POSITION"));
        assert!(e.to_string().contains("16"));
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
        assert_eq!(err.kind(), ErrorKind::Io);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::UnexpectedEof("header").kind(), ErrorKind::Format);
        assert_eq!(Error::schema("bad").kind(), ErrorKind::Schema);
        assert_eq!(
            Error::SizeMismatch { declared: 8, actual: 16 }.kind(),
            ErrorKind::Invariant
        );
        let eof = std::io::Error::new(std::io::ErrorKind::UnexpectedEof, "short");
        assert!(matches!(eof_or_io(eof, "glTF"), Error::UnexpectedEof("glTF")));
    }
}
