//! Error types for MIME decoding.

use std::io;

/// Result type alias for MIME operations.
pub type Result<T> = std::result::Result<T, Error>;

/// MIME error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A structured header (`Content-Type`, `Content-Disposition`, ...) could not be parsed.
    #[error("Malformed header {name}: {value:?}")]
    MalformedHeader {
        /// Header name.
        name: String,
        /// Offending raw value.
        value: String,
    },

    /// The encoding cannot render the input as text.
    #[error("Cannot decode text using charset {label:?}")]
    CharsetDecode {
        /// Charset label that was requested or sniffed.
        label: String,
    },

    /// A header value still contains non-UTF-8 bytes after decoding.
    #[error("Header decode error: {0}")]
    HeaderDecode(String),

    /// Unrecognized `Content-Transfer-Encoding` label.
    #[error("Unsupported transfer encoding: {0}")]
    UnsupportedTransferEncoding(String),

    /// Missing boundary or truncated part sequence.
    #[error("Invalid multipart structure: {0}")]
    MultipartStructure(String),

    /// Corrupt transfer-encoded input. Decoders stay readable after reporting it.
    #[error("Corrupt transfer-encoded input at byte {offset}")]
    CorruptInput {
        /// Offset in the encoded input where corruption was detected.
        offset: u64,
    },

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(io::Error),
}

impl Error {
    /// Creates a malformed header error.
    pub fn malformed(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::MalformedHeader {
            name: name.into(),
            value: value.into(),
        }
    }

    /// Wraps this error into an [`io::Error`] so it can travel through a [`std::io::Read`].
    #[must_use]
    pub fn into_io(self) -> io::Error {
        let kind = match &self {
            Self::CorruptInput { .. } => io::ErrorKind::InvalidData,
            Self::UnsupportedTransferEncoding(_) => io::ErrorKind::Unsupported,
            Self::Io(err) => err.kind(),
            _ => io::ErrorKind::Other,
        };
        io::Error::new(kind, self)
    }

    /// Returns true if `err` carries a recoverable [`Error::CorruptInput`].
    #[must_use]
    pub fn is_corrupt_input(err: &io::Error) -> bool {
        err.get_ref()
            .and_then(|inner| inner.downcast_ref::<Self>())
            .is_some_and(|inner| matches!(inner, Self::CorruptInput { .. }))
    }
}

impl From<io::Error> for Error {
    /// Unwraps errors produced by [`Error::into_io`], wraps everything else.
    fn from(err: io::Error) -> Self {
        if !err.get_ref().is_some_and(|inner| inner.is::<Self>()) {
            return Self::Io(err);
        }
        let kind = err.kind();
        match err.into_inner().map(|inner| inner.downcast::<Self>()) {
            Some(Ok(inner)) => *inner,
            Some(Err(other)) => Self::Io(io::Error::new(kind, other)),
            None => Self::Io(io::Error::from(kind)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_io_round_trip_keeps_variant() {
        let err = Error::UnsupportedTransferEncoding("x-custom".to_string()).into_io();
        assert_eq!(err.kind(), io::ErrorKind::Unsupported);

        match Error::from(err) {
            Error::UnsupportedTransferEncoding(label) => assert_eq!(label, "x-custom"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_plain_io_error_is_wrapped() {
        let err = Error::from(io::Error::new(io::ErrorKind::UnexpectedEof, "short read"));
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::UnexpectedEof));
    }

    #[test]
    fn test_is_corrupt_input() {
        let corrupt = Error::CorruptInput { offset: 4 }.into_io();
        assert!(Error::is_corrupt_input(&corrupt));

        let other = io::Error::new(io::ErrorKind::InvalidData, "nope");
        assert!(!Error::is_corrupt_input(&other));
    }
}
