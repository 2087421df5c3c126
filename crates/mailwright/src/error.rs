//! Error types for message parsing and composition.

use crate::html::HtmlError;

/// Result type alias for message operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Message error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Decoding error from the MIME layer.
    #[error(transparent)]
    Mime(#[from] mailwright_mime::Error),

    /// A header required to build the message is absent or empty.
    #[error("Missing required header: {0}")]
    MissingRequiredField(&'static str),

    /// MIME parts are nested deeper than the configured limit.
    #[error("MIME parts nested deeper than {0} levels")]
    TooDeeplyNested(usize),

    /// A header value (or attachment filename) could not be decoded.
    #[error("Failed to decode {name}: {source}")]
    Header {
        /// Header name.
        name: String,
        /// Underlying decoding error.
        #[source]
        source: mailwright_mime::Error,
    },

    /// The HTML-to-text collaborator failed.
    #[error("HTML to text conversion failed: {0}")]
    HtmlToText(#[from] HtmlError),
}

impl Error {
    /// Wraps a decoding error with the header it came from.
    pub(crate) fn header(name: impl Into<String>) -> impl FnOnce(mailwright_mime::Error) -> Self {
        let name = name.into();
        move |source| Self::Header { name, source }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Mime(err.into())
    }
}
