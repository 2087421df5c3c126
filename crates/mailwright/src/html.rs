//! HTML-to-text collaborator.

use std::error::Error as StdError;

/// Error returned by an [`HtmlToText`] implementation.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct HtmlError(Box<dyn StdError + Send + Sync>);

impl HtmlError {
    /// Wraps any error.
    pub fn new(err: impl Into<Box<dyn StdError + Send + Sync>>) -> Self {
        Self(err.into())
    }
}

/// Renders an HTML body as plain text.
///
/// Invoked by the parser when a message has an HTML body but no plain-text
/// body. Closures `Fn(&str) -> Result<String, HtmlError>` implement it too.
pub trait HtmlToText {
    /// Converts `html` into a plain-text rendering.
    ///
    /// # Errors
    ///
    /// Returns an error if the document cannot be rendered.
    fn html_to_text(&self, html: &str) -> Result<String, HtmlError>;
}

impl<F> HtmlToText for F
where
    F: Fn(&str) -> Result<String, HtmlError>,
{
    fn html_to_text(&self, html: &str) -> Result<String, HtmlError> {
        self(html)
    }
}

/// Default renderer: converts HTML to Markdown-flavored text with `htmd`.
#[derive(Debug, Clone, Copy, Default)]
pub struct MarkdownText;

impl HtmlToText for MarkdownText {
    fn html_to_text(&self, html: &str) -> Result<String, HtmlError> {
        htmd::convert(html).map_err(HtmlError::new)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_markdown_text_strips_tags() {
        let text = MarkdownText
            .html_to_text("<html><body><p>Hello <b>there</b></p></body></html>")
            .unwrap();
        assert!(text.contains("Hello"));
        assert!(text.contains("there"));
        assert!(!text.contains("<p>"));
    }

    #[test]
    fn test_closure_collaborator() {
        let shout = |html: &str| Ok::<_, HtmlError>(html.to_uppercase());
        assert_eq!(shout.html_to_text("<i>hi</i>").unwrap(), "<I>HI</I>");

        let failing = |_: &str| Err::<String, _>(HtmlError::new("renderer unavailable"));
        let err = failing.html_to_text("<p>").unwrap_err();
        assert_eq!(err.to_string(), "renderer unavailable");
    }
}
