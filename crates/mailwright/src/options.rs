//! Parse options.

use std::fmt;

use crate::html::{HtmlToText, MarkdownText};

/// Default limit on multipart nesting.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Options controlling [`read_message_with`](crate::read_message_with).
pub struct ParseOptions {
    /// Maximum multipart nesting depth.
    pub max_depth: usize,
    /// Renderer used when a message has only an HTML body.
    pub html: Box<dyn HtmlToText>,
}

impl ParseOptions {
    /// Creates options with the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Creates an options builder.
    #[must_use]
    pub fn builder() -> ParseOptionsBuilder {
        ParseOptionsBuilder::new()
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOptions")
            .field("max_depth", &self.max_depth)
            .finish_non_exhaustive()
    }
}

/// Builder for [`ParseOptions`].
pub struct ParseOptionsBuilder {
    max_depth: usize,
    html: Option<Box<dyn HtmlToText>>,
}

impl ParseOptionsBuilder {
    /// Creates a builder with the defaults.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            html: None,
        }
    }

    /// Sets the maximum multipart nesting depth.
    #[must_use]
    pub const fn max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Sets the HTML-to-text renderer.
    #[must_use]
    pub fn html_to_text(mut self, renderer: impl HtmlToText + 'static) -> Self {
        self.html = Some(Box::new(renderer));
        self
    }

    /// Builds the options.
    #[must_use]
    pub fn build(self) -> ParseOptions {
        ParseOptions {
            max_depth: self.max_depth,
            html: self.html.unwrap_or_else(|| Box::new(MarkdownText)),
        }
    }
}

impl Default for ParseOptionsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ParseOptionsBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParseOptionsBuilder")
            .field("max_depth", &self.max_depth)
            .field("custom_html", &self.html.is_some())
            .finish()
    }
}
