//! Structured message model.

use chrono::{DateTime, FixedOffset, Local};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::header_map::HeaderMap;
use crate::id::make_id;

/// An attachment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Part {
    /// Decoded filename, empty if none was given.
    pub name: String,
    /// Transfer-decoded content. No charset conversion is applied.
    pub data: Vec<u8>,
}

impl Part {
    /// Creates an attachment.
    #[must_use]
    pub fn new(name: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }
}

/// A parsed or to-be-sent email.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Message {
    /// Message-ID, including angle brackets.
    pub id: String,
    /// Bounce address.
    pub return_path: String,
    /// Sender address.
    pub from: String,
    /// Recipient addresses.
    pub to: Vec<String>,
    /// Carbon-copy addresses.
    pub cc: Vec<String>,
    /// Decoded subject.
    pub subject: String,
    /// Origination date.
    pub date: DateTime<FixedOffset>,
    /// True if `body` was rendered from `html`.
    pub is_html: bool,
    /// Decoded HTML body, possibly empty.
    pub html: String,
    /// Plain-text body.
    pub body: String,
    /// Attachments in the order they appeared.
    pub parts: Vec<Part>,
    /// Remaining decoded headers.
    pub headers: HeaderMap,
}

impl Message {
    /// Creates a message with a fresh id dated now.
    ///
    /// The return path is the sender.
    #[must_use]
    pub fn new(
        from: impl Into<String>,
        to: Vec<String>,
        cc: Vec<String>,
        subject: impl Into<String>,
        body: impl Into<String>,
        headers: HeaderMap,
    ) -> Self {
        let from = from.into();
        Self {
            id: make_id(),
            return_path: from.clone(),
            from,
            to,
            cc,
            subject: subject.into(),
            date: Local::now().fixed_offset(),
            is_html: false,
            html: String::new(),
            body: body.into(),
            parts: Vec::new(),
            headers,
        }
    }

    /// All recipient addresses: `to` followed by `cc`.
    pub fn recipients(&self) -> impl Iterator<Item = &str> {
        self.to.iter().chain(&self.cc).map(String::as_str)
    }

    /// All recipients joined with `", "`.
    #[must_use]
    pub fn receivers(&self) -> String {
        self.recipients().collect::<Vec<_>>().join(", ")
    }
}
