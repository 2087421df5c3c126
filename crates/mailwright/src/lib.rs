//! # mailwright
//!
//! Parse RFC 5322 mail into a structured [`Message`], derive replies and
//! forwards from it, and compose it back into bytes.
//!
//! ## Features
//!
//! - **Lenient parsing**: mislabeled charsets, stray 8-bit bytes and
//!   truncated base64 are recovered instead of rejected
//! - **MIME traversal**: nested multipart bodies sorted into plain text,
//!   HTML and attachments, with a nesting limit
//! - **Threading**: `reply`, `reply_all` and `forward` link to the parent
//!   through `In-Reply-To` and `References`
//! - **Composition**: single-part quoted-printable output ready for a
//!   [`Transport`]
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwright::read_message;
//!
//! let raw = std::fs::File::open("ticket.eml")?;
//! let msg = read_message(raw)?;
//!
//! let reply = msg.reply("desk@example.com", "We are on it.", Vec::new());
//! let bytes = reply.marshal()?;
//! ```
//!
//! ## Modules
//!
//! - [`id`]: Message-ID generation with an injectable identity source
//! - [`html`]: HTML-to-text collaborator
//! - [`transport`]: mail transport collaborator
//!
//! The byte-level codecs live in the `mailwright-mime` crate, re-exported as
//! [`mime`].

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod address;
mod body;
mod compose;
mod derive;
mod error;
mod header_map;
mod message;
mod options;
mod parse;

pub mod html;
pub mod id;
pub mod transport;

pub use mailwright_mime as mime;

pub use address::extract_addresses;
pub use error::{Error, Result};
pub use header_map::HeaderMap;
pub use html::{HtmlError, HtmlToText, MarkdownText};
pub use id::{IdentitySource, SystemIdentity, make_id, make_id_with};
pub use message::{Message, Part};
pub use options::{DEFAULT_MAX_DEPTH, ParseOptions, ParseOptionsBuilder};
pub use parse::{read_message, read_message_with};
pub use transport::{SendError, Transport};
