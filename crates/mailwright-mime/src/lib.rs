//! # mailwright-mime
//!
//! Lenient MIME decoding primitives for email.
//!
//! ## Features
//!
//! - **Charsets**: WHATWG label lookup, content sniffing, and decoding that
//!   drops undecodable bytes instead of failing
//! - **Header words**: RFC 2047 encoded-word decoding and Q-encoding
//! - **Transfer encodings**: Base64, Quoted-Printable and identity decoders
//!   as [`std::io::Read`] adapters that tolerate stray 8-bit bytes
//! - **Content types**: `Content-Type` / `Content-Disposition` parameters,
//!   including RFC 2231 extended values
//! - **Multipart**: boundary-delimited part iteration
//!
//! ## Quick Start
//!
//! ```ignore
//! use mailwright_mime::{decode_header, open_decoder};
//! use std::io::Read;
//!
//! let subject = decode_header("=?utf-8?q?H=C3=A9llo?=")?;
//! assert_eq!(subject, "Héllo");
//!
//! let mut body = Vec::new();
//! open_decoder(&b"SGVsbG8="[..], "base64").read_to_end(&mut body)?;
//! assert_eq!(body, b"Hello");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod content_type;
mod error;
mod header;
mod multipart;

pub mod charset;
pub mod encoding;
pub mod transfer;

pub use content_type::{ContentDisposition, ContentType};
pub use encoding::{decode_header, encode_quoted_printable, encode_word};
pub use error::{Error, Result};
pub use header::{Headers, split_message};
pub use multipart::{BodyPart, MultipartReader};
pub use transfer::{TransferEncoding, open_decoder};
