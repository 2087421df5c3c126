//! Message parsing entry points.

use std::io::Read;

use chrono::{DateTime, FixedOffset, Local};
use mailwright_mime::{Headers, decode_header, split_message};

use crate::address::extract_addresses;
use crate::error::{Error, Result};
use crate::header_map::HeaderMap;
use crate::id::make_id;
use crate::message::Message;
use crate::options::ParseOptions;

/// Headers stored in typed fields rather than in [`Message::headers`].
const PROMOTED: [&str; 7] = [
    "Message-Id",
    "Subject",
    "Date",
    "Return-Path",
    "From",
    "To",
    "Cc",
];

const NO_SUBJECT: &str = "No subject";

/// Reads and parses a message with default options.
///
/// # Errors
///
/// Returns an error if reading fails or the message cannot be parsed.
pub fn read_message(reader: impl Read) -> Result<Message> {
    read_message_with(reader, &ParseOptions::default())
}

/// Reads and parses a message.
///
/// # Errors
///
/// Returns an error if reading fails or the message cannot be parsed.
pub fn read_message_with(mut reader: impl Read, options: &ParseOptions) -> Result<Message> {
    let mut raw = Vec::new();
    reader.read_to_end(&mut raw)?;
    Message::parse_with(&raw, options)
}

impl Message {
    /// Parses a raw message with default options.
    ///
    /// # Errors
    ///
    /// See [`Message::parse_with`].
    pub fn parse(raw: &[u8]) -> Result<Self> {
        Self::parse_with(raw, &ParseOptions::default())
    }

    /// Parses a raw message.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingRequiredField`] if there is no `From`
    /// address, [`Error::Header`] if a header cannot be decoded, and any
    /// error raised while decoding the body.
    pub fn parse_with(raw: &[u8], options: &ParseOptions) -> Result<Self> {
        let (raw_headers, body) = split_message(raw)?;

        let id = raw_headers
            .get_str("Message-Id")
            .filter(|id| !id.is_empty())
            .unwrap_or_else(make_id);

        let date = raw_headers
            .get_str("Date")
            .and_then(|value| {
                let date = parse_date(&value);
                if date.is_none() {
                    tracing::debug!(date = %value, "Unparseable Date header, using current time");
                }
                date
            })
            .unwrap_or_else(|| Local::now().fixed_offset());

        let subject = decode_header(raw_headers.get("Subject").unwrap_or_default())
            .map_err(Error::header("Subject"))?;
        let subject = if subject.is_empty() {
            NO_SUBJECT.to_string()
        } else {
            subject
        };

        let return_path = first_address(&raw_headers, "Return-Path")?;
        let from = first_address(&raw_headers, "From")?;
        let to = addresses(&raw_headers, "To")?;
        let cc = addresses(&raw_headers, "Cc")?;

        let from = from.ok_or(Error::MissingRequiredField("From"))?;
        let return_path = return_path.unwrap_or_else(|| from.clone());

        let mut headers = HeaderMap::new();
        for (name, value) in raw_headers.iter() {
            if PROMOTED.iter().any(|p| p.eq_ignore_ascii_case(name)) {
                continue;
            }
            let decoded = decode_header(value).map_err(Error::header(name))?;
            headers.append(name, decoded);
        }

        let mut msg = Self {
            id,
            return_path,
            from,
            to,
            cc,
            subject,
            date,
            is_html: false,
            html: String::new(),
            body: String::new(),
            parts: Vec::new(),
            headers,
        };

        msg.decode_body(body, &raw_headers, options.max_depth)?;

        if msg.body.is_empty() && !msg.html.is_empty() {
            msg.body = options.html.html_to_text(&msg.html)?;
            msg.is_html = true;
        }

        tracing::debug!(
            id = %msg.id,
            parts = msg.parts.len(),
            is_html = msg.is_html,
            "Message parsed"
        );
        Ok(msg)
    }
}

fn addresses(headers: &Headers, name: &'static str) -> Result<Vec<String>> {
    extract_addresses(headers.get(name).unwrap_or_default()).map_err(Error::header(name))
}

fn first_address(headers: &Headers, name: &'static str) -> Result<Option<String>> {
    Ok(addresses(headers, name)?.into_iter().next())
}

/// Parses an RFC 2822 date, ignoring a trailing `(zone)` comment.
fn parse_date(value: &str) -> Option<DateTime<FixedOffset>> {
    let mut value = value.trim();
    if value.ends_with(')')
        && let Some(open) = value.rfind('(')
    {
        value = value[..open].trim_end();
    }
    DateTime::parse_from_rfc2822(value).ok()
}
