//! Raw header block handling.
//!
//! Header values are kept as raw bytes: mail routinely carries unlabeled
//! 8-bit text in headers, and only the RFC 2047 decoder knows how to turn
//! them into text.

use std::fmt;

use crate::error::{Error, Result};

/// Ordered collection of raw email headers.
///
/// Names keep the case they were received in; lookups ignore case.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Headers {
    entries: Vec<(String, Vec<u8>)>,
}

impl Headers {
    /// Creates a new empty header collection.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a header value.
    pub fn add(&mut self, name: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.entries.push((name.into(), value.into()));
    }

    /// Gets the first value for a header.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.entries
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    /// Gets the first value for a header as lossy text, trimmed.
    #[must_use]
    pub fn get_str(&self, name: &str) -> Option<String> {
        self.get(name)
            .map(|v| String::from_utf8_lossy(v).trim().to_string())
    }

    /// Gets all values for a header.
    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a [u8]> + 'a {
        self.entries
            .iter()
            .filter(move |(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_slice())
    }

    /// Returns an iterator over all headers in received order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[u8])> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v.as_slice()))
    }

    /// Returns the number of header lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no headers.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Parses a header block.
    ///
    /// Lines end in LF with an optional CR. Continuation lines (starting with
    /// a space or tab) are unfolded into the previous value with a single
    /// space. Parsing stops at the first empty line.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] for a line without a colon, an
    /// invalid header name, or a continuation line with nothing to continue.
    pub fn parse(block: &[u8]) -> Result<Self> {
        let mut headers = Self::new();

        for line in lines(block) {
            if line.is_empty() {
                break;
            }

            if matches!(line[0], b' ' | b'\t') {
                let (_, value) = headers.entries.last_mut().ok_or_else(|| {
                    Error::malformed("(continuation)", String::from_utf8_lossy(line))
                })?;
                value.push(b' ');
                value.extend_from_slice(line.trim_ascii());
                continue;
            }

            let colon = line
                .iter()
                .position(|&b| b == b':')
                .ok_or_else(|| Error::malformed("(line)", String::from_utf8_lossy(line)))?;
            let name = &line[..colon];
            if name.is_empty() || !name.iter().all(|&b| b.is_ascii_graphic()) {
                return Err(Error::malformed(
                    String::from_utf8_lossy(name),
                    String::from_utf8_lossy(line),
                ));
            }
            let name = String::from_utf8_lossy(name).into_owned();
            headers.add(name, line[colon + 1..].trim_ascii().to_vec());
        }

        Ok(headers)
    }
}

impl fmt::Debug for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.entries
                    .iter()
                    .map(|(n, v)| (n, String::from_utf8_lossy(v))),
            )
            .finish()
    }
}

/// Splits a message (or body part) into its header block and body.
///
/// The body starts after the first empty line. Input without an empty line
/// is all headers and an empty body.
///
/// # Errors
///
/// Returns an error if the header block is malformed.
pub fn split_message(raw: &[u8]) -> Result<(Headers, &[u8])> {
    let mut pos = 0;
    while pos < raw.len() {
        let end = raw[pos..]
            .iter()
            .position(|&b| b == b'\n')
            .map_or(raw.len(), |i| pos + i + 1);
        let line = strip_newline(&raw[pos..end]);
        if line.is_empty() {
            return Ok((Headers::parse(&raw[..pos])?, &raw[end..]));
        }
        pos = end;
    }
    Ok((Headers::parse(raw)?, &raw[raw.len()..]))
}

/// Iterates over lines without their line terminators.
fn lines(block: &[u8]) -> impl Iterator<Item = &[u8]> {
    let block = block.strip_suffix(b"\n").unwrap_or(block);
    block.split(|&b| b == b'\n').map(strip_newline)
}

fn strip_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_headers_new() {
        let headers = Headers::new();
        assert!(headers.is_empty());
    }

    #[test]
    fn test_headers_add_get() {
        let mut headers = Headers::new();
        headers.add("Content-Type", "text/plain");
        assert_eq!(headers.get("Content-Type"), Some(&b"text/plain"[..]));
        assert_eq!(headers.get("content-type"), Some(&b"text/plain"[..]));
        assert_eq!(headers.get_str("CONTENT-TYPE").as_deref(), Some("text/plain"));
    }

    #[test]
    fn test_headers_get_all_in_order() {
        let mut headers = Headers::new();
        headers.add("Received", "first");
        headers.add("Subject", "x");
        headers.add("received", "second");

        let values: Vec<&[u8]> = headers.get_all("RECEIVED").collect();
        assert_eq!(values, vec![&b"first"[..], &b"second"[..]]);
    }

    #[test]
    fn test_headers_parse() {
        let text = concat!(
            "From: sender@example.com\r\n",
            "To: recipient@example.com\r\n",
            "Subject: Test Message\r\n",
            "Content-Type: text/plain;\r\n",
            "\tcharset=utf-8\r\n",
            "\r\n",
            "Not: a header\r\n"
        );

        let headers = Headers::parse(text.as_bytes()).unwrap();
        assert_eq!(headers.len(), 4);
        assert_eq!(headers.get_str("From").as_deref(), Some("sender@example.com"));
        assert_eq!(
            headers.get_str("Content-Type").as_deref(),
            Some("text/plain; charset=utf-8")
        );
        assert!(headers.get("Not").is_none());
    }

    #[test]
    fn test_headers_parse_keeps_raw_bytes() {
        let headers = Headers::parse(b"Subject: caf\xe9\n").unwrap();
        assert_eq!(headers.get("subject"), Some(&b"caf\xe9"[..]));
    }

    #[test]
    fn test_headers_parse_malformed() {
        assert!(matches!(
            Headers::parse(b"no colon here\n"),
            Err(Error::MalformedHeader { .. })
        ));
        assert!(matches!(
            Headers::parse(b" leading continuation\n"),
            Err(Error::MalformedHeader { .. })
        ));
        assert!(matches!(
            Headers::parse(b"Bad Name: x\n"),
            Err(Error::MalformedHeader { .. })
        ));
    }

    #[test]
    fn test_split_message() {
        let raw = b"From: a@b.com\nSubject: hi\n\nbody line\n\nmore\n";
        let (headers, body) = split_message(raw).unwrap();
        assert_eq!(headers.len(), 2);
        assert_eq!(body, b"body line\n\nmore\n");
    }

    #[test]
    fn test_split_message_crlf_and_empty_headers() {
        let (headers, body) = split_message(b"\r\nonly body").unwrap();
        assert!(headers.is_empty());
        assert_eq!(body, b"only body");
    }

    #[test]
    fn test_split_message_without_body() {
        let (headers, body) = split_message(b"From: a@b.com\r\n").unwrap();
        assert_eq!(headers.len(), 1);
        assert!(body.is_empty());
    }
}
