//! MIME body walker.
//!
//! Descends the part tree of a message body, sorting every leaf into the
//! plain-text body, the HTML body or the attachment list.

use std::io::Read;

use mailwright_mime::{
    ContentDisposition, ContentType, Headers, MultipartReader, charset, decode_header,
    open_decoder,
};

use crate::error::{Error, Result};
use crate::message::{Message, Part};

/// What a leaf part contributes to the message.
enum Leaf {
    Attachment(String),
    Text,
    Html,
    Multipart(String),
    Ignored,
}

impl Message {
    /// Decodes `body` according to `headers` and accumulates the result.
    ///
    /// # Errors
    ///
    /// Fails on malformed `Content-Type`/`Content-Disposition` headers,
    /// unsupported transfer encodings, charset failures, broken multipart
    /// structure, and nesting deeper than `max_depth`.
    pub fn decode_body(&mut self, body: &[u8], headers: &Headers, max_depth: usize) -> Result<()> {
        walk(self, body, headers, 0, max_depth)
    }
}

fn walk(
    msg: &mut Message,
    body: &[u8],
    headers: &Headers,
    depth: usize,
    max_depth: usize,
) -> Result<()> {
    if depth > max_depth {
        return Err(Error::TooDeeplyNested(max_depth));
    }

    let content_type = content_type(headers)?;
    let encoding = headers
        .get_str("Content-Transfer-Encoding")
        .unwrap_or_default();

    match classify(&content_type, headers)? {
        Leaf::Attachment(raw_name) => {
            let name = decode_header(&raw_name).map_err(Error::header("filename"))?;
            let mut data = Vec::new();
            open_decoder(body, &encoding).read_to_end(&mut data)?;
            tracing::trace!(%name, size = data.len(), "Attachment decoded");
            msg.parts.push(Part { name, data });
        }
        Leaf::Text => {
            let text = decode_text(body, &encoding, content_type.charset())?;
            msg.body.push_str(&text);
        }
        Leaf::Html => {
            let text = decode_text(body, &encoding, content_type.charset())?;
            msg.html.push_str(&text);
        }
        Leaf::Multipart(boundary) => {
            for part in MultipartReader::new(body, &boundary)? {
                let part = part?;
                walk(msg, part.body, &part.headers, depth + 1, max_depth)?;
            }
        }
        Leaf::Ignored => {
            tracing::debug!(
                content_type = %content_type.essence(),
                "Skipping part without filename"
            );
        }
    }

    Ok(())
}

/// Reads the part's `Content-Type`, defaulting to `text/plain`.
fn content_type(headers: &Headers) -> Result<ContentType> {
    let raw = header_text(headers, "Content-Type")?;
    if raw.is_empty() {
        return Ok(ContentType::new("text", "plain"));
    }
    Ok(ContentType::parse(&raw)?)
}

fn classify(content_type: &ContentType, headers: &Headers) -> Result<Leaf> {
    if let Some(name) = content_type.name() {
        return Ok(Leaf::Attachment(name.to_string()));
    }

    let disposition = header_text(headers, "Content-Disposition")?;
    if !disposition.is_empty() {
        let disposition = ContentDisposition::parse(&disposition)?;
        if let Some(name) = disposition.filename() {
            return Ok(Leaf::Attachment(name.to_string()));
        }
    }

    Ok(match content_type.essence().as_str() {
        "text/plain" => Leaf::Text,
        "text/html" => Leaf::Html,
        _ if content_type.is_multipart() => {
            Leaf::Multipart(content_type.boundary().unwrap_or_default().to_string())
        }
        _ => Leaf::Ignored,
    })
}

/// Header value as text, empty if absent. Raw 8-bit values are sniffed.
fn header_text(headers: &Headers, name: &'static str) -> Result<String> {
    let Some(raw) = headers.get(name) else {
        return Ok(String::new());
    };
    let text = charset::normalize(raw, "").map_err(Error::header(name))?;
    Ok(text.trim().to_string())
}

/// Transfer-decodes a text leaf and converts it to UTF-8.
fn decode_text(body: &[u8], encoding: &str, charset: Option<&str>) -> Result<String> {
    let raw = read_lenient(open_decoder(body, encoding))?;
    Ok(charset::normalize(&raw, charset.unwrap_or_default())?)
}

/// Reads to the end, skipping over recoverable corruption.
fn read_lenient(mut reader: impl Read) -> Result<Vec<u8>> {
    let mut data = Vec::new();
    loop {
        match reader.read_to_end(&mut data) {
            Ok(_) => return Ok(data),
            Err(err) if mailwright_mime::Error::is_corrupt_input(&err) => {
                tracing::debug!(error = %err, recovered = data.len(), "Continuing past corrupt input");
            }
            Err(err) => return Err(err.into()),
        }
    }
}
