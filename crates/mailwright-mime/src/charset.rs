//! Charset lookup, sniffing and lenient decoding to UTF-8.
//!
//! Mail in the wild often mislabels or omits its charset. [`normalize`]
//! resolves a label when it can, sniffs the content when it cannot, and
//! drops byte sequences the chosen encoding cannot map instead of failing.

use encoding_rs::{DecoderResult, Encoding, REPLACEMENT, UTF_8, UTF_16BE, UTF_16LE, WINDOWS_1252};

use crate::error::{Error, Result};

/// Number of leading bytes inspected while sniffing.
const SNIFF_LIMIT: usize = 1024;

/// Looks up an encoding by its WHATWG label (`utf-8`, `latin1`, `koi8-r`, ...).
///
/// Returns `None` for empty or unknown labels.
#[must_use]
pub fn lookup(label: &str) -> Option<&'static Encoding> {
    let label = label.trim();
    if label.is_empty() {
        return None;
    }
    Encoding::for_label(label.as_bytes())
}

/// Sniffs the encoding of `content` treated as `text/plain`.
///
/// Checks, in order: a byte-order mark, an HTML `<meta>` charset declaration,
/// UTF-8 validity, and finally falls back to `windows-1252`.
#[must_use]
pub fn sniff(content: &[u8]) -> &'static Encoding {
    let head = &content[..content.len().min(SNIFF_LIMIT)];

    if let Some((encoding, _)) = Encoding::for_bom(head) {
        return encoding;
    }
    if let Some(encoding) = prescan_meta(head) {
        return encoding;
    }
    // A multi-byte sequence cut off by the sniff window still counts as UTF-8.
    let truncated = content.len() > SNIFF_LIMIT;
    match std::str::from_utf8(head) {
        Ok(_) => UTF_8,
        Err(e) if truncated && e.error_len().is_none() => UTF_8,
        Err(_) => WINDOWS_1252,
    }
}

/// Decodes `bytes` to text using `label`, sniffing when the label is unknown.
///
/// Byte sequences that are malformed for the selected encoding are dropped.
///
/// # Errors
///
/// Returns [`Error::CharsetDecode`] if the encoding cannot render text at all
/// (the WHATWG "replacement" encodings such as `iso-2022-kr`).
pub fn normalize(bytes: &[u8], label: &str) -> Result<String> {
    let encoding = lookup(label).unwrap_or_else(|| {
        let sniffed = sniff(bytes);
        tracing::trace!(label, sniffed = sniffed.name(), "Charset label unresolved, sniffed");
        sniffed
    });
    decode(bytes, encoding)
}

/// Decodes `bytes` with a known encoding, dropping malformed sequences.
///
/// # Errors
///
/// Returns [`Error::CharsetDecode`] for the replacement encoding.
pub fn decode(bytes: &[u8], encoding: &'static Encoding) -> Result<String> {
    if encoding == REPLACEMENT {
        return Err(Error::CharsetDecode {
            label: encoding.name().to_string(),
        });
    }

    let mut decoder = encoding.new_decoder_with_bom_removal();
    let mut text = String::with_capacity(bytes.len());
    let mut input = bytes;
    let mut dropped = 0usize;

    loop {
        let needed = decoder
            .max_utf8_buffer_length_without_replacement(input.len())
            .ok_or_else(|| Error::CharsetDecode {
                label: encoding.name().to_string(),
            })?;
        text.reserve(needed);

        let (result, read) = decoder.decode_to_string_without_replacement(input, &mut text, true);
        input = &input[read..];

        match result {
            DecoderResult::InputEmpty => break,
            DecoderResult::Malformed(bad, _) => dropped += usize::from(bad),
            DecoderResult::OutputFull => {}
        }
    }

    if dropped > 0 {
        tracing::debug!(charset = encoding.name(), dropped, "Dropped undecodable bytes");
    }
    Ok(text)
}

/// Looks for `<meta charset=...>` or `<meta http-equiv ... content="...; charset=...">`.
fn prescan_meta(head: &[u8]) -> Option<&'static Encoding> {
    let lower = head.to_ascii_lowercase();
    let mut rest = lower.as_slice();

    while let Some(start) = find(rest, b"<meta") {
        let tag = &rest[start..];
        let end = tag.iter().position(|&b| b == b'>').unwrap_or(tag.len());
        if let Some(encoding) = meta_charset(&tag[..end]) {
            // A document can't be declared UTF-16 from inside its own ASCII bytes.
            if encoding == UTF_16LE || encoding == UTF_16BE {
                return Some(UTF_8);
            }
            return Some(encoding);
        }
        rest = &tag[end..];
    }
    None
}

fn meta_charset(tag: &[u8]) -> Option<&'static Encoding> {
    let at = find(tag, b"charset")?;
    let value = tag[at + b"charset".len()..].trim_ascii_start();
    let value = value.strip_prefix(b"=")?.trim_ascii_start();
    let value = value
        .strip_prefix(b"\"")
        .or_else(|| value.strip_prefix(b"'"))
        .unwrap_or(value);
    let end = value
        .iter()
        .position(|&b| matches!(b, b'"' | b'\'' | b';' | b'/' | b'>') || b.is_ascii_whitespace())
        .unwrap_or(value.len());
    Encoding::for_label(&value[..end])
}

pub(crate) fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}
