//! Header and body text encodings.
//!
//! Supports RFC 2047 encoded-word decoding and Q-encoding, plus the
//! Quoted-Printable body writer used when composing messages.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::fmt::Write as _;

use crate::charset::{self, find};
use crate::error::{Error, Result};

/// Maximum line length for Quoted-Printable encoding.
const MAX_LINE_LENGTH: usize = 76;

/// Maximum length of a single encoded-word.
const MAX_WORD_LENGTH: usize = 75;

const WORD_PREFIX: &str = "=?utf-8?q?";
const WORD_SUFFIX: &str = "?=";

/// Decodes every RFC 2047 encoded-word in a header value into UTF-8 text.
///
/// This is the two-step composition of [`decode_words`] and [`finish_header`].
///
/// # Errors
///
/// Returns an error if an encoded-word's charset cannot render text, or if
/// non-UTF-8 bytes survive the sniffing pass.
pub fn decode_header(raw: impl AsRef<[u8]>) -> Result<String> {
    finish_header(decode_words(raw.as_ref())?)
}

/// First step: replaces encoded-words with their UTF-8 text.
///
/// Literal runs outside encoded-words are copied as-is, so the result may
/// still hold raw 8-bit bytes. Whitespace between two adjacent encoded-words
/// is dropped. Encoded-words with invalid content are kept literally.
///
/// # Errors
///
/// Returns [`Error::CharsetDecode`] if a declared charset cannot render text.
pub fn decode_words(raw: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(raw.len());
    let mut rest = raw;
    let mut between_words = false;

    while let Some(start) = find(rest, b"=?") {
        let literal = &rest[..start];

        if let Some((word, consumed)) = EncodedWord::parse(&rest[start..]) {
            if let Some(text) = word.decode()? {
                if !(between_words && literal.iter().all(u8::is_ascii_whitespace)) {
                    out.extend_from_slice(literal);
                }
                out.extend_from_slice(text.as_bytes());
                rest = &rest[start + consumed..];
                between_words = true;
                continue;
            }
        }

        out.extend_from_slice(&rest[..start + 2]);
        rest = &rest[start + 2..];
        between_words = false;
    }

    out.extend_from_slice(rest);
    Ok(out)
}

/// Second step: guarantees valid UTF-8.
///
/// Valid input passes through. Otherwise the bytes are run once through
/// charset sniffing (empty label); if that cannot render text, decoding fails.
///
/// # Errors
///
/// Returns [`Error::HeaderDecode`] if the sniffing pass fails.
pub fn finish_header(bytes: Vec<u8>) -> Result<String> {
    match String::from_utf8(bytes) {
        Ok(text) => Ok(text),
        Err(err) => charset::normalize(err.as_bytes(), "").map_err(|e| {
            Error::HeaderDecode(format!("non-UTF-8 bytes left after decode: {e}"))
        }),
    }
}

/// A parsed `=?charset?encoding?text?=` token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct EncodedWord<'a> {
    charset: &'a str,
    encoding: u8,
    text: &'a [u8],
}

impl<'a> EncodedWord<'a> {
    /// Parses a word at the start of `input`, returning it and its byte length.
    fn parse(input: &'a [u8]) -> Option<(Self, usize)> {
        let body = input.strip_prefix(b"=?")?;

        let charset_end = body.iter().position(|&b| b == b'?')?;
        let charset = std::str::from_utf8(&body[..charset_end]).ok()?;
        // RFC 2231 language suffix: =?utf-8*en?Q?...?=
        let charset = charset.split('*').next().unwrap_or_default();
        if charset.is_empty() || charset.contains(char::is_whitespace) {
            return None;
        }

        let after = &body[charset_end + 1..];
        let (&encoding, after) = after.split_first()?;
        let encoding = encoding.to_ascii_uppercase();
        if !matches!(encoding, b'B' | b'Q') {
            return None;
        }
        let text_area = after.strip_prefix(b"?")?;
        let text_end = find(text_area, b"?=")?;

        let consumed = 2 + charset_end + 1 + 2 + text_end + 2;
        Some((
            Self {
                charset,
                encoding,
                text: &text_area[..text_end],
            },
            consumed,
        ))
    }

    /// Decodes the word. `Ok(None)` means the content is invalid and the
    /// word should be kept literally.
    fn decode(&self) -> Result<Option<String>> {
        let content = match self.encoding {
            b'B' => STANDARD.decode(self.text).ok(),
            _ => decode_q(self.text),
        };
        let Some(content) = content else {
            tracing::trace!(charset = self.charset, "Keeping invalid encoded-word literally");
            return Ok(None);
        };
        charset::normalize(&content, self.charset).map(Some)
    }
}

/// Decodes RFC 2047 Q-encoded text (`_` is a space, `=XX` is a byte).
fn decode_q(text: &[u8]) -> Option<Vec<u8>> {
    let mut out = Vec::with_capacity(text.len());
    let mut i = 0;
    while i < text.len() {
        match text[i] {
            b'_' => out.push(b' '),
            b'=' => {
                out.push(hex_pair(text.get(i + 1..i + 3)?)?);
                i += 2;
            }
            b if b == b'\t' || (b' '..=b'~').contains(&b) => out.push(b),
            _ => return None,
        }
        i += 1;
    }
    Some(out)
}

/// Parses two hex digits (either case) into a byte.
pub(crate) fn hex_pair(pair: &[u8]) -> Option<u8> {
    let [hi, lo] = pair else {
        return None;
    };
    let hi = char::from(*hi).to_digit(16)?;
    let lo = char::from(*lo).to_digit(16)?;
    u8::try_from((hi << 4) | lo).ok()
}

/// Encodes a header value as RFC 2047 Q-encoded UTF-8 words when needed.
///
/// Printable ASCII that cannot be mistaken for an encoded-word is returned
/// unchanged. Otherwise the value becomes one or more `=?utf-8?q?...?=` words
/// separated by spaces, none longer than 75 bytes and none splitting a
/// character.
#[must_use]
pub fn encode_word(text: &str) -> String {
    let needs_encoding = text.contains("=?")
        || text
            .bytes()
            .any(|b| !(b == b'\t' || (b' '..=b'~').contains(&b)));
    if !needs_encoding {
        return text.to_string();
    }

    let budget = MAX_WORD_LENGTH - WORD_PREFIX.len() - WORD_SUFFIX.len();

    let mut words = Vec::new();
    let mut current = String::new();
    for ch in text.chars() {
        let mut encoded = String::new();
        let mut buf = [0u8; 4];
        for &byte in ch.encode_utf8(&mut buf).as_bytes() {
            match byte {
                b' ' => encoded.push('_'),
                b'!'..=b'~' if !matches!(byte, b'=' | b'?' | b'_') => {
                    encoded.push(char::from(byte));
                }
                _ => {
                    let _ = write!(encoded, "={byte:02X}");
                }
            }
        }
        if !current.is_empty() && current.len() + encoded.len() > budget {
            words.push(format!("{WORD_PREFIX}{current}{WORD_SUFFIX}"));
            current.clear();
        }
        current.push_str(&encoded);
    }
    words.push(format!("{WORD_PREFIX}{current}{WORD_SUFFIX}"));

    words.join(" ")
}

/// Encodes text using Quoted-Printable encoding (RFC 2045).
///
/// Line feeds in `text` stay hard line breaks. `=`, control bytes (including
/// a bare CR), and non-ASCII bytes become `=XX`; whitespace at the end of a
/// line is escaped; lines are soft-wrapped at 76 columns.
#[must_use]
pub fn encode_quoted_printable(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);

    for (index, line) in text.split('\n').enumerate() {
        if index > 0 {
            result.push('\n');
        }

        let bytes = line.as_bytes();
        let mut line_length = 0;
        for (i, &byte) in bytes.iter().enumerate() {
            let last = i + 1 == bytes.len();
            let mut token = [0u8; 3];
            let token = match byte {
                b'!'..=b'<' | b'>'..=b'~' => {
                    token[0] = byte;
                    &token[..1]
                }
                b' ' | b'\t' if !last => {
                    token[0] = byte;
                    &token[..1]
                }
                _ => {
                    token[0] = b'=';
                    token[1] = HEX_UPPER[usize::from(byte >> 4)];
                    token[2] = HEX_UPPER[usize::from(byte & 0x0f)];
                    &token[..3]
                }
            };

            // Leave room for the soft break's '='.
            if line_length + token.len() > MAX_LINE_LENGTH - 1 {
                result.push_str("=\n");
                line_length = 0;
            }
            for &b in token {
                result.push(char::from(b));
            }
            line_length += token.len();
        }
    }

    result
}

const HEX_UPPER: &[u8; 16] = b"0123456789ABCDEF";

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::needless_collect)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_header_plain_text_unchanged() {
        assert_eq!(decode_header("Hello, World!").unwrap(), "Hello, World!");
        assert_eq!(decode_header("a =? b").unwrap(), "a =? b");
    }

    #[test]
    fn test_decode_header_base64_word() {
        let decoded = decode_header("=?utf-8?B?SMOpbGxv?=").unwrap();
        assert_eq!(decoded, "Héllo");
    }

    #[test]
    fn test_decode_header_q_word() {
        let decoded = decode_header("=?UTF-8?q?H=C3=A9llo_W=c3=b6rld?=").unwrap();
        assert_eq!(decoded, "Héllo Wörld");
    }

    #[test]
    fn test_decode_header_mixed_with_literals() {
        let decoded = decode_header("Re: =?iso-8859-1?q?caf=E9?= au lait").unwrap();
        assert_eq!(decoded, "Re: café au lait");
    }

    #[test]
    fn test_decode_header_joins_adjacent_words() {
        let decoded = decode_header("=?utf-8?q?Hello,?=\r\n =?utf-8?q?_World?=").unwrap();
        assert_eq!(decoded, "Hello, World");
    }

    #[test]
    fn test_decode_header_keeps_invalid_word() {
        let decoded = decode_header("=?utf-8?B?###?= tail").unwrap();
        assert_eq!(decoded, "=?utf-8?B?###?= tail");

        let decoded = decode_header("=?utf-8?X?abc?=").unwrap();
        assert_eq!(decoded, "=?utf-8?X?abc?=");
    }

    #[test]
    fn test_decode_header_unknown_charset_sniffs() {
        let decoded = decode_header("=?x-unknown?q?caf=E9?=").unwrap();
        assert_eq!(decoded, "café");
    }

    #[test]
    fn test_decode_header_language_suffix() {
        let decoded = decode_header("=?utf-8*en?q?hi?=").unwrap();
        assert_eq!(decoded, "hi");
    }

    #[test]
    fn test_decode_header_raw_8bit_literal_is_sniffed() {
        let decoded = decode_header(b"Caf\xe9 =?utf-8?q?ol=C3=A9?=").unwrap();
        assert_eq!(decoded, "Café olÃ©");
    }

    #[test]
    fn test_decode_header_undecodable_charset_fails() {
        let err = decode_header("=?iso-2022-kr?q?abc?=").unwrap_err();
        assert!(matches!(err, Error::CharsetDecode { .. }));
    }

    #[test]
    fn test_finish_header_valid_passthrough() {
        assert_eq!(finish_header(b"plain".to_vec()).unwrap(), "plain");
        assert_eq!(finish_header(b"\xe9t\xe9".to_vec()).unwrap(), "été");
    }

    #[test]
    fn test_encode_word_ascii_unchanged() {
        assert_eq!(encode_word("Hello"), "Hello");
        assert_eq!(encode_word("Re: [TT:42] status"), "Re: [TT:42] status");
    }

    #[test]
    fn test_encode_word_utf8() {
        let encoded = encode_word("Héllo wörld");
        assert_eq!(encoded, "=?utf-8?q?H=C3=A9llo_w=C3=B6rld?=");
        assert_eq!(decode_header(&encoded).unwrap(), "Héllo wörld");
    }

    #[test]
    fn test_encode_word_splits_long_values() {
        let text = "Привет, мир! ".repeat(8);
        let encoded = encode_word(&text);
        let words: Vec<&str> = encoded.split(' ').collect();
        assert!(words.len() > 1);
        assert!(words.iter().all(|w| w.len() <= MAX_WORD_LENGTH));
        assert_eq!(decode_header(&encoded).unwrap(), text);
    }

    #[test]
    fn test_quoted_printable_encode() {
        assert_eq!(encode_quoted_printable("Hello, World!"), "Hello, World!");
        assert_eq!(encode_quoted_printable("Héllo"), "H=C3=A9llo");
        assert_eq!(encode_quoted_printable("a=b"), "a=3Db");
    }

    #[test]
    fn test_quoted_printable_trailing_whitespace() {
        assert_eq!(encode_quoted_printable("end \nnext\t"), "end=20\nnext=09");
    }

    #[test]
    fn test_quoted_printable_keeps_line_breaks() {
        assert_eq!(encode_quoted_printable("one\ntwo\n"), "one\ntwo\n");
        assert_eq!(encode_quoted_printable("crlf\r\n"), "crlf=0D\n");
    }

    #[test]
    fn test_quoted_printable_soft_wrap() {
        let text = "x".repeat(200);
        let encoded = encode_quoted_printable(&text);
        assert!(encoded.lines().all(|line| line.len() <= MAX_LINE_LENGTH));
        assert_eq!(encoded.replace("=\n", ""), text);
    }
}
