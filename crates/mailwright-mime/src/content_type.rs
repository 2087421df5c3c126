//! `Content-Type` and `Content-Disposition` parsing.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::charset;
use crate::encoding::hex_pair;
use crate::error::{Error, Result};

/// Characters that end a token (RFC 2045 `tspecials`).
const TSPECIALS: &str = "()<>@,;:\\\"/[]?=";

/// MIME content type with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    /// Main type (e.g., "text", "image", "multipart").
    pub main_type: String,
    /// Subtype (e.g., "plain", "html", "jpeg"). Empty if the header gave none.
    pub sub_type: String,
    /// Parameters keyed by lowercase name (e.g., charset=utf-8, boundary=xxx).
    pub parameters: HashMap<String, String>,
}

impl ContentType {
    /// Creates a new content type.
    #[must_use]
    pub fn new(main_type: impl Into<String>, sub_type: impl Into<String>) -> Self {
        Self {
            main_type: main_type.into(),
            sub_type: sub_type.into(),
            parameters: HashMap::new(),
        }
    }

    /// Adds a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Returns `type/subtype`, or just `type` when no subtype was given.
    #[must_use]
    pub fn essence(&self) -> String {
        if self.sub_type.is_empty() {
            self.main_type.clone()
        } else {
            format!("{}/{}", self.main_type, self.sub_type)
        }
    }

    /// Returns the charset parameter if present.
    #[must_use]
    pub fn charset(&self) -> Option<&str> {
        self.parameters.get("charset").map(String::as_str)
    }

    /// Returns the boundary parameter if present.
    #[must_use]
    pub fn boundary(&self) -> Option<&str> {
        self.parameters.get("boundary").map(String::as_str)
    }

    /// Returns the non-empty `name` parameter if present.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.parameters
            .get("name")
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Checks if this is a multipart content type.
    #[must_use]
    pub fn is_multipart(&self) -> bool {
        self.main_type == "multipart"
    }

    /// Parses a content type string.
    ///
    /// Format: `type/subtype; param1=value1; param2="value 2"`. Parameter
    /// values are tokens or quoted strings; RFC 2231 extended and continued
    /// parameters (`name*=utf-8''%C3%A9`, `name*0=...`) are decoded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] if the media type or any parameter
    /// is malformed, or a parameter is repeated.
    pub fn parse(s: &str) -> Result<Self> {
        let malformed = || Error::malformed("Content-Type", s);
        let (media, parameters) = parse_media(s).ok_or_else(malformed)?;
        let (main_type, sub_type) = media.split_once('/').unwrap_or((&media, ""));

        Ok(Self {
            main_type: main_type.to_string(),
            sub_type: sub_type.to_string(),
            parameters: resolve_parameters(parameters, malformed)?,
        })
    }
}

/// MIME content disposition with parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentDisposition {
    /// Disposition type, lowercase (e.g., "inline", "attachment").
    pub kind: String,
    /// Parameters keyed by lowercase name.
    pub parameters: HashMap<String, String>,
}

impl ContentDisposition {
    /// Returns the non-empty `filename` parameter if present.
    #[must_use]
    pub fn filename(&self) -> Option<&str> {
        self.parameters
            .get("filename")
            .map(String::as_str)
            .filter(|name| !name.is_empty())
    }

    /// Parses a content disposition string, e.g. `attachment; filename="a.txt"`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedHeader`] on the same conditions as
    /// [`ContentType::parse`].
    pub fn parse(s: &str) -> Result<Self> {
        let malformed = || Error::malformed("Content-Disposition", s);
        let (kind, parameters) = parse_media(s).ok_or_else(malformed)?;

        Ok(Self {
            kind,
            parameters: resolve_parameters(parameters, malformed)?,
        })
    }
}

fn is_token_char(c: char) -> bool {
    c.is_ascii() && !c.is_ascii_control() && c != ' ' && !TSPECIALS.contains(c)
}

fn consume_token(s: &str) -> (&str, &str) {
    let end = s.find(|c| !is_token_char(c)).unwrap_or(s.len());
    s.split_at(end)
}

/// Consumes a quoted string starting at `"`, returning its unescaped value.
fn consume_quoted(s: &str) -> Option<(String, &str)> {
    let mut value = String::new();
    let mut chars = s.strip_prefix('"')?.char_indices();
    while let Some((i, c)) = chars.next() {
        match c {
            '"' => return Some((value, &s[i + 2..])),
            '\\' => value.push(chars.next()?.1),
            '\r' | '\n' => return None,
            _ => value.push(c),
        }
    }
    None
}

/// Splits a header into its lowercase media type and raw parameters.
fn parse_media(s: &str) -> Option<(String, Vec<(String, String)>)> {
    let (media, mut rest) = s.split_once(';').unwrap_or((s, ""));
    let media = media.trim().to_ascii_lowercase();

    let valid_media = match media.split_once('/') {
        Some((main, sub)) => {
            !main.is_empty() && !sub.is_empty() && main.chars().chain(sub.chars()).all(is_token_char)
        }
        None => !media.is_empty() && media.chars().all(is_token_char),
    };
    if !valid_media {
        return None;
    }

    let mut parameters = Vec::new();
    loop {
        rest = rest.trim_start();
        if rest.is_empty() {
            break;
        }
        // Empty parameters and trailing semicolons are tolerated.
        if let Some(after) = rest.strip_prefix(';') {
            rest = after;
            continue;
        }

        let (key, after) = consume_token(rest);
        if key.is_empty() {
            return None;
        }
        let after = after.trim_start().strip_prefix('=')?.trim_start();
        let (value, after) = if after.starts_with('"') {
            consume_quoted(after)?
        } else {
            let (value, after) = consume_token(after);
            if value.is_empty() {
                return None;
            }
            (value.to_string(), after)
        };

        rest = after.trim_start();
        if !rest.is_empty() && !rest.starts_with(';') {
            return None;
        }
        parameters.push((key.to_ascii_lowercase(), value));
    }

    Some((media, parameters))
}

/// A piece of an RFC 2231 parameter: (section index, percent-encoded, value).
type Section = (u32, bool, String);

/// Merges raw parameters, decoding RFC 2231 extended values.
///
/// Duplicate keys and bad section numbers are reported through `malformed`.
fn resolve_parameters(
    raw: Vec<(String, String)>,
    malformed: impl Fn() -> Error,
) -> Result<HashMap<String, String>> {
    let mut simple = HashMap::new();
    let mut extended: BTreeMap<String, Vec<Section>> = BTreeMap::new();
    let mut seen = HashSet::new();

    for (key, value) in raw {
        if !seen.insert(key.clone()) {
            return Err(malformed());
        }
        match key.split_once('*') {
            None => {
                simple.insert(key, value);
            }
            Some((base, "")) => extended
                .entry(base.to_string())
                .or_default()
                .push((0, true, value)),
            Some((base, section)) => {
                let (number, encoded) = section
                    .strip_suffix('*')
                    .map_or((section, false), |number| (number, true));
                let index = number.parse::<u32>().map_err(|_| malformed())?;
                extended
                    .entry(base.to_string())
                    .or_default()
                    .push((index, encoded, value));
            }
        }
    }

    for (base, mut sections) in extended {
        sections.sort_by_key(|section| section.0);
        simple.insert(base, decode_sections(&sections)?);
    }
    Ok(simple)
}

fn decode_sections(sections: &[Section]) -> Result<String> {
    let mut label = "";
    let mut bytes = Vec::new();

    for (i, (_, encoded, value)) in sections.iter().enumerate() {
        if !*encoded {
            bytes.extend_from_slice(value.as_bytes());
            continue;
        }
        let mut value = value.as_str();
        if i == 0 {
            if let Some((charset, rest)) = value.split_once('\'') {
                let (_language, rest) = rest.split_once('\'').unwrap_or(("", rest));
                label = charset;
                value = rest;
            }
        }
        percent_decode(value.as_bytes(), &mut bytes);
    }

    charset::normalize(&bytes, label)
}

fn percent_decode(input: &[u8], out: &mut Vec<u8>) {
    let mut i = 0;
    while i < input.len() {
        if input[i] == b'%' {
            if let Some(byte) = input.get(i + 1..i + 3).and_then(hex_pair) {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(input[i]);
        i += 1;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_content_type_new() {
        let ct = ContentType::new("text", "plain");
        assert_eq!(ct.main_type, "text");
        assert_eq!(ct.sub_type, "plain");
        assert!(ct.parameters.is_empty());
    }

    #[test]
    fn test_content_type_parse() {
        let ct = ContentType::parse("Text/Plain; Charset=utf-8").unwrap();
        assert_eq!(ct.essence(), "text/plain");
        assert_eq!(ct.charset(), Some("utf-8"));
    }

    #[test]
    fn test_content_type_parse_quoted() {
        let ct = ContentType::parse("multipart/mixed; boundary=\"----=_Part_123\"").unwrap();
        assert!(ct.is_multipart());
        assert_eq!(ct.boundary(), Some("----=_Part_123"));

        let ct = ContentType::parse(r#"application/octet-stream; name="a \"quoted\" name.txt""#)
            .unwrap();
        assert_eq!(ct.name(), Some("a \"quoted\" name.txt"));
    }

    #[test]
    fn test_content_type_trailing_semicolon() {
        let ct = ContentType::parse("text/plain; charset=utf-8;").unwrap();
        assert_eq!(ct.charset(), Some("utf-8"));
    }

    #[test]
    fn test_content_type_without_subtype() {
        let ct = ContentType::parse("text").unwrap();
        assert_eq!(ct.essence(), "text");
    }

    #[test]
    fn test_content_type_with_parameter() {
        let ct = ContentType::new("text", "plain")
            .with_parameter("charset", "iso-8859-1")
            .with_parameter("format", "flowed");

        assert_eq!(ct.charset(), Some("iso-8859-1"));
        assert_eq!(ct.parameters.get("format"), Some(&"flowed".to_string()));
    }

    #[test]
    fn test_content_type_malformed() {
        for bad in [
            "",
            "text/",
            "/plain",
            "text plain",
            "text/plain; charset",
            "text/plain; charset=",
            "text/plain; name=two words",
            "text/plain; name=\"unterminated",
            "text/plain; a=1; A=2",
        ] {
            let err = ContentType::parse(bad).unwrap_err();
            assert!(
                matches!(err, Error::MalformedHeader { ref name, .. } if name == "Content-Type"),
                "{bad:?} gave {err:?}"
            );
        }
    }

    #[test]
    fn test_rfc2231_extended_value() {
        let ct = ContentType::parse("application/pdf; name*=utf-8''r%C3%A9sum%C3%A9.pdf").unwrap();
        assert_eq!(ct.name(), Some("résumé.pdf"));
    }

    #[test]
    fn test_rfc2231_continuations() {
        let cd = ContentDisposition::parse(
            "attachment; filename*0*=iso-8859-1'fr'caf%E9; filename*1=\"_menu.txt\"",
        )
        .unwrap();
        assert_eq!(cd.kind, "attachment");
        assert_eq!(cd.filename(), Some("café_menu.txt"));
    }

    #[test]
    fn test_content_disposition_parse() {
        let cd = ContentDisposition::parse("Attachment; filename=\"a.txt\"; size=42").unwrap();
        assert_eq!(cd.kind, "attachment");
        assert_eq!(cd.filename(), Some("a.txt"));

        let cd = ContentDisposition::parse("inline").unwrap();
        assert_eq!(cd.filename(), None);
    }

    #[test]
    fn test_content_disposition_malformed() {
        let err = ContentDisposition::parse("attachment; filename").unwrap_err();
        assert!(matches!(err, Error::MalformedHeader { ref name, .. } if name == "Content-Disposition"));
    }
}
