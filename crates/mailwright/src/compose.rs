//! Message composition.
//!
//! Produces a single-part text message with a quoted-printable body. The
//! return path, the HTML body and attachments are not written.

use std::io::{self, Write};

use mailwright_mime::{encode_quoted_printable, encode_word};

use crate::error::Result;
use crate::message::Message;

/// Headers describing the body; the composer writes its own.
const BODY_HEADERS: [&str; 3] = [
    "Content-Type",
    "Content-Transfer-Encoding",
    "Content-Disposition",
];

impl Message {
    /// Serializes the message into `writer`. Lines end in LF.
    ///
    /// # Errors
    ///
    /// Returns any error raised by `writer`.
    pub fn write_to<W: Write + ?Sized>(&self, writer: &mut W) -> io::Result<()> {
        writeln!(writer, "From: <{}>", self.from)?;
        write_address_list(writer, "To", &self.to)?;
        write_address_list(writer, "CC", &self.cc)?;
        writeln!(writer, "Message-ID: {}", self.id)?;
        writeln!(writer, "Subject: {}", encode_word(&self.subject))?;
        writeln!(writer, "Date: {}", self.format_date())?;

        for (name, value) in self.headers.iter() {
            if BODY_HEADERS.iter().any(|h| h.eq_ignore_ascii_case(name)) {
                continue;
            }
            writeln!(writer, "{name}: {}", encode_word(value))?;
        }

        let media = if self.is_html { "text/html" } else { "text/plain" };
        writeln!(writer, "Content-Type: {media}; charset=utf-8;")?;
        writeln!(writer, "Content-Transfer-Encoding: quoted-printable")?;
        writeln!(writer)?;

        let body = encode_quoted_printable(&self.body);
        writer.write_all(body.as_bytes())?;
        // Without a final hard break the decoder would append one.
        if !body.is_empty() && !body.ends_with('\n') {
            writer.write_all(b"=\n")?;
        }
        writer.flush()
    }

    /// Serializes the message to bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if encoding fails.
    pub fn marshal(&self) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.body.len() + 512);
        self.write_to(&mut out)?;
        Ok(out)
    }

    /// `Date` header value, e.g. `Mon, 2 Jan 2006 15:04:05 -0700 (-0700)`.
    ///
    /// The parenthesized zone name repeats the numeric offset for every
    /// non-zero offset, since a fixed offset carries no zone abbreviation.
    /// A zero offset reads `+0000 (UTC)`.
    fn format_date(&self) -> String {
        let zone = if self.date.offset().local_minus_utc() == 0 {
            "UTC".to_string()
        } else {
            self.date.format("%z").to_string()
        };
        format!("{} ({zone})", self.date.format("%a, %-d %b %Y %H:%M:%S %z"))
    }
}

fn write_address_list<W: Write + ?Sized>(
    writer: &mut W,
    name: &str,
    addresses: &[String],
) -> io::Result<()> {
    if addresses.is_empty() {
        return Ok(());
    }
    let list = addresses
        .iter()
        .map(|addr| format!("<{addr}>"))
        .collect::<Vec<_>>()
        .join(", ");
    writeln!(writer, "{name}: {list}")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::header_map::HeaderMap;
    use chrono::{FixedOffset, TimeZone};

    fn fixed(body: &str) -> Message {
        let mut msg = Message::new(
            "desk@example.com",
            vec!["a@example.com".to_string(), "b@example.com".to_string()],
            Vec::new(),
            "Status",
            body,
            [
                ("In-Reply-To", "<1@x>"),
                ("Content-Type", "multipart/mixed; boundary=zzz"),
            ]
            .into_iter()
            .collect(),
        );
        msg.id = "<42@example.com>".to_string();
        msg.date = FixedOffset::east_opt(3 * 3600)
            .unwrap()
            .with_ymd_and_hms(2024, 3, 9, 7, 5, 1)
            .unwrap();
        msg
    }

    #[test]
    fn test_marshal_layout() {
        let out = String::from_utf8(fixed("Hello").marshal().unwrap()).unwrap();
        assert_eq!(
            out,
            "From: <desk@example.com>\n\
To: <a@example.com>, <b@example.com>\n\
Message-ID: <42@example.com>\n\
Subject: Status\n\
Date: Sat, 9 Mar 2024 07:05:01 +0300 (+0300)\n\
In-Reply-To: <1@x>\n\
Content-Type: text/plain; charset=utf-8;\n\
Content-Transfer-Encoding: quoted-printable\n\
\n\
Hello=\n"
        );
    }

    #[test]
    fn test_marshal_html_and_cc() {
        let mut msg = fixed("x\n");
        msg.is_html = true;
        msg.cc = vec!["c@example.com".to_string()];
        let out = String::from_utf8(msg.marshal().unwrap()).unwrap();
        assert!(out.contains("\nCC: <c@example.com>\n"));
        assert!(out.contains("\nContent-Type: text/html; charset=utf-8;\n"));
        assert!(out.ends_with("\n\nx\n"));
    }

    #[test]
    fn test_marshal_encodes_subject_and_body() {
        let mut msg = fixed("Grüße");
        msg.subject = "Привет".to_string();
        let out = String::from_utf8(msg.marshal().unwrap()).unwrap();
        assert!(out.contains("\nSubject: =?utf-8?q?"));
        assert!(out.ends_with("\n\nGr=C3=BC=C3=9Fe=\n"));
    }

    #[test]
    fn test_date_utc_zone_name() {
        let mut msg = fixed("");
        msg.date = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2006, 1, 2, 15, 4, 5)
            .unwrap();
        assert_eq!(msg.format_date(), "Mon, 2 Jan 2006 15:04:05 +0000 (UTC)");
    }

    #[test]
    fn test_writer_error_propagates() {
        struct Broken;
        impl Write for Broken {
            fn write(&mut self, _: &[u8]) -> io::Result<usize> {
                Err(io::Error::other("disk full"))
            }
            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }
        let err = fixed("x").write_to(&mut Broken).unwrap_err();
        assert_eq!(err.to_string(), "disk full");
    }
}
