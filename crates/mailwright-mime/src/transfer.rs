//! Content-Transfer-Encoding decoders.
//!
//! Every decoder is a [`Read`] adapter so that the body walker can pull
//! decoded bytes out of a part without caring which encoding was used.
//! Base64 and Quoted-Printable input is first passed through [`AsciiOnly`]:
//! stray 8-bit bytes from broken gateways are dropped instead of failing.
//! Corrupt input is reported as [`Error::CorruptInput`] wrapped in an
//! [`io::Error`] of kind `InvalidData`; the decoder stays usable afterwards
//! so callers may choose to keep reading.

use base64::Engine;
use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use std::fmt;
use std::io::{self, BufRead, BufReader, Read};

use crate::encoding::hex_pair;
use crate::error::{Error, Result};

/// Base64 engine accepting missing padding and non-zero trailing bits.
const LENIENT: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_decode_padding_mode(DecodePaddingMode::Indifferent)
        .with_decode_allow_trailing_bits(true),
);

const CHUNK_SIZE: usize = 4096;

/// Transfer encoding types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferEncoding {
    /// Base64 encoding.
    Base64,
    /// Quoted-Printable encoding.
    QuotedPrintable,
    /// `7bit`, `8bit`, `binary` or no header at all.
    Identity,
}

impl TransferEncoding {
    /// Parses a `Content-Transfer-Encoding` label, ignoring case.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedTransferEncoding`] carrying the label.
    pub fn from_label(label: &str) -> Result<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "base64" => Ok(Self::Base64),
            "quoted-printable" => Ok(Self::QuotedPrintable),
            "" | "7bit" | "8bit" | "binary" => Ok(Self::Identity),
            _ => Err(Error::UnsupportedTransferEncoding(label.to_string())),
        }
    }
}

impl fmt::Display for TransferEncoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Base64 => write!(f, "base64"),
            Self::QuotedPrintable => write!(f, "quoted-printable"),
            Self::Identity => write!(f, "8bit"),
        }
    }
}

/// Wraps `reader` in the decoder selected by `label`.
///
/// Unknown labels yield a reader that fails on its first read with
/// [`Error::UnsupportedTransferEncoding`].
pub fn open_decoder<'a, R: Read + 'a>(reader: R, label: &str) -> Box<dyn Read + 'a> {
    match TransferEncoding::from_label(label) {
        Ok(TransferEncoding::Base64) => Box::new(Base64Decoder::new(AsciiOnly::new(reader))),
        Ok(TransferEncoding::QuotedPrintable) => Box::new(QuotedPrintableDecoder::new(
            TrailingNewline::new(AsciiOnly::new(reader)),
        )),
        Ok(TransferEncoding::Identity) => Box::new(reader),
        Err(_) => Box::new(FailReader {
            label: label.to_string(),
        }),
    }
}

/// Reader that fails every read with an unsupported-encoding error.
#[derive(Debug, Clone)]
struct FailReader {
    label: String,
}

impl Read for FailReader {
    fn read(&mut self, _buf: &mut [u8]) -> io::Result<usize> {
        Err(Error::UnsupportedTransferEncoding(self.label.clone()).into_io())
    }
}

/// Drops every byte above 127.
#[derive(Debug)]
pub struct AsciiOnly<R> {
    inner: R,
}

impl<R: Read> AsciiOnly<R> {
    /// Wraps a reader.
    pub const fn new(inner: R) -> Self {
        Self { inner }
    }
}

impl<R: Read> Read for AsciiOnly<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            let n = self.inner.read(buf)?;
            if n == 0 {
                return Ok(0);
            }
            let mut kept = 0;
            for i in 0..n {
                if buf[i].is_ascii() {
                    buf[kept] = buf[i];
                    kept += 1;
                }
            }
            if kept > 0 {
                return Ok(kept);
            }
        }
    }
}

/// Appends a line feed at end of stream if the source did not end with one.
#[derive(Debug)]
pub struct TrailingNewline<R> {
    inner: R,
    last: Option<u8>,
    done: bool,
}

impl<R: Read> TrailingNewline<R> {
    /// Wraps a reader.
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            last: None,
            done: false,
        }
    }
}

impl<R: Read> Read for TrailingNewline<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.done || buf.is_empty() {
            return Ok(0);
        }
        let n = self.inner.read(buf)?;
        if n > 0 {
            self.last = Some(buf[n - 1]);
            return Ok(n);
        }
        self.done = true;
        match self.last {
            None | Some(b'\n') => Ok(0),
            Some(_) => {
                buf[0] = b'\n';
                Ok(1)
            }
        }
    }
}

/// Streaming Base64 decoder.
///
/// Line breaks and blanks are skipped. A quantum containing a byte outside
/// the alphabet, or padding in the wrong place, is discarded and reported
/// once as corrupt input. A short final quantum is decoded without padding.
#[derive(Debug)]
pub struct Base64Decoder<R> {
    inner: R,
    quantum: [u8; 4],
    filled: usize,
    output: Vec<u8>,
    pos: usize,
    offset: u64,
    corrupt: Option<u64>,
    finished: bool,
}

impl<R: Read> Base64Decoder<R> {
    /// Wraps a reader of Base64 text.
    pub const fn new(inner: R) -> Self {
        Self {
            inner,
            quantum: [0; 4],
            filled: 0,
            output: Vec::new(),
            pos: 0,
            offset: 0,
            corrupt: None,
            finished: false,
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        let mut chunk = [0u8; CHUNK_SIZE];
        let n = self.inner.read(&mut chunk)?;
        if n == 0 {
            self.finished = true;
            self.decode_partial();
            return Ok(());
        }

        for &byte in &chunk[..n] {
            self.offset += 1;
            match byte {
                b'\r' | b'\n' | b' ' | b'\t' => {}
                b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'+' | b'/' | b'=' => {
                    self.quantum[self.filled] = byte;
                    self.filled += 1;
                    if self.filled == 4 {
                        self.decode_quantum(4);
                    }
                }
                _ => self.reject(),
            }
        }
        Ok(())
    }

    fn decode_quantum(&mut self, len: usize) {
        let symbols = self.quantum;
        let symbols = &symbols[..len];
        let trimmed = symbols
            .iter()
            .rposition(|&b| b != b'=')
            .map_or(&symbols[..0], |last| &symbols[..=last]);

        let mut decoded = [0u8; 3];
        match LENIENT.decode_slice(trimmed, &mut decoded) {
            Ok(n) if trimmed.len() % 4 != 1 => {
                self.output.extend_from_slice(&decoded[..n]);
                self.filled = 0;
            }
            _ => self.reject(),
        }
    }

    fn decode_partial(&mut self) {
        if self.filled > 0 {
            self.decode_quantum(self.filled);
        }
    }

    fn reject(&mut self) {
        self.filled = 0;
        self.corrupt.get_or_insert(self.offset.saturating_sub(1));
    }
}

impl<R: Read> Read for Base64Decoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.output.len() {
                let n = (self.output.len() - self.pos).min(buf.len());
                buf[..n].copy_from_slice(&self.output[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            if let Some(offset) = self.corrupt.take() {
                return Err(Error::CorruptInput { offset }.into_io());
            }
            if self.finished {
                return Ok(0);
            }
            self.output.clear();
            self.pos = 0;
            self.fill()?;
        }
    }
}

/// Line-oriented Quoted-Printable decoder (RFC 2045).
///
/// Expects every line, including the last, to end in a line feed; wrap the
/// source in [`TrailingNewline`] if it may not. Hard line breaks keep their
/// original `\n` or `\r\n` form. `=` not followed by two hex digits is kept
/// literally. Unescaped control bytes are dropped and reported as corrupt.
#[derive(Debug)]
pub struct QuotedPrintableDecoder<R> {
    inner: BufReader<R>,
    line: Vec<u8>,
    output: Vec<u8>,
    pos: usize,
    offset: u64,
    corrupt: Option<u64>,
    finished: bool,
}

impl<R: Read> QuotedPrintableDecoder<R> {
    /// Wraps a reader of Quoted-Printable text.
    pub fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            line: Vec::new(),
            output: Vec::new(),
            pos: 0,
            offset: 0,
            corrupt: None,
            finished: false,
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        self.line.clear();
        let n = self.inner.read_until(b'\n', &mut self.line)?;
        if n == 0 {
            self.finished = true;
            return Ok(());
        }
        let start = self.offset;
        self.offset += n as u64;

        let line = std::mem::take(&mut self.line);
        self.decode_line(&line, start);
        self.line = line;
        Ok(())
    }

    fn decode_line(&mut self, line: &[u8], start: u64) {
        let (content, newline) = if let Some(content) = line.strip_suffix(b"\r\n") {
            (content, &b"\r\n"[..])
        } else if let Some(content) = line.strip_suffix(b"\n") {
            (content, &b"\n"[..])
        } else {
            (line, &b""[..])
        };

        let content = content.trim_ascii_end();
        let (content, soft_break) = content
            .strip_suffix(b"=")
            .map_or((content, false), |content| (content, true));

        let mut i = 0;
        while i < content.len() {
            let byte = content[i];
            if byte == b'=' {
                if let Some(decoded) = content.get(i + 1..i + 3).and_then(hex_pair) {
                    self.output.push(decoded);
                    i += 3;
                    continue;
                }
                self.output.push(b'=');
            } else if (byte < b' ' && byte != b'\t') || byte == 0x7f {
                self.corrupt.get_or_insert(start + i as u64);
            } else {
                self.output.push(byte);
            }
            i += 1;
        }

        if !soft_break {
            self.output.extend_from_slice(newline);
        }
    }
}

impl<R: Read> Read for QuotedPrintableDecoder<R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        loop {
            if self.pos < self.output.len() {
                let n = (self.output.len() - self.pos).min(buf.len());
                buf[..n].copy_from_slice(&self.output[self.pos..self.pos + n]);
                self.pos += n;
                return Ok(n);
            }
            if let Some(offset) = self.corrupt.take() {
                return Err(Error::CorruptInput { offset }.into_io());
            }
            if self.finished {
                return Ok(0);
            }
            self.output.clear();
            self.pos = 0;
            self.fill()?;
        }
    }
}
