//! Multipart body reader (RFC 2046).

use crate::error::{Error, Result};
use crate::header::{Headers, split_message};

/// One part of a multipart body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPart<'a> {
    /// Part headers.
    pub headers: Headers,
    /// Raw (still transfer-encoded) part body.
    pub body: &'a [u8],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Preamble,
    Parts { pos: usize },
    Done,
}

/// A delimiter line found in the body.
#[derive(Debug, Clone, Copy)]
struct Delimiter {
    /// Offset of the first byte of the delimiter line.
    start: usize,
    /// Offset just past the delimiter line's terminator.
    next: usize,
    /// True for the close delimiter (`--boundary--`).
    closing: bool,
}

/// Iterates over the parts of a multipart body.
///
/// The preamble before the first delimiter and the epilogue after the close
/// delimiter are ignored. A body that ends before the close delimiter is a
/// truncated part sequence and yields [`Error::MultipartStructure`].
#[derive(Debug, Clone)]
pub struct MultipartReader<'a> {
    data: &'a [u8],
    delimiter: Vec<u8>,
    state: State,
}

impl<'a> MultipartReader<'a> {
    /// Creates a reader over `data` using `boundary`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MultipartStructure`] if the boundary is empty.
    pub fn new(data: &'a [u8], boundary: &str) -> Result<Self> {
        if boundary.is_empty() {
            return Err(Error::MultipartStructure("missing boundary".to_string()));
        }
        let mut delimiter = Vec::with_capacity(boundary.len() + 2);
        delimiter.extend_from_slice(b"--");
        delimiter.extend_from_slice(boundary.as_bytes());

        Ok(Self {
            data,
            delimiter,
            state: State::Preamble,
        })
    }

    /// Returns the next part, or `None` after the close delimiter.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MultipartStructure`] if a delimiter is missing, or a
    /// header error if a part's header block is malformed.
    pub fn next_part(&mut self) -> Result<Option<BodyPart<'a>>> {
        loop {
            match self.state {
                State::Done => return Ok(None),
                State::Preamble => {
                    let first = self.find_delimiter(0).ok_or_else(|| {
                        Error::MultipartStructure("no opening delimiter".to_string())
                    })?;
                    self.state = if first.closing {
                        State::Done
                    } else {
                        State::Parts { pos: first.next }
                    };
                }
                State::Parts { pos } => {
                    let next = self.find_delimiter(pos).ok_or_else(|| {
                        Error::MultipartStructure("part sequence truncated".to_string())
                    })?;
                    let end = body_end(self.data, next.start).max(pos);
                    self.state = if next.closing {
                        State::Done
                    } else {
                        State::Parts { pos: next.next }
                    };

                    let (headers, body) = split_message(&self.data[pos..end])?;
                    return Ok(Some(BodyPart { headers, body }));
                }
            }
        }
    }

    /// Finds the next delimiter line starting at or after `from`.
    fn find_delimiter(&self, from: usize) -> Option<Delimiter> {
        let mut pos = from;
        while pos < self.data.len() {
            let end = self.data[pos..]
                .iter()
                .position(|&b| b == b'\n')
                .map_or(self.data.len(), |i| pos + i);
            let next = (end + 1).min(self.data.len());

            let line = &self.data[pos..end];
            let line = line.strip_suffix(b"\r").unwrap_or(line);
            if let Some(rest) = line.strip_prefix(self.delimiter.as_slice()) {
                let (closing, rest) = rest
                    .strip_prefix(b"--")
                    .map_or((false, rest), |rest| (true, rest));
                if rest.iter().all(|&b| b == b' ' || b == b'\t') {
                    return Some(Delimiter {
                        start: pos,
                        next,
                        closing,
                    });
                }
            }
            pos = next;
        }
        None
    }
}

impl<'a> Iterator for MultipartReader<'a> {
    type Item = Result<BodyPart<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_part() {
            Ok(part) => part.map(Ok),
            Err(err) => {
                self.state = State::Done;
                Some(Err(err))
            }
        }
    }
}

/// The line break before a delimiter belongs to the delimiter.
fn body_end(data: &[u8], delimiter_start: usize) -> usize {
    let mut end = delimiter_start;
    if end > 0 && data[end - 1] == b'\n' {
        end -= 1;
        if end > 0 && data[end - 1] == b'\r' {
            end -= 1;
        }
    }
    end
}
