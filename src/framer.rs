use crate::config::{is_whitespace, Delimiters};
use crate::errors::*;
use bytes::{Buf, Bytes, BytesMut};
use error_chain::bail;
use std::fmt;

/// Splits a growing byte stream into complete top-level `{...}` objects.
///
/// Bytes are appended with [`Framer::extend`] and complete objects are taken off the front of the
/// accumulator with [`Framer::next_object`]. The accumulator only ever holds the object currently
/// being scanned, so memory is bounded by the largest single object rather than the stream size.
///
/// Braces inside double-quoted strings are not counted. Nothing else about the JSON grammar is
/// checked.
pub struct Framer {
    buf: BytesMut,
    delimiters: Delimiters,
    // Absolute stream offset of buf[0]
    offset: u64,
    // Next index of buf to examine, only meaningful while depth > 0
    cursor: usize,
    depth: usize,
    in_string: bool,
    escaped: bool,
}

/// An object left open when the stream ended
#[derive(Debug, Clone, PartialEq)]
pub struct Truncation {
    /// Absolute offset of the object's opening delimiter
    pub start: u64,
    /// Number of bytes held for the unfinished object
    pub pending: usize,
    /// Open delimiters still unmatched
    pub depth: usize,
    pub in_string: bool,
}

impl fmt::Display for Truncation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "incomplete object at offset {} ({} bytes, {} unclosed",
            self.start, self.pending, self.depth
        )?;
        if self.in_string {
            write!(f, ", inside a string")?;
        }
        write!(f, ")")
    }
}

impl Default for Framer {
    fn default() -> Self {
        Framer::new()
    }
}

impl Framer {
    pub fn new() -> Framer {
        Framer::with_delimiters(Delimiters::default())
    }

    pub fn with_delimiters(delimiters: Delimiters) -> Framer {
        Framer {
            buf: BytesMut::new(),
            delimiters,
            offset: 0,
            cursor: 0,
            depth: 0,
            in_string: false,
            escaped: false,
        }
    }

    /// Appends newly decompressed bytes to the accumulator
    pub fn extend(&mut self, chunk: &[u8]) {
        self.buf.extend_from_slice(chunk);
    }

    /// Appends `chunk` and passes every object it completes to `emit`, in order.
    pub fn feed<F>(&mut self, chunk: &[u8], mut emit: F) -> Result<usize>
    where
        F: FnMut(Bytes) -> Result<()>,
    {
        self.extend(chunk);

        let mut emitted = 0;
        while let Some(object) = self.next_object()? {
            emit(object)?;
            emitted += 1;
        }
        Ok(emitted)
    }

    /// Removes and returns the next complete object, or `Ok(None)` if more input is needed.
    ///
    /// Whitespace between objects is dropped. Any other byte where an object should start is a
    /// `Framing` error; the framer does not skip past it, so later calls report the same error.
    pub fn next_object(&mut self) -> Result<Option<Bytes>> {
        if self.depth == 0 && !self.start_object()? {
            return Ok(None);
        }

        let Delimiters { open, close } = self.delimiters;
        while self.cursor < self.buf.len() {
            let byte = self.buf[self.cursor];
            self.cursor += 1;

            if self.in_string {
                if self.escaped {
                    self.escaped = false;
                } else if byte == b'\\' {
                    self.escaped = true;
                } else if byte == b'"' {
                    self.in_string = false;
                }
                continue;
            }

            if byte == b'"' {
                self.in_string = true;
            } else if byte == open {
                self.depth += 1;
            } else if byte == close {
                self.depth -= 1;
                if self.depth == 0 {
                    let object = self.buf.split_to(self.cursor).freeze();
                    self.offset += object.len() as u64;
                    self.cursor = 0;
                    return Ok(Some(object));
                }
            }
        }

        Ok(None)
    }

    /// Describes the partial object still held, if any
    pub fn pending(&self) -> Option<Truncation> {
        let start = self.buf.iter().position(|&b| !is_whitespace(b))?;
        Some(Truncation {
            start: self.offset + start as u64,
            pending: self.buf.len() - start,
            depth: self.depth,
            in_string: self.in_string,
        })
    }

    /// Absolute stream offset of the first byte still held
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// Number of bytes currently held in the accumulator
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// Skips leading whitespace and enters an object if its opening delimiter is next.
    fn start_object(&mut self) -> Result<bool> {
        let skip = self
            .buf
            .iter()
            .take_while(|&&b| is_whitespace(b))
            .count();
        self.buf.advance(skip);
        self.offset += skip as u64;

        let first = match self.buf.first() {
            Some(&b) => b,
            None => return Ok(false),
        };
        if first != self.delimiters.open {
            bail!(ErrorKind::Framing(first, self.offset));
        }

        self.depth = 1;
        self.cursor = 1;
        self.in_string = false;
        self.escaped = false;
        Ok(true)
    }
}
