//! # Incremental command-line reader.
//!
//! [`LineSource`] reads newline-delimited command lines from a byte stream
//! without loading the whole input into memory and without handing out a line
//! before it is fully available. Buffer growth, compaction and whitespace
//! skipping are internal; callers only see [`next_line`](LineSource::next_line)
//! and [`is_truncated`](LineSource::is_truncated).
//!
//! ## Buffer invariants
//! - `pos <= used <= buffer.len()`; `buffer[pos..used]` holds unconsumed bytes
//! - bytes before `pos` are logically discarded and physically slid to index 0
//!   on the next refill
//! - `buffer[pos..used]` never starts with whitespace: runs of whitespace
//!   (including blank lines) are skipped eagerly after every successful read
//!   and after every consumed line
//!
//! ## Behavior
//! - capacity starts at 512 bytes and doubles whenever a line outgrows it
//! - a read interrupted by a signal is retried transparently
//! - a permanent read failure stops the source; the error is reported once
//!   via [`take_read_error`](LineSource::take_read_error)
//! - a trailing line without a newline is never yielded; it is flagged by
//!   [`is_truncated`](LineSource::is_truncated) after end of stream

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use crate::error::RunnerError;

const INITIAL_CAPACITY: usize = 512;

/// The byte stream a [`LineSource`] is opened over: a named file or stdin.
///
/// Dropping the `File` variant closes the descriptor; dropping the `Stdin`
/// variant leaves the process's stdin open, matching the original tool's
/// never-close-stdin rule.
pub enum Input {
    File(fs::File),
    Stdin(io::Stdin),
}

impl Read for Input {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Input::File(f) => f.read(buf),
            Input::Stdin(s) => s.read(buf),
        }
    }
}

/// Streaming source of trimmed, non-blank command lines.
pub struct LineSource<R> {
    reader: R,
    buffer: Vec<u8>,
    /// One past the last byte read from the stream.
    used: usize,
    /// First unconsumed byte; never points at whitespace while `pos < used`.
    pos: usize,
    eof: bool,
    failed: bool,
    read_error: Option<io::Error>,
}

impl LineSource<Input> {
    /// Opens a named command file, or stdin when `path` is `None`.
    pub fn open(path: Option<&Path>) -> Result<Self, RunnerError> {
        let input = match path {
            Some(p) => {
                let file = fs::File::open(p).map_err(|source| RunnerError::Open {
                    path: p.display().to_string(),
                    source,
                })?;
                Input::File(file)
            }
            None => Input::Stdin(io::stdin()),
        };
        Ok(Self::new(input))
    }
}

impl<R: Read> LineSource<R> {
    /// Creates a source over an arbitrary byte stream.
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: vec![0; INITIAL_CAPACITY],
            used: 0,
            pos: 0,
            eof: false,
            failed: false,
            read_error: None,
        }
    }

    /// Returns the next non-blank command line with surrounding whitespace
    /// stripped, or `None` if no further complete line is available.
    ///
    /// The returned string is never empty and never contains a newline.
    pub fn next_line(&mut self) -> Option<String> {
        let eol = match self.find_newline() {
            Some(i) => i,
            None => self.refill()?,
        };

        // Leading whitespace was skipped eagerly, so the line starts at
        // content and is non-empty after trimming the tail.
        debug_assert!(eol > self.pos && !self.buffer[self.pos].is_ascii_whitespace());
        let start = self.pos;
        let mut end = eol;
        while end > start && self.buffer[end - 1].is_ascii_whitespace() {
            end -= 1;
        }
        let line = String::from_utf8_lossy(&self.buffer[start..end]).into_owned();

        self.pos = eol + 1;
        self.skip_whitespace();
        Some(line)
    }

    /// True only if the stream has reached end-of-file and leftover content
    /// without a terminating newline remains unconsumed.
    ///
    /// Meaningful once the caller has stopped reading (after `next_line`
    /// returned `None` at end of stream).
    pub fn is_truncated(&self) -> bool {
        self.eof && self.find_newline().is_none() && self.pos != self.used
    }

    /// Takes the irrecoverable read error, if one occurred.
    ///
    /// The source stays stopped afterwards; this only transfers the error so
    /// it can be reported exactly once.
    pub fn take_read_error(&mut self) -> Option<io::Error> {
        self.read_error.take()
    }

    fn find_newline(&self) -> Option<usize> {
        self.buffer[self.pos..self.used]
            .iter()
            .position(|&b| b == b'\n')
            .map(|i| self.pos + i)
    }

    fn skip_whitespace(&mut self) {
        while self.pos < self.used && self.buffer[self.pos].is_ascii_whitespace() {
            self.pos += 1;
        }
    }

    /// Compacts the buffer and reads until a newline is available, growing
    /// the buffer (capacity ×2) when full. Returns the newline's index, or
    /// `None` at permanent end-of-file or after an irrecoverable read error.
    fn refill(&mut self) -> Option<usize> {
        self.buffer.copy_within(self.pos..self.used, 0);
        self.used -= self.pos;
        self.pos = 0;

        loop {
            if let Some(i) = self.find_newline() {
                return Some(i);
            }
            if self.failed || self.eof {
                return None;
            }

            if self.used == self.buffer.len() {
                let grown = self.buffer.len() * 2;
                self.buffer.resize(grown, 0);
            }

            match self.reader.read(&mut self.buffer[self.used..]) {
                Ok(0) => self.eof = true,
                Ok(n) => {
                    self.used += n;
                    self.skip_whitespace();
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                Err(e) => {
                    self.failed = true;
                    self.read_error = Some(e);
                }
            }
        }
    }
}
