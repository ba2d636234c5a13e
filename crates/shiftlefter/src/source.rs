//! Source buffer: UTF-8 validation and line/column tracking.
//!
//! `SourceBuffer` normalises nothing about the input text itself — lines are
//! still split on LF, CRLF or bare CR exactly as found — it only tracks
//! where each line begins so the lexer can hand out [`Location`] values
//! without re-scanning from the start of the file.

use crate::location::Location;
use thiserror::Error;

/// Errors raised while constructing a [`SourceBuffer`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum Error {
    /// The input bytes were not well-formed UTF-8, or began with a BOM.
    #[error("input is not valid UTF-8 at byte offset {byte_offset}")]
    Utf8DecodeFailed {
        /// Byte offset of the first invalid (or BOM) byte.
        byte_offset: usize,
    },
}

/// One EOL style recognised while scanning a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Eol {
    Lf,
    CrLf,
    Cr,
    /// End of input with no trailing terminator.
    None,
}

impl Eol {
    const fn byte_len(self) -> usize {
        match self {
            Self::Lf | Self::Cr => 1,
            Self::CrLf => 2,
            Self::None => 0,
        }
    }
}

/// A validated UTF-8 source buffer with pre-computed line start offsets.
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    text: String,
    /// Byte offset of the start of each line, 0-indexed by line number - 1.
    line_starts: Vec<usize>,
}

impl SourceBuffer {
    /// Validate `bytes` as UTF-8 and build a buffer over it.
    ///
    /// A leading byte-order mark is not supported and is reported the same
    /// way as any other invalid byte sequence.
    ///
    /// # Errors
    /// Returns [`Error::Utf8DecodeFailed`] if `bytes` is not valid UTF-8 or
    /// begins with a UTF-8 BOM (`EF BB BF`).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, Error> {
        if bytes.starts_with(&[0xEF, 0xBB, 0xBF]) {
            return Err(Error::Utf8DecodeFailed { byte_offset: 0 });
        }
        let text = std::str::from_utf8(bytes).map_err(|e| Error::Utf8DecodeFailed {
            byte_offset: e.valid_up_to(),
        })?;
        Ok(Self::from_str_unchecked(text))
    }

    /// Build a buffer directly from an already-validated `&str`.
    #[must_use]
    pub fn from_str_unchecked(text: &str) -> Self {
        let mut line_starts = vec![0usize];
        let bytes = text.as_bytes();
        let mut i = 0usize;
        while i < bytes.len() {
            match eol_at(bytes, i) {
                Eol::None => i += 1,
                eol => {
                    i += eol.byte_len();
                    line_starts.push(i);
                }
            }
        }
        Self {
            text: text.to_owned(),
            line_starts,
        }
    }

    /// The full source text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Number of lines in the buffer (always at least 1, even for empty
    /// input).
    #[must_use]
    pub fn line_count(&self) -> usize {
        self.line_starts.len()
    }

    /// Byte offset at which line `line` (1-based) begins.
    #[must_use]
    pub fn line_start_offset(&self, line: u32) -> Option<usize> {
        self.line_starts.get(line.checked_sub(1)? as usize).copied()
    }

    /// The location at the very start of the buffer.
    #[must_use]
    pub const fn start(&self) -> Location {
        Location::start()
    }
}

/// Detect which EOL sequence (if any) begins at byte offset `i`.
fn eol_at(bytes: &[u8], i: usize) -> Eol {
    match bytes.get(i) {
        Some(b'\n') => Eol::Lf,
        Some(b'\r') => {
            if bytes.get(i + 1) == Some(&b'\n') {
                Eol::CrLf
            } else {
                Eol::Cr
            }
        }
        _ => Eol::None,
    }
}

/// Split `text` into lines, each paired with its [`Location`] and including
/// its own trailing EOL bytes (if any) so lexer token `raw` fields can be
/// built by simple concatenation.
#[must_use]
pub fn lines_with_locations(text: &str) -> Vec<(Location, &str)> {
    let bytes = text.as_bytes();
    let mut out = Vec::new();
    let mut line_no: u32 = 1;
    let mut start = 0usize;
    let mut i = 0usize;
    while i < bytes.len() {
        match eol_at(bytes, i) {
            Eol::None => i += 1,
            eol => {
                let end = i + eol.byte_len();
                #[expect(
                    clippy::string_slice,
                    reason = "start/end are byte offsets aligned to ASCII EOL bytes"
                )]
                let line = &text[start..end];
                out.push((Location::new(line_no, 0), line));
                line_no += 1;
                start = end;
                i = end;
            }
        }
    }
    if start < bytes.len() {
        #[expect(
            clippy::string_slice,
            reason = "start is a line-start offset recorded by the scan above"
        )]
        let line = &text[start..];
        out.push((Location::new(line_no, 0), line));
    }
    out
}
