//! Line splitting and per-line chunk decoding

use std::borrow::Cow;

use crate::error::DecodeError;
use crate::protocol::ChatChunk;

/// Line that terminates a stream, compared after trimming
pub const DONE_SENTINEL: &str = "data: [DONE]";

/// Accumulates raw body bytes and yields complete lines
///
/// Splitting happens on bytes, so a multi-byte character broken across two
/// reads is reassembled before it is decoded.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `bytes` and drain every newline-terminated line
    ///
    /// Lines are returned without the `\n` and without a trailing `\r`.
    /// Whatever follows the last newline stays buffered.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let Some(last_newline) = self.pending.iter().rposition(|&b| b == b'\n') else {
            return Vec::new();
        };

        let tail = self.pending.split_off(last_newline + 1);
        let complete = std::mem::replace(&mut self.pending, tail);

        complete[..last_newline]
            .split(|&b| b == b'\n')
            .map(|line| {
                let line = line.strip_suffix(b"\r").unwrap_or(line);
                String::from_utf8_lossy(line).into_owned()
            })
            .collect()
    }

    /// Bytes of the unterminated trailing line
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// The unterminated trailing line, decoded lossily
    pub fn pending_line(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.pending)
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Classification of one stream line
#[derive(Debug)]
pub enum Line {
    /// Empty or whitespace only
    Blank,
    /// The termination sentinel
    Done,
    /// A decoded chunk
    Chunk(ChatChunk),
    /// Undecodable; callers log and move on
    Skipped(DecodeError),
}

/// Decode a single line
///
/// Any prefix before the first `{` is ignored, so `data: {...}` and bare
/// `{...}` lines decode the same way.
pub fn decode_line(line: &str) -> Line {
    let trimmed = line.trim();

    if trimmed.is_empty() {
        return Line::Blank;
    }

    if trimmed == DONE_SENTINEL {
        return Line::Done;
    }

    let Some(start) = trimmed.find('{') else {
        return Line::Skipped(DecodeError::NoJson);
    };

    match serde_json::from_str(&trimmed[start..]) {
        Ok(chunk) => Line::Chunk(chunk),
        Err(e) => Line::Skipped(DecodeError::Malformed(e)),
    }
}
