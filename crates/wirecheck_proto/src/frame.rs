//! Incremental delimiter framing.
//!
//! [`FrameBuffer`] accumulates bytes as they arrive from a stream and hands out one frame per delimiter. Bytes after
//! the first delimiter stay buffered for the next call, so a single read may carry any number of frames, or only a
//! fragment of one.
//!
//! ## Notes
//!
//! - The buffer keeps a read cursor instead of shifting bytes on every frame. The consumed prefix is compacted when
//!   new data arrives and it makes up at least half of the allocation.
//! - A scan cursor remembers how far the current partial frame has already been searched, so a long frame arriving
//!   in many small reads is not rescanned from its start on every read.

use crate::delimiter::Delimiter;
use crate::error::ProtoError;

/// One delimiter-bounded unit of the wire protocol, delimiter stripped.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Frame(Vec<u8>);

impl Frame {
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The frame as text, with invalid UTF-8 replaced by `U+FFFD`.
    pub fn to_text_lossy(&self) -> String {
        String::from_utf8_lossy(&self.0).into_owned()
    }
}

impl AsRef<[u8]> for Frame {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Accumulation buffer splitting a byte stream into frames.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    buf: Vec<u8>,
    /// First byte not yet handed out as part of a frame.
    start: usize,
    /// Bytes in `start..scanned` are known to contain no complete delimiter.
    scanned: usize,
    delimiter: Delimiter,
    max_frame_len: Option<usize>,
}

impl FrameBuffer {
    /// Default upper bound on a single frame (16 MiB).
    pub const DEFAULT_MAX_FRAME_LEN: usize = 16 * 1024 * 1024;

    pub fn new(delimiter: Delimiter) -> Self {
        Self {
            buf: Vec::new(),
            start: 0,
            scanned: 0,
            delimiter,
            max_frame_len: Some(Self::DEFAULT_MAX_FRAME_LEN),
        }
    }

    /// Set the frame length limit; `None` lets a frame grow without bound.
    pub fn with_max_frame_len(mut self, limit: Option<usize>) -> Self {
        self.max_frame_len = limit;
        self
    }

    pub fn delimiter(&self) -> &Delimiter {
        &self.delimiter
    }

    /// Number of bytes received but not yet returned as a frame.
    pub fn buffered(&self) -> usize {
        self.buf.len() - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.buffered() == 0
    }

    /// Bytes received but not yet returned as a frame.
    pub fn pending(&self) -> &[u8] {
        &self.buf[self.start..]
    }

    /// Append bytes read from the stream.
    pub fn extend(&mut self, bytes: &[u8]) {
        if bytes.is_empty() {
            return;
        }
        if self.start > 0 && self.start * 2 >= self.buf.len() {
            self.buf.drain(..self.start);
            self.scanned -= self.start;
            self.start = 0;
        }
        self.buf.extend_from_slice(bytes);
    }

    /// Split off the next complete frame, if the buffer holds one.
    ///
    /// Only the first delimiter is consumed; anything after it stays buffered.
    ///
    /// ## Errors
    /// - [`ProtoError::FrameTooLarge`] when the frame (complete or still partial) exceeds the configured limit. A
    ///   complete oversized frame is discarded so the buffer stays aligned on the next frame.
    pub fn next_frame(&mut self) -> Result<Option<Frame>, ProtoError> {
        let width = self.delimiter.len();
        // A delimiter may straddle the boundary between scanned and fresh bytes.
        let from = self.scanned.saturating_sub(width - 1).max(self.start);

        match self.delimiter.find_in(&self.buf[from..]) {
            Some(offset) => {
                let end = from + offset;
                let frame = Frame::new(&self.buf[self.start..end]);
                self.start = end + width;
                self.scanned = self.start;
                if self.start == self.buf.len() {
                    self.buf.clear();
                    self.start = 0;
                    self.scanned = 0;
                }
                self.check_limit(frame.len())?;
                Ok(Some(frame))
            }
            None => {
                self.scanned = self.buf.len();
                // Up to `width - 1` trailing bytes may still turn out to be a delimiter prefix.
                self.check_limit(self.buffered().saturating_sub(width - 1))?;
                Ok(None)
            }
        }
    }

    fn check_limit(&self, frame_len: usize) -> Result<(), ProtoError> {
        match self.max_frame_len {
            Some(limit) if frame_len > limit => Err(ProtoError::FrameTooLarge {
                limit,
                buffered: frame_len,
            }),
            _ => Ok(()),
        }
    }
}
