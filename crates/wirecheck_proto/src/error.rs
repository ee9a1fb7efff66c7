//! Errors raised while building delimiters or extracting frames.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtoError {
    #[error("frame delimiter must not be empty")]
    EmptyDelimiter,

    #[error("invalid escape sequence `{sequence}` in delimiter")]
    InvalidEscape { sequence: String },

    #[error("frame exceeds {limit} bytes ({buffered} bytes buffered without a delimiter)")]
    FrameTooLarge { limit: usize, buffered: usize },
}
