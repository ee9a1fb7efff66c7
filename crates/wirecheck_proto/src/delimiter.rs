//! Frame delimiters.
//!
//! A [`Delimiter`] is a non-empty byte sequence. It can be written in configuration files and on the command line with
//! the escapes `\n`, `\r`, `\t`, `\0`, `\\` and `\xNN`.

use std::fmt;
use std::str::FromStr;

use crate::error::ProtoError;

/// Byte sequence terminating every frame on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Delimiter(Vec<u8>);

impl Delimiter {
    /// Build a delimiter from raw bytes.
    ///
    /// ## Errors
    /// - [`ProtoError::EmptyDelimiter`] if `bytes` is empty.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, ProtoError> {
        let bytes = bytes.into();
        if bytes.is_empty() {
            return Err(ProtoError::EmptyDelimiter);
        }
        Ok(Self(bytes))
    }

    /// The single newline byte used when nothing else is configured.
    pub fn newline() -> Self {
        Self(vec![b'\n'])
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Number of bytes in the delimiter (always at least one).
    #[allow(clippy::len_without_is_empty)]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Offset of the first occurrence of the delimiter in `haystack`.
    pub fn find_in(&self, haystack: &[u8]) -> Option<usize> {
        match self.0.as_slice() {
            [byte] => haystack.iter().position(|b| b == byte),
            needle => haystack.windows(needle.len()).position(|window| window == needle),
        }
    }

    /// Parse a delimiter written with backslash escapes.
    ///
    /// ## Errors
    /// - [`ProtoError::InvalidEscape`] for an unknown or truncated escape.
    /// - [`ProtoError::EmptyDelimiter`] if the text is empty.
    pub fn parse_escaped(text: &str) -> Result<Self, ProtoError> {
        let mut bytes = Vec::with_capacity(text.len());
        let mut chars = text.chars();

        while let Some(ch) = chars.next() {
            if ch != '\\' {
                let mut utf8 = [0u8; 4];
                bytes.extend_from_slice(ch.encode_utf8(&mut utf8).as_bytes());
                continue;
            }

            let escaped = chars.next().ok_or_else(|| ProtoError::InvalidEscape {
                sequence: "\\".to_string(),
            })?;
            let byte = match escaped {
                'n' => b'\n',
                'r' => b'\r',
                't' => b'\t',
                '0' => 0,
                '\\' => b'\\',
                'x' => {
                    let hex: String = chars.by_ref().take(2).collect();
                    if hex.len() != 2 {
                        return Err(ProtoError::InvalidEscape {
                            sequence: format!("\\x{hex}"),
                        });
                    }
                    u8::from_str_radix(&hex, 16).map_err(|_| ProtoError::InvalidEscape {
                        sequence: format!("\\x{hex}"),
                    })?
                }
                other => {
                    return Err(ProtoError::InvalidEscape {
                        sequence: format!("\\{other}"),
                    });
                }
            };
            bytes.push(byte);
        }

        Self::new(bytes)
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Self::newline()
    }
}

impl FromStr for Delimiter {
    type Err = ProtoError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse_escaped(s)
    }
}

/// Renders the escaped form accepted by [`Delimiter::parse_escaped`].
impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for &byte in &self.0 {
            match byte {
                b'\n' => f.write_str("\\n")?,
                b'\r' => f.write_str("\\r")?,
                b'\t' => f.write_str("\\t")?,
                0 => f.write_str("\\0")?,
                b'\\' => f.write_str("\\\\")?,
                0x20..=0x7e => write!(f, "{}", byte as char)?,
                _ => write!(f, "\\x{byte:02x}")?,
            }
        }
        Ok(())
    }
}
