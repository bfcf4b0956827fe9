use std::borrow::Borrow;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use thiserror::Error;

use crate::utils::escape_frame;

/// One inbound request payload, matched byte-exactly against a command table.
#[derive(Debug, Clone, Eq, PartialEq, Hash, derive_more::Into)]
pub struct CommandFrame {
    bytes: Vec<u8>,
}

impl CommandFrame {
    /// Creates a command frame from raw bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// Returns the raw frame bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Borrow<[u8]> for CommandFrame {
    fn borrow(&self) -> &[u8] {
        &self.bytes
    }
}

impl Display for CommandFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", escape_frame(&self.bytes))
    }
}

/// One outbound payload chunk.
#[derive(Debug, Clone, Eq, PartialEq, Hash, derive_more::Into)]
pub struct ResponseFrame {
    bytes: Vec<u8>,
}

impl ResponseFrame {
    /// Creates a response frame from raw bytes.
    #[must_use]
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            bytes: bytes.into(),
        }
    }

    /// The value an adapter holds right after power-on, before any command was answered.
    #[must_use]
    pub fn power_on_trigger() -> Self {
        Self::new(b"ATZ\r".to_vec())
    }

    /// Returns the raw frame bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the frame length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns whether the frame carries no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl From<&[u8]> for ResponseFrame {
    fn from(value: &[u8]) -> Self {
        Self::new(value)
    }
}

impl From<&str> for ResponseFrame {
    fn from(value: &str) -> Self {
        Self::new(value.as_bytes())
    }
}

impl Display for ResponseFrame {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", escape_frame(&self.bytes))
    }
}

/// Ordered, non-empty list of response frames answering one command.
///
/// Cloning is cheap; the frames are shared.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ResponseSequence {
    frames: Arc<[ResponseFrame]>,
}

impl ResponseSequence {
    /// Creates a sequence, or `None` when `frames` is empty.
    #[must_use]
    pub fn new(frames: Vec<ResponseFrame>) -> Option<Self> {
        if frames.is_empty() {
            return None;
        }
        Some(Self {
            frames: frames.into(),
        })
    }

    pub(crate) fn single(frame: ResponseFrame) -> Self {
        Self {
            frames: Arc::from([frame]),
        }
    }

    /// Returns the frames in delivery order.
    #[must_use]
    pub fn frames(&self) -> &[ResponseFrame] {
        &self.frames
    }

    /// Returns the number of frames.
    #[must_use]
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Returns `false`; sequences hold at least one frame.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Iterates the frames in delivery order.
    pub fn iter(&self) -> impl Iterator<Item = &ResponseFrame> {
        self.frames.iter()
    }
}

/// Errors returned when parsing a textual frame literal.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum FrameLiteralError {
    #[error("frame literal is empty")]
    Empty,
    #[error("frame literal ends with a dangling `\\`")]
    DanglingEscape,
    #[error("unsupported escape sequence `\\{escape}`")]
    UnsupportedEscape { escape: char },
    #[error("invalid `\\x` escape `{value}`")]
    InvalidHexEscape { value: String },
    #[error("invalid hexadecimal frame")]
    InvalidHex(#[from] hex::FromHexError),
}

/// Frame bytes parsed from a command-line literal such as `ATZ\r` or `0902\r`.
///
/// Supports `\r`, `\n`, `\t`, `\\` and `\xNN` escapes.
#[derive(Debug, Clone, Eq, PartialEq, derive_more::Into)]
pub struct FrameLiteral {
    bytes: Vec<u8>,
}

impl FrameLiteral {
    /// Parses a frame written as hexadecimal digits (whitespace ignored).
    ///
    /// # Errors
    ///
    /// Returns an error when the input is empty or not valid hexadecimal.
    pub fn from_hex(value: &str) -> Result<Self, FrameLiteralError> {
        let cleaned: String = value.chars().filter(|c| !c.is_whitespace()).collect();
        if cleaned.is_empty() {
            return Err(FrameLiteralError::Empty);
        }
        Ok(Self {
            bytes: hex::decode(cleaned)?,
        })
    }

    /// Returns the parsed bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl FromStr for FrameLiteral {
    type Err = FrameLiteralError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.is_empty() {
            return Err(FrameLiteralError::Empty);
        }

        let mut bytes = Vec::with_capacity(value.len());
        let mut chars = value.chars();
        while let Some(ch) = chars.next() {
            if ch != '\\' {
                let mut buffer = [0u8; 4];
                bytes.extend_from_slice(ch.encode_utf8(&mut buffer).as_bytes());
                continue;
            }
            let Some(escape) = chars.next() else {
                return Err(FrameLiteralError::DanglingEscape);
            };
            match escape {
                'r' => bytes.push(b'\r'),
                'n' => bytes.push(b'\n'),
                't' => bytes.push(b'\t'),
                '\\' => bytes.push(b'\\'),
                'x' => {
                    let digits: String = chars.by_ref().take(2).collect();
                    let parsed = (digits.len() == 2)
                        .then(|| u8::from_str_radix(&digits, 16).ok())
                        .flatten()
                        .ok_or(FrameLiteralError::InvalidHexEscape { value: digits })?;
                    bytes.push(parsed);
                }
                other => return Err(FrameLiteralError::UnsupportedEscape { escape: other }),
            }
        }

        Ok(Self { bytes })
    }
}
