//! Decimal length-prefixed text framing: `<len>:<payload>`.
//!
//! A frame is an ASCII decimal payload length, a `:` separator, and exactly
//! that many payload bytes. `"5:hello"` carries the payload `hello`.

use bytes::Bytes;
use framewise_core::{Decoded, FrameDecoder};

/// Upper bound on the number of digits in a length prefix.
const MAX_LENGTH_DIGITS: usize = 10;

/// Default payload size limit.
pub const DEFAULT_MAX_PAYLOAD: usize = 16 * 1024 * 1024;

/// Decoder for `<len>:<payload>` framed streams, yielding payload bytes.
#[derive(Debug, Clone, Copy)]
pub struct NetstringDecoder {
    max_payload: usize,
}

impl NetstringDecoder {
    /// Create a decoder with the default payload limit.
    pub fn new() -> Self {
        Self {
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }

    /// Create a decoder with a custom payload limit.
    pub fn with_max_payload(max_payload: usize) -> Self {
        Self { max_payload }
    }
}

impl Default for NetstringDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Netstring framing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NetstringDecodeError {
    /// A byte that is neither a digit nor the separator where the length
    /// prefix was expected.
    #[error("invalid length prefix byte 0x{0:02x}")]
    InvalidPrefix(u8),

    /// The length prefix has more digits than any accepted payload needs.
    #[error("length prefix exceeds 10 digits")]
    LengthOverflow,

    /// The prefix advertises a payload larger than the configured limit.
    #[error("payload of {length} bytes exceeds limit of {max}")]
    Oversized { length: usize, max: usize },

    /// The stream ended inside a frame.
    #[error("stream ended inside a frame: {missing} more bytes required")]
    Truncated { missing: usize },
}

impl FrameDecoder for NetstringDecoder {
    type Frame = Bytes;
    type Error = NetstringDecodeError;

    fn decode(&mut self, src: &[u8], eof: bool) -> Result<Decoded<Bytes>, NetstringDecodeError> {
        if src.is_empty() {
            return Ok(Decoded::Incomplete);
        }

        let mut digits = 0;
        while digits < src.len() && src[digits].is_ascii_digit() {
            digits += 1;
            if digits > MAX_LENGTH_DIGITS {
                return Err(NetstringDecodeError::LengthOverflow);
            }
        }

        if digits == src.len() {
            // Still inside the length prefix.
            return if eof {
                Err(NetstringDecodeError::Truncated { missing: 1 })
            } else {
                Ok(Decoded::Incomplete)
            };
        }

        if digits == 0 || src[digits] != b':' {
            return Err(NetstringDecodeError::InvalidPrefix(src[digits]));
        }

        let mut length: usize = 0;
        for &b in &src[..digits] {
            length = length
                .checked_mul(10)
                .and_then(|l| l.checked_add((b - b'0') as usize))
                .ok_or(NetstringDecodeError::LengthOverflow)?;
        }
        if length > self.max_payload {
            return Err(NetstringDecodeError::Oversized {
                length,
                max: self.max_payload,
            });
        }

        let total = digits + 1 + length;
        if src.len() < total {
            return if eof {
                Err(NetstringDecodeError::Truncated {
                    missing: total - src.len(),
                })
            } else {
                Ok(Decoded::Incomplete)
            };
        }

        let payload = Bytes::copy_from_slice(&src[digits + 1..total]);
        Ok(Decoded::Frame {
            frame: payload,
            consumed: total,
        })
    }
}
