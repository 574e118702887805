//! Length-delimited envelope framing.
//!
//! Wire format:
//!
//! ```text
//! [flags:1][length:4 BE][payload:length]
//! ```
//!
//! The flags byte is carried through untouched; its meaning (compression,
//! end-of-stream markers and so on) belongs to the application protocol.

use bytes::Bytes;
use framewise_core::{Decoded, FrameDecoder};

/// Envelope header size (flags + length).
pub const ENVELOPE_HEADER_SIZE: usize = 5;

/// Default payload size limit.
pub const DEFAULT_MAX_PAYLOAD: u32 = 16 * 1024 * 1024;

/// One decoded envelope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    pub flags: u8,
    pub payload: Bytes,
}

/// Decoder for envelope-framed streams.
///
/// The payload limit is checked as soon as the header is parsed, before any
/// payload bytes are buffered, so a corrupt length field cannot drive the
/// receive buffer to the advertised size.
#[derive(Debug, Clone, Copy)]
pub struct EnvelopeDecoder {
    max_payload: u32,
}

impl EnvelopeDecoder {
    /// Create a decoder with the default payload limit.
    pub fn new() -> Self {
        Self {
            max_payload: DEFAULT_MAX_PAYLOAD,
        }
    }

    /// Create a decoder with a custom payload limit.
    pub fn with_max_payload(max_payload: u32) -> Self {
        Self { max_payload }
    }
}

impl Default for EnvelopeDecoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Envelope framing errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EnvelopeDecodeError {
    /// The header advertises a payload larger than the configured limit.
    #[error("envelope payload of {length} bytes exceeds limit of {max}")]
    Oversized { length: u32, max: u32 },

    /// The stream ended inside an envelope.
    #[error("stream ended inside an envelope: {missing} more bytes required")]
    Truncated { missing: usize },
}

impl FrameDecoder for EnvelopeDecoder {
    type Frame = Envelope;
    type Error = EnvelopeDecodeError;

    fn decode(&mut self, src: &[u8], eof: bool) -> Result<Decoded<Envelope>, EnvelopeDecodeError> {
        if src.len() < ENVELOPE_HEADER_SIZE {
            return if eof && !src.is_empty() {
                Err(EnvelopeDecodeError::Truncated {
                    missing: ENVELOPE_HEADER_SIZE - src.len(),
                })
            } else {
                Ok(Decoded::Incomplete)
            };
        }

        let flags = src[0];
        let length = u32::from_be_bytes([src[1], src[2], src[3], src[4]]);
        if length > self.max_payload {
            return Err(EnvelopeDecodeError::Oversized {
                length,
                max: self.max_payload,
            });
        }

        let total = ENVELOPE_HEADER_SIZE + length as usize;
        if src.len() < total {
            return if eof {
                Err(EnvelopeDecodeError::Truncated {
                    missing: total - src.len(),
                })
            } else {
                Ok(Decoded::Incomplete)
            };
        }

        let payload = Bytes::copy_from_slice(&src[ENVELOPE_HEADER_SIZE..total]);
        Ok(Decoded::Frame {
            frame: Envelope { flags, payload },
            consumed: total,
        })
    }
}

/// Wrap a payload in an envelope, for the write side and for tests.
pub fn encode_envelope(flags: u8, payload: &[u8]) -> Bytes {
    let mut frame = Vec::with_capacity(ENVELOPE_HEADER_SIZE + payload.len());
    frame.push(flags);
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(payload);
    Bytes::from(frame)
}
