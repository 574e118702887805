//! Bundled frame decoders.
//!
//! The reader itself is format-agnostic; these are the concrete strategies
//! the crate ships: length-delimited binary envelopes and decimal
//! length-prefixed text frames. Custom formats implement
//! [`FrameDecoder`](framewise_core::FrameDecoder) directly.

pub mod envelope;
pub mod netstring;

pub use envelope::{encode_envelope, Envelope, EnvelopeDecodeError, EnvelopeDecoder};
pub use netstring::{NetstringDecodeError, NetstringDecoder};
