//! The frame decoder contract.
//!
//! A [`FrameDecoder`] is a pluggable strategy that turns the front of a byte
//! buffer into one decoded frame, or reports that more bytes are needed. The
//! reader owns the buffer; the decoder only sees a borrowed view and returns
//! how many bytes the frame occupied, so buffer cursors are advanced in
//! exactly one place.

/// Outcome of a single decode attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decoded<T> {
    /// A complete frame and the number of buffered bytes it occupied.
    Frame {
        frame: T,
        /// Prefix of the offered view consumed by this frame.
        /// Must not exceed the view's length.
        consumed: usize,
    },
    /// No complete frame yet; the reader should gather more bytes.
    Incomplete,
}

/// Strategy for extracting frames from an unconsumed byte region.
///
/// Implementations must be deterministic in the contents of `src` and must
/// not retain the view beyond the call. State that spans calls (for example
/// a partially parsed length prefix) belongs to the decoder value itself,
/// though most formats can re-parse from the buffered prefix on every
/// attempt.
///
/// # End of stream
///
/// `eof` is true once the byte source has permanently run dry. A decoder
/// that can never form another frame from the remaining bytes should then
/// either fail with a framing error (truncated frame, trailing garbage) or
/// return [`Decoded::Incomplete`] one final time, which the reader treats
/// as a clean end of the frame sequence.
pub trait FrameDecoder {
    /// The decoded frame type.
    type Frame;
    /// Framing error reported when the buffered bytes can never form a
    /// valid frame.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Attempt to decode one frame from the front of `src`.
    fn decode(&mut self, src: &[u8], eof: bool) -> Result<Decoded<Self::Frame>, Self::Error>;
}
