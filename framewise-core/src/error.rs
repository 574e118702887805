//! Frame reading errors.
//!
//! All failures surface synchronously to the caller of the current frame
//! production; nothing is swallowed or retried. Clean end-of-stream is not
//! an error and is reported as the absence of a frame instead.
//!
//! Buffer allocation failure has no arm here: growing the receive buffer
//! goes through the global allocator, which aborts on out-of-memory.

use std::io;

/// Error produced while reading the next frame.
///
/// Generic over the decoder's own framing error so callers can distinguish
/// "frame produced", "stream ended cleanly", and "failed with which kind".
#[derive(Debug, thiserror::Error)]
pub enum FrameError<E> {
    /// The byte source failed before reaching clean end-of-stream.
    ///
    /// Distinct from EOF: the stream is considered unusable afterwards and
    /// the reader will not read from the source again.
    #[error("byte source read failed: {0}")]
    Source(#[from] io::Error),

    /// The decoder determined the buffered bytes can never form a valid
    /// frame. The reader does not resynchronize.
    #[error("frame decoding failed: {0}")]
    Framing(E),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("bad magic byte")]
    struct BadMagic;

    #[test]
    fn test_source_error_display() {
        let err: FrameError<BadMagic> =
            io::Error::new(io::ErrorKind::ConnectionReset, "peer reset").into();
        assert_eq!(err.to_string(), "byte source read failed: peer reset");
    }

    #[test]
    fn test_framing_error_display() {
        let err: FrameError<BadMagic> = FrameError::Framing(BadMagic);
        assert_eq!(err.to_string(), "frame decoding failed: bad magic byte");
    }
}
