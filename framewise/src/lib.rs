//! # framewise
//!
//! Incremental frame extraction from async byte sources.
//!
//! A [`FramedReader`] turns any [`tokio::io::AsyncRead`] into a sequence of
//! decoded frames without knowing in advance how many bytes a frame needs
//! or when more data will arrive. Bytes are buffered as they come in,
//! offered to a pluggable [`FrameDecoder`] that may answer "not enough data
//! yet," and reclaimed once decoded, so long-lived streams do not grow the
//! buffer without bound.
//!
//! ## Reading frames
//!
//! ```ignore
//! use framewise::decoders::EnvelopeDecoder;
//! use framewise::FramedReader;
//! use futures::StreamExt;
//!
//! let mut reader = FramedReader::new(socket, EnvelopeDecoder::new());
//!
//! // Pull one at a time...
//! while let Some(envelope) = reader.next_frame().await? {
//!     handle(envelope);
//! }
//!
//! // ...or drive it as a stream.
//! let mut reader = FramedReader::new(socket, EnvelopeDecoder::new());
//! while let Some(result) = reader.next().await {
//!     handle(result?);
//! }
//! ```
//!
//! ## Custom formats
//!
//! Implement [`FrameDecoder`] for your wire format: the decoder is handed
//! the buffered bytes plus an end-of-stream flag and either returns one
//! frame together with the number of bytes it occupied, or asks for more
//! data. See the [`decoders`] module for two complete implementations.

pub mod decoders;
pub mod reader;

// Re-export several crates
pub use bytes;
pub use futures;

pub use framewise_core::{Decoded, FrameDecoder, FrameError, RecvBuffer};
pub use reader::{FramedReader, ReadConfig};

pub mod prelude {
    //! A prelude providing the most common types.
    pub use crate::reader::{FramedReader, ReadConfig};
    pub use framewise_core::{Decoded, FrameDecoder, FrameError};
}
