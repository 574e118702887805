//! Core building blocks for the `framewise` incremental frame reader.
//!
//! This crate provides the pieces that are independent of any byte source
//! or wire format:
//!
//! - [`RecvBuffer`]: growable receive buffer with explicit read/write cursors
//! - [`FrameDecoder`]: the pluggable decoding contract
//! - [`FrameError`]: the failure taxonomy for frame production
//!
//! The read loop that drives these lives in the `framewise` crate.

mod buffer;
mod decode;
mod error;

pub use buffer::*;
pub use decode::*;
pub use error::*;
