//! Growable receive buffer with explicit read and write cursors.
//!
//! Uses `bytes::BytesMut` for amortized buffer management. The buffer tracks
//! three positions inside one contiguous allocation:
//!
//! ```text
//! [ consumed | unconsumed | granted ]
//!   ^read_pos             ^write position (len - granted)
//! ```
//!
//! New bytes land in a region handed out by [`RecvBuffer::grant`] and become
//! part of the unconsumed region on [`RecvBuffer::commit`]. The reader hands
//! the unconsumed region to a decoder, advances past decoded bytes with
//! [`RecvBuffer::consume`], and periodically calls [`RecvBuffer::reclaim`] so
//! the consumed prefix does not pin allocation space for the lifetime of the
//! stream.

use bytes::{Buf, BytesMut};

/// Receive buffer for accumulating partial reads.
///
/// Invariant: `read_pos <= write position <= capacity`. The unconsumed
/// region `[read_pos, write position)` is never reordered or dropped; it is
/// only extended by commits or shifted to the front by [`reclaim`].
///
/// [`reclaim`]: RecvBuffer::reclaim
#[derive(Debug)]
pub struct RecvBuffer {
    buf: BytesMut,
    /// Start of the unconsumed region within `buf`.
    read_pos: usize,
    /// Size of the outstanding writable grant at the tail of `buf`.
    granted: usize,
}

impl RecvBuffer {
    /// Create a buffer with the given initial capacity, cursors at zero.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
            read_pos: 0,
            granted: 0,
        }
    }

    /// Reserve and expose a writable region of exactly `n` bytes past the
    /// current write position, growing the allocation if it does not fit.
    ///
    /// Growing never moves unconsumed bytes relative to the read cursor.
    /// At most one grant may be outstanding; it must be resolved with
    /// [`commit`](RecvBuffer::commit) before the next `grant`.
    ///
    /// # Panics
    ///
    /// Panics if a grant is already outstanding.
    pub fn grant(&mut self, n: usize) -> &mut [u8] {
        assert!(self.granted == 0, "grant already outstanding");
        let start = self.buf.len();
        self.buf.resize(start + n, 0);
        self.granted = n;
        &mut self.buf[start..]
    }

    /// Keep the first `written` bytes of the outstanding grant as part of
    /// the unconsumed region and release the rest.
    ///
    /// `commit(0)` releases the whole grant; with no grant outstanding it is
    /// a no-op.
    ///
    /// # Panics
    ///
    /// Panics if `written` exceeds the granted region.
    pub fn commit(&mut self, written: usize) {
        assert!(written <= self.granted, "commit exceeds granted region");
        let end = self.buf.len() - (self.granted - written);
        self.buf.truncate(end);
        self.granted = 0;
    }

    /// The unconsumed region, read-only. Valid until the next mutating call.
    pub fn readable(&self) -> &[u8] {
        &self.buf[self.read_pos..self.buf.len() - self.granted]
    }

    /// Mark the first `n` bytes of the unconsumed region as processed.
    ///
    /// # Panics
    ///
    /// Panics if `n` exceeds the unconsumed region.
    pub fn consume(&mut self, n: usize) {
        assert!(n <= self.len(), "consume exceeds unconsumed region");
        self.read_pos += n;
    }

    /// Drop the consumed prefix so its space can be reused.
    ///
    /// The unconsumed region keeps its contents and order; only its offset
    /// within the allocation changes. `BytesMut` reuses the freed prefix on
    /// the next reservation, which bounds capacity growth for long-lived
    /// streams that decode frames promptly.
    pub fn reclaim(&mut self) {
        if self.read_pos > 0 {
            self.buf.advance(self.read_pos);
            self.read_pos = 0;
        }
    }

    /// Number of unconsumed bytes.
    pub fn len(&self) -> usize {
        self.buf.len() - self.granted - self.read_pos
    }

    /// Whether the unconsumed region is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Usable capacity of the current allocation.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }
}
