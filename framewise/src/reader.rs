//! The framed reader: orchestrates the fill/decode loop.
//!
//! [`FramedReader`] pulls bytes from an [`AsyncRead`] source into a
//! [`RecvBuffer`], repeatedly offers the unconsumed region to a
//! [`FrameDecoder`], reclaims consumed space, and yields decoded frames one
//! at a time. Frames come out either through [`FramedReader::next_frame`]
//! or through the [`Stream`] impl.
//!
//! # Cancellation
//!
//! The only suspension point is the source's `poll_read`. Dropping the
//! `next_frame` future mid-read leaves the buffer consistent: an
//! outstanding write grant is resolved before every early return, so the
//! next call picks up exactly where the previous one left off.

use std::pin::Pin;
use std::task::{Context, Poll};

use futures::Stream;
use tokio::io::{AsyncRead, ReadBuf};

use framewise_core::{Decoded, FrameDecoder, FrameError, RecvBuffer};

/// Default initial capacity of the receive buffer.
pub const DEFAULT_BUFFER_CAPACITY: usize = 16 * 1024;

/// Default size of a single read from the byte source.
pub const DEFAULT_READ_CHUNK: usize = 16 * 1024;

/// Reader configuration.
///
/// Both knobs default to 16 KiB. `read_chunk` bounds how much is requested
/// from the byte source per read; `initial_capacity` only sets the starting
/// allocation, the buffer still grows on demand.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadConfig {
    pub initial_capacity: usize,
    pub read_chunk: usize,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_BUFFER_CAPACITY,
            read_chunk: DEFAULT_READ_CHUNK,
        }
    }
}

impl ReadConfig {
    /// Create a config with the default sizes.
    pub fn new() -> Self {
        Self::default()
    }
}

/// Incremental frame reader over an async byte source.
///
/// Owns its buffer exclusively; drive it from a single task. Frames are
/// produced in the exact order their bytes appear in the source stream.
///
/// # Example
///
/// ```ignore
/// use framewise::decoders::NetstringDecoder;
/// use framewise::FramedReader;
///
/// let mut reader = FramedReader::new(socket, NetstringDecoder::new());
/// while let Some(frame) = reader.next_frame().await? {
///     println!("{} byte frame", frame.len());
/// }
/// ```
pub struct FramedReader<R, D: FrameDecoder> {
    /// The byte source.
    source: R,
    /// The decoding strategy.
    decoder: D,
    /// Accumulated bytes not yet turned into frames.
    buffer: RecvBuffer,
    /// Bytes requested from the source per read.
    read_chunk: usize,
    /// Sticky: the source reported clean end-of-stream.
    eof: bool,
    /// A decode attempt may succeed without reading more. Set after every
    /// read that changed the picture, cleared when the decoder reports
    /// `Incomplete`.
    maybe_decodable: bool,
    /// Terminal: clean end reached or an error was propagated. Subsequent
    /// polls yield end-of-sequence.
    finished: bool,
}

impl<R, D: FrameDecoder> FramedReader<R, D> {
    /// Create a reader with the default [`ReadConfig`].
    pub fn new(source: R, decoder: D) -> Self {
        Self::with_config(source, decoder, ReadConfig::default())
    }

    /// Create a reader with an explicit configuration.
    ///
    /// # Panics
    ///
    /// Panics if `config.read_chunk` is zero, which would make every fill
    /// look like end-of-stream.
    pub fn with_config(source: R, decoder: D, config: ReadConfig) -> Self {
        assert!(config.read_chunk > 0, "read_chunk must be non-zero");
        Self {
            source,
            decoder,
            buffer: RecvBuffer::with_capacity(config.initial_capacity),
            read_chunk: config.read_chunk,
            eof: false,
            maybe_decodable: false,
            finished: false,
        }
    }

    /// Get a reference to the byte source.
    pub fn get_ref(&self) -> &R {
        &self.source
    }

    /// Get a mutable reference to the byte source.
    ///
    /// Reading from the source directly will corrupt the frame sequence.
    pub fn get_mut(&mut self) -> &mut R {
        &mut self.source
    }

    /// Consume the reader and return the byte source.
    ///
    /// Bytes already pulled into the internal buffer are discarded.
    pub fn into_inner(self) -> R {
        self.source
    }

    /// Get a reference to the decoder.
    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    /// Get a mutable reference to the decoder.
    pub fn decoder_mut(&mut self) -> &mut D {
        &mut self.decoder
    }

    /// The internal receive buffer, for diagnostics.
    pub fn buffer(&self) -> &RecvBuffer {
        &self.buffer
    }

    /// Whether the reader has reached its terminal state (clean end of
    /// stream, or a propagated error).
    pub fn is_finished(&self) -> bool {
        self.finished
    }
}

impl<R, D> FramedReader<R, D>
where
    R: AsyncRead + Unpin,
    D: FrameDecoder,
{
    /// Produce the next frame, or `None` at clean end-of-stream.
    ///
    /// Decoder failures and source read errors surface here exactly once;
    /// afterwards the reader is finished and keeps returning `Ok(None)`.
    pub async fn next_frame(&mut self) -> Result<Option<D::Frame>, FrameError<D::Error>> {
        std::future::poll_fn(|cx| self.poll_frame(cx)).await.transpose()
    }

    /// One produce-next-frame attempt. Each iteration of the loop either
    /// decodes, terminates, or performs exactly one read from the source.
    fn poll_frame(
        &mut self,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<D::Frame, FrameError<D::Error>>>> {
        loop {
            if self.finished {
                return Poll::Ready(None);
            }

            if self.maybe_decodable {
                let outcome = self.decoder.decode(self.buffer.readable(), self.eof);
                match outcome {
                    Ok(Decoded::Frame { frame, consumed }) => {
                        self.buffer.consume(consumed);
                        self.buffer.reclaim();
                        return Poll::Ready(Some(Ok(frame)));
                    }
                    Ok(Decoded::Incomplete) => {
                        // Reclaim after every attempt, successful or not, so
                        // unconsumed bytes never drift toward the end of a
                        // growing allocation.
                        self.buffer.reclaim();
                        self.maybe_decodable = false;
                    }
                    Err(e) => {
                        self.buffer.reclaim();
                        self.finished = true;
                        return Poll::Ready(Some(Err(FrameError::Framing(e))));
                    }
                }
            }

            if self.eof {
                self.finished = true;
                return Poll::Ready(None);
            }

            let filled = {
                let dst = self.buffer.grant(self.read_chunk);
                let mut read_buf = ReadBuf::new(dst);
                Pin::new(&mut self.source)
                    .poll_read(cx, &mut read_buf)
                    .map_ok(|()| read_buf.filled().len())
            };

            match filled {
                Poll::Ready(Ok(0)) => {
                    self.buffer.commit(0);
                    tracing::trace!("byte source reached end of stream");
                    // One final decode attempt with the end-of-stream flag
                    // set, so length-implicit formats can finalize.
                    self.eof = true;
                    self.maybe_decodable = true;
                }
                Poll::Ready(Ok(n)) => {
                    self.buffer.commit(n);
                    tracing::trace!(bytes = n, buffered = self.buffer.len(), "filled receive buffer");
                    self.maybe_decodable = true;
                }
                Poll::Ready(Err(e)) => {
                    self.buffer.commit(0);
                    // A read error is not end-of-stream; the reader is
                    // finished but `eof` stays unset.
                    self.finished = true;
                    return Poll::Ready(Some(Err(FrameError::Source(e))));
                }
                Poll::Pending => {
                    self.buffer.commit(0);
                    return Poll::Pending;
                }
            }
        }
    }
}

impl<R, D: FrameDecoder> Unpin for FramedReader<R, D> where R: Unpin {}

/// Lazy, single-pass sequence of frames. The stream ends exactly when the
/// reader reaches clean end-of-stream; failures surface as `Some(Err(_))`
/// from the corresponding poll rather than silently ending the sequence.
impl<R, D> Stream for FramedReader<R, D>
where
    R: AsyncRead + Unpin,
    D: FrameDecoder,
{
    type Item = Result<D::Frame, FrameError<D::Error>>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.get_mut().poll_frame(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decoders::{encode_envelope, EnvelopeDecoder, NetstringDecoder};
    use crate::decoders::netstring::NetstringDecodeError;

    use std::collections::VecDeque;
    use std::io;

    use bytes::Bytes;
    use futures::StreamExt;

    /// Scripted byte source: serves the given chunks one per read, then
    /// reports end-of-stream forever. Chunks larger than the offered region
    /// are served across multiple reads.
    struct ChunkReader {
        chunks: VecDeque<io::Result<Bytes>>,
        eof_reads: usize,
    }

    impl ChunkReader {
        fn new(chunks: Vec<io::Result<Bytes>>) -> Self {
            Self {
                chunks: chunks.into(),
                eof_reads: 0,
            }
        }

        fn data<T: AsRef<[u8]>>(chunks: &[T]) -> Self {
            Self::new(
                chunks
                    .iter()
                    .map(|c| Ok(Bytes::copy_from_slice(c.as_ref())))
                    .collect(),
            )
        }
    }

    impl AsyncRead for ChunkReader {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            match this.chunks.pop_front() {
                None => {
                    this.eof_reads += 1;
                    Poll::Ready(Ok(()))
                }
                Some(Err(e)) => Poll::Ready(Err(e)),
                Some(Ok(mut chunk)) => {
                    let n = chunk.len().min(buf.remaining());
                    buf.put_slice(&chunk[..n]);
                    if n < chunk.len() {
                        this.chunks.push_front(Ok(chunk.split_off(n)));
                    }
                    Poll::Ready(Ok(()))
                }
            }
        }
    }

    /// Wraps a source and returns `Pending` before every actual read, to
    /// exercise the suspension path.
    struct YieldingReader<R>(R, bool);

    impl<R> YieldingReader<R> {
        fn new(inner: R) -> Self {
            Self(inner, true)
        }
    }

    impl<R: AsyncRead + Unpin> AsyncRead for YieldingReader<R> {
        fn poll_read(
            self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            let this = self.get_mut();
            if this.1 {
                this.1 = false;
                cx.waker().wake_by_ref();
                return Poll::Pending;
            }
            this.1 = true;
            Pin::new(&mut this.0).poll_read(cx, buf)
        }
    }

    async fn drain<R, D>(reader: &mut FramedReader<R, D>) -> Vec<D::Frame>
    where
        R: AsyncRead + Unpin,
        D: FrameDecoder,
    {
        let mut frames = Vec::new();
        while let Some(frame) = reader.next_frame().await.unwrap() {
            frames.push(frame);
        }
        frames
    }

    #[tokio::test]
    async fn test_netstring_frames_across_chunk_boundary() {
        // "5:hello4:joe!" delivered as "5:he" + "llo4:joe!".
        let source = ChunkReader::data(&["5:he", "llo4:joe!"]);
        let mut reader = FramedReader::new(source, NetstringDecoder::new());

        assert_eq!(
            reader.next_frame().await.unwrap().as_deref(),
            Some(&b"hello"[..])
        );
        assert_eq!(
            reader.next_frame().await.unwrap().as_deref(),
            Some(&b"joe!"[..])
        );
        assert_eq!(reader.next_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_chunking_is_transparent_to_decoding() {
        let stream: Vec<u8> = (0..10)
            .flat_map(|i| format!("7:payld{i:02}").into_bytes())
            .collect();

        let single = ChunkReader::data(&[&stream[..]]);
        let mut reader = FramedReader::new(single, NetstringDecoder::new());
        let whole = drain(&mut reader).await;
        assert_eq!(whole.len(), 10);

        let byte_chunks: Vec<&[u8]> = stream.chunks(1).collect();
        let trickle = ChunkReader::data(&byte_chunks);
        let mut reader = FramedReader::new(trickle, NetstringDecoder::new());
        assert_eq!(drain(&mut reader).await, whole);

        let odd_chunks: Vec<&[u8]> = stream.chunks(3).collect();
        let lumpy = ChunkReader::data(&odd_chunks);
        let mut reader = FramedReader::new(lumpy, NetstringDecoder::new());
        assert_eq!(drain(&mut reader).await, whole);
    }

    #[tokio::test]
    async fn test_all_frames_in_order_then_clean_end() {
        let mut stream = Vec::new();
        for i in 0..50 {
            let payload = format!("message-{i}");
            stream.extend_from_slice(format!("{}:{}", payload.len(), payload).as_bytes());
        }

        let source = ChunkReader::data(&[&stream[..]]);
        let mut reader = FramedReader::new(source, NetstringDecoder::new());
        let frames = drain(&mut reader).await;

        assert_eq!(frames.len(), 50);
        for (i, frame) in frames.iter().enumerate() {
            assert_eq!(frame, &format!("message-{i}"));
        }
        assert!(reader.is_finished());
        // Terminal signal is stable.
        assert_eq!(reader.next_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_empty_stream_ends_immediately() {
        let source = ChunkReader::data::<&[u8]>(&[]);
        let mut reader = FramedReader::new(source, NetstringDecoder::new());

        assert_eq!(reader.next_frame().await.unwrap(), None);
        assert_eq!(reader.next_frame().await.unwrap(), None);
        assert!(reader.is_finished());
    }

    #[tokio::test]
    async fn test_truncated_frame_fails_instead_of_silently_ending() {
        // Length prefix promises 3 bytes; the stream ends after 2.
        let source = ChunkReader::data(&["3:ab"]);
        let mut reader = FramedReader::new(source, NetstringDecoder::new());

        let err = reader.next_frame().await.unwrap_err();
        match err {
            FrameError::Framing(NetstringDecodeError::Truncated { missing }) => {
                assert_eq!(missing, 1);
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Propagated once; afterwards the sequence is over.
        assert_eq!(reader.next_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_decoder_failure_after_exactly_one_eof_read() {
        #[derive(Debug, thiserror::Error)]
        #[error("stream ended before a frame could be formed")]
        struct NeverFramed;

        struct EofFailDecoder;

        impl FrameDecoder for EofFailDecoder {
            type Frame = ();
            type Error = NeverFramed;

            fn decode(&mut self, _src: &[u8], eof: bool) -> Result<Decoded<()>, NeverFramed> {
                if eof { Err(NeverFramed) } else { Ok(Decoded::Incomplete) }
            }
        }

        let source = ChunkReader::data(&["abc"]);
        let mut reader = FramedReader::new(source, EofFailDecoder);

        let err = reader.next_frame().await.unwrap_err();
        assert!(matches!(err, FrameError::Framing(NeverFramed)));
        assert_eq!(reader.get_ref().eof_reads, 1);
        assert_eq!(reader.next_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_source_error_is_not_end_of_stream() {
        let source = ChunkReader::new(vec![
            Ok(Bytes::from_static(b"5:he")),
            Err(io::Error::new(io::ErrorKind::ConnectionReset, "peer reset")),
        ]);
        let mut reader = FramedReader::new(source, NetstringDecoder::new());

        let err = reader.next_frame().await.unwrap_err();
        match err {
            FrameError::Source(e) => assert_eq!(e.kind(), io::ErrorKind::ConnectionReset),
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(reader.is_finished());
        assert_eq!(reader.next_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_envelope_frames_fragmented_across_header() {
        let mut stream = encode_envelope(0x00, b"first payload").to_vec();
        stream.extend_from_slice(&encode_envelope(0x01, b"second"));

        // Split mid-header and mid-payload.
        let chunks = [&stream[..3], &stream[3..9], &stream[9..]];
        let source = ChunkReader::data(&chunks);
        let mut reader = FramedReader::new(source, EnvelopeDecoder::new());

        let first = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(first.flags, 0x00);
        assert_eq!(&first.payload[..], b"first payload");

        let second = reader.next_frame().await.unwrap().unwrap();
        assert_eq!(second.flags, 0x01);
        assert_eq!(&second.payload[..], b"second");

        assert_eq!(reader.next_frame().await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_stream_adapter_yields_frames_then_none() {
        let source = ChunkReader::data(&["2:ab", "2:cd"]);
        let mut reader = FramedReader::new(source, NetstringDecoder::new());

        assert_eq!(&reader.next().await.unwrap().unwrap()[..], b"ab");
        assert_eq!(&reader.next().await.unwrap().unwrap()[..], b"cd");
        assert!(reader.next().await.is_none());
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn test_stream_adapter_surfaces_errors() {
        let source = ChunkReader::data(&["3:ab"]);
        let mut reader = FramedReader::new(source, NetstringDecoder::new());

        assert!(reader.next().await.unwrap().is_err());
        assert!(reader.next().await.is_none());
    }

    #[tokio::test]
    async fn test_pending_source_resumes_cleanly() {
        let inner = ChunkReader::data(&["5:he", "llo4:joe!"]);
        let source = YieldingReader::new(inner);
        let mut reader = FramedReader::new(source, NetstringDecoder::new());

        let frames = drain(&mut reader).await;
        assert_eq!(frames, vec![Bytes::from_static(b"hello"), Bytes::from_static(b"joe!")]);
    }

    #[tokio::test]
    async fn test_buffer_capacity_stays_bounded() {
        let mut stream = Vec::new();
        for _ in 0..1_000 {
            stream.extend_from_slice(b"8:abcdefgh");
        }

        let source = ChunkReader::data(&[&stream[..]]);
        let config = ReadConfig {
            initial_capacity: 64,
            read_chunk: 32,
        };
        let mut reader = FramedReader::with_config(source, NetstringDecoder::new(), config);

        let frames = drain(&mut reader).await;
        assert_eq!(frames.len(), 1_000);
        assert!(
            reader.buffer().capacity() <= 256,
            "buffer grew to {} bytes",
            reader.buffer().capacity()
        );
    }

    #[test]
    #[should_panic(expected = "read_chunk must be non-zero")]
    fn test_zero_read_chunk_is_rejected() {
        let source = ChunkReader::data::<&[u8]>(&[]);
        let config = ReadConfig {
            initial_capacity: 16,
            read_chunk: 0,
        };
        let _ = FramedReader::with_config(source, NetstringDecoder::new(), config);
    }
}
