use std::io;
use std::io::ErrorKind;

use bytes::{BufMut, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};
use tracing::{debug, trace};

use crate::error::FramingError;
use crate::framing::chunked::{chunk_end, parse_chunk_size};
use crate::message::{HEADER_END, MessageBuffer};
use crate::scan::{find_end, take};
use FramingState::*;

/// How the body of a message is delimited, decided once its header is complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    /// `Content-Length` bytes follow the header
    FixedLength(u64),
    /// `Transfer-Encoding: chunked`
    Chunked,
    /// The message ends with its header
    NoBody,
}

/// How reading a message ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// The whole message, as framed by its header, is in the buffer
    Complete,
    /// The peer stopped early or the framing was malformed; the buffer holds what arrived
    Failed(FramingError),
    /// The peer closed before a complete header arrived
    NoHeader,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FramingState {
    /// Waiting for `\r\n\r\n`
    AwaitingHeader,
    /// Reading until the buffer holds `target` bytes
    FixedLength { body_start: usize, target: usize },
    /// Reading the chunk size line starting at `index`
    ChunkSize { index: usize },
    /// Reading the data of a chunk ending at `target`
    ChunkData { target: usize },
    /// Last chunk seen at `index`, reading until the trailer section ends
    Trailer { index: usize },
    /// Message fully read
    Complete,
    /// Message ended early
    Failed(FramingError),
    /// Peer closed before the header completed
    NoHeader,
}

/// Reads one HTTP message from a stream into a [`MessageBuffer`], stopping exactly where
/// the message ends according to its own framing.
///
/// The framer drives the reads itself: it reads in slices of at most `io_chunk_size`
/// bytes and inspects the accumulated buffer after each one. A zero-length read means the
/// peer closed, which ends the message early. No data past the framed end is requested.
#[derive(Debug)]
pub struct BodyFramer {
    io_chunk_size: usize,
    read_buf: BytesMut,
    state: FramingState,
    body_kind: Option<BodyKind>,
}

impl BodyFramer {
    /// Creates a framer reading at most `io_chunk_size` bytes per read.
    ///
    /// # Panics
    ///
    /// Panics if `io_chunk_size` is zero.
    pub fn new(io_chunk_size: usize) -> Self {
        assert!(io_chunk_size > 0, "io chunk size must be greater than zero");
        Self { io_chunk_size, read_buf: BytesMut::new(), state: AwaitingHeader, body_kind: None }
    }

    /// The body framing chosen for the last message, once its header was complete.
    pub fn body_kind(&self) -> Option<BodyKind> {
        self.body_kind
    }

    /// Reads a whole message from `stream`, appending everything read to `message`.
    ///
    /// Early peer closes and malformed chunk sizes are reported through the outcome; only
    /// I/O errors from the stream itself are returned as `Err`.
    pub async fn read_message<R>(&mut self, stream: &mut R, message: &mut MessageBuffer) -> io::Result<FrameOutcome>
    where
        R: AsyncRead + Unpin,
    {
        self.state = AwaitingHeader;
        self.body_kind = None;

        loop {
            let next = match self.state.clone() {
                AwaitingHeader => self.read_header(stream, message).await?,
                FixedLength { body_start, target } => self.read_fixed_length(stream, message, body_start, target).await?,
                ChunkSize { index } => self.read_chunk_size(stream, message, index).await?,
                ChunkData { target } => self.read_chunk_data(stream, message, target).await?,
                Trailer { index } => self.read_trailer(stream, message, index).await?,
                Complete => return Ok(FrameOutcome::Complete),
                Failed(e) => return Ok(FrameOutcome::Failed(e)),
                NoHeader => return Ok(FrameOutcome::NoHeader),
            };

            if next != self.state {
                trace!(from = ?self.state, to = ?next, "framing state changed");
            }
            self.state = next;
        }
    }

    async fn read_header<R>(&mut self, stream: &mut R, message: &mut MessageBuffer) -> io::Result<FramingState>
    where
        R: AsyncRead + Unpin,
    {
        if let Some(header_length) = message.header_length() {
            return Ok(self.select_body(message, header_length));
        }

        if self.fill(stream, message).await? == 0 {
            return Ok(NoHeader);
        }

        Ok(AwaitingHeader)
    }

    /// Picks the body framing from a complete header. Chunked encoding wins over
    /// `Content-Length`; a missing or unusable length means no body.
    fn select_body(&mut self, message: &MessageBuffer, header_length: usize) -> FramingState {
        if message.is_chunked() {
            self.body_kind = Some(BodyKind::Chunked);
            return ChunkSize { index: header_length };
        }

        let target = message
            .content_length()
            .and_then(|length| Some((length, header_length.checked_add(usize::try_from(length).ok()?)?)));

        match target {
            Some((length, target)) => {
                self.body_kind = Some(BodyKind::FixedLength(length));
                FixedLength { body_start: header_length, target }
            }
            None => {
                self.body_kind = Some(BodyKind::NoBody);
                Complete
            }
        }
    }

    async fn read_fixed_length<R>(
        &mut self,
        stream: &mut R,
        message: &mut MessageBuffer,
        body_start: usize,
        target: usize,
    ) -> io::Result<FramingState>
    where
        R: AsyncRead + Unpin,
    {
        if message.len() >= target {
            return Ok(Complete);
        }

        if self.fill(stream, message).await? == 0 {
            let received = message.len() - body_start;
            let expected = target - body_start;
            return Ok(Failed(FramingError::TruncatedBody { received, expected }));
        }

        Ok(FixedLength { body_start, target })
    }

    async fn read_chunk_size<R>(&mut self, stream: &mut R, message: &mut MessageBuffer, index: usize) -> io::Result<FramingState>
    where
        R: AsyncRead + Unpin,
    {
        let Some(token) = message.chunk_size_token(index) else {
            if self.fill(stream, message).await? == 0 {
                return Ok(Failed(FramingError::TruncatedChunkSize { index }));
            }
            return Ok(ChunkSize { index });
        };

        let Some(size) = parse_chunk_size(token) else {
            return Ok(Failed(FramingError::invalid_chunk_size(token)));
        };

        if size == 0 {
            return Ok(Trailer { index });
        }

        match chunk_end(index, token.len(), size) {
            Some(target) => {
                trace!(index, size, "read chunk size");
                Ok(ChunkData { target })
            }
            None => Ok(Failed(FramingError::invalid_chunk_size(token))),
        }
    }

    async fn read_chunk_data<R>(&mut self, stream: &mut R, message: &mut MessageBuffer, target: usize) -> io::Result<FramingState>
    where
        R: AsyncRead + Unpin,
    {
        if message.len() >= target {
            return Ok(ChunkSize { index: target });
        }

        if self.fill(stream, message).await? == 0 {
            return Ok(Failed(FramingError::TruncatedChunk { end: target }));
        }

        Ok(ChunkData { target })
    }

    async fn read_trailer<R>(&mut self, stream: &mut R, message: &mut MessageBuffer, index: usize) -> io::Result<FramingState>
    where
        R: AsyncRead + Unpin,
    {
        if find_end(message.as_bytes(), HEADER_END, index).is_some() {
            trace!("finished reading chunked data");
            return Ok(Complete);
        }

        if self.fill(stream, message).await? == 0 {
            return Ok(Failed(FramingError::TruncatedTrailer));
        }

        Ok(Trailer { index })
    }

    /// Performs one read of at most `io_chunk_size` bytes, appending what arrived.
    ///
    /// An `UnexpectedEof` read error counts as the peer closing: TLS streams report a
    /// close without `close_notify` that way.
    async fn fill<R>(&mut self, stream: &mut R, message: &mut MessageBuffer) -> io::Result<usize>
    where
        R: AsyncRead + Unpin,
    {
        self.read_buf.reserve(self.io_chunk_size);
        let read = match stream.read_buf(&mut (&mut self.read_buf).limit(self.io_chunk_size)).await {
            Ok(read) => read,
            Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
                debug!(cause = %e, "stream ended without a clean close");
                0
            }
            Err(e) => return Err(e),
        };
        trace!(len = read, "read from stream");

        if read > 0 {
            message.append(take(&mut self.read_buf, read));
        }

        Ok(read)
    }
}
