use std::cmp;
use std::io;
use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

use crate::framing::{BodyFramer, FrameOutcome};
use crate::message::MessageBuffer;
use crate::pump::queue::relay_queue;

/// Writes all of `buffer` to `stream` in slices of at most `io_chunk_size` bytes.
///
/// A short write is not an error: the loop continues from wherever the stream stopped.
/// A stream accepting zero bytes fails with [`ErrorKind::WriteZero`].
pub async fn write_all<W>(stream: &mut W, buffer: &[u8], io_chunk_size: usize) -> io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let mut offset = 0;
    while offset < buffer.len() {
        let end = cmp::min(offset + io_chunk_size, buffer.len());
        let written = stream.write(&buffer[offset..end]).await?;
        if written == 0 {
            return Err(io::Error::from(ErrorKind::WriteZero));
        }

        trace!(len = written, "wrote to stream");
        offset += written;
    }

    Ok(())
}

/// The result of a finished [`relay`].
///
/// Failures on either side are carried next to the bytes already read, so a caller can
/// still report a message that was cut short by an I/O error.
#[derive(Debug)]
pub struct Relayed {
    /// Every byte read from the source, whether or not the message completed
    pub message: MessageBuffer,
    /// How reading the message ended, or the error that stopped reading from the source
    pub outcome: io::Result<FrameOutcome>,
    /// Bytes written to the destination
    pub written: u64,
    /// The error that stopped writing to the destination
    pub write_error: Option<io::Error>,
}

/// Reads one message from `source` and forwards it to `dest` while it is still arriving.
///
/// Two halves run concurrently on the current task:
///
/// - the producer: `framer` reads the message into a streaming [`MessageBuffer`], which
///   pushes every fragment onto the relay queue as it is appended
/// - the consumer: drains the queue in order, writing each fragment to `dest`
///
/// The producer closes the queue when the message ends, and the relay returns only after
/// the consumer has drained it, so no write outlives the call. A failing client write
/// stops the consumer but not the producer, which still reads the message to its end.
pub async fn relay<R, W>(source: &mut R, dest: &mut W, framer: &mut BodyFramer, io_chunk_size: usize) -> Relayed
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let (sender, mut receiver) = relay_queue();

    let producer = async move {
        let mut message = MessageBuffer::streaming(sender);
        let result = framer.read_message(source, &mut message).await;

        // closing the queue lets the consumer finish once it has drained
        drop(message.detach_relay());
        (message, result)
    };

    let consumer = async move {
        let mut written = 0u64;
        while let Some(fragment) = receiver.next().await {
            if let Err(e) = write_all(dest, &fragment, io_chunk_size).await {
                return (written, Some(e));
            }
            written += fragment.len() as u64;
        }

        (written, dest.flush().await.err())
    };

    let ((message, outcome), (written, write_error)) = tokio::join!(producer, consumer);

    debug!(read = message.len(), written, ?outcome, ?write_error, "relay finished");
    Relayed { message, outcome, written, write_error }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio_test::io::Builder;

    const HEADER: &[u8] = b"HTTP/1.1 200 OK\r\nContent-Length: 10\r\n\r\n";

    /// Records every write call separately and accepts at most `max_write` bytes per call.
    #[derive(Debug, Default)]
    struct Recorder {
        writes: Vec<Vec<u8>>,
        max_write: Option<usize>,
    }

    impl AsyncWrite for Recorder {
        fn poll_write(mut self: Pin<&mut Self>, _cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
            let len = self.max_write.map_or(buf.len(), |max| cmp::min(max, buf.len()));
            self.writes.push(buf[..len].to_vec());
            Poll::Ready(Ok(len))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn write_all_in_slices() {
        let mut recorder = Recorder::default();
        write_all(&mut recorder, b"0123456789", 4).await.unwrap();

        assert_eq!(recorder.writes, vec![b"0123".to_vec(), b"4567".to_vec(), b"89".to_vec()]);
    }

    #[tokio::test]
    async fn write_all_continues_after_short_writes() {
        let mut recorder = Recorder { max_write: Some(3), ..Default::default() };
        write_all(&mut recorder, b"0123456789", 4).await.unwrap();

        assert_eq!(recorder.writes.concat(), b"0123456789");
        assert_eq!(recorder.writes[0], b"012");
        assert_eq!(recorder.writes[1], b"345");
    }

    #[tokio::test]
    async fn write_all_zero_write() {
        let mut recorder = Recorder { max_write: Some(0), ..Default::default() };
        let error = write_all(&mut recorder, b"data", 4).await.unwrap_err();

        assert_eq!(error.kind(), ErrorKind::WriteZero);
    }

    #[tokio::test]
    async fn relay_keeps_fragment_order() {
        let mut source = Builder::new()
            .read(HEADER)
            .wait(Duration::from_millis(50))
            .read(b"01234")
            .read(b"56789")
            .build();
        let mut dest = Recorder::default();
        let mut framer = BodyFramer::new(8 * 1024);

        let relayed = relay(&mut source, &mut dest, &mut framer, 8 * 1024).await;

        assert_eq!(relayed.outcome.unwrap(), FrameOutcome::Complete);
        assert!(relayed.write_error.is_none());
        assert_eq!(dest.writes, vec![HEADER.to_vec(), b"01234".to_vec(), b"56789".to_vec()]);
        assert_eq!(relayed.written, (HEADER.len() + 10) as u64);
        assert_eq!(relayed.message.as_bytes(), [HEADER, b"0123456789"].concat());
    }

    #[tokio::test]
    async fn relay_forwards_before_message_completes() {
        let (mut upstream, mut upstream_peer) = tokio::io::duplex(256);
        let (mut client, mut client_peer) = tokio::io::duplex(256);
        let mut framer = BodyFramer::new(64);

        let relaying = relay(&mut upstream, &mut client, &mut framer, 64);
        let driver = async {
            upstream_peer.write_all(HEADER).await.unwrap();

            // the header reaches the client while the body hasn't been sent yet
            let mut header = vec![0; HEADER.len()];
            client_peer.read_exact(&mut header).await.unwrap();
            assert_eq!(header, HEADER);

            upstream_peer.write_all(b"0123456789").await.unwrap();
            let mut body = vec![0; 10];
            client_peer.read_exact(&mut body).await.unwrap();
            assert_eq!(body, b"0123456789");
        };

        let (relayed, ()) = tokio::join!(relaying, driver);
        assert_eq!(relayed.outcome.unwrap(), FrameOutcome::Complete);
        assert_eq!(relayed.written, (HEADER.len() + 10) as u64);
    }

    #[tokio::test]
    async fn relay_truncated_message_still_drains() {
        let mut source = Builder::new().read(HEADER).read(b"012").build();
        let mut dest = Builder::new().write(HEADER).write(b"012").build();
        let mut framer = BodyFramer::new(8 * 1024);

        let relayed = relay(&mut source, &mut dest, &mut framer, 8 * 1024).await;

        assert!(matches!(relayed.outcome, Ok(FrameOutcome::Failed(_))));
        assert_eq!(relayed.message.as_bytes(), [HEADER, b"012"].concat());
    }

    #[tokio::test]
    async fn relay_keeps_message_after_client_write_error() {
        let mut source = Builder::new().read(HEADER).read(b"0123456789").build();
        let mut dest = Builder::new().write_error(io::Error::from(ErrorKind::BrokenPipe)).build();
        let mut framer = BodyFramer::new(8 * 1024);

        let relayed = relay(&mut source, &mut dest, &mut framer, 8 * 1024).await;

        assert_eq!(relayed.write_error.unwrap().kind(), ErrorKind::BrokenPipe);
        assert_eq!(relayed.written, 0);
        // the producer still read the message to its end
        assert_eq!(relayed.outcome.unwrap(), FrameOutcome::Complete);
        assert_eq!(relayed.message.as_bytes(), [HEADER, b"0123456789"].concat());
    }

    #[tokio::test]
    async fn relay_keeps_message_after_source_read_error() {
        let mut source =
            Builder::new().read(HEADER).read(b"012").read_error(io::Error::from(ErrorKind::ConnectionReset)).build();
        let mut dest = Builder::new().write(HEADER).write(b"012").build();
        let mut framer = BodyFramer::new(8 * 1024);

        let relayed = relay(&mut source, &mut dest, &mut framer, 8 * 1024).await;

        assert_eq!(relayed.outcome.unwrap_err().kind(), ErrorKind::ConnectionReset);
        assert!(relayed.write_error.is_none());
        assert_eq!(relayed.written, (HEADER.len() + 3) as u64);
        assert_eq!(relayed.message.as_bytes(), [HEADER, b"012"].concat());
    }
}
