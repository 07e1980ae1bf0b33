//! Accumulating byte buffer for one HTTP message.
//!
//! The proxy never builds a structured request or response. It keeps the exact bytes
//! received so far and answers framing questions (where does the header end, how long
//! is the body, is it chunked) by scanning those bytes on demand. Rewrites splice the
//! buffer in place, so any offset computed before a rewrite is stale after it; nothing
//! here caches one.

use bytes::{Bytes, BytesMut};
use tracing::trace;

use crate::pump::RelaySender;
use crate::scan::{find_byte, find_end, find_end_ignore_case, splice_replace};

/// Terminator of the header block.
pub const HEADER_END: &[u8] = b"\r\n\r\n";

pub const HOST: &str = "Host";
pub const CONNECTION: &str = "Connection";
pub const CONTENT_LENGTH: &str = "Content-Length";
pub const TRANSFER_ENCODING: &str = "Transfer-Encoding";

/// The bytes of one HTTP message, request or response, as received so far.
///
/// In streaming mode every appended fragment is also pushed onto a relay queue, so a
/// concurrent writer can forward it before the message is complete.
#[derive(Debug, Default)]
pub struct MessageBuffer {
    bytes: BytesMut,
    relay: Option<RelaySender>,
}

impl MessageBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a buffer seeded with a first batch of bytes.
    pub fn with_first_batch(first_batch: &[u8]) -> Self {
        Self { bytes: BytesMut::from(first_batch), relay: None }
    }

    /// Creates an empty buffer in streaming mode.
    pub fn streaming(relay: RelaySender) -> Self {
        Self { bytes: BytesMut::new(), relay: Some(relay) }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    pub fn is_streaming(&self) -> bool {
        self.relay.is_some()
    }

    /// Leaves streaming mode. Dropping the returned sender completes the relay queue.
    pub fn detach_relay(&mut self) -> Option<RelaySender> {
        self.relay.take()
    }

    pub fn into_bytes(self) -> Bytes {
        self.bytes.freeze()
    }

    /// Appends newly received bytes, forwarding them to the relay queue in streaming mode.
    pub fn append(&mut self, fragment: Bytes) {
        self.bytes.extend_from_slice(&fragment);

        if let Some(relay) = &self.relay
            && !relay.send(fragment)
        {
            trace!("relay consumer gone, leaving streaming mode");
            self.relay = None;
        }
    }

    /// Offset immediately after the `\r\n\r\n` header terminator, which is where the body
    /// starts. `None` while the header block is incomplete.
    pub fn header_length(&self) -> Option<usize> {
        find_end(&self.bytes, HEADER_END, 0)
    }

    /// Raw value of header `name`, empty if absent.
    ///
    /// Only the header block is searched once it is complete, so a body that happens to
    /// contain `Name: ` never yields a value.
    pub fn header_value(&self, name: &str) -> &[u8] {
        match self.value_span(name) {
            Some((start, len)) => &self.bytes[start..start + len],
            None => &[],
        }
    }

    /// `Content-Length` as a number. Absent, non-numeric and overflowing values are all
    /// `None`: a bad length means "no fixed-length body", never an error.
    pub fn content_length(&self) -> Option<u64> {
        let value = self.header_value(CONTENT_LENGTH);
        if value.is_empty() {
            return None;
        }

        std::str::from_utf8(value).ok()?.trim().parse().ok()
    }

    pub fn transfer_encoding(&self) -> &[u8] {
        self.header_value(TRANSFER_ENCODING)
    }

    /// Whether the body uses chunked framing.
    pub fn is_chunked(&self) -> bool {
        let transfer_encoding = self.transfer_encoding();
        transfer_encoding.windows(b"chunked".len()).any(|window| window.eq_ignore_ascii_case(b"chunked"))
    }

    /// The chunk size line starting at `position`, without its `\r\n`.
    ///
    /// `None` until the `\r` ending the line has been received.
    pub fn chunk_size_token(&self, position: usize) -> Option<&[u8]> {
        let end = find_byte(&self.bytes, b'\r', position)?;
        Some(&self.bytes[position..end])
    }

    /// Replaces the value of header `name`. Returns `false` if the header isn't present,
    /// leaving the buffer untouched.
    pub fn replace_header_value(&mut self, name: &str, value: &str) -> bool {
        let Some((start, len)) = self.value_span(name) else {
            return false;
        };

        self.splice(start, len, value.as_bytes());
        true
    }

    /// Inserts a header line right before the blank line ending the header block.
    ///
    /// Returns `false` if the header block is not complete yet.
    pub fn insert_header_line(&mut self, line: &str) -> bool {
        let Some(header_length) = self.header_length() else {
            return false;
        };

        let mut inserted = Vec::with_capacity(line.len() + 2);
        inserted.extend_from_slice(b"\r\n");
        inserted.extend_from_slice(line.as_bytes());

        self.splice(header_length - HEADER_END.len(), 0, &inserted);
        true
    }

    /// Sets `Content-Length` to the number of body bytes currently buffered.
    ///
    /// Used after rewrites that change the body size. Does nothing when the message has no
    /// `Content-Length` header; returns whether the header was updated.
    pub fn recompute_content_length(&mut self) -> bool {
        let Some(header_length) = self.header_length() else {
            return false;
        };

        let body_length = self.bytes.len() - header_length;
        self.replace_header_value(CONTENT_LENGTH, &body_length.to_string())
    }

    /// Replaces `len` bytes at `start`, keeping everything around them in place.
    pub(crate) fn splice(&mut self, start: usize, len: usize, replacement: &[u8]) {
        self.bytes = splice_replace(&self.bytes, start, len, replacement);
    }

    /// Locates the value of header `name` as a `(start, len)` span.
    fn value_span(&self, name: &str) -> Option<(usize, usize)> {
        let name = name.trim_matches(|c| c == ':' || c == ' ');
        let needle = format!("{name}: ");
        let header_length = self.header_length();

        let mut cursor = 0;
        loop {
            let start = find_end_ignore_case(&self.bytes, needle.as_bytes(), cursor)?;
            if header_length.is_some_and(|header_length| start > header_length) {
                return None;
            }

            // the name must start a line, `X-Host: ` is not `Host: `
            let name_start = start - needle.len();
            if name_start > 0 && self.bytes[name_start - 1] == b'\n' {
                let end = find_byte(&self.bytes, b'\r', start)?;
                return Some((start, end - start));
            }

            cursor = start;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pump::relay_queue;

    const GET: &[u8] = b"GET / HTTP/1.1\r\nHost: x\r\nConnection: keep-alive\r\n\r\n";

    #[test]
    fn header_length_points_at_body() {
        let message = MessageBuffer::with_first_batch(b"HTTP/1.1 200 OK\r\nContent-Length: 4\r\n\r\nbody");
        let header_length = message.header_length().unwrap();
        assert_eq!(&message.as_bytes()[header_length..], b"body");
    }

    #[test]
    fn header_length_incomplete() {
        assert_eq!(MessageBuffer::new().header_length(), None);
        assert_eq!(MessageBuffer::with_first_batch(b"GET / HTTP/1.1\r\nHost: x\r\n\r").header_length(), None);
    }

    #[test]
    fn header_length_matches_first_terminator() {
        // for every split point k, the terminator placed at k is reported as k + 4
        let prefix = b"GET / HTTP/1.1\r\nA: b";
        for k in 17..=prefix.len() {
            let mut bytes = prefix[..k].to_vec();
            bytes.extend_from_slice(b"\r\n\r\nrest\r\n\r\n");
            let message = MessageBuffer::with_first_batch(&bytes);
            assert_eq!(message.header_length(), Some(k + 4));
        }
    }

    #[test]
    fn header_values() {
        let message = MessageBuffer::with_first_batch(GET);
        assert_eq!(message.header_value("Host"), b"x");
        assert_eq!(message.header_value("Host:"), b"x");
        assert_eq!(message.header_value("connection"), b"keep-alive");
        assert_eq!(message.header_value("Accept"), b"");
    }

    #[test]
    fn header_value_needs_line_start() {
        let message = MessageBuffer::with_first_batch(b"GET / HTTP/1.1\r\nX-Host: wrong\r\nHost: right\r\n\r\n");
        assert_eq!(message.header_value("Host"), b"right");
    }

    #[test]
    fn header_value_not_found_in_body() {
        let message = MessageBuffer::with_first_batch(b"POST / HTTP/1.1\r\nContent-Length: 17\r\n\r\nConnection: close");
        assert_eq!(message.header_value("Connection"), b"");
        assert_eq!(message.content_length(), Some(17));
    }

    #[test]
    fn content_length_parsing() {
        let length = |header: &[u8]| {
            let mut bytes = b"HTTP/1.1 200 OK\r\n".to_vec();
            bytes.extend_from_slice(header);
            bytes.extend_from_slice(b"\r\n\r\n");
            MessageBuffer::with_first_batch(&bytes).content_length()
        };

        assert_eq!(length(b"Content-Length: 42"), Some(42));
        assert_eq!(length(b"Content-Length: 0"), Some(0));
        assert_eq!(length(b"Content-Length: abc"), None);
        assert_eq!(length(b"Content-Length: -1"), None);
        assert_eq!(length(b"Content-Length: 99999999999999999999999"), None);
        assert_eq!(length(b"Content-Length: "), None);
        assert_eq!(length(b"Server: test"), None);
    }

    #[test]
    fn chunked_detection() {
        let chunked = |header: &[u8]| {
            let mut bytes = b"HTTP/1.1 200 OK\r\n".to_vec();
            bytes.extend_from_slice(header);
            bytes.extend_from_slice(b"\r\n\r\n");
            MessageBuffer::with_first_batch(&bytes).is_chunked()
        };

        assert!(chunked(b"Transfer-Encoding: chunked"));
        assert!(chunked(b"Transfer-Encoding: gzip, chunked"));
        assert!(chunked(b"transfer-encoding: Chunked"));
        assert!(!chunked(b"Transfer-Encoding: gzip"));
        assert!(!chunked(b"Content-Length: 7"));
    }

    #[test]
    fn chunk_size_token_until_cr() {
        let message = MessageBuffer::with_first_batch(b"1a;ext=1\r\n");
        assert_eq!(message.chunk_size_token(0), Some(&b"1a;ext=1"[..]));

        let partial = MessageBuffer::with_first_batch(b"1a");
        assert_eq!(partial.chunk_size_token(0), None);
    }

    #[test]
    fn replace_round_trip() {
        let mut message = MessageBuffer::with_first_batch(GET);
        assert!(message.replace_header_value("Host", "upstream.example.com"));
        assert_eq!(message.header_value("Host"), b"upstream.example.com");
        assert_eq!(message.as_bytes(), b"GET / HTTP/1.1\r\nHost: upstream.example.com\r\nConnection: keep-alive\r\n\r\n");

        assert!(message.replace_header_value("Connection", "close"));
        assert_eq!(message.header_value("Connection"), b"close");
        assert_eq!(message.as_bytes(), b"GET / HTTP/1.1\r\nHost: upstream.example.com\r\nConnection: close\r\n\r\n");
    }

    #[test]
    fn replace_preserves_bytes_outside_span() {
        let original = b"POST /a HTTP/1.1\r\nHost: old\r\nContent-Length: 5\r\n\r\nHost:";
        let mut message = MessageBuffer::with_first_batch(original);
        let start = find_end(original, b"Host: ", 0).unwrap();

        assert!(message.replace_header_value("Host", "new-host"));

        let bytes = message.as_bytes();
        assert_eq!(&bytes[..start], &original[..start]);
        assert_eq!(&bytes[start..start + 8], b"new-host");
        assert_eq!(&bytes[start + 8..], &original[start + 3..]);
    }

    #[test]
    fn replace_absent_header() {
        let mut message = MessageBuffer::with_first_batch(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
        assert!(!message.replace_header_value("Connection", "close"));
        assert_eq!(message.as_bytes(), b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
    }

    #[test]
    fn insert_header_before_blank_line() {
        let mut message = MessageBuffer::with_first_batch(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
        assert!(message.insert_header_line("Connection: close"));
        assert_eq!(message.as_bytes(), b"GET / HTTP/1.1\r\nHost: x\r\nConnection: close\r\n\r\n");
        assert_eq!(message.header_value("Connection"), b"close");
    }

    #[test]
    fn insert_header_keeps_body() {
        let mut message = MessageBuffer::with_first_batch(b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\nhi");
        assert!(message.insert_header_line("Connection: close"));
        assert_eq!(message.as_bytes(), b"POST / HTTP/1.1\r\nContent-Length: 2\r\nConnection: close\r\n\r\nhi");
    }

    #[test]
    fn insert_header_incomplete() {
        let mut message = MessageBuffer::with_first_batch(b"GET / HTTP/1.1\r\nHost: x\r\n");
        assert!(!message.insert_header_line("Connection: close"));
        assert_eq!(message.as_bytes(), b"GET / HTTP/1.1\r\nHost: x\r\n");
    }

    #[test]
    fn recompute_content_length_after_body_change() {
        let mut message = MessageBuffer::with_first_batch(b"POST / HTTP/1.1\r\nContent-Length: 2\r\n\r\nhello world");
        assert!(message.recompute_content_length());
        assert_eq!(message.content_length(), Some(11));
        assert_eq!(message.as_bytes(), b"POST / HTTP/1.1\r\nContent-Length: 11\r\n\r\nhello world");
    }

    #[test]
    fn recompute_content_length_without_header() {
        let mut message = MessageBuffer::with_first_batch(b"POST / HTTP/1.1\r\n\r\nhello");
        assert!(!message.recompute_content_length());
        assert_eq!(message.as_bytes(), b"POST / HTTP/1.1\r\n\r\nhello");
    }

    #[tokio::test]
    async fn streaming_append_feeds_relay() {
        let (sender, mut receiver) = relay_queue();
        let mut message = MessageBuffer::streaming(sender);

        message.append(Bytes::from_static(b"HTTP/1.1 200 OK\r\n"));
        message.append(Bytes::from_static(b"\r\n"));
        drop(message.detach_relay());

        assert_eq!(message.as_bytes(), b"HTTP/1.1 200 OK\r\n\r\n");
        assert_eq!(receiver.next().await, Some(Bytes::from_static(b"HTTP/1.1 200 OK\r\n")));
        assert_eq!(receiver.next().await, Some(Bytes::from_static(b"\r\n")));
        assert_eq!(receiver.next().await, None);
    }

    #[test]
    fn streaming_append_survives_gone_consumer() {
        let (sender, receiver) = relay_queue();
        drop(receiver);

        let mut message = MessageBuffer::streaming(sender);
        message.append(Bytes::from_static(b"data"));

        assert!(!message.is_streaming());
        assert_eq!(message.as_bytes(), b"data");
    }
}
