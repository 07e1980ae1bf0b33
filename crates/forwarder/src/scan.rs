//! Byte sequence search and splice helpers.
//!
//! Everything above this module works on raw HTTP bytes instead of a parsed message, so
//! header lookups, framing and rewrites all come down to the few primitives here:
//!
//! - [`find_end`]: locate a short token such as `\r\n\r\n` or `Host: `
//! - [`find_byte`]: locate the next single delimiter byte, usually `\r`
//! - [`splice_replace`]: replace a span of bytes, keeping everything around it intact
//! - [`take`]: detach the bytes produced by a read without copying them

use bytes::{BufMut, Bytes, BytesMut};

/// Returns the offset immediately after the first occurrence of `needle` in `haystack`,
/// searching from `start`.
///
/// The search is a plain left-to-right scan. The needles used by the proxy are short
/// fixed tokens, so the `O(n * m)` worst case doesn't matter in practice.
///
/// Returns `None` if the needle is empty, longer than what remains of the haystack,
/// or never matched.
pub fn find_end(haystack: &[u8], needle: &[u8], start: usize) -> Option<usize> {
    let remaining = haystack.get(start..)?;
    if needle.is_empty() || needle.len() > remaining.len() {
        return None;
    }

    remaining.windows(needle.len()).position(|window| window == needle).map(|pos| start + pos + needle.len())
}

/// Same as [`find_end`], but ASCII letters of the needle match either case.
///
/// Header names are case-insensitive on the wire, so lookups by name go through here.
pub fn find_end_ignore_case(haystack: &[u8], needle: &[u8], start: usize) -> Option<usize> {
    let remaining = haystack.get(start..)?;
    if needle.is_empty() || needle.len() > remaining.len() {
        return None;
    }

    remaining
        .windows(needle.len())
        .position(|window| window.eq_ignore_ascii_case(needle))
        .map(|pos| start + pos + needle.len())
}

/// Returns the offset of the next `byte` at or after `start`.
pub fn find_byte(haystack: &[u8], byte: u8, start: usize) -> Option<usize> {
    haystack.get(start..)?.iter().position(|&b| b == byte).map(|pos| start + pos)
}

/// Returns a new buffer equal to `buffer` with the `len` bytes at `start` replaced by
/// `replacement`.
///
/// The replacement may be shorter or longer than the span it replaces. Bytes before
/// `start` and after `start + len` are copied unchanged and in order.
///
/// # Panics
///
/// Panics if `start + len` is past the end of `buffer`.
pub fn splice_replace(buffer: &[u8], start: usize, len: usize, replacement: &[u8]) -> BytesMut {
    let end = start + len;
    assert!(end <= buffer.len(), "splice span {start}..{end} out of range for buffer of {} bytes", buffer.len());

    let mut result = BytesMut::with_capacity(buffer.len() - len + replacement.len());
    result.put_slice(&buffer[..start]);
    result.put_slice(replacement);
    result.put_slice(&buffer[end..]);
    result
}

/// Detaches the first `count` bytes of `buffer`.
///
/// The bytes are split off the front of the buffer rather than copied, so a read buffer
/// can be reused for the next read while the returned fragment travels on.
pub fn take(buffer: &mut BytesMut, count: usize) -> Bytes {
    let count = count.min(buffer.len());
    buffer.split_to(count).freeze()
}
