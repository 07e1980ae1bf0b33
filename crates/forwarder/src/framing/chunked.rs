//! Chunk size line arithmetic for chunked transfer encoding, as defined in
//! [RFC 7230 Section 4.1](https://tools.ietf.org/html/rfc7230#section-4.1).
//!
//! Chunks are never decoded here, only measured: the proxy relays the raw framing bytes
//! and just needs to know where each chunk ends.

/// Length of the `\r\n` that ends a chunk size line and each chunk's data.
const CRLF_LEN: usize = 2;

/// Parses the size from a chunk size line such as `1a` or `1a;name=value`.
///
/// Extensions and trailing whitespace are skipped, not interpreted. Returns `None` for an
/// empty, non-hexadecimal or overflowing size.
pub(crate) fn parse_chunk_size(token: &[u8]) -> Option<u64> {
    let digits_len = token.iter().position(|&b| matches!(b, b';' | b' ' | b'\t')).unwrap_or(token.len());
    let digits = &token[..digits_len];

    if digits.is_empty() || !digits.iter().all(u8::is_ascii_hexdigit) {
        return None;
    }

    let digits = std::str::from_utf8(digits).ok()?;
    u64::from_str_radix(digits, 16).ok()
}

/// Offset just past a chunk whose size line starts at `index`: the size line, its CRLF,
/// `size` data bytes and the CRLF closing the data.
///
/// `None` if the offset doesn't fit in memory addresses.
pub(crate) fn chunk_end(index: usize, token_len: usize, size: u64) -> Option<usize> {
    let size = usize::try_from(size).ok()?;
    index.checked_add(token_len)?.checked_add(CRLF_LEN)?.checked_add(size)?.checked_add(CRLF_LEN)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_sizes() {
        assert_eq!(parse_chunk_size(b"0"), Some(0));
        assert_eq!(parse_chunk_size(b"4"), Some(4));
        assert_eq!(parse_chunk_size(b"1a"), Some(26));
        assert_eq!(parse_chunk_size(b"1A"), Some(26));
        assert_eq!(parse_chunk_size(b"ffffffffffffffff"), Some(u64::MAX));
    }

    #[test]
    fn parse_skips_extensions() {
        assert_eq!(parse_chunk_size(b"5;name=value"), Some(5));
        assert_eq!(parse_chunk_size(b"5 ;name"), Some(5));
        assert_eq!(parse_chunk_size(b"10\t"), Some(16));
    }

    #[test]
    fn parse_invalid() {
        assert_eq!(parse_chunk_size(b""), None);
        assert_eq!(parse_chunk_size(b";ext"), None);
        assert_eq!(parse_chunk_size(b"xyz"), None);
        assert_eq!(parse_chunk_size(b"+5"), None);
        assert_eq!(parse_chunk_size(b"10000000000000000"), None);
    }

    #[test]
    fn chunk_end_covers_framing() {
        // "4\r\nWiki\r\n" starting at 10
        assert_eq!(chunk_end(10, 1, 4), Some(19));
        assert_eq!(chunk_end(usize::MAX - 2, 1, 1), None);
    }
}
