use std::fmt;
use std::mem::MaybeUninit;

use httparse::Status;

/// Maximum number of headers parsed when summarizing a message head.
const MAX_HEADER_NUM: usize = 64;

/// A one-line summary of a message head, used for log fields.
///
/// Framing never depends on this: the proxy relays whatever bytes it gets, and a head
/// that `httparse` rejects simply has no summary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageHead {
    Request { method: String, path: String, version: u8 },
    Response { code: u16, reason: String, version: u8 },
}

impl MessageHead {
    /// Summarizes a complete request header block.
    pub fn parse_request(bytes: &[u8]) -> Option<Self> {
        let mut headers = [const { MaybeUninit::<httparse::Header>::uninit() }; MAX_HEADER_NUM];
        let mut request = httparse::Request::new(&mut []);

        match request.parse_with_uninit_headers(bytes, &mut headers) {
            Ok(Status::Complete(_)) => Some(Self::Request {
                method: request.method?.to_string(),
                path: request.path?.to_string(),
                version: request.version?,
            }),
            _ => None,
        }
    }

    /// Summarizes a complete response header block.
    pub fn parse_response(bytes: &[u8]) -> Option<Self> {
        let mut headers = [httparse::EMPTY_HEADER; MAX_HEADER_NUM];
        let mut response = httparse::Response::new(&mut headers);

        match response.parse(bytes) {
            Ok(Status::Complete(_)) => Some(Self::Response {
                code: response.code?,
                reason: response.reason.unwrap_or_default().to_string(),
                version: response.version?,
            }),
            _ => None,
        }
    }
}

impl fmt::Display for MessageHead {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Request { method, path, version } => write!(f, "{method} {path} HTTP/1.{version}"),
            Self::Response { code, reason, version } => write!(f, "HTTP/1.{version} {code} {reason}"),
        }
    }
}
