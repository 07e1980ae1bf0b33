//! Raw HTTP message handling.
//!
//! - [`MessageBuffer`]: the bytes of one request or response, with header lookups and
//!   in-place rewrites
//! - [`MessageHead`]: a parsed summary of the start line, for logging only
//!
//! The body url rewrite lives in its own file but extends [`MessageBuffer`].

mod buffer;
mod head;
mod rewrite;

pub use buffer::MessageBuffer;
pub use buffer::{CONNECTION, CONTENT_LENGTH, HEADER_END, HOST, TRANSFER_ENCODING};
pub use head::MessageHead;
