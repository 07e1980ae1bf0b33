//! HTTP message framing over a live stream.
//!
//! This module decides where an HTTP message ends and reads exactly that far:
//!
//! - [`BodyFramer`]: the state machine reading a message into a
//!   [`MessageBuffer`](crate::message::MessageBuffer)
//! - [`BodyKind`]: the body framing chosen from the header
//! - [`FrameOutcome`]: how reading ended
//!
//! # State Machine
//!
//! ```text
//! AwaitingHeader ──┬─> FixedLength ─────────────────────────┬─> Complete
//!                  ├─> ChunkSize <─> ChunkData              │
//!                  │       └───> Trailer ───────────────────┤
//!                  └─> (no body) ───────────────────────────┘
//!
//! any reading state ── zero-length read ──> Failed (NoHeader before the header completes)
//! ```
//!
//! Unlike a decoder, the framer keeps every byte: chunk size lines, extensions and
//! trailers are measured and skipped over but stay in the buffer, because the proxy
//! relays the message exactly as it was received.

mod chunked;
mod framer;

pub use framer::BodyFramer;
pub use framer::BodyKind;
pub use framer::FrameOutcome;
