//! Moving bytes between streams.
//!
//! - [`write_all`]: chunked writes that tolerate short writes
//! - [`relay`]: forwards a message from one stream to another while it is still being
//!   read, overlapping the upstream read with the client write
//! - [`relay_queue`]: the FIFO connecting the two halves of a relay

mod queue;
mod relay;

pub use queue::{RelayReceiver, RelaySender, relay_queue};
pub use relay::{Relayed, relay, write_all};
