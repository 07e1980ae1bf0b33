//! A transparent HTTP/1 forwarding proxy
//!
//! This crate accepts client connections, reads one HTTP request per connection straight
//! off the socket, points it at a fixed upstream and relays the upstream's response back
//! while it is still arriving. Messages are handled as raw bytes: nothing is parsed into
//! a request object, and everything the proxy doesn't rewrite reaches the other side
//! byte for byte.
//!
//! # Features
//!
//! - Header detection and `Content-Length` or chunked body framing over a live stream
//! - In-place rewriting of the `Host` and `Connection` headers
//! - Plain TCP or TLS (rustls) upstreams
//! - Streaming relay of the response, overlapping the upstream read with the client write
//! - Optional rewriting of `http://<ip>:<port>` urls in request bodies
//! - Typed events for every request, response and failure
//!
//! # Example
//!
//! ```no_run
//! use micro_forwarder::acceptor::ConnectionAcceptor;
//! use micro_forwarder::config::ForwarderConfig;
//! use micro_forwarder::engine::ForwardingEngine;
//! use micro_forwarder::event::TracingObserver;
//! use tracing::{error, Level};
//! use tracing_subscriber::FmtSubscriber;
//!
//! #[tokio::main]
//! async fn main() {
//!     let subscriber = FmtSubscriber::builder().with_max_level(Level::INFO).finish();
//!     tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");
//!
//!     let config = match ForwarderConfig::new(8080, "https://example.com:443") {
//!         Ok(config) => config,
//!         Err(e) => {
//!             error!(cause = %e, "invalid configuration");
//!             return;
//!         }
//!     };
//!
//!     let engine = ForwardingEngine::with_tcp_connector(config, TracingObserver).unwrap();
//!     match ConnectionAcceptor::bind(engine).await {
//!         Ok(acceptor) => acceptor.run().await,
//!         Err(e) => error!(cause = %e, "bind error"),
//!     }
//! }
//! ```
//!
//! # Architecture
//!
//! - [`scan`]: byte searching and splicing
//! - [`message`]: the raw message buffer with header lookups and rewrites
//! - [`framing`]: the state machine deciding where a message ends
//! - [`pump`]: writing and the concurrent relay
//! - [`upstream`]: TCP and TLS connections to the upstream
//! - [`engine`]: one request/response exchange per client connection
//! - [`acceptor`]: the accept loop
//! - [`event`]: what the engine and acceptor report
//!
//! # Limitations
//!
//! - One connection is served at a time
//! - No keep-alive: every request opens a new upstream connection and carries
//!   `Connection: close`
//! - No timeouts, a stalled peer stalls the proxy
//! - HTTP/1 only

pub mod acceptor;
pub mod config;
pub mod engine;
pub mod error;
pub mod event;
pub mod framing;
pub mod message;
pub mod pump;
pub mod scan;
pub mod upstream;

mod utils;
