use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{debug, warn};

use crate::config::ForwarderConfig;
use crate::error::{ConnectError, ForwardError};
use crate::event::Observer;
use crate::framing::{BodyFramer, FrameOutcome};
use crate::message::{CONNECTION, HOST, MessageBuffer};
use crate::pump::{Relayed, relay, write_all};
use crate::upstream::{Connector, TcpConnector};

const NO_REQUEST_HEADER: &str = "client connected but no header found";
const NO_RESPONSE_HEADER: &str = "upstream closed without a response header";

/// Forwards one request per client connection to the configured upstream and relays the
/// response back.
///
/// The request is read in full before the upstream connection is opened. The response is
/// streamed: every fragment read from upstream is written to the client before the rest
/// of the response has arrived.
#[derive(Debug)]
pub struct ForwardingEngine<C, O> {
    config: ForwarderConfig,
    connector: C,
    observer: O,
}

impl<O: Observer> ForwardingEngine<TcpConnector, O> {
    /// Creates an engine connecting over TCP, with TLS per the configured policy.
    pub fn with_tcp_connector(config: ForwarderConfig, observer: O) -> Result<Self, ConnectError> {
        let connector = TcpConnector::new(config.tls_policy())?;
        Ok(Self::new(config, connector, observer))
    }
}

impl<C: Connector, O: Observer> ForwardingEngine<C, O> {
    pub fn new(config: ForwarderConfig, connector: C, observer: O) -> Self {
        Self { config, connector, observer }
    }

    pub fn config(&self) -> &ForwarderConfig {
        &self.config
    }

    pub fn observer(&self) -> &O {
        &self.observer
    }

    /// Handles one client connection: reads the request, rewrites it, sends it upstream
    /// and relays the response to `client_writer`.
    ///
    /// Messages cut short by either peer are still forwarded as far as they arrived and
    /// reported to the observer, also when an I/O error ended them. I/O and connect
    /// failures are returned after that; nothing has been written to the client when
    /// connecting fails.
    pub async fn forward<R, W>(&self, client_reader: &mut R, client_writer: &mut W) -> Result<(), ForwardError>
    where
        R: AsyncRead + Unpin + Send,
        W: AsyncWrite + Unpin + Send,
    {
        let io_chunk_size = self.config.io_chunk_size();
        let mut framer = BodyFramer::new(io_chunk_size);

        let mut request = MessageBuffer::new();
        match framer.read_message(client_reader, &mut request).await? {
            FrameOutcome::Complete => {}
            FrameOutcome::NoHeader => {
                self.observer.on_info(NO_REQUEST_HEADER);
                return Ok(());
            }
            FrameOutcome::Failed(e) => {
                warn!(cause = %e, "request ended early, forwarding what arrived");
                self.observer.on_error(&format!("reading the request failed: {e}"));
            }
        }

        self.rewrite_request(&mut request);
        let request = request.into_bytes();
        self.observer.on_request(&request);

        let upstream = self.config.upstream();
        let mut stream = self.connector.connect(upstream).await?;
        write_all(&mut stream, &request, io_chunk_size).await?;
        stream.flush().await?;
        debug!(len = request.len(), upstream = %upstream, "request forwarded");

        let Relayed { message, outcome, written, write_error } =
            relay(&mut stream, client_writer, &mut framer, io_chunk_size).await;
        debug!(written, "response relayed");
        let read_error = self.report_response(message, outcome);

        if let Err(e) = stream.shutdown().await {
            debug!(cause = %e, "upstream shutdown failed");
        }

        match read_error.or(write_error) {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Reports whatever arrived from upstream, returning the read error that cut the
    /// response short, if any.
    fn report_response(&self, message: MessageBuffer, outcome: io::Result<FrameOutcome>) -> Option<io::Error> {
        match outcome {
            Ok(FrameOutcome::Complete) => self.observer.on_response(&message.into_bytes()),
            Ok(FrameOutcome::Failed(e)) => {
                self.observer.on_response(&message.into_bytes());
                self.observer.on_error(&format!("reading the response failed: {e}"));
            }
            Ok(FrameOutcome::NoHeader) => self.observer.on_info(NO_RESPONSE_HEADER),
            Err(e) => {
                if !message.is_empty() {
                    self.observer.on_response(&message.into_bytes());
                }
                return Some(e);
            }
        }
        None
    }

    /// Points the request at the upstream and forbids keep-alive.
    fn rewrite_request(&self, request: &mut MessageBuffer) {
        let upstream = self.config.upstream();

        let host = upstream.host_header();
        if !request.replace_header_value(HOST, &host) {
            request.insert_header_line(&format!("{HOST}: {host}"));
        }

        if !request.replace_header_value(CONNECTION, "close") {
            request.insert_header_line(&format!("{CONNECTION}: close"));
        }

        if self.config.rewrite_body_urls() {
            let rewritten = request.rewrite_ip_urls(self.config.listen_port(), &upstream.scheme_and_host());
            if rewritten > 0 {
                request.recompute_content_length();
                debug!(rewritten, "rewrote urls in request body");
            }
        }
    }
}
