//! Connections to the upstream server.
//!
//! - [`Upstream`]: the parsed upstream url
//! - [`Connector`]: opens one connection per forwarded request
//! - [`TcpConnector`]: the real connector, TCP with optional TLS
//! - [`UpstreamStream`]: the stream a [`TcpConnector`] hands out

mod stream;
mod target;
mod tls;

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use rustls::pki_types::ServerName;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpStream;
use tokio_rustls::TlsConnector;
use tracing::debug;

use crate::error::ConnectError;

pub use stream::UpstreamStream;
pub use target::{Scheme, Upstream};
pub use tls::TlsVersionPolicy;

#[async_trait]
pub trait Connector: Send + Sync {
    type Stream: AsyncRead + AsyncWrite + Unpin + Send;

    /// Opens a fresh connection to `upstream`, completing the TLS handshake for `https`.
    async fn connect(&self, upstream: &Upstream) -> Result<Self::Stream, ConnectError>;
}

/// Connects over TCP, wrapping the socket in TLS when the upstream scheme is `https`.
#[derive(Clone)]
pub struct TcpConnector {
    tls: TlsConnector,
    policy: TlsVersionPolicy,
}

impl TcpConnector {
    pub fn new(policy: TlsVersionPolicy) -> Result<Self, ConnectError> {
        let config = tls::client_config(policy)?;
        Ok(Self { tls: TlsConnector::from(Arc::new(config)), policy })
    }
}

impl fmt::Debug for TcpConnector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TcpConnector").field("policy", &self.policy).finish_non_exhaustive()
    }
}

#[async_trait]
impl Connector for TcpConnector {
    type Stream = UpstreamStream;

    async fn connect(&self, upstream: &Upstream) -> Result<Self::Stream, ConnectError> {
        let host = upstream.connect_host();
        let tcp = TcpStream::connect((host, upstream.port()))
            .await
            .map_err(|e| ConnectError::tcp(upstream.authority(), e))?;
        // requests are written in one go, no need to wait for acks
        tcp.set_nodelay(true).map_err(|e| ConnectError::tcp(upstream.authority(), e))?;
        debug!(upstream = %upstream, "tcp connected");

        if !upstream.is_tls() {
            return Ok(UpstreamStream::plain(tcp));
        }

        let server_name =
            ServerName::try_from(host.to_string()).map_err(|e| ConnectError::invalid_server_name(host, e))?;
        let tls = self
            .tls
            .connect(server_name, tcp)
            .await
            .map_err(|e| ConnectError::handshake(upstream.authority(), e))?;
        debug!(upstream = %upstream, policy = %self.policy, "tls handshake finished");

        Ok(UpstreamStream::tls(tls))
    }
}
