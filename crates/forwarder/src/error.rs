use std::io;

use rustls::pki_types::InvalidDnsNameError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ForwardError {
    #[error("failed to bind listening port {port}: {source}")]
    Bind { port: u16, source: io::Error },

    #[error("failed to accept client connection: {source}")]
    Accept { source: io::Error },

    #[error("upstream error: {source}")]
    Connect {
        #[from]
        source: ConnectError,
    },

    #[error("io error: {source}")]
    Io {
        #[from]
        source: io::Error,
    },
}

impl ForwardError {
    pub fn bind(port: u16, source: io::Error) -> Self {
        Self::Bind { port, source }
    }

    pub fn accept(source: io::Error) -> Self {
        Self::Accept { source }
    }
}

#[derive(Error, Debug)]
pub enum ConnectError {
    #[error("tcp connect to {addr} failed: {source}")]
    Tcp { addr: String, source: io::Error },

    #[error("invalid tls server name {name}: {source}")]
    InvalidServerName { name: String, source: InvalidDnsNameError },

    #[error("invalid tls config: {reason}")]
    TlsConfig { reason: String },

    #[error("tls handshake with {addr} failed: {source}")]
    Handshake { addr: String, source: io::Error },
}

impl ConnectError {
    pub fn tcp<S: ToString>(addr: S, source: io::Error) -> Self {
        Self::Tcp { addr: addr.to_string(), source }
    }

    pub fn invalid_server_name<S: ToString>(name: S, source: InvalidDnsNameError) -> Self {
        Self::InvalidServerName { name: name.to_string(), source }
    }

    pub fn tls_config<S: ToString>(str: S) -> Self {
        Self::TlsConfig { reason: str.to_string() }
    }

    pub fn handshake<S: ToString>(addr: S, source: io::Error) -> Self {
        Self::Handshake { addr: addr.to_string(), source }
    }
}

/// Why a message stopped short of its framed end.
///
/// These never escape as errors: the framer records them in its outcome and the engine
/// reports them while still delivering the bytes that did arrive.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FramingError {
    #[error("peer closed after {received} of {expected} body bytes")]
    TruncatedBody { received: usize, expected: usize },

    #[error("peer closed before the chunk size line at offset {index}")]
    TruncatedChunkSize { index: usize },

    #[error("peer closed inside the chunk ending at offset {end}")]
    TruncatedChunk { end: usize },

    #[error("invalid chunk size: {token:?}")]
    InvalidChunkSize { token: String },

    #[error("receiving the headers after the last chunk failed")]
    TruncatedTrailer,
}

impl FramingError {
    pub fn invalid_chunk_size(token: &[u8]) -> Self {
        Self::InvalidChunkSize { token: String::from_utf8_lossy(token).into_owned() }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid listening port {port}, expected 1-65535")]
    InvalidPort { port: u32 },

    #[error("invalid upstream url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("io chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("unknown tls version policy {value:?}, expected one of: default, 1.2, 1.3")]
    UnknownTlsPolicy { value: String },
}

impl ConfigError {
    pub fn invalid_url<U: ToString, S: ToString>(url: U, str: S) -> Self {
        Self::InvalidUrl { url: url.to_string(), reason: str.to_string() }
    }
}
