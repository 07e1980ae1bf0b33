use crate::error::ConfigError;
use crate::upstream::{TlsVersionPolicy, Upstream};
use crate::utils::ensure;

/// Bytes requested per read and written per write call, matching the read buffer
/// capacity of the http codec.
pub const DEFAULT_IO_CHUNK_SIZE: usize = 8 * 1024;

/// Everything the forwarder needs to run. Immutable once the acceptor has started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForwarderConfig {
    listen_port: u16,
    upstream: Upstream,
    io_chunk_size: usize,
    tls_policy: TlsVersionPolicy,
    rewrite_body_urls: bool,
}

impl ForwarderConfig {
    /// Validates the listening port and parses the upstream url, using defaults for
    /// everything else.
    pub fn new(listen_port: u32, upstream_url: &str) -> Result<Self, ConfigError> {
        let listen_port = validate_port(listen_port)?;
        let upstream = Upstream::parse(upstream_url)?;

        Ok(Self {
            listen_port,
            upstream,
            io_chunk_size: DEFAULT_IO_CHUNK_SIZE,
            tls_policy: TlsVersionPolicy::default(),
            rewrite_body_urls: false,
        })
    }

    pub fn with_io_chunk_size(mut self, io_chunk_size: usize) -> Result<Self, ConfigError> {
        ensure!(io_chunk_size > 0, ConfigError::ZeroChunkSize);
        self.io_chunk_size = io_chunk_size;
        Ok(self)
    }

    pub fn with_tls_policy(mut self, tls_policy: TlsVersionPolicy) -> Self {
        self.tls_policy = tls_policy;
        self
    }

    /// Enables rewriting `http://<ip>:<listen port>` urls in request bodies to the
    /// upstream origin.
    pub fn with_rewrite_body_urls(mut self, rewrite_body_urls: bool) -> Self {
        self.rewrite_body_urls = rewrite_body_urls;
        self
    }

    pub fn listen_port(&self) -> u16 {
        self.listen_port
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    pub fn io_chunk_size(&self) -> usize {
        self.io_chunk_size
    }

    pub fn tls_policy(&self) -> TlsVersionPolicy {
        self.tls_policy
    }

    pub fn rewrite_body_urls(&self) -> bool {
        self.rewrite_body_urls
    }
}

/// Checks that `port` is a usable listening port, `1..=65535`.
pub fn validate_port(port: u32) -> Result<u16, ConfigError> {
    u16::try_from(port).ok().filter(|&port| port != 0).ok_or(ConfigError::InvalidPort { port })
}
