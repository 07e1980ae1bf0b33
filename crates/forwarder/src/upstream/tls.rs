use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use rustls::{ClientConfig, RootCertStore, SupportedProtocolVersion};

use crate::error::{ConfigError, ConnectError};

static TLS12_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS12];
static TLS13_ONLY: &[&SupportedProtocolVersion] = &[&rustls::version::TLS13];

/// Which TLS protocol versions the upstream handshake may negotiate.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum TlsVersionPolicy {
    /// TLS 1.3, falling back to TLS 1.2
    #[default]
    Default,
    /// TLS 1.2 only, for old upstreams that misbehave with 1.3
    Tls12,
    /// TLS 1.3 only
    Tls13,
}

impl TlsVersionPolicy {
    pub fn protocol_versions(self) -> &'static [&'static SupportedProtocolVersion] {
        match self {
            TlsVersionPolicy::Default => rustls::DEFAULT_VERSIONS,
            TlsVersionPolicy::Tls12 => TLS12_ONLY,
            TlsVersionPolicy::Tls13 => TLS13_ONLY,
        }
    }
}

impl FromStr for TlsVersionPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(TlsVersionPolicy::Default),
            "1.2" => Ok(TlsVersionPolicy::Tls12),
            "1.3" => Ok(TlsVersionPolicy::Tls13),
            _ => Err(ConfigError::UnknownTlsPolicy { value: s.to_string() }),
        }
    }
}

impl fmt::Display for TlsVersionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TlsVersionPolicy::Default => "default",
            TlsVersionPolicy::Tls12 => "1.2",
            TlsVersionPolicy::Tls13 => "1.3",
        };
        f.write_str(name)
    }
}

/// Builds the client config used for `https` upstreams.
///
/// Server certificates are validated against the webpki root store. Only `http/1.1` is
/// offered over ALPN since the proxy relays HTTP/1 bytes verbatim.
pub(crate) fn client_config(policy: TlsVersionPolicy) -> Result<ClientConfig, ConnectError> {
    let mut roots = RootCertStore::empty();
    roots.extend(webpki_roots::TLS_SERVER_ROOTS.iter().cloned());

    let provider = Arc::new(rustls::crypto::ring::default_provider());
    let mut config = ClientConfig::builder_with_provider(provider)
        .with_protocol_versions(policy.protocol_versions())
        .map_err(ConnectError::tls_config)?
        .with_root_certificates(roots)
        .with_no_client_auth();

    config.alpn_protocols = vec![b"http/1.1".to_vec()];
    Ok(config)
}
