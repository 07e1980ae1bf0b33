use std::fmt;
use std::str::FromStr;

use http::Uri;

use crate::error::ConfigError;

/// Scheme of the upstream url, which decides whether the connection uses TLS.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Scheme {
    Http,
    Https,
}

impl Scheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Scheme::Http => "http",
            Scheme::Https => "https",
        }
    }

    fn default_port(self) -> u16 {
        match self {
            Scheme::Http => 80,
            Scheme::Https => 443,
        }
    }
}

/// The server every request is forwarded to.
///
/// Only the scheme, host and port of the configured url matter; a path or query is
/// accepted and ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upstream {
    scheme: Scheme,
    host: String,
    port: u16,
}

impl Upstream {
    pub fn new<S: Into<String>>(scheme: Scheme, host: S, port: u16) -> Self {
        Self { scheme, host: host.into(), port }
    }

    /// Parses an absolute `http` or `https` url. A missing port defaults to the scheme's.
    pub fn parse(url: &str) -> Result<Self, ConfigError> {
        let uri: Uri = url.parse().map_err(|e| ConfigError::invalid_url(url, e))?;

        let scheme = match uri.scheme_str() {
            Some(scheme) if scheme.eq_ignore_ascii_case("http") => Scheme::Http,
            Some(scheme) if scheme.eq_ignore_ascii_case("https") => Scheme::Https,
            Some(scheme) => return Err(ConfigError::invalid_url(url, format!("unsupported scheme {scheme:?}"))),
            None => return Err(ConfigError::invalid_url(url, "url must be absolute")),
        };

        let host = match uri.host() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(ConfigError::invalid_url(url, "missing host")),
        };

        let port = uri.port_u16().unwrap_or_else(|| scheme.default_port());
        Ok(Self { scheme, host, port })
    }

    pub fn scheme(&self) -> Scheme {
        self.scheme
    }

    /// Host as written in the url, which is also the value sent in the `Host` header.
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn is_tls(&self) -> bool {
        self.scheme == Scheme::Https
    }

    /// Host without the brackets of an IPv6 literal, as used for connecting and as the TLS
    /// server name.
    pub fn connect_host(&self) -> &str {
        self.host.trim_start_matches('[').trim_end_matches(']')
    }

    /// Value for the forwarded `Host` header: the host, plus the port when it isn't the
    /// scheme's default.
    pub fn host_header(&self) -> String {
        if self.port == self.scheme.default_port() {
            self.host.clone()
        } else {
            self.authority()
        }
    }

    /// `host:port`, for log fields and error messages.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// `scheme://host`, the origin used when rewriting urls in request bodies.
    pub fn scheme_and_host(&self) -> String {
        format!("{}://{}", self.scheme.as_str(), self.host)
    }
}

impl FromStr for Upstream {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for Upstream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}:{}", self.scheme.as_str(), self.host, self.port)
    }
}
