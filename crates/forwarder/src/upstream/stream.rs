use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use pin_project_lite::pin_project;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio_rustls::client::TlsStream;

pin_project! {
    /// An upstream connection, plain or wrapped in TLS depending on the url scheme.
    #[project = UpstreamStreamProj]
    #[derive(Debug)]
    pub enum UpstreamStream {
        Plain {
            #[pin]
            stream: TcpStream,
        },
        Tls {
            #[pin]
            stream: TlsStream<TcpStream>,
        },
    }
}

impl UpstreamStream {
    pub fn plain(stream: TcpStream) -> Self {
        UpstreamStream::Plain { stream }
    }

    pub fn tls(stream: TlsStream<TcpStream>) -> Self {
        UpstreamStream::Tls { stream }
    }

    pub fn is_tls(&self) -> bool {
        matches!(self, UpstreamStream::Tls { .. })
    }
}

impl AsyncRead for UpstreamStream {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            UpstreamStreamProj::Plain { stream } => stream.poll_read(cx, buf),
            UpstreamStreamProj::Tls { stream } => stream.poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for UpstreamStream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<io::Result<usize>> {
        match self.project() {
            UpstreamStreamProj::Plain { stream } => stream.poll_write(cx, buf),
            UpstreamStreamProj::Tls { stream } => stream.poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            UpstreamStreamProj::Plain { stream } => stream.poll_flush(cx),
            UpstreamStreamProj::Tls { stream } => stream.poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        match self.project() {
            UpstreamStreamProj::Plain { stream } => stream.poll_shutdown(cx),
            UpstreamStreamProj::Tls { stream } => stream.poll_shutdown(cx),
        }
    }
}
