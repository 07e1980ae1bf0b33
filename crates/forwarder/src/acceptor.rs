use std::io;
use std::net::{Ipv4Addr, SocketAddr};

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tracing::{debug, error, info};

use crate::engine::ForwardingEngine;
use crate::error::ForwardError;
use crate::event::Observer;
use crate::upstream::Connector;

/// The listen/accept loop. Connections are handled one at a time, each to completion
/// before the next accept.
#[derive(Debug)]
pub struct ConnectionAcceptor<C, O> {
    listener: TcpListener,
    engine: ForwardingEngine<C, O>,
}

impl<C: Connector, O: Observer> ConnectionAcceptor<C, O> {
    /// Binds `0.0.0.0` on the configured listening port.
    pub async fn bind(engine: ForwardingEngine<C, O>) -> Result<Self, ForwardError> {
        let port = engine.config().listen_port();
        let listener =
            TcpListener::bind((Ipv4Addr::UNSPECIFIED, port)).await.map_err(|e| ForwardError::bind(port, e))?;

        Ok(Self::from_listener(listener, engine))
    }

    /// Serves on an already bound listener.
    pub fn from_listener(listener: TcpListener, engine: ForwardingEngine<C, O>) -> Self {
        Self { listener, engine }
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Accepts and forwards connections forever.
    ///
    /// Nothing a single connection does ends the loop: accept and forwarding failures are
    /// reported to the observer and the next client is accepted.
    pub async fn run(&self) {
        let observer = self.engine.observer();
        let port = self.local_addr().map(|addr| addr.port()).unwrap_or(self.engine.config().listen_port());

        info!(port, upstream = %self.engine.config().upstream(), "forwarder started");
        observer.on_info(&format!("start listening for connections on port: {port}"));
        observer.on_info(&format!("forwarding requests to: {}", self.engine.config().upstream()));

        loop {
            observer.on_info("waiting for client to connect");

            let (stream, peer) = match self.listener.accept().await {
                Ok(accepted) => accepted,
                Err(e) => {
                    let e = ForwardError::accept(e);
                    error!(cause = %e, "accept failed");
                    observer.on_error(&e.to_string());
                    continue;
                }
            };

            observer.on_info(&format!("client connected ({peer})"));
            match self.serve(stream).await {
                Ok(()) => observer.on_info("connection closed"),
                Err(e) => {
                    error!(%peer, cause = %e, "forwarding failed");
                    observer.on_error(&format!("forwarding failed: {e}"));
                }
            }
        }
    }

    async fn serve(&self, mut stream: TcpStream) -> Result<(), ForwardError> {
        let (mut reader, mut writer) = stream.split();
        self.engine.forward(&mut reader, &mut writer).await?;

        if let Err(e) = stream.shutdown().await {
            debug!(cause = %e, "client shutdown failed");
        }
        Ok(())
    }
}
