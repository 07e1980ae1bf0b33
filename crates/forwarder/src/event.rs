//! Events reported while forwarding.
//!
//! The engine and the acceptor never print anything themselves; they report to an
//! [`Observer`] handed to them at construction.

use bytes::Bytes;
use futures::channel::mpsc::UnboundedSender;
use tracing::{error, info};

use crate::message::MessageHead;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Info(String),
    Error(String),
    /// The request exactly as it was sent upstream
    Request(Bytes),
    /// The response bytes received from upstream, complete or not
    Response(Bytes),
}

pub trait Observer: Send + Sync {
    fn on_info(&self, message: &str);

    fn on_error(&self, message: &str);

    fn on_request(&self, request: &Bytes);

    fn on_response(&self, response: &Bytes);
}

/// Logs every event through `tracing`. Payloads are summarized by their start line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_info(&self, message: &str) {
        info!("{message}");
    }

    fn on_error(&self, message: &str) {
        error!("{message}");
    }

    fn on_request(&self, request: &Bytes) {
        match MessageHead::parse_request(request) {
            Some(head) => info!(len = request.len(), %head, "request"),
            None => info!(len = request.len(), "request"),
        }
    }

    fn on_response(&self, response: &Bytes) {
        match MessageHead::parse_response(response) {
            Some(head) => info!(len = response.len(), %head, "response"),
            None => info!(len = response.len(), "response"),
        }
    }
}

/// Sends events down a channel. A closed receiver drops them.
impl Observer for UnboundedSender<Event> {
    fn on_info(&self, message: &str) {
        let _ = self.unbounded_send(Event::Info(message.to_string()));
    }

    fn on_error(&self, message: &str) {
        let _ = self.unbounded_send(Event::Error(message.to_string()));
    }

    fn on_request(&self, request: &Bytes) {
        let _ = self.unbounded_send(Event::Request(request.clone()));
    }

    fn on_response(&self, response: &Bytes) {
        let _ = self.unbounded_send(Event::Response(response.clone()));
    }
}
