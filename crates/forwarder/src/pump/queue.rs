use bytes::Bytes;
use futures::StreamExt;
use futures::channel::mpsc;
use tracing::trace;

/// Creates the queue that carries response fragments from the upstream reader to the
/// client writer.
///
/// The queue is unbounded: a slow client never stalls the upstream read, at the cost of
/// buffering whatever the client hasn't taken yet.
pub fn relay_queue() -> (RelaySender, RelayReceiver) {
    let (sender, receiver) = mpsc::unbounded();
    (RelaySender { sender }, RelayReceiver { receiver })
}

/// Producer side of the relay queue.
///
/// Dropping the sender marks the queue complete.
#[derive(Debug)]
pub struct RelaySender {
    sender: mpsc::UnboundedSender<Bytes>,
}

impl RelaySender {
    /// Enqueues a fragment, returns `false` once the consumer has gone away.
    pub fn send(&self, fragment: Bytes) -> bool {
        let len = fragment.len();
        match self.sender.unbounded_send(fragment) {
            Ok(()) => {
                trace!(len, "enqueued relay fragment");
                true
            }
            Err(_) => false,
        }
    }
}

/// Consumer side of the relay queue.
#[derive(Debug)]
pub struct RelayReceiver {
    receiver: mpsc::UnboundedReceiver<Bytes>,
}

impl RelayReceiver {
    /// Waits for the next fragment, `None` once the sender is dropped and the queue is drained.
    pub async fn next(&mut self) -> Option<Bytes> {
        self.receiver.next().await
    }
}
