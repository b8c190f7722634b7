use assembly_voting::identity::ConnectionId;
use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};
use tokio::sync::{mpsc, Notify};

use super::ResponseMessage;

struct Shared {
    connection: ConnectionId,
    pending: AtomicUsize,
    warn_threshold: usize,
    close_threshold: usize,
    slow: AtomicBool,
    overflowed: AtomicBool,
    overflow: Notify,
}

impl Shared {
    fn overflow(&self, pending: usize) {
        if !self.overflowed.swap(true, Ordering::Relaxed) {
            log::warn!(
                "[{}] Client is not reading, {pending} message(s) are waiting for delivery, closing the connection",
                self.connection
            );
            self.overflow.notify_one();
        }
    }
}

/// Sending half of the outbound queue of a connection. Acknowledgments and tally updates are
/// written to the socket in the order they are queued.
///
/// A backlog above `warn_threshold` is reported once. A message above `close_threshold`
/// overflows the queue: no more messages are accepted and the connection has to be closed.
#[derive(Clone)]
pub struct OutboundQueue {
    sender: mpsc::UnboundedSender<ResponseMessage>,
    shared: Arc<Shared>,
}

pub struct OutboundReceiver {
    receiver: mpsc::UnboundedReceiver<ResponseMessage>,
    shared: Arc<Shared>,
}

impl OutboundQueue {
    pub fn new(connection: ConnectionId, warn_threshold: usize, close_threshold: usize) -> (Self, OutboundReceiver) {
        let (sender, receiver) = mpsc::unbounded_channel();
        let shared = Arc::new(Shared {
            connection,
            pending: AtomicUsize::new(0),
            warn_threshold,
            close_threshold: close_threshold.max(warn_threshold),
            slow: AtomicBool::new(false),
            overflowed: AtomicBool::new(false),
            overflow: Notify::new(),
        });
        (
            Self {
                sender,
                shared: shared.clone(),
            },
            OutboundReceiver { receiver, shared },
        )
    }

    /// Queue a message, returns false if the connection is gone or overflowed.
    pub fn send(&self, message: ResponseMessage) -> bool {
        if self.shared.overflowed.load(Ordering::Relaxed) {
            return false;
        }

        let pending = self.shared.pending.fetch_add(1, Ordering::Relaxed) + 1;
        if pending > self.shared.close_threshold {
            self.shared.pending.fetch_sub(1, Ordering::Relaxed);
            self.shared.overflow(pending - 1);
            return false;
        }

        if self.sender.send(message).is_err() {
            self.shared.pending.fetch_sub(1, Ordering::Relaxed);
            return false;
        }

        if pending > self.shared.warn_threshold && !self.shared.slow.swap(true, Ordering::Relaxed) {
            log::warn!(
                "[{}] Slow client, {pending} message(s) are waiting for delivery",
                self.shared.connection
            );
        }
        true
    }

    pub fn is_overflowed(&self) -> bool {
        self.shared.overflowed.load(Ordering::Relaxed)
    }

    /// Wait until a message is refused because the backlog is at the close threshold.
    pub async fn overflowed(&self) {
        if !self.is_overflowed() {
            self.shared.overflow.notified().await;
        }
    }
}

impl OutboundReceiver {
    /// The next message to write, `None` once the queue is closed or overflowed.
    pub async fn recv(&mut self) -> Option<ResponseMessage> {
        if self.shared.overflowed.load(Ordering::Relaxed) {
            return None;
        }
        let message = self.receiver.recv().await?;
        let pending = self.shared.pending.fetch_sub(1, Ordering::Relaxed).saturating_sub(1);
        if pending <= self.shared.warn_threshold / 2 && self.shared.slow.swap(false, Ordering::Relaxed) {
            log::info!("[{}] Client caught up with the updates", self.shared.connection);
        }
        Some(message)
    }

    #[cfg(test)]
    pub fn try_recv(&mut self) -> Option<ResponseMessage> {
        let message = self.receiver.try_recv().ok()?;
        self.shared.pending.fetch_sub(1, Ordering::Relaxed);
        Some(message)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use assembly_test::test;

    fn error(message: &str) -> ResponseMessage {
        ResponseMessage::Error {
            message: message.to_string(),
        }
    }

    #[test]
    async fn messages_keep_their_order() {
        let (queue, mut receiver) = OutboundQueue::new(ConnectionId::new(1), 2, 8);
        for i in 0..5 {
            assert!(queue.send(error(&i.to_string())));
        }
        assert!(queue.shared.slow.load(Ordering::Relaxed));

        for i in 0..5 {
            match receiver.recv().await {
                Some(ResponseMessage::Error { message }) => assert_eq!(message, i.to_string()),
                msg => panic!("unexpected message: {msg:?}"),
            }
        }
        assert_eq!(queue.shared.pending.load(Ordering::Relaxed), 0);
        assert!(!queue.shared.slow.load(Ordering::Relaxed));
    }

    #[test]
    async fn closed_connection_rejects_messages() {
        let (queue, receiver) = OutboundQueue::new(ConnectionId::new(2), 2, 8);
        drop(receiver);
        assert!(!queue.send(error("lost")));
    }

    #[test]
    async fn stalled_client_overflows_the_queue() {
        let (queue, mut receiver) = OutboundQueue::new(ConnectionId::new(3), 2, 4);
        for i in 0..4 {
            assert!(queue.send(error(&i.to_string())));
        }
        assert!(!queue.is_overflowed());

        log::info!("The message above the close threshold is refused...");
        assert!(!queue.send(error("4")));
        assert!(queue.is_overflowed());
        assert_eq!(queue.shared.pending.load(Ordering::Relaxed), 4);
        queue.overflowed().await;

        assert!(!queue.send(error("5")));
        assert!(receiver.recv().await.is_none());
    }
}
