use crate::tally::TallySnapshot;
use futures::{future::BoxFuture, FutureExt};
use std::{fmt, future::Future, sync::Arc};
use thiserror::Error as ThisError;
use tokio::sync::mpsc;
use uuid::Uuid;

#[derive(Debug, ThisError)]
pub enum DeliveryError {
    /// The receiving side is gone, the subscriber is removed from the hub.
    #[error("Subscriber is closed")]
    Closed,
    #[error("Delivery failed: {0}")]
    Failed(String),
}

/// Receiver of the tally snapshots of a session.
pub trait Subscriber: Send + Sync + 'static {
    fn deliver<'a>(&'a self, snapshot: &'a TallySnapshot) -> impl Future<Output = Result<(), DeliveryError>> + Send + 'a;
}

/// Object safe form of the Subscriber.
pub(crate) trait WrappedSubscriber: Send + Sync + 'static {
    fn deliver<'a>(&'a self, snapshot: &'a TallySnapshot) -> BoxFuture<'a, Result<(), DeliveryError>>;
}

struct WrappedBoxingSubscriber<S>(S)
where
    S: Subscriber;

impl<S> WrappedSubscriber for WrappedBoxingSubscriber<S>
where
    S: Subscriber,
{
    fn deliver<'a>(&'a self, snapshot: &'a TallySnapshot) -> BoxFuture<'a, Result<(), DeliveryError>> {
        self.0.deliver(snapshot).boxed()
    }
}

pub(crate) type BoxedSubscriber = Arc<dyn WrappedSubscriber>;

pub(crate) fn into_boxed<S: Subscriber>(subscriber: S) -> BoxedSubscriber {
    Arc::new(WrappedBoxingSubscriber(subscriber))
}

/// Registration of a subscriber, required to unsubscribe.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriberHandle {
    pub(crate) session_id: Uuid,
    pub(crate) id: u64,
}

impl SubscriberHandle {
    pub fn session_id(&self) -> &Uuid {
        &self.session_id
    }
}

impl fmt::Display for SubscriberHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/sub#{}", self.session_id, self.id)
    }
}

/// Forwards the snapshots into an unbounded channel, ex. the outbound queue of a connection.
#[derive(Clone)]
pub struct ChannelSubscriber {
    sender: mpsc::UnboundedSender<TallySnapshot>,
}

impl ChannelSubscriber {
    pub fn new(sender: mpsc::UnboundedSender<TallySnapshot>) -> Self {
        Self { sender }
    }

    pub fn channel() -> (Self, mpsc::UnboundedReceiver<TallySnapshot>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self::new(sender), receiver)
    }
}

impl Subscriber for ChannelSubscriber {
    async fn deliver(&self, snapshot: &TallySnapshot) -> Result<(), DeliveryError> {
        self.sender.send(snapshot.clone()).map_err(|_| DeliveryError::Closed)
    }
}

/// Subscriber calling a function for each snapshot.
pub struct FnSubscriber<F>(pub F)
where
    F: Fn(&TallySnapshot) -> Result<(), DeliveryError> + Send + Sync + 'static;

impl<F> Subscriber for FnSubscriber<F>
where
    F: Fn(&TallySnapshot) -> Result<(), DeliveryError> + Send + Sync + 'static,
{
    async fn deliver(&self, snapshot: &TallySnapshot) -> Result<(), DeliveryError> {
        (self.0)(snapshot)
    }
}
