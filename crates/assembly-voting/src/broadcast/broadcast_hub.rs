use crate::tally::TallySnapshot;
use futures::FutureExt;
use std::{
    collections::{BTreeMap, HashMap},
    panic::AssertUnwindSafe,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{into_boxed, BoxedSubscriber, DeliveryError, Subscriber, SubscriberHandle};

#[derive(Default)]
struct Topic {
    // ids are increasing, iteration order is the registration order
    subscribers: BTreeMap<u64, BoxedSubscriber>,
    sealed: bool,
}

impl Topic {
    fn is_unused(&self) -> bool {
        self.subscribers.is_empty() && !self.sealed
    }
}

struct Inner {
    next_subscriber_id: AtomicU64,
    topics: RwLock<HashMap<Uuid, Topic>>,
}

/// Fan-out of tally snapshots to the subscribers of a session.
///
/// The subscriber set has its own lock, independent of the sessions. Delivery runs on a copy of
/// the subscriber list, thus subscribe and unsubscribe are never blocked by a slow subscriber.
/// A failing subscriber does not affect the delivery to the others.
#[derive(Clone)]
pub struct BroadcastHub(Arc<Inner>);

impl Default for BroadcastHub {
    fn default() -> Self {
        Self::new()
    }
}

impl BroadcastHub {
    pub fn new() -> Self {
        Self(Arc::new(Inner {
            next_subscriber_id: AtomicU64::new(1),
            topics: Default::default(),
        }))
    }

    pub async fn subscribe<S>(&self, session_id: Uuid, subscriber: S) -> SubscriberHandle
    where
        S: Subscriber,
    {
        let subscriber = into_boxed(subscriber);
        let mut topics = self.0.topics.write().await;
        // allocate under the lock to keep the id order equal to the registration order
        let id = self.0.next_subscriber_id.fetch_add(1, Ordering::Relaxed);
        topics.entry(session_id).or_default().subscribers.insert(id, subscriber);

        let handle = SubscriberHandle { session_id, id };
        log::debug!("Subscriber {handle} registered");
        handle
    }

    /// Remove a subscriber. Returns false if it was not registered (anymore).
    pub async fn unsubscribe(&self, handle: &SubscriberHandle) -> bool {
        let mut topics = self.0.topics.write().await;
        let Some(topic) = topics.get_mut(&handle.session_id) else {
            return false;
        };

        let removed = topic.subscribers.remove(&handle.id).is_some();
        if topic.is_unused() {
            topics.remove(&handle.session_id);
        }
        if removed {
            log::debug!("Subscriber {handle} removed");
        }
        removed
    }

    /// Stop delivering updates of the session. Subscribers remain registered until they leave.
    pub async fn seal(&self, session_id: Uuid) {
        let mut topics = self.0.topics.write().await;
        topics.entry(session_id).or_default().sealed = true;
        log::debug!("Session {session_id} sealed for updates");
    }

    pub async fn is_sealed(&self, session_id: &Uuid) -> bool {
        let topics = self.0.topics.read().await;
        topics.get(session_id).is_some_and(|topic| topic.sealed)
    }

    pub async fn subscriber_count(&self, session_id: &Uuid) -> usize {
        let topics = self.0.topics.read().await;
        topics.get(session_id).map(|topic| topic.subscribers.len()).unwrap_or(0)
    }

    /// Deliver the snapshot to every subscriber of the session in registration order.
    /// Returns the number of successful deliveries.
    pub async fn publish(&self, session_id: &Uuid, snapshot: &TallySnapshot) -> usize {
        let subscribers = {
            let topics = self.0.topics.read().await;
            match topics.get(session_id) {
                Some(topic) if topic.sealed => {
                    log::debug!("Session {session_id} is sealed, snapshot {} dropped", snapshot.sequence);
                    return 0;
                }
                Some(topic) => topic
                    .subscribers
                    .iter()
                    .map(|(id, subscriber)| (*id, subscriber.clone()))
                    .collect::<Vec<_>>(),
                None => return 0,
            }
        };

        let mut delivered = 0;
        let mut closed = Vec::new();
        for (id, subscriber) in subscribers {
            let handle = SubscriberHandle {
                session_id: *session_id,
                id,
            };
            match Self::deliver(&handle, &subscriber, snapshot).await {
                Ok(()) => delivered += 1,
                Err(DeliveryError::Closed) => closed.push(handle),
                Err(_) => {}
            }
        }

        for handle in closed {
            log::info!("Subscriber {handle} is closed, removing it");
            self.unsubscribe(&handle).await;
        }

        log::trace!(
            "Snapshot {} of session {session_id} delivered to {delivered} subscriber(s)",
            snapshot.sequence
        );
        delivered
    }

    /// Deliver a snapshot to a single subscriber, ex. the current tally to a newly attached monitor.
    pub async fn publish_to(&self, handle: &SubscriberHandle, snapshot: &TallySnapshot) -> Result<(), DeliveryError> {
        let subscriber = {
            let topics = self.0.topics.read().await;
            topics
                .get(&handle.session_id)
                .and_then(|topic| topic.subscribers.get(&handle.id))
                .cloned()
                .ok_or(DeliveryError::Closed)?
        };

        let result = Self::deliver(handle, &subscriber, snapshot).await;
        if let Err(DeliveryError::Closed) = result {
            self.unsubscribe(handle).await;
        }
        result
    }

    async fn deliver(
        handle: &SubscriberHandle,
        subscriber: &BoxedSubscriber,
        snapshot: &TallySnapshot,
    ) -> Result<(), DeliveryError> {
        let result = AssertUnwindSafe(subscriber.deliver(snapshot))
            .catch_unwind()
            .await
            .unwrap_or_else(|_| {
                log::error!("Subscriber {handle} panicked");
                Err(DeliveryError::Closed)
            });

        match &result {
            Ok(()) => {}
            Err(DeliveryError::Closed) => log::debug!("Subscriber {handle} is gone"),
            Err(err) => log::warn!("Failed to deliver snapshot {} to {handle}: {err}", snapshot.sequence),
        }
        result
    }
}
