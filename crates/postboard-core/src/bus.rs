//! Topic-keyed publish/subscribe registry
//!
//! Each subscriber gets its own endpoint (an mpsc queue). The registry is
//! only touched to register, remove or snapshot endpoints; delivery always
//! happens after the registry guard is released, so a subscriber with a
//! full bounded queue only slows down the publisher waiting on it.
//!
//! Endpoints are never evicted automatically. Whoever subscribes must
//! unsubscribe when the consumer goes away.

use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::mpsc;
use tracing::debug;

pub type EndpointId = u64;

enum Outbox<E> {
    Unbounded(mpsc::UnboundedSender<E>),
    Bounded(mpsc::Sender<E>),
}

impl<E> Clone for Outbox<E> {
    fn clone(&self) -> Self {
        match self {
            Outbox::Unbounded(tx) => Outbox::Unbounded(tx.clone()),
            Outbox::Bounded(tx) => Outbox::Bounded(tx.clone()),
        }
    }
}

impl<E> Outbox<E> {
    async fn deliver(&self, event: E) -> bool {
        match self {
            Outbox::Unbounded(tx) => tx.send(event).is_ok(),
            Outbox::Bounded(tx) => tx.send(event).await.is_ok(),
        }
    }
}

enum Inbox<E> {
    Unbounded(mpsc::UnboundedReceiver<E>),
    Bounded(mpsc::Receiver<E>),
}

/// Receiving side of one endpoint
pub struct Subscription<E> {
    topic: String,
    id: EndpointId,
    inbox: Inbox<E>,
}

impl<E> Subscription<E> {
    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn id(&self) -> EndpointId {
        self.id
    }

    /// Next event; `None` once the endpoint is unsubscribed and drained
    pub async fn recv(&mut self) -> Option<E> {
        match &mut self.inbox {
            Inbox::Unbounded(rx) => rx.recv().await,
            Inbox::Bounded(rx) => rx.recv().await,
        }
    }

    pub fn try_recv(&mut self) -> Option<E> {
        match &mut self.inbox {
            Inbox::Unbounded(rx) => rx.try_recv().ok(),
            Inbox::Bounded(rx) => rx.try_recv().ok(),
        }
    }
}

impl<E> std::fmt::Debug for Subscription<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .finish()
    }
}

/// Registry of endpoints per topic
pub struct SubscriptionBus<E> {
    topics: DashMap<String, Vec<(EndpointId, Outbox<E>)>>,
    next_id: AtomicU64,
    /// Queue size for [`SubscriptionBus::subscribe`]; `None` means unbounded
    capacity: Option<usize>,
}

impl<E: Clone + Send + 'static> SubscriptionBus<E> {
    /// Endpoints with unbounded queues
    pub fn new() -> Self {
        Self::with_default_capacity(None)
    }

    /// Endpoints with queues of `capacity` events
    pub fn bounded(capacity: usize) -> Self {
        Self::with_default_capacity(Some(capacity))
    }

    fn with_default_capacity(capacity: Option<usize>) -> Self {
        Self {
            topics: DashMap::new(),
            next_id: AtomicU64::new(1),
            capacity,
        }
    }

    pub fn subscribe(&self, topic: &str) -> Subscription<E> {
        self.register(topic, self.capacity)
    }

    /// Subscribe with an explicit queue size; `0` means unbounded
    pub fn subscribe_with_capacity(&self, topic: &str, capacity: usize) -> Subscription<E> {
        self.register(topic, Some(capacity))
    }

    fn register(&self, topic: &str, capacity: Option<usize>) -> Subscription<E> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (outbox, inbox) = match capacity {
            Some(n) if n > 0 => {
                let (tx, rx) = mpsc::channel(n);
                (Outbox::Bounded(tx), Inbox::Bounded(rx))
            }
            _ => {
                let (tx, rx) = mpsc::unbounded_channel();
                (Outbox::Unbounded(tx), Inbox::Unbounded(rx))
            }
        };

        self.topics
            .entry(topic.to_string())
            .or_default()
            .push((id, outbox));
        debug!("Endpoint {} subscribed to {}", id, topic);

        Subscription {
            topic: topic.to_string(),
            id,
            inbox,
        }
    }

    /// Remove exactly the endpoint `id` from `topic`. Returns false if it
    /// was not registered (already removed, or never was).
    pub fn unsubscribe(&self, topic: &str, id: EndpointId) -> bool {
        let (removed, now_empty) = match self.topics.get_mut(topic) {
            Some(mut endpoints) => {
                let before = endpoints.len();
                endpoints.retain(|(endpoint, _)| *endpoint != id);
                (endpoints.len() != before, endpoints.is_empty())
            }
            None => return false,
        };

        if now_empty {
            self.topics.remove_if(topic, |_, endpoints| endpoints.is_empty());
        }
        if removed {
            debug!("Endpoint {} unsubscribed from {}", id, topic);
        }
        removed
    }

    /// Deliver `event` to every endpoint registered under `topic` at the
    /// time of the call. Returns how many endpoints accepted it.
    pub async fn publish(&self, topic: &str, event: E) -> usize {
        let outboxes: Vec<(EndpointId, Outbox<E>)> = match self.topics.get(topic) {
            Some(endpoints) => endpoints.value().clone(),
            None => return 0,
        };

        let mut delivered = 0;
        for (id, outbox) in outboxes {
            if outbox.deliver(event.clone()).await {
                delivered += 1;
            } else {
                debug!("Endpoint {} on {} is closed, event dropped", id, topic);
            }
        }
        delivered
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|endpoints| endpoints.len())
            .unwrap_or(0)
    }

    pub fn topic_count(&self) -> usize {
        self.topics.len()
    }
}

impl<E: Clone + Send + 'static> Default for SubscriptionBus<E> {
    fn default() -> Self {
        Self::new()
    }
}
