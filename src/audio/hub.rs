use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tracing::debug;

use super::events::{AudioEvent, EventKind, EventSink};

#[derive(Default)]
struct HubInner {
    next_id: u64,
    subscribers: Vec<Subscriber>,
}

struct Subscriber {
    id: u64,
    kind: EventKind,
    sink: EventSink,
}

/// In-process registry that fans audio notifications out to subscribers
#[derive(Clone, Default)]
pub struct EventHub {
    inner: Arc<Mutex<HubInner>>,
}

/// Active registration on an [`EventHub`]. Dropping it unsubscribes.
pub struct Subscription {
    id: u64,
    kind: EventKind,
    hub: Weak<Mutex<HubInner>>,
}

fn lock(inner: &Mutex<HubInner>) -> MutexGuard<'_, HubInner> {
    inner.lock().unwrap_or_else(PoisonError::into_inner)
}

impl EventHub {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, kind: EventKind, sink: EventSink) -> Subscription {
        let mut inner = lock(&self.inner);
        inner.next_id += 1;
        let id = inner.next_id;
        inner.subscribers.push(Subscriber { id, kind, sink });
        debug!("Subscribed #{} to {:?} events", id, kind);

        Subscription {
            id,
            kind,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Deliver an event to every subscriber of its kind.
    ///
    /// Returns the number of sinks that accepted it; closed sinks are skipped.
    pub fn publish(&self, event: AudioEvent) -> usize {
        let kind = event.kind();
        let inner = lock(&self.inner);
        let mut delivered = 0;

        for subscriber in inner.subscribers.iter().filter(|s| s.kind == kind) {
            if subscriber.sink.send(event.clone()).is_ok() {
                delivered += 1;
            } else {
                debug!("Subscriber #{} sink closed, skipping", subscriber.id);
            }
        }

        debug!("Published {:?} event to {} subscribers", kind, delivered);
        delivered
    }

    pub fn subscriber_count(&self, kind: EventKind) -> usize {
        lock(&self.inner)
            .subscribers
            .iter()
            .filter(|s| s.kind == kind)
            .count()
    }
}

impl Subscription {
    /// Explicitly dispose of the subscription
    pub fn cancel(self) {
        drop(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(hub) = self.hub.upgrade() {
            lock(&hub).subscribers.retain(|s| s.id != self.id);
            debug!("Unsubscribed #{} from {:?} events", self.id, self.kind);
        }
    }
}
