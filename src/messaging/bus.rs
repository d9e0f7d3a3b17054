/// Engine event broadcast
///
/// The engine publishes a `SoundEvent` for every play, denial, eviction,
/// completion and stop. Observers on any thread subscribe and drain their
/// own channel; publishing never blocks the engine tick.
use std::sync::Arc;

use crossbeam_channel::{unbounded, Receiver, Sender};
use parking_lot::RwLock;

use super::events::SoundEvent;

/// Identifies one subscription
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriberId(u64);

#[derive(Default)]
struct Subscribers {
    next_id: u64,
    senders: Vec<(SubscriberId, Sender<SoundEvent>)>,
}

/// Cloneable handle; clones share the subscriber list
#[derive(Clone, Default)]
pub struct EventBus {
    subscribers: Arc<RwLock<Subscribers>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a new event channel
    pub fn subscribe(&self) -> (Receiver<SoundEvent>, SubscriberId) {
        let (tx, rx) = unbounded();

        let mut subscribers = self.subscribers.write();
        subscribers.next_id += 1;
        let id = SubscriberId(subscribers.next_id);
        subscribers.senders.push((id, tx));

        (rx, id)
    }

    pub fn unsubscribe(&self, id: SubscriberId) {
        self.subscribers.write().senders.retain(|(sid, _)| *sid != id);
    }

    /// Deliver an event to every subscriber.
    ///
    /// Subscribers whose receiver has been dropped are removed.
    pub fn publish(&self, event: SoundEvent) {
        let gone: Vec<SubscriberId> = self
            .subscribers
            .read()
            .senders
            .iter()
            .filter(|(_, sender)| sender.try_send(event.clone()).is_err())
            .map(|(id, _)| *id)
            .collect();

        if !gone.is_empty() {
            self.subscribers
                .write()
                .senders
                .retain(|(id, _)| !gone.contains(id));
            tracing::debug!("Dropped {} disconnected event subscribers", gone.len());
        }
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().senders.len()
    }

    pub fn clear(&self) {
        self.subscribers.write().senders.clear();
    }
}
