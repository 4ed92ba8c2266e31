//! Typed publish/subscribe for committed events

use crate::{EventKind, SimEvent};

/// Callback invoked for a delivered event
pub type Subscriber = Box<dyn FnMut(&SimEvent)>;

/// Registry of subscribers keyed by event kind
///
/// Subscribers registered without a kind receive every event. Delivery order
/// is registration order.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<(Option<EventKind>, Subscriber)>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to one kind of event
    pub fn subscribe(&mut self, kind: EventKind, f: impl FnMut(&SimEvent) + 'static) {
        self.subscribers.push((Some(kind), Box::new(f)));
    }

    /// Subscribe to every event
    pub fn subscribe_all(&mut self, f: impl FnMut(&SimEvent) + 'static) {
        self.subscribers.push((None, Box::new(f)));
    }

    pub fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }

    /// Deliver one event; returns how many subscribers received it
    pub fn publish(&mut self, event: &SimEvent) -> usize {
        let kind = event.kind();
        let mut delivered = 0;
        for (filter, subscriber) in &mut self.subscribers {
            if filter.map_or(true, |k| k == kind) {
                subscriber(event);
                delivered += 1;
            }
        }
        delivered
    }

    /// Deliver events in order
    pub fn publish_all<'a>(&mut self, events: impl IntoIterator<Item = &'a SimEvent>) {
        for event in events {
            self.publish(event);
        }
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("subscribers", &self.subscribers.len())
            .finish()
    }
}
