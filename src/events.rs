//! Connection lifecycle events and the session event bus.
//!
//! Each session owns one [`EventBus`]: a map from event kind to an ordered
//! list of registered callbacks. The read loop fires events from the I/O
//! task while application code subscribes and unsubscribes concurrently, so
//! the map is mutex-guarded. Firing snapshots the registration list before
//! invoking anything: handlers may subscribe or unsubscribe from inside a
//! callback without deadlocking, but a handler added during a fire is not
//! invoked in that same pass.
//!
//! # Example
//!
//! ```
//! use natslink::events::{EventBus, NatsEvent};
//!
//! let bus = EventBus::new();
//! let id = bus.subscribe(&[NatsEvent::Connected], |event, _payload| {
//!     println!("now {event:?}");
//! });
//! bus.fire(NatsEvent::Connected, None);
//! bus.unsubscribe(id);
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

/// Lifecycle events a session emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NatsEvent {
    /// Handshake (and authentication, when required) completed.
    Connected,
    /// Session torn down; fired by every `disconnect`, even a failed one.
    Disconnected,
    /// A retry pass has started.
    Reconnecting,
    /// An INFO frame was received; payload is the server's JSON.
    Informed,
    /// An -ERR frame or a transport failure; payload is the message.
    Error,
}

impl NatsEvent {
    /// Every event kind, used when clearing a listener id bus-wide.
    pub const ALL: [NatsEvent; 5] = [
        NatsEvent::Connected,
        NatsEvent::Disconnected,
        NatsEvent::Reconnecting,
        NatsEvent::Informed,
        NatsEvent::Error,
    ];
}

/// Opaque handle identifying one `subscribe` call across every event kind
/// it registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

type EventCallback = Arc<dyn Fn(NatsEvent, Option<&str>) + Send + Sync>;

/// One registration: callback plus its removal bookkeeping.
struct EventRegistration {
    id: ListenerId,
    callback: EventCallback,
    auto_off: bool,
}

/// Per-session event dispatcher.
pub struct EventBus {
    next_id: AtomicU64,
    handlers: Mutex<HashMap<NatsEvent, Vec<EventRegistration>>>,
}

impl EventBus {
    /// Create an empty bus.
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            handlers: Mutex::new(HashMap::new()),
        }
    }

    /// Register `handler` under every listed event kind.
    ///
    /// Returns a fresh id covering all of the registrations.
    pub fn subscribe<F>(&self, events: &[NatsEvent], handler: F) -> ListenerId
    where
        F: Fn(NatsEvent, Option<&str>) + Send + Sync + 'static,
    {
        self.subscribe_with(events, false, handler)
    }

    /// Register `handler`, removing it after its first invocation when
    /// `auto_off` is set. An auto-off listener registered under several
    /// kinds is removed from all of them once any one fires.
    pub fn subscribe_with<F>(
        &self,
        events: &[NatsEvent],
        auto_off: bool,
        handler: F,
    ) -> ListenerId
    where
        F: Fn(NatsEvent, Option<&str>) + Send + Sync + 'static,
    {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let callback: EventCallback = Arc::new(handler);

        let mut handlers = self.handlers.lock().expect("event bus poisoned");
        for &event in events {
            handlers.entry(event).or_default().push(EventRegistration {
                id,
                callback: Arc::clone(&callback),
                auto_off,
            });
        }

        id
    }

    /// Remove every registration with this id, across all event kinds.
    /// No-op for an unknown id.
    pub fn unsubscribe(&self, id: ListenerId) {
        let mut handlers = self.handlers.lock().expect("event bus poisoned");
        for event in NatsEvent::ALL {
            if let Some(store) = handlers.get_mut(&event) {
                store.retain(|registration| registration.id != id);
            }
        }
    }

    /// Invoke every handler registered for `event`, in registration order,
    /// synchronously on the calling thread. Auto-off registrations are
    /// claimed before their callback runs, so they fire at most once even
    /// under concurrent `fire` calls. Firing with no listeners is a no-op.
    pub fn fire(&self, event: NatsEvent, payload: Option<&str>) {
        let (snapshot, auto_off_ids) = {
            let mut handlers = self.handlers.lock().expect("event bus poisoned");
            let Some(store) = handlers.get_mut(&event) else {
                return;
            };

            let snapshot: Vec<EventCallback> = store
                .iter()
                .map(|registration| Arc::clone(&registration.callback))
                .collect();
            let auto_off_ids: Vec<ListenerId> = store
                .iter()
                .filter(|registration| registration.auto_off)
                .map(|registration| registration.id)
                .collect();
            store.retain(|registration| !registration.auto_off);

            (snapshot, auto_off_ids)
        };

        for callback in snapshot {
            callback(event, payload);
        }

        // Auto-off ids may be registered under other kinds too.
        for id in auto_off_ids {
            self.unsubscribe(id);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_handlers_fire_in_registration_order() {
        let bus = EventBus::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let log = Arc::clone(&log);
            bus.subscribe(&[NatsEvent::Connected], move |_, _| {
                log.lock().unwrap().push(tag);
            });
        }

        bus.fire(NatsEvent::Connected, None);
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_payload_reaches_handler() {
        let bus = EventBus::new();
        let seen = Arc::new(Mutex::new(None));
        let seen_clone = Arc::clone(&seen);

        bus.subscribe(&[NatsEvent::Error], move |_, payload| {
            *seen_clone.lock().unwrap() = payload.map(str::to_string);
        });

        bus.fire(NatsEvent::Error, Some("boom"));
        assert_eq!(seen.lock().unwrap().as_deref(), Some("boom"));
    }

    #[test]
    fn test_auto_off_fires_at_most_once() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        bus.subscribe_with(&[NatsEvent::Informed], true, move |_, _| {
            count_clone.fetch_add(1, Ordering::SeqCst);
        });

        bus.fire(NatsEvent::Informed, None);
        bus.fire(NatsEvent::Informed, None);
        bus.fire(NatsEvent::Informed, None);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_auto_off_removed_from_every_kind() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        bus.subscribe_with(
            &[NatsEvent::Informed, NatsEvent::Error],
            true,
            move |_, _| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            },
        );

        bus.fire(NatsEvent::Informed, None);
        // The error registration must be gone as well.
        bus.fire(NatsEvent::Error, None);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_unsubscribe_covers_all_kinds() {
        let bus = EventBus::new();
        let count = Arc::new(AtomicUsize::new(0));
        let count_clone = Arc::clone(&count);

        let id = bus.subscribe(
            &[NatsEvent::Connected, NatsEvent::Disconnected],
            move |_, _| {
                count_clone.fetch_add(1, Ordering::SeqCst);
            },
        );
        bus.unsubscribe(id);

        bus.fire(NatsEvent::Connected, None);
        bus.fire(NatsEvent::Disconnected, None);
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_unsubscribe_unknown_id_is_noop() {
        let bus = EventBus::new();
        let id = bus.subscribe(&[NatsEvent::Connected], |_, _| {});
        bus.unsubscribe(id);
        bus.unsubscribe(id);
    }

    #[test]
    fn test_fire_without_listeners_is_noop() {
        let bus = EventBus::new();
        bus.fire(NatsEvent::Reconnecting, None);
    }

    #[test]
    fn test_handler_may_subscribe_reentrantly() {
        let bus = Arc::new(EventBus::new());
        let count = Arc::new(AtomicUsize::new(0));

        let bus_clone = Arc::clone(&bus);
        let count_clone = Arc::clone(&count);
        bus.subscribe(&[NatsEvent::Connected], move |_, _| {
            let count_inner = Arc::clone(&count_clone);
            bus_clone.subscribe(&[NatsEvent::Connected], move |_, _| {
                count_inner.fetch_add(1, Ordering::SeqCst);
            });
        });

        // The handler added mid-fire does not run in the same pass.
        bus.fire(NatsEvent::Connected, None);
        assert_eq!(count.load(Ordering::SeqCst), 0);

        bus.fire(NatsEvent::Connected, None);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_fire_and_subscribe() {
        let bus = Arc::new(EventBus::new());
        let count = Arc::new(AtomicUsize::new(0));

        let firing = {
            let bus = Arc::clone(&bus);
            std::thread::spawn(move || {
                for _ in 0..500 {
                    bus.fire(NatsEvent::Informed, Some("{}"));
                }
            })
        };
        let subscribing = {
            let bus = Arc::clone(&bus);
            let count = Arc::clone(&count);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    let count = Arc::clone(&count);
                    let id = bus.subscribe(&[NatsEvent::Informed], move |_, _| {
                        count.fetch_add(1, Ordering::SeqCst);
                    });
                    bus.unsubscribe(id);
                }
            })
        };

        firing.join().unwrap();
        subscribing.join().unwrap();
    }
}
