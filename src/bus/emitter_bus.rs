//! Bus adapter over `event_emitter_rs::EventEmitter`.
//!
//! The emitter runs every listener on its own thread, so delivery is
//! asynchronous: `publish` returns before any listener has run.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use event_emitter_rs::EventEmitter;
use tracing::debug;

use super::{Listener, PublishError, Publisher, Subscriber, SubscriptionId};

struct Shared {
    emitter: EventEmitter,
    /// Listener id -> topic, for every listener this bus attached
    attached: HashMap<String, String>,
}

impl Shared {
    fn detach(&mut self, id: &str) -> Option<String> {
        let topic = self.attached.remove(id)?;
        let _ = self.emitter.remove_listener(id);
        Some(topic)
    }
}

/// Pub/sub bus backed by a Node-style `EventEmitter`.
///
/// Cloning yields another handle on the same emitter.
///
/// ## Example
///
/// ```no_run
/// use std::sync::Arc;
/// use emitter_rpc::bus::{EmitterBus, Publisher, Subscriber};
///
/// let bus = EmitterBus::new();
/// bus.subscribe("HEY", Arc::new(|payload| println!("{} bytes", payload.len())));
/// bus.publish("HEY", b"Hey Alice!".to_vec()).unwrap();
/// ```
#[derive(Clone)]
pub struct EmitterBus {
    shared: Arc<Mutex<Shared>>,
}

impl Default for EmitterBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EmitterBus {
    /// Create a bus over a fresh emitter.
    pub fn new() -> Self {
        Self::from_emitter(EventEmitter::new())
    }

    /// Wrap an existing emitter, keeping the listeners already attached to it.
    pub fn from_emitter(emitter: EventEmitter) -> Self {
        Self {
            shared: Arc::new(Mutex::new(Shared {
                emitter,
                attached: HashMap::new(),
            })),
        }
    }

    /// Number of listeners this bus has attached to a topic.
    pub fn listener_count(&self, topic: &str) -> usize {
        self.lock().attached.values().filter(|t| *t == topic).count()
    }

    fn lock(&self) -> MutexGuard<'_, Shared> {
        self.shared.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn on(
        &self,
        topic: &str,
        callback: impl Fn(Vec<u8>) + Send + Sync + 'static,
    ) -> SubscriptionId {
        let mut shared = self.lock();
        let id = shared.emitter.on(topic, callback);
        shared.attached.insert(id.clone(), topic.to_string());
        debug!(topic, subscription = %id, "Emitter listener attached");
        SubscriptionId::new(id)
    }
}

impl Publisher for EmitterBus {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        self.shared
            .lock()
            .map_err(|_| PublishError::Poisoned)?
            .emitter
            .emit(topic, payload);
        Ok(())
    }
}

impl Subscriber for EmitterBus {
    fn has_listeners(&self, topic: &str) -> bool {
        self.listener_count(topic) > 0
    }

    fn subscribe(&self, topic: &str, listener: Listener) -> SubscriptionId {
        self.on(topic, move |payload: Vec<u8>| listener(payload))
    }

    fn subscribe_once(&self, topic: &str, listener: Listener) -> SubscriptionId {
        // Listener threads race each other, so the flag decides who fires and
        // the winner detaches the listener from the emitter.
        let fired = Arc::new(AtomicBool::new(false));
        let own_id: Arc<Mutex<Option<String>>> = Arc::new(Mutex::new(None));
        let shared: Weak<Mutex<Shared>> = Arc::downgrade(&self.shared);

        let slot = Arc::clone(&own_id);
        let id = self.on(topic, move |payload: Vec<u8>| {
            if fired.swap(true, Ordering::AcqRel) {
                return;
            }
            let id = slot.lock().unwrap_or_else(PoisonError::into_inner).take();
            if let (Some(id), Some(shared)) = (id, shared.upgrade()) {
                shared
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .detach(&id);
            }
            listener(payload);
        });

        *own_id.lock().unwrap_or_else(PoisonError::into_inner) = Some(id.as_str().to_string());
        id
    }

    fn unsubscribe(&self, topic: &str, id: &SubscriptionId) -> bool {
        let removed = self.lock().detach(id.as_str()).is_some();
        if removed {
            debug!(topic, subscription = %id, "Emitter listener detached");
        }
        removed
    }
}
