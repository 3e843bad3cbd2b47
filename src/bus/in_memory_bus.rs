//! In-memory bus for testing and single-process scenarios.
//!
//! This module provides a thread-safe in-process pub/sub bus that implements
//! both `Publisher` and `Subscriber`, useful for:
//! - Unit and integration testing without external dependencies
//! - Single-process applications wiring requesters and responders together
//! - Development and prototyping

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock};

use tracing::{debug, trace};

use super::{Listener, PublishError, Publisher, Subscriber, SubscriptionId};

/// A payload published on the bus, kept in the bus log.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PublishedEvent {
    /// Topic the payload was published on
    pub topic: String,
    /// Raw payload bytes
    pub payload: Vec<u8>,
    /// Number of listeners the payload was handed to
    pub delivered_to: usize,
}

struct Entry {
    id: SubscriptionId,
    listener: Listener,
    once: bool,
}

/// In-memory pub/sub bus.
///
/// Features:
/// - Thread-safe (handles share state via `Clone`)
/// - Multiple listeners per topic
/// - Synchronous delivery: listeners run inside `publish`, in subscription order
/// - Every publish is recorded in a log for inspection
///
/// ## Example
///
/// ```
/// use std::sync::{Arc, Mutex};
/// use emitter_rpc::bus::{InMemoryBus, Publisher, Subscriber};
///
/// let bus = InMemoryBus::new();
/// let seen = Arc::new(Mutex::new(Vec::new()));
///
/// let sink = seen.clone();
/// bus.subscribe("greeting", Arc::new(move |payload| sink.lock().unwrap().push(payload)));
/// bus.publish("greeting", b"hey".to_vec()).unwrap();
///
/// assert_eq!(seen.lock().unwrap().as_slice(), &[b"hey".to_vec()]);
/// assert_eq!(bus.topics(), vec!["greeting"]);
/// ```
#[derive(Clone)]
pub struct InMemoryBus {
    /// Listeners by exact topic
    listeners: Arc<RwLock<HashMap<String, Vec<Entry>>>>,
    /// Append-only publish log
    log: Arc<Mutex<Vec<PublishedEvent>>>,
    /// Source of subscription ids
    next_id: Arc<AtomicU64>,
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBus {
    /// Create a new, empty bus.
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(RwLock::new(HashMap::new())),
            log: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Get all events in the publish log.
    pub fn events(&self) -> Vec<PublishedEvent> {
        self.log().clone()
    }

    /// Get all published topics in order.
    pub fn topics(&self) -> Vec<String> {
        self.log().iter().map(|e| e.topic.clone()).collect()
    }

    /// Find the first event published on a topic.
    pub fn find_by_topic(&self, topic: &str) -> Option<PublishedEvent> {
        self.log().iter().find(|e| e.topic == topic).cloned()
    }

    /// Find all events published on topics starting with `prefix`.
    pub fn find_all_by_prefix(&self, prefix: &str) -> Vec<PublishedEvent> {
        self.log()
            .iter()
            .filter(|e| e.topic.starts_with(prefix))
            .cloned()
            .collect()
    }

    /// Number of listeners currently attached to a topic.
    pub fn listener_count(&self, topic: &str) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(topic)
            .map_or(0, Vec::len)
    }

    /// Number of listeners across all topics.
    pub fn total_listeners(&self) -> usize {
        self.listeners
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .map(Vec::len)
            .sum()
    }

    /// Get the total number of published events.
    pub fn len(&self) -> usize {
        self.log().len()
    }

    /// Check if nothing has been published yet.
    pub fn is_empty(&self) -> bool {
        self.log().is_empty()
    }

    /// Clear the publish log (useful for test cleanup). Listeners stay attached.
    pub fn clear(&self) {
        self.log().clear();
    }

    fn log(&self) -> MutexGuard<'_, Vec<PublishedEvent>> {
        // A listener panicking mid-publish must not make the log unreadable.
        self.log.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn attach(&self, topic: &str, listener: Listener, once: bool) -> SubscriptionId {
        let id = SubscriptionId::new(format!(
            "sub-{}",
            self.next_id.fetch_add(1, Ordering::Relaxed)
        ));
        self.listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(topic.to_string())
            .or_default()
            .push(Entry {
                id: id.clone(),
                listener,
                once,
            });

        debug!(topic, subscription = %id, once, "Listener attached");
        id
    }
}

impl Publisher for InMemoryBus {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        // Collect under the lock, call outside of it: listeners are free to
        // subscribe, unsubscribe and publish themselves.
        let targets: Vec<Listener> = {
            let mut listeners = self.listeners.write().map_err(|_| PublishError::Poisoned)?;
            match listeners.get_mut(topic) {
                Some(entries) => {
                    let targets = entries.iter().map(|e| Arc::clone(&e.listener)).collect();
                    entries.retain(|e| !e.once);
                    if entries.is_empty() {
                        listeners.remove(topic);
                    }
                    targets
                }
                None => Vec::new(),
            }
        };

        trace!(topic, receivers = targets.len(), "Event published");

        self.log().push(PublishedEvent {
            topic: topic.to_string(),
            payload: payload.clone(),
            delivered_to: targets.len(),
        });

        for listener in targets {
            listener(payload.clone());
        }
        Ok(())
    }
}

impl Subscriber for InMemoryBus {
    fn has_listeners(&self, topic: &str) -> bool {
        self.listener_count(topic) > 0
    }

    fn subscribe(&self, topic: &str, listener: Listener) -> SubscriptionId {
        self.attach(topic, listener, false)
    }

    fn subscribe_once(&self, topic: &str, listener: Listener) -> SubscriptionId {
        self.attach(topic, listener, true)
    }

    fn unsubscribe(&self, topic: &str, id: &SubscriptionId) -> bool {
        let mut listeners = self
            .listeners
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        let Some(entries) = listeners.get_mut(topic) else {
            return false;
        };

        let before = entries.len();
        entries.retain(|e| &e.id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            listeners.remove(topic);
        }

        if removed {
            debug!(topic, subscription = %id, "Listener detached");
        }
        removed
    }
}
