//! Single-handler-per-topic table shared by `Responder` and `Receiver`.
//!
//! Each instance owns its own table; nothing here is global. A topic holds
//! zero or one handler at any instant. Every slot carries a generation token
//! so that cancelling a stale registration can never vacate a newer one.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use crate::bus::SubscriptionId;
use crate::error::RegistrationError;

struct Slot<H: ?Sized> {
    token: u64,
    handler: Arc<H>,
}

pub(crate) struct HandlerRegistry<H: ?Sized> {
    slots: Mutex<HashMap<String, Slot<H>>>,
    next_token: AtomicU64,
}

impl<H: ?Sized> HandlerRegistry<H> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Mutex::new(HashMap::new()),
            next_token: AtomicU64::new(1),
        }
    }

    fn slots(&self) -> MutexGuard<'_, HashMap<String, Slot<H>>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Occupy `topic`, failing if it already has a handler.
    pub(crate) fn register(&self, topic: &str, handler: Arc<H>) -> Result<u64, RegistrationError> {
        let mut slots = self.slots();
        if slots.contains_key(topic) {
            return Err(RegistrationError::AlreadyRegistered(topic.to_string()));
        }

        let token = self.next_token.fetch_add(1, Ordering::Relaxed);
        slots.insert(topic.to_string(), Slot { token, handler });
        debug!(topic, token, "Handler registered");
        Ok(token)
    }

    /// The active handler for `topic`, if any.
    pub(crate) fn get(&self, topic: &str) -> Option<Arc<H>> {
        self.slots().get(topic).map(|slot| Arc::clone(&slot.handler))
    }

    /// Empty the slot, but only if it still holds the registration `token`.
    pub(crate) fn vacate(&self, topic: &str, token: u64) -> bool {
        let mut slots = self.slots();
        match slots.get(topic) {
            Some(slot) if slot.token == token => {
                slots.remove(topic);
                debug!(topic, token, "Handler slot vacated");
                true
            }
            _ => false,
        }
    }

    pub(crate) fn topics(&self) -> Vec<String> {
        let mut topics: Vec<String> = self.slots().keys().cloned().collect();
        topics.sort();
        topics
    }
}

/// Bus subscriptions made on behalf of registrations, keyed by registration token.
pub(crate) struct SubscriptionBook {
    entries: Mutex<HashMap<u64, (String, SubscriptionId)>>,
}

impl SubscriptionBook {
    pub(crate) fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<u64, (String, SubscriptionId)>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn insert(&self, token: u64, topic: &str, id: SubscriptionId) {
        self.entries().insert(token, (topic.to_string(), id));
    }

    pub(crate) fn remove(&self, token: u64) -> Option<(String, SubscriptionId)> {
        self.entries().remove(&token)
    }

    pub(crate) fn drain(&self) -> Vec<(String, SubscriptionId)> {
        self.entries().drain().map(|(_, entry)| entry).collect()
    }
}

type CancelFn = Box<dyn FnOnce() + Send>;

/// Cancellation capability returned when a handler is registered.
///
/// `cancel` stops further dispatch to the handler and frees the topic for a
/// new registration. Calls already dispatched to the handler run to
/// completion. Dropping the registration cancels it as well.
#[must_use = "dropping a Registration cancels it"]
pub struct Registration {
    topic: String,
    cancel: Mutex<Option<CancelFn>>,
}

impl Registration {
    pub(crate) fn new(topic: impl Into<String>, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            topic: topic.into(),
            cancel: Mutex::new(Some(Box::new(cancel))),
        }
    }

    /// Topic this registration occupies.
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// `false` once cancelled.
    pub fn is_active(&self) -> bool {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Cancel the registration. Further calls are no-ops.
    pub fn cancel(&self) {
        let cancel = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(cancel) = cancel {
            cancel();
        }
    }
}

impl Drop for Registration {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Registration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Registration")
            .field("topic", &self.topic)
            .field("active", &self.is_active())
            .finish()
    }
}
