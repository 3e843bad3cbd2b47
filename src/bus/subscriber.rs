//! Core subscriber trait for the bus.

use std::fmt;
use std::sync::Arc;

/// Callback invoked with the raw payload of every event delivered on a topic.
pub type Listener = Arc<dyn Fn(Vec<u8>) + Send + Sync>;

/// Opaque handle identifying one listener on one bus.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(String);

impl SubscriptionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Trait for subscribing to topics on a pub/sub bus.
///
/// This is a push-based interface: listeners are called by the bus. Several
/// listeners may be attached to the same topic at once, and each one sees
/// the events of that topic in publish order.
pub trait Subscriber: Send + Sync {
    /// Attach a listener to a topic until it is unsubscribed.
    fn subscribe(&self, topic: &str, listener: Listener) -> SubscriptionId;

    /// Attach a listener that is detached automatically after its first delivery.
    fn subscribe_once(&self, topic: &str, listener: Listener) -> SubscriptionId;

    /// Detach a listener. Returns `false` when it was already gone.
    fn unsubscribe(&self, topic: &str, id: &SubscriptionId) -> bool;

    /// Whether any listener is currently attached to `topic`.
    fn has_listeners(&self, topic: &str) -> bool;
}

/// A cancellable subscription: unsubscribes when cancelled or dropped.
#[must_use = "dropping a Subscription unsubscribes its listener"]
pub struct Subscription<S: Subscriber + ?Sized> {
    subscriber: Arc<S>,
    topic: String,
    id: Option<SubscriptionId>,
}

impl<S: Subscriber + ?Sized> Subscription<S> {
    /// Subscribe `listener` to `topic` and wrap the result in a guard.
    pub fn attach(subscriber: Arc<S>, topic: &str, listener: Listener) -> Self {
        let id = subscriber.subscribe(topic, listener);
        Self {
            subscriber,
            topic: topic.to_string(),
            id: Some(id),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn id(&self) -> Option<&SubscriptionId> {
        self.id.as_ref()
    }

    /// Detach the listener. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(id) = self.id.take() {
            self.subscriber.unsubscribe(&self.topic, &id);
        }
    }
}

impl<S: Subscriber + ?Sized> Drop for Subscription<S> {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl<S: Subscriber + ?Sized> fmt::Debug for Subscription<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("topic", &self.topic)
            .field("id", &self.id)
            .finish()
    }
}
