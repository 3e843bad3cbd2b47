//! Receiving one-way messages with one handler per topic.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Weak};

use serde::de::DeserializeOwned;
use tracing::{debug, error, trace, warn};

use crate::bus::{EventBus, Listener};
use crate::contract::Message;
use crate::envelope::{decode_payload, MessageEnvelope};
use crate::error::RegistrationError;
use crate::registry::{HandlerRegistry, Registration, SubscriptionBook};

type MessageHandler = dyn Fn(&[u8]) + Send + Sync;

struct Inner<B: EventBus> {
    bus: Arc<B>,
    handlers: HandlerRegistry<MessageHandler>,
    subscriptions: SubscriptionBook,
}

impl<B: EventBus> Inner<B> {
    fn on_message(&self, bytes: &[u8]) {
        let message = match MessageEnvelope::decode(bytes) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable message");
                return;
            }
        };

        let Some(handler) = self.handlers.get(&message.topic) else {
            trace!(topic = %message.topic, "No receiver for message");
            return;
        };

        if catch_unwind(AssertUnwindSafe(|| handler(&message.payload))).is_err() {
            error!(topic = %message.topic, "Receiver panicked");
        }
    }

    fn cancel(&self, topic: &str, token: u64) {
        if let Some((channel, id)) = self.subscriptions.remove(token) {
            self.bus.unsubscribe(&channel, &id);
        }
        if self.handlers.vacate(topic, token) {
            debug!(topic, "Receiver cancelled");
        }
    }
}

/// Dispatches one-way messages to at most one handler per topic.
///
/// Handlers run synchronously on the thread the bus delivers on. Messages
/// for topics without a handler are dropped.
pub struct Receiver<B: EventBus + 'static> {
    inner: Arc<Inner<B>>,
}

impl<B: EventBus + 'static> Receiver<B> {
    pub fn new(bus: Arc<B>) -> Self {
        Self {
            inner: Arc::new(Inner {
                bus,
                handlers: HandlerRegistry::new(),
                subscriptions: SubscriptionBook::new(),
            }),
        }
    }

    pub fn bus(&self) -> &Arc<B> {
        &self.inner.bus
    }

    /// Topics that currently have a handler, sorted.
    pub fn topics(&self) -> Vec<String> {
        self.inner.handlers.topics()
    }

    /// Register the handler for `topic`.
    ///
    /// Fails with `AlreadyRegistered` if the topic already has a handler.
    /// Messages that do not decode into `M` are logged and dropped.
    pub fn add_receiver<M, F>(&self, topic: &str, handler: F) -> Result<Registration, RegistrationError>
    where
        M: DeserializeOwned + 'static,
        F: Fn(M) + Send + Sync + 'static,
    {
        let owned_topic = topic.to_string();
        let decode_topic = owned_topic.clone();
        let handler: Arc<MessageHandler> = Arc::new(move |payload: &[u8]| {
            match decode_payload::<M>(payload) {
                Ok(message) => handler(message),
                Err(e) => warn!(topic = %decode_topic, error = %e, "Dropping message"),
            }
        });

        let token = self.inner.handlers.register(topic, handler)?;
        let id = self.inner.bus.subscribe(topic, message_listener(&self.inner));
        self.inner.subscriptions.insert(token, topic, id);

        let inner = Arc::downgrade(&self.inner);
        Ok(Registration::new(topic, move || {
            if let Some(inner) = inner.upgrade() {
                inner.cancel(&owned_topic, token);
            }
        }))
    }

    /// Typed form of [`add_receiver`](Self::add_receiver) for a [`Message`].
    pub fn hear<M, F>(&self, handler: F) -> Result<Registration, RegistrationError>
    where
        M: Message,
        F: Fn(M) + Send + Sync + 'static,
    {
        self.add_receiver(M::TOPIC, handler)
    }
}

impl<B: EventBus + 'static> Drop for Receiver<B> {
    fn drop(&mut self) {
        for (topic, id) in self.inner.subscriptions.drain() {
            self.inner.bus.unsubscribe(&topic, &id);
        }
    }
}

fn message_listener<B: EventBus + 'static>(inner: &Arc<Inner<B>>) -> Listener {
    let inner: Weak<Inner<B>> = Arc::downgrade(inner);
    Arc::new(move |bytes: Vec<u8>| {
        if let Some(inner) = inner.upgrade() {
            inner.on_message(&bytes);
        }
    })
}
