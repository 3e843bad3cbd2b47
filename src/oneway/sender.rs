//! Fire-and-forget publishing of one-way messages.

use std::sync::Arc;

use serde::Serialize;
use tracing::debug;

use crate::bus::EventBus;
use crate::contract::Message;
use crate::envelope::{encode_payload, MessageEnvelope};
use crate::error::SendError;

/// Publishes one-way messages. Nothing is acknowledged and nothing is
/// waited for; a message nobody listens to is simply lost.
pub struct Sender<B: EventBus> {
    bus: Arc<B>,
}

impl<B: EventBus> Sender<B> {
    pub fn new(bus: Arc<B>) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &Arc<B> {
        &self.bus
    }

    /// Publish `message` under `topic`.
    pub fn send<M: Serialize + ?Sized>(&self, topic: &str, message: &M) -> Result<(), SendError> {
        let envelope = MessageEnvelope::new(topic, encode_payload(message)?).encode()?;
        self.bus.publish(topic, envelope)?;
        debug!(topic, "Message sent");
        Ok(())
    }

    /// Typed form of [`send`](Self::send) for a [`Message`].
    pub fn tell<M: Message>(&self, message: &M) -> Result<(), SendError> {
        self.send(M::TOPIC, message)
    }
}

impl<B: EventBus> Clone for Sender<B> {
    fn clone(&self) -> Self {
        Self {
            bus: Arc::clone(&self.bus),
        }
    }
}
