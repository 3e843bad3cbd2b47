//! Core publisher trait for the bus.

use thiserror::Error;

/// Error type for publish operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PublishError {
    /// The bus refused the event.
    #[error("event rejected: {0}")]
    Rejected(String),
    /// A lock inside the bus was poisoned by a panicking listener.
    #[error("bus state poisoned")]
    Poisoned,
}

/// Trait for publishing events to a topic on a pub/sub bus.
///
/// Publishing is fire-and-forget: `Ok(())` means the bus accepted the event,
/// not that anybody received it. Delivery goes to the listeners subscribed to
/// that exact topic string at the time of publishing, synchronously or
/// asynchronously at the implementation's discretion.
///
/// Implementations might include:
/// - `InMemoryBus` - For testing and single-process scenarios
/// - `EmitterBus` - Over an `event_emitter_rs::EventEmitter`
/// - A broker-backed bus (NATS, Redis pub/sub) - For distributed deployments
pub trait Publisher: Send + Sync {
    /// Publish a payload on a topic.
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError>;
}
