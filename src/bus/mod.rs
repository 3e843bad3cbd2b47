//! Bus - the publish/subscribe transport the protocol runs on
//!
//! The request/response protocol only consumes this interface; it never
//! assumes ordering across topics, only that a single listener sees the
//! events of its topic in publish order.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────┐   ┌──────────────────────────────┐
//! │ Requester / Sender           │   │ Responder / Receiver         │
//! └──────────────────────────────┘   └──────────────────────────────┘
//!                 │                                  │
//!                 ▼                                  ▼
//! ┌─────────────────────────────────────────────────────────────────┐
//! │                  Publisher + Subscriber Traits                   │
//! │  Publisher:  publish(topic, payload)                             │
//! │  Subscriber: subscribe / subscribe_once / unsubscribe            │
//! └─────────────────────────────────────────────────────────────────┘
//!          │                       │                      │
//!          ▼                       ▼                      ▼
//! ┌─────────────────┐   ┌─────────────────────┐   ┌─────────────────┐
//! │  InMemoryBus    │   │  EmitterBus         │   │  NATS / Redis   │
//! │  (synchronous)  │   │  (emitter threads)  │   │   (external)    │
//! └─────────────────┘   └─────────────────────┘   └─────────────────┘
//! ```

#[cfg(feature = "emitter")]
mod emitter_bus;
mod in_memory_bus;
mod publisher;
mod subscriber;

#[cfg(feature = "emitter")]
pub use emitter_bus::EmitterBus;
pub use in_memory_bus::{InMemoryBus, PublishedEvent};
pub use publisher::{PublishError, Publisher};
pub use subscriber::{Listener, Subscriber, Subscription, SubscriptionId};

/// Combined trait for bidirectional bus communication.
pub trait EventBus: Publisher + Subscriber {}

// Blanket implementation
impl<T: Publisher + Subscriber> EventBus for T {}
