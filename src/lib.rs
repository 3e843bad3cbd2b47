//! Request/response and one-way messaging over a publish/subscribe bus.
//!
//! ```ignore
//! let bus = Arc::new(InMemoryBus::new());
//!
//! let responder = Responder::new(bus.clone());
//! let _registration = responder.add_sync_responder("HOW_ARE_YOU", |_: Value| {
//!     Ok::<_, Infallible>(json!({ "good": true }))
//! })?;
//!
//! let requester = Requester::new(bus.clone());
//! let answer: Value = requester.request("HOW_ARE_YOU", &json!({})).await?;
//! ```

pub mod bus;
mod config;
mod contract;
mod correlation;
pub mod envelope;
mod error;
pub mod oneway;
mod registry;
pub mod rpc;
pub mod transport;

pub use config::{RequesterConfig, ResponderConfig, DEFAULT_TIMEOUT_MS};
pub use contract::{Contract, Message};
pub use correlation::{CorrelationId, IdGenerator, RandomIds, SequentialIds};
pub use error::{RegistrationError, RequestError, SendError};
pub use oneway::{Receiver, Sender};
pub use registry::Registration;
pub use rpc::{Requester, Responder};
pub use transport::{Transport, DEFAULT_SHARED_CHANNEL};

// Re-export the EventEmitter from the event_emitter_rs crate
#[cfg(feature = "emitter")]
pub use event_emitter_rs::EventEmitter;
