//! One-way messages: publish and forget.
//!
//! Same one-handler-per-topic rule as the request/response side, but no
//! correlation id, no reply and no timeout.

mod receiver;
mod sender;

pub use receiver::Receiver;
pub use sender::Sender;
