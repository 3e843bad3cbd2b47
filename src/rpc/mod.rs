//! Request/response over a pub/sub bus.
//!
//! A [`Requester`] publishes a request carrying a fresh correlation id and
//! waits for the reply with the same id; a [`Responder`] runs the handler
//! registered for the request's topic and publishes its outcome back.
//!
//! ```text
//!  Requester                     bus                      Responder
//!  ─────────                     ───                      ─────────
//!  request(topic, payload)
//!    pending[id] = waiting
//!    publish ──────────── RequestEnvelope{topic, id} ──────▶ handler(payload)
//!                                                               │
//!    on_reply ◀───────── ReplyEnvelope{id, outcome} ◀──────────┘
//!    pending[id] settled
//! ```
//!
//! Calls settle exactly once: by their reply, by their timeout, or by the
//! caller dropping the request future. Whichever comes first removes the
//! pending entry; the others find nothing left to do.

mod pending;
mod requester;
mod responder;

pub use requester::Requester;
pub use responder::Responder;
