//! Request/response integration tests.

mod support;
mod request_response;
mod registration;
mod timeouts;

#[cfg(feature = "emitter")]
mod emitter;
