//! Typed protocol definitions.
//!
//! A [`Contract`] pins a topic to its request and response types so that both
//! sides of an exchange agree at compile time:
//!
//! ```
//! use serde::{Deserialize, Serialize};
//! use emitter_rpc::Contract;
//!
//! #[derive(Serialize, Deserialize)]
//! struct GetState { prop: String }
//!
//! #[derive(Serialize, Deserialize)]
//! struct State { value: i64 }
//!
//! struct GetStateContract;
//!
//! impl Contract for GetStateContract {
//!     const TOPIC: &'static str = "GET_STATE";
//!     type Request = GetState;
//!     type Response = State;
//! }
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A named request/response exchange.
pub trait Contract {
    /// Topic the exchange runs under.
    const TOPIC: &'static str;
    /// What the requester sends.
    type Request: Serialize + DeserializeOwned + Send + 'static;
    /// What the responder answers with.
    type Response: Serialize + DeserializeOwned + Send + 'static;
}

/// A named one-way message.
pub trait Message: Serialize + DeserializeOwned + Send + 'static {
    /// Topic the message is sent under.
    const TOPIC: &'static str;
}
