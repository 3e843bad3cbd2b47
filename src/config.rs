//! Configuration for requesters and responders.
//!
//! Both structs deserialize with defaults for missing fields, so they can be
//! embedded in a host application's configuration file:
//!
//! ```
//! use std::time::Duration;
//! use emitter_rpc::{RequesterConfig, Transport};
//!
//! let config: RequesterConfig = serde_json::from_str(
//!     r#"{ "timeout_ms": 500, "transport": { "kind": "shared", "channel": "svc" } }"#,
//! ).unwrap();
//!
//! assert_eq!(config.timeout, Duration::from_millis(500));
//! assert_eq!(config.transport, Transport::shared_on("svc"));
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::transport::Transport;

/// Default time a requester waits for a reply.
pub const DEFAULT_TIMEOUT_MS: u64 = 2000;

/// Requester settings. There is deliberately no retry or backoff setting:
/// a caller that wants another attempt calls `request` again.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequesterConfig {
    /// How long a call waits for its reply.
    #[serde(rename = "timeout_ms", with = "millis")]
    pub timeout: Duration,
    /// Where requests and replies travel.
    pub transport: Transport,
}

impl Default for RequesterConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_millis(DEFAULT_TIMEOUT_MS),
            transport: Transport::Direct,
        }
    }
}

impl RequesterConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }
}

/// Responder settings.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResponderConfig {
    /// Where requests arrive and replies are sent.
    pub transport: Transport,
}

impl ResponderConfig {
    pub fn with_transport(mut self, transport: Transport) -> Self {
        self.transport = transport;
        self
    }
}

mod millis {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
