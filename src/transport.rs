//! The two shapes a request/response exchange can take on the bus.
//!
//! Both shapes are kept on purpose; they differ in what a requester observes
//! when nobody answers a topic.
//!
//! | Shape    | Request published on | Reply published on             | No responder            |
//! |----------|----------------------|--------------------------------|-------------------------|
//! | `Direct` | the topic itself     | `<topic>_response_<id>`        | requester times out     |
//! | `Shared` | the shared channel   | `<channel>_response`, id inside | immediate failure reply |

use serde::{Deserialize, Serialize};

use crate::correlation::CorrelationId;

/// Channel used by `Transport::shared()`.
pub const DEFAULT_SHARED_CHANNEL: &str = "rpc.requests";

/// Where requests and replies travel on the bus.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Transport {
    /// Requests go straight to the topic; each call gets its own reply topic.
    ///
    /// Only a registered responder listens on a topic, so a request for an
    /// unregistered topic goes unanswered and the requester times out.
    #[default]
    Direct,
    /// Requests for every topic go through one channel served by a responder,
    /// which answers unknown topics with a "no responder" failure.
    ///
    /// A channel has exactly one responder: since that responder speaks for
    /// every topic on it, a second one would answer "no responder" for the
    /// first one's topics. Responders that must stay independent on one bus
    /// use distinct channels; `Responder::with_config` refuses a channel that
    /// is already served.
    Shared { channel: String },
}

impl Transport {
    /// The shared shape on [`DEFAULT_SHARED_CHANNEL`].
    pub fn shared() -> Self {
        Self::Shared {
            channel: DEFAULT_SHARED_CHANNEL.to_string(),
        }
    }

    /// The shared shape on a named channel.
    pub fn shared_on(channel: impl Into<String>) -> Self {
        Self::Shared {
            channel: channel.into(),
        }
    }

    /// Topic a request for `topic` is published on.
    pub fn request_channel<'a>(&'a self, topic: &'a str) -> &'a str {
        match self {
            Transport::Direct => topic,
            Transport::Shared { channel } => channel.as_str(),
        }
    }

    /// Topic the reply to a request `(topic, id)` is published on.
    pub fn reply_channel(&self, topic: &str, id: &CorrelationId) -> String {
        match self {
            Transport::Direct => format!("{}_response_{}", topic, id),
            Transport::Shared { channel } => shared_reply_channel(channel),
        }
    }

    pub fn is_shared(&self) -> bool {
        matches!(self, Transport::Shared { .. })
    }
}

/// The single reply topic of a shared channel.
pub fn shared_reply_channel(channel: &str) -> String {
    format!("{}_response", channel)
}
