use std::time::Duration;

use thiserror::Error;

use crate::bus::PublishError;
use crate::envelope::EnvelopeError;

/// Error raised when attaching a handler to a topic.
///
/// These are programmer errors and surface at registration time, never later
/// at request time.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistrationError {
    /// The topic already has an active handler on this instance.
    #[error("a handler is already registered for topic {0:?}")]
    AlreadyRegistered(String),
    /// Another responder already serves the shared request channel.
    #[error("shared channel {0:?} is already served by another responder")]
    ChannelTaken(String),
    /// Async handlers need a Tokio runtime to run on.
    #[error("registering an async handler requires a running Tokio runtime")]
    NoRuntime,
}

/// Error returned by a request that did not produce a response.
///
/// Every variant is local to one call: other in-flight calls and the
/// responder's availability are unaffected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// No reply arrived within the requester's timeout.
    #[error("request to {topic:?} timed out after {after:?}")]
    Timeout { topic: String, after: Duration },
    /// A shared-channel responder reported that nobody handles the topic.
    #[error("no responder for {0}")]
    NoResponder(String),
    /// The responder's handler failed; `reason` is its stringified error.
    #[error("handler for {topic:?} failed: {reason}")]
    Handler { topic: String, reason: String },
    /// The request payload could not be encoded.
    #[error("could not encode request to {topic:?}: {source}")]
    Encode {
        topic: String,
        #[source]
        source: EnvelopeError,
    },
    /// The reply payload did not decode into the expected response type.
    #[error("could not decode reply from {topic:?}: {source}")]
    Decode {
        topic: String,
        #[source]
        source: EnvelopeError,
    },
    /// The id generator kept producing ids of calls that are still pending.
    #[error("no free correlation id for {topic:?} after {attempts} attempts, last was {last}")]
    IdCollision {
        topic: String,
        attempts: usize,
        last: String,
    },
    /// The bus refused the request.
    #[error("could not publish request to {topic:?}: {source}")]
    Publish {
        topic: String,
        #[source]
        source: PublishError,
    },
}

impl RequestError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, RequestError::Timeout { .. })
    }

    /// Topic of the failed call.
    pub fn topic(&self) -> &str {
        match self {
            RequestError::Timeout { topic, .. }
            | RequestError::Handler { topic, .. }
            | RequestError::Encode { topic, .. }
            | RequestError::Decode { topic, .. }
            | RequestError::IdCollision { topic, .. }
            | RequestError::Publish { topic, .. } => topic,
            RequestError::NoResponder(topic) => topic,
        }
    }
}

/// Error returned by a one-way send.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SendError {
    #[error("could not encode message: {0}")]
    Encode(#[from] EnvelopeError),
    #[error("could not publish message: {0}")]
    Publish(#[from] PublishError),
}
