//! Envelopes the protocol puts on the bus.
//!
//! Envelopes are framed with bitcode. The user payload inside an envelope is
//! JSON so that any serde type, `serde_json::Value` included, can travel.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::correlation::CorrelationId;

/// Error when framing or unframing envelopes and payloads.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    #[error("envelope encoding failed: {0}")]
    Frame(String),
    #[error("envelope decoding failed: {0}")]
    Unframe(String),
    #[error("payload encoding failed: {0}")]
    EncodePayload(String),
    #[error("payload decoding failed: {0}")]
    DecodePayload(String),
}

/// Encode a user payload.
pub fn encode_payload<T: Serialize + ?Sized>(payload: &T) -> Result<Vec<u8>, EnvelopeError> {
    serde_json::to_vec(payload).map_err(|e| EnvelopeError::EncodePayload(e.to_string()))
}

/// Decode a user payload.
pub fn decode_payload<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, EnvelopeError> {
    serde_json::from_slice(bytes).map_err(|e| EnvelopeError::DecodePayload(e.to_string()))
}

fn frame<T: Serialize>(envelope: &T) -> Result<Vec<u8>, EnvelopeError> {
    bitcode::serialize(envelope).map_err(|e| EnvelopeError::Frame(e.to_string()))
}

fn unframe<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, EnvelopeError> {
    bitcode::deserialize(bytes).map_err(|e| EnvelopeError::Unframe(e.to_string()))
}

/// A request travelling from a requester to a responder.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub topic: String,
    pub correlation_id: CorrelationId,
    pub payload: Vec<u8>,
}

impl RequestEnvelope {
    pub fn new(topic: impl Into<String>, correlation_id: CorrelationId, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            correlation_id,
            payload,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        frame(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        unframe(bytes)
    }
}

/// How a request ended on the responder side.
///
/// Exactly one of result or failure travels back, so a requester never has
/// to guess whether a payload is an answer or an error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    /// The handler's answer, as a JSON payload.
    Result(Vec<u8>),
    /// The handler failed; the reason is its stringified error.
    Failure(String),
    /// Nobody is registered for the topic.
    NoResponder(String),
}

/// A reply travelling from a responder back to the requester.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    pub correlation_id: CorrelationId,
    pub outcome: Outcome,
}

impl ReplyEnvelope {
    pub fn result(correlation_id: CorrelationId, payload: Vec<u8>) -> Self {
        Self {
            correlation_id,
            outcome: Outcome::Result(payload),
        }
    }

    pub fn failure(correlation_id: CorrelationId, reason: impl Into<String>) -> Self {
        Self {
            correlation_id,
            outcome: Outcome::Failure(reason.into()),
        }
    }

    pub fn no_responder(correlation_id: CorrelationId, topic: impl Into<String>) -> Self {
        Self {
            correlation_id,
            outcome: Outcome::NoResponder(topic.into()),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        frame(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        unframe(bytes)
    }
}

/// A one-way message. Carries no correlation id and expects no reply.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageEnvelope {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl MessageEnvelope {
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            topic: topic.into(),
            payload,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, EnvelopeError> {
        frame(self)
    }

    pub fn decode(bytes: &[u8]) -> Result<Self, EnvelopeError> {
        unframe(bytes)
    }
}
