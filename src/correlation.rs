//! Correlation ids linking a request to its reply.
//!
//! An id only has to be unique among the calls a single requester has in
//! flight. Ids are never persisted and never reused.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque token correlating one request with its reply.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(String);

impl CorrelationId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Source of correlation ids for a requester.
pub trait IdGenerator: Send + Sync {
    /// Produce a fresh id.
    fn next_id(&self) -> CorrelationId;
}

/// 128 random bits per id, rendered as a 22 character URL-safe token.
///
/// Collisions are negligible without any bookkeeping, which also makes these
/// ids safe to use across processes sharing a distributed bus.
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIds;

impl IdGenerator for RandomIds {
    fn next_id(&self) -> CorrelationId {
        CorrelationId(URL_SAFE_NO_PAD.encode(Uuid::new_v4().as_bytes()))
    }
}

/// A random per-instance prefix followed by a monotonic counter.
///
/// Ids from one generator can never repeat (short of wrapping a `u64`), and
/// the prefix keeps two generators on the same bus apart.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: AtomicU64,
}

impl SequentialIds {
    pub fn new() -> Self {
        let bytes = Uuid::new_v4();
        Self::with_prefix(URL_SAFE_NO_PAD.encode(&bytes.as_bytes()[..8]))
    }

    /// Use a fixed prefix, e.g. a process or node name.
    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: AtomicU64::new(0),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }
}

impl Default for SequentialIds {
    fn default() -> Self {
        Self::new()
    }
}

impl IdGenerator for SequentialIds {
    fn next_id(&self) -> CorrelationId {
        let seq = self.next.fetch_add(1, Ordering::Relaxed);
        CorrelationId(format!("{}.{}", self.prefix, seq))
    }
}
