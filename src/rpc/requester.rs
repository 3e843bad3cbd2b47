//! Requester - issues named requests and waits for the correlated reply.
//!
//! ## Example
//!
//! ```ignore
//! let bus = Arc::new(InMemoryBus::new());
//! let requester = Requester::new(bus.clone());
//!
//! let reply: Value = requester.request("GREETING", &json!({ "greeting": "hey" })).await?;
//! ```

use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::sync::oneshot;
use tracing::{debug, trace, warn};

use super::pending::PendingCalls;
use crate::bus::{EventBus, Subscription};
use crate::config::RequesterConfig;
use crate::contract::Contract;
use crate::correlation::{CorrelationId, IdGenerator, RandomIds};
use crate::envelope::{decode_payload, encode_payload, Outcome, ReplyEnvelope, RequestEnvelope};
use crate::error::RequestError;
use crate::transport::{shared_reply_channel, Transport};

struct Inner<B: EventBus> {
    bus: Arc<B>,
    config: RequesterConfig,
    ids: Box<dyn IdGenerator>,
    pending: PendingCalls,
}

impl<B: EventBus> Inner<B> {
    /// Route a reply to its pending call, if that call is still waiting.
    fn on_reply(&self, bytes: &[u8]) {
        let reply = match ReplyEnvelope::decode(bytes) {
            Ok(reply) => reply,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable reply");
                return;
            }
        };

        let Some(call) = self.pending.take(&reply.correlation_id) else {
            // Late (timed out or abandoned) or addressed to another requester
            // on the same shared reply topic.
            trace!(correlation_id = %reply.correlation_id, "Reply has no pending call");
            return;
        };

        if let Some(subscription) = &call.subscription {
            self.bus.unsubscribe(&call.reply_channel, subscription);
        }
        debug!(
            topic = %call.topic,
            correlation_id = %reply.correlation_id,
            elapsed = ?call.started.elapsed(),
            "Reply settled call"
        );
        call.complete(reply.outcome);
    }

    /// Settle a call without a reply. Returns `true` if it was still pending.
    fn abandon(&self, id: &CorrelationId) -> bool {
        match self.pending.take(id) {
            Some(call) => {
                if let Some(subscription) = &call.subscription {
                    self.bus.unsubscribe(&call.reply_channel, subscription);
                }
                true
            }
            None => false,
        }
    }

    async fn await_outcome(
        &self,
        topic: &str,
        id: &CorrelationId,
        mut reply_rx: oneshot::Receiver<Outcome>,
    ) -> Result<Outcome, RequestError> {
        let timeout = self.config.timeout;
        let sleep = tokio::time::sleep(timeout);
        tokio::pin!(sleep);

        let received = tokio::select! {
            biased;
            received = &mut reply_rx => received,
            _ = &mut sleep => {
                if self.abandon(id) {
                    warn!(topic, correlation_id = %id, ?timeout, "Request timed out");
                    return Err(RequestError::Timeout {
                        topic: topic.to_string(),
                        after: timeout,
                    });
                }
                // The reply settled the call first and is already in the channel.
                reply_rx.await
            }
        };

        // The sender only disappears without a value if the entry was taken
        // by a path that does not complete it, which means nobody answered.
        received.map_err(|_| RequestError::Timeout {
            topic: topic.to_string(),
            after: timeout,
        })
    }
}

/// How many ids `request` draws before giving up on a generator that only
/// repeats ids of pending calls.
const MAX_ID_ATTEMPTS: usize = 8;

/// Settles the call as abandoned if the request future is dropped early.
struct PendingGuard<'a, B: EventBus> {
    inner: &'a Inner<B>,
    id: CorrelationId,
}

impl<B: EventBus> Drop for PendingGuard<'_, B> {
    fn drop(&mut self) {
        if self.inner.abandon(&self.id) {
            debug!(correlation_id = %self.id, "Pending call abandoned by caller");
        }
    }
}

/// Issues requests on a bus and resolves each with its correlated reply.
///
/// Every call gets a fresh correlation id and its own pending entry, so
/// concurrent calls never interfere; they complete in whatever order their
/// replies (or timeouts) arrive. No call is ever retried.
pub struct Requester<B: EventBus + 'static> {
    inner: Arc<Inner<B>>,
    /// Listener on the shared reply topic, for the shared transport.
    _reply_subscription: Option<Subscription<B>>,
}

impl<B: EventBus + 'static> Requester<B> {
    /// Requester with the default configuration: direct transport, 2000 ms timeout.
    pub fn new(bus: Arc<B>) -> Self {
        Self::with_config(bus, RequesterConfig::default())
    }

    /// Requester with a custom timeout and the direct transport.
    pub fn with_timeout(bus: Arc<B>, timeout: Duration) -> Self {
        Self::with_config(bus, RequesterConfig::default().with_timeout(timeout))
    }

    pub fn with_config(bus: Arc<B>, config: RequesterConfig) -> Self {
        Self::with_id_generator(bus, config, RandomIds)
    }

    /// Requester drawing correlation ids from `ids`.
    pub fn with_id_generator(
        bus: Arc<B>,
        config: RequesterConfig,
        ids: impl IdGenerator + 'static,
    ) -> Self {
        let inner = Arc::new(Inner {
            bus,
            config,
            ids: Box::new(ids),
            pending: PendingCalls::default(),
        });

        let reply_subscription = match &inner.config.transport {
            Transport::Direct => None,
            Transport::Shared { channel } => Some(Subscription::attach(
                Arc::clone(&inner.bus),
                &shared_reply_channel(channel),
                reply_listener(&inner),
            )),
        };

        Self {
            inner,
            _reply_subscription: reply_subscription,
        }
    }

    pub fn bus(&self) -> &Arc<B> {
        &self.inner.bus
    }

    pub fn timeout(&self) -> Duration {
        self.inner.config.timeout
    }

    pub fn transport(&self) -> &Transport {
        &self.inner.config.transport
    }

    /// Number of calls waiting for a reply.
    pub fn pending_count(&self) -> usize {
        self.inner.pending.len()
    }

    /// Draw an id that no pending call holds and register the call under it.
    fn register_call(
        &self,
        topic: &str,
    ) -> Result<(CorrelationId, String, oneshot::Receiver<Outcome>), RequestError> {
        let inner = &*self.inner;
        let mut last = None;
        for _ in 0..MAX_ID_ATTEMPTS {
            let id = inner.ids.next_id();
            let reply_channel = inner.config.transport.reply_channel(topic, &id);
            match inner.pending.insert(id.clone(), topic, &reply_channel) {
                Some(reply_rx) => return Ok((id, reply_channel, reply_rx)),
                None => {
                    warn!(topic, correlation_id = %id, "Correlation id already pending, drawing another");
                    last = Some(id);
                }
            }
        }

        Err(RequestError::IdCollision {
            topic: topic.to_string(),
            attempts: MAX_ID_ATTEMPTS,
            last: last.map(|id| id.to_string()).unwrap_or_default(),
        })
    }

    /// Send `payload` under `topic` and wait for the correlated reply.
    ///
    /// Resolves with the responder's answer, or fails with:
    /// - `Timeout` when nothing arrives within the configured timeout,
    /// - `NoResponder` when a shared-channel responder has no handler for the topic,
    /// - `Handler` when the responder's handler failed,
    /// - `IdCollision` when the id generator only yields ids of pending calls,
    /// - `Encode`, `Decode` or `Publish` for local problems.
    ///
    /// Dropping the returned future stops waiting and releases the call.
    pub async fn request<Req, Res>(&self, topic: &str, payload: &Req) -> Result<Res, RequestError>
    where
        Req: Serialize + ?Sized,
        Res: DeserializeOwned,
    {
        let inner = &*self.inner;
        let transport = &inner.config.transport;
        let payload = encode_payload(payload).map_err(|source| RequestError::Encode {
            topic: topic.to_string(),
            source,
        })?;

        let (id, reply_channel, reply_rx) = self.register_call(topic)?;
        let _guard = PendingGuard {
            inner,
            id: id.clone(),
        };
        let envelope = RequestEnvelope::new(topic, id.clone(), payload)
            .encode()
            .map_err(|source| RequestError::Encode {
                topic: topic.to_string(),
                source,
            })?;

        if let Transport::Direct = transport {
            let subscription = inner
                .bus
                .subscribe_once(&reply_channel, reply_listener(&self.inner));
            if !inner.pending.attach_subscription(&id, subscription.clone()) {
                inner.bus.unsubscribe(&reply_channel, &subscription);
            }
        }

        inner
            .bus
            .publish(transport.request_channel(topic), envelope)
            .map_err(|source| RequestError::Publish {
                topic: topic.to_string(),
                source,
            })?;
        debug!(topic, correlation_id = %id, "Request sent");

        match inner.await_outcome(topic, &id, reply_rx).await? {
            Outcome::Result(bytes) => {
                decode_payload(&bytes).map_err(|source| RequestError::Decode {
                    topic: topic.to_string(),
                    source,
                })
            }
            Outcome::Failure(reason) => Err(RequestError::Handler {
                topic: topic.to_string(),
                reason,
            }),
            Outcome::NoResponder(missing) => Err(RequestError::NoResponder(missing)),
        }
    }

    /// Typed form of [`request`](Self::request) for a [`Contract`].
    pub async fn call<C: Contract>(&self, request: &C::Request) -> Result<C::Response, RequestError> {
        self.request(C::TOPIC, request).await
    }
}

fn reply_listener<B: EventBus + 'static>(inner: &Arc<Inner<B>>) -> crate::bus::Listener {
    let inner: Weak<Inner<B>> = Arc::downgrade(inner);
    Arc::new(move |bytes: Vec<u8>| {
        if let Some(inner) = inner.upgrade() {
            inner.on_reply(&bytes);
        }
    })
}
