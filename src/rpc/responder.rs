//! Responder - answers named requests with registered handlers.
//!
//! ## Example
//!
//! ```ignore
//! let responder = Responder::new(bus.clone());
//!
//! let registration = responder.add_responder("GREETING", |req: Greeting| async move {
//!     Ok::<_, Infallible>(Greeting { greeting: format!("{} to you too.", req.greeting) })
//! })?;
//!
//! // Later: stop answering and free the topic.
//! registration.cancel();
//! ```

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Weak};

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::runtime::Handle;
use tracing::{debug, error, trace, warn};

use crate::bus::{EventBus, Listener, Subscription};
use crate::config::ResponderConfig;
use crate::contract::Contract;
use crate::envelope::{decode_payload, encode_payload, Outcome, ReplyEnvelope, RequestEnvelope};
use crate::error::RegistrationError;
use crate::registry::{HandlerRegistry, Registration, SubscriptionBook};
use crate::transport::Transport;

type HandlerFuture = Pin<Box<dyn Future<Output = Result<Vec<u8>, String>> + Send>>;

/// A registered handler with its payload codec folded in.
struct RequestHandler {
    call: Box<dyn Fn(Vec<u8>) -> HandlerFuture + Send + Sync>,
    /// Runtime the handler was registered on; bus listeners may run on any thread.
    runtime: Handle,
}

struct Inner<B: EventBus> {
    bus: Arc<B>,
    transport: Transport,
    handlers: HandlerRegistry<RequestHandler>,
    subscriptions: SubscriptionBook,
}

impl<B: EventBus + 'static> Inner<B> {
    fn on_request(&self, bytes: &[u8]) {
        let request = match RequestEnvelope::decode(bytes) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Dropping undecodable request");
                return;
            }
        };

        match self.handlers.get(&request.topic) {
            Some(handler) => self.dispatch(handler, request),
            None if self.transport.is_shared() => {
                debug!(topic = %request.topic, correlation_id = %request.correlation_id, "No responder for topic");
                let reply_channel = self.transport.reply_channel(&request.topic, &request.correlation_id);
                let reply = ReplyEnvelope::no_responder(request.correlation_id, request.topic);
                send_reply(self.bus.as_ref(), &reply_channel, &reply);
            }
            None => {
                // Cancelled between delivery and lookup.
                trace!(topic = %request.topic, "Request arrived after handler was cancelled");
            }
        }
    }

    /// Run the handler in its own task and publish whatever it settles with.
    fn dispatch(&self, handler: Arc<RequestHandler>, request: RequestEnvelope) {
        let RequestEnvelope {
            topic,
            correlation_id,
            payload,
        } = request;
        let bus = Arc::clone(&self.bus);
        let reply_channel = self.transport.reply_channel(&topic, &correlation_id);
        let runtime = handler.runtime.clone();

        trace!(topic = %topic, correlation_id = %correlation_id, "Dispatching request");
        runtime.spawn(async move {
            // The inner task isolates handler panics from the reply path.
            let settled = tokio::spawn(async move { (handler.call)(payload).await }).await;

            let outcome = match settled {
                Ok(Ok(result)) => Outcome::Result(result),
                Ok(Err(reason)) => {
                    warn!(topic = %topic, correlation_id = %correlation_id, reason = %reason, "Handler failed");
                    Outcome::Failure(reason)
                }
                Err(e) if e.is_panic() => {
                    error!(topic = %topic, correlation_id = %correlation_id, "Handler panicked");
                    Outcome::Failure("handler panicked".to_string())
                }
                Err(e) => Outcome::Failure(e.to_string()),
            };

            let reply = ReplyEnvelope {
                correlation_id,
                outcome,
            };
            send_reply(bus.as_ref(), &reply_channel, &reply);
        });
    }

    fn cancel(&self, topic: &str, token: u64) {
        if let Some((channel, id)) = self.subscriptions.remove(token) {
            self.bus.unsubscribe(&channel, &id);
        }
        if self.handlers.vacate(topic, token) {
            debug!(topic, "Responder cancelled");
        }
    }
}

fn send_reply<B: EventBus + ?Sized>(bus: &B, reply_channel: &str, reply: &ReplyEnvelope) {
    let bytes = match reply.encode() {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(channel = reply_channel, error = %e, "Could not encode reply");
            return;
        }
    };
    if let Err(e) = bus.publish(reply_channel, bytes) {
        error!(channel = reply_channel, error = %e, "Could not publish reply");
    }
}

fn request_listener<B: EventBus + 'static>(inner: &Arc<Inner<B>>) -> Listener {
    let inner: Weak<Inner<B>> = Arc::downgrade(inner);
    Arc::new(move |bytes: Vec<u8>| {
        if let Some(inner) = inner.upgrade() {
            inner.on_request(&bytes);
        }
    })
}

/// Answers requests on a bus with at most one handler per topic.
///
/// A handler runs once per request, concurrently with other requests. A
/// failing or panicking handler only fails its own request; the topic stays
/// registered. Dropping the responder detaches it from the bus.
pub struct Responder<B: EventBus + 'static> {
    inner: Arc<Inner<B>>,
    /// Listener on the shared request channel, for the shared transport.
    _request_subscription: Option<Subscription<B>>,
}

impl<B: EventBus + 'static> Responder<B> {
    /// Responder on the direct transport.
    pub fn new(bus: Arc<B>) -> Self {
        Self::build(bus, Transport::Direct)
    }

    /// Responder on the configured transport.
    ///
    /// With `Transport::Shared` the responder becomes the only server of its
    /// channel and answers "no responder" for every topic it has no handler
    /// for. It fails with `ChannelTaken` when the channel already has a
    /// listener on this bus; give independent responders distinct channels.
    /// The channel is released when the responder is dropped.
    pub fn with_config(bus: Arc<B>, config: ResponderConfig) -> Result<Self, RegistrationError> {
        if let Transport::Shared { channel } = &config.transport {
            if bus.has_listeners(channel) {
                return Err(RegistrationError::ChannelTaken(channel.clone()));
            }
        }
        Ok(Self::build(bus, config.transport))
    }

    fn build(bus: Arc<B>, transport: Transport) -> Self {
        let inner = Arc::new(Inner {
            bus,
            transport,
            handlers: HandlerRegistry::new(),
            subscriptions: SubscriptionBook::new(),
        });

        let request_subscription = match &inner.transport {
            Transport::Direct => None,
            Transport::Shared { channel } => {
                debug!(channel = %channel, "Responder serving shared channel");
                Some(Subscription::attach(
                    Arc::clone(&inner.bus),
                    channel,
                    request_listener(&inner),
                ))
            }
        };

        Self {
            inner,
            _request_subscription: request_subscription,
        }
    }

    pub fn bus(&self) -> &Arc<B> {
        &self.inner.bus
    }

    pub fn transport(&self) -> &Transport {
        &self.inner.transport
    }

    /// Topics that currently have a handler, sorted.
    pub fn topics(&self) -> Vec<String> {
        self.inner.handlers.topics()
    }

    pub fn is_registered(&self, topic: &str) -> bool {
        self.inner.handlers.get(topic).is_some()
    }

    /// Register the handler for `topic`.
    ///
    /// Fails with `AlreadyRegistered` if the topic already has a handler, and
    /// with `NoRuntime` outside a Tokio runtime. The returned [`Registration`]
    /// stops dispatch and frees the topic when cancelled or dropped.
    ///
    /// The handler's error is stringified and sent back as the request's
    /// failure reason.
    pub fn add_responder<Req, Res, E, F, Fut>(
        &self,
        topic: &str,
        handler: F,
    ) -> Result<Registration, RegistrationError>
    where
        Req: DeserializeOwned + Send + 'static,
        Res: Serialize + Send + 'static,
        E: Display + Send + 'static,
        F: Fn(Req) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<Res, E>> + Send + 'static,
    {
        let runtime = Handle::try_current().map_err(|_| RegistrationError::NoRuntime)?;
        let handler = Arc::new(handler);
        let call = move |payload: Vec<u8>| -> HandlerFuture {
            let handler = Arc::clone(&handler);
            Box::pin(async move {
                let request: Req = decode_payload(&payload).map_err(|e| e.to_string())?;
                let response = handler(request).await.map_err(|e| e.to_string())?;
                encode_payload(&response).map_err(|e| e.to_string())
            })
        };

        let token = self.inner.handlers.register(
            topic,
            Arc::new(RequestHandler {
                call: Box::new(call),
                runtime,
            }),
        )?;

        if let Transport::Direct = self.inner.transport {
            let id = self.inner.bus.subscribe(topic, request_listener(&self.inner));
            self.inner.subscriptions.insert(token, topic, id);
        }

        let inner = Arc::downgrade(&self.inner);
        let owned_topic = topic.to_string();
        Ok(Registration::new(topic, move || {
            if let Some(inner) = inner.upgrade() {
                inner.cancel(&owned_topic, token);
            }
        }))
    }

    /// Register a synchronous handler for `topic`.
    pub fn add_sync_responder<Req, Res, E, F>(
        &self,
        topic: &str,
        handler: F,
    ) -> Result<Registration, RegistrationError>
    where
        Req: DeserializeOwned + Send + 'static,
        Res: Serialize + Send + 'static,
        E: Display + Send + 'static,
        F: Fn(Req) -> Result<Res, E> + Send + Sync + 'static,
    {
        self.add_responder(topic, move |request: Req| std::future::ready(handler(request)))
    }

    /// Typed form of [`add_responder`](Self::add_responder) for a [`Contract`].
    pub fn answer<C, E, F, Fut>(&self, handler: F) -> Result<Registration, RegistrationError>
    where
        C: Contract,
        E: Display + Send + 'static,
        F: Fn(C::Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<C::Response, E>> + Send + 'static,
    {
        self.add_responder(C::TOPIC, handler)
    }
}

impl<B: EventBus + 'static> Drop for Responder<B> {
    fn drop(&mut self) {
        for (topic, id) in self.inner.subscriptions.drain() {
            self.inner.bus.unsubscribe(&topic, &id);
        }
    }
}
