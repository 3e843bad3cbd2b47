//! Pending-call registry of a requester.
//!
//! An entry lives from the moment a request is sent until exactly one of
//! these happens: its reply arrives, its timeout fires, or the caller stops
//! waiting. Removing the entry under the registry lock is the settle
//! transition, so only the first of those paths ever sees it.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use tokio::sync::oneshot;

use crate::bus::SubscriptionId;
use crate::correlation::CorrelationId;
use crate::envelope::Outcome;

/// One outstanding request.
#[derive(Debug)]
pub(crate) struct PendingCall {
    pub(crate) topic: String,
    pub(crate) reply_channel: String,
    /// Per-call reply listener; `None` when replies arrive on a shared topic.
    pub(crate) subscription: Option<SubscriptionId>,
    pub(crate) started: Instant,
    reply_tx: oneshot::Sender<Outcome>,
}

impl PendingCall {
    /// Hand the outcome to the waiting caller. Returns `false` if it stopped waiting.
    pub(crate) fn complete(self, outcome: Outcome) -> bool {
        self.reply_tx.send(outcome).is_ok()
    }
}

#[derive(Default)]
pub(crate) struct PendingCalls {
    calls: Mutex<HashMap<CorrelationId, PendingCall>>,
}

impl PendingCalls {
    fn calls(&self) -> MutexGuard<'_, HashMap<CorrelationId, PendingCall>> {
        self.calls.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a call and return the receiving end of its reply.
    ///
    /// Returns `None` when `id` already belongs to a pending call; that call
    /// is left untouched.
    pub(crate) fn insert(
        &self,
        id: CorrelationId,
        topic: &str,
        reply_channel: &str,
    ) -> Option<oneshot::Receiver<Outcome>> {
        let mut calls = self.calls();
        let Entry::Vacant(slot) = calls.entry(id) else {
            return None;
        };

        let (reply_tx, reply_rx) = oneshot::channel();
        slot.insert(PendingCall {
            topic: topic.to_string(),
            reply_channel: reply_channel.to_string(),
            subscription: None,
            started: Instant::now(),
            reply_tx,
        });
        Some(reply_rx)
    }

    /// Record the reply listener of a still-pending call.
    ///
    /// Returns `false` when the call already settled; the caller then owns the
    /// subscription and has to release it.
    pub(crate) fn attach_subscription(&self, id: &CorrelationId, subscription: SubscriptionId) -> bool {
        match self.calls().get_mut(id) {
            Some(call) => {
                call.subscription = Some(subscription);
                true
            }
            None => false,
        }
    }

    /// Settle a call: remove and return it if it is still pending.
    pub(crate) fn take(&self, id: &CorrelationId) -> Option<PendingCall> {
        self.calls().remove(id)
    }

    pub(crate) fn len(&self) -> usize {
        self.calls().len()
    }
}
