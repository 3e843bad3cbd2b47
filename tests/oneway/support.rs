//! Shared fixtures for the one-way suite.

#![allow(dead_code)]

use std::sync::{Arc, Mutex, Once};

use emitter_rpc::Message;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hey {
    pub call_message: String,
}

impl Message for Hey {
    const TOPIC: &'static str = "HEY";
}

/// Records every message handed to it.
#[derive(Clone)]
pub struct Inbox<M> {
    seen: Arc<Mutex<Vec<M>>>,
}

impl<M: Clone + Send + 'static> Inbox<M> {
    pub fn new() -> Self {
        Self {
            seen: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn handler(&self) -> impl Fn(M) + Send + Sync + 'static {
        let seen = Arc::clone(&self.seen);
        move |message| seen.lock().unwrap().push(message)
    }

    pub fn messages(&self) -> Vec<M> {
        self.seen.lock().unwrap().clone()
    }
}
