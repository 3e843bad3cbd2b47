//! Shared fixtures for the request/response suite.

#![allow(dead_code)]

use std::convert::Infallible;
use std::sync::Once;

use emitter_rpc::Contract;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

static TRACING: Once = Once::new();

/// Install a test subscriber honouring `RUST_LOG`. Safe to call from every test.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Greeting {
    pub greeting: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Empty {}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mood {
    pub good: bool,
}

pub struct Greet;

impl Contract for Greet {
    const TOPIC: &'static str = "GREETING";
    type Request = Greeting;
    type Response = Greeting;
}

pub struct HowAreYou;

impl Contract for HowAreYou {
    const TOPIC: &'static str = "HOW_ARE_YOU";
    type Request = Empty;
    type Response = Mood;
}

pub async fn greet(request: Greeting) -> Result<Greeting, Infallible> {
    Ok(Greeting {
        greeting: format!("{} to you too.", request.greeting),
    })
}

pub async fn how_are_you(_: Empty) -> Result<Mood, Infallible> {
    Ok(Mood { good: true })
}
