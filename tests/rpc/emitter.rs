use std::sync::Arc;
use std::time::Duration;

use emitter_rpc::bus::EmitterBus;
use emitter_rpc::{
    RequestError, Requester, RequesterConfig, Responder, ResponderConfig, Transport,
};

use crate::support::{greet, how_are_you, init_tracing, Empty, Greet, Greeting, HowAreYou};

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn round_trip_over_event_emitter() {
    init_tracing();
    let bus = Arc::new(EmitterBus::new());
    let responder = Responder::new(bus.clone());
    let _greet = responder.answer::<Greet, _, _, _>(greet).unwrap();
    let _mood = responder.answer::<HowAreYou, _, _, _>(how_are_you).unwrap();
    let requester = Requester::new(bus.clone());

    let (greeting, mood) = tokio::join!(
        requester.call::<Greet>(&Greeting {
            greeting: "hey".into()
        }),
        requester.call::<HowAreYou>(&Empty {}),
    );

    assert_eq!(greeting.unwrap().greeting, "hey to you too.");
    assert!(mood.unwrap().good);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn unregistered_topic_times_out_over_event_emitter() {
    init_tracing();
    let bus = Arc::new(EmitterBus::new());
    let _responder = Responder::new(bus.clone());
    let requester = Requester::with_timeout(bus.clone(), Duration::from_millis(100));

    let result = requester.call::<HowAreYou>(&Empty {}).await;

    assert!(result.unwrap_err().is_timeout());
    assert_eq!(bus.listener_count("HOW_ARE_YOU"), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shared_channel_over_event_emitter() {
    init_tracing();
    let bus = Arc::new(EmitterBus::new());
    let _responder = Responder::with_config(
        bus.clone(),
        ResponderConfig::default().with_transport(Transport::shared_on("svc")),
    )
    .unwrap();
    let requester = Requester::with_config(
        bus.clone(),
        RequesterConfig::default().with_transport(Transport::shared_on("svc")),
    );

    let result = requester.call::<HowAreYou>(&Empty {}).await;

    assert_eq!(result, Err(RequestError::NoResponder("HOW_ARE_YOU".into())));
}
