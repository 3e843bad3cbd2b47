use std::sync::Arc;

use emitter_rpc::bus::InMemoryBus;
use emitter_rpc::{RegistrationError, Requester, Responder};

use crate::support::{greet, init_tracing, Greet, Greeting};

#[tokio::test]
async fn second_responder_for_a_topic_is_rejected() {
    init_tracing();
    let bus = Arc::new(InMemoryBus::new());
    let responder = Responder::new(bus.clone());
    let _first = responder.answer::<Greet, _, _, _>(greet).unwrap();

    let second = responder.answer::<Greet, _, _, _>(greet);

    assert_eq!(
        second.unwrap_err(),
        RegistrationError::AlreadyRegistered("GREETING".into())
    );
    assert_eq!(responder.topics(), vec!["GREETING"]);
}

#[tokio::test]
async fn topic_can_be_taken_again_after_cancel() {
    init_tracing();
    let bus = Arc::new(InMemoryBus::new());
    let responder = Responder::new(bus.clone());
    let first = responder.answer::<Greet, _, _, _>(greet).unwrap();
    first.cancel();
    assert!(!first.is_active());

    let _second = responder
        .add_responder("GREETING", |request: Greeting| async move {
            Ok::<_, String>(Greeting {
                greeting: format!("{}!", request.greeting),
            })
        })
        .unwrap();
    let requester = Requester::new(bus.clone());

    let reply = requester
        .call::<Greet>(&Greeting {
            greeting: "hey".into(),
        })
        .await
        .unwrap();

    assert_eq!(reply.greeting, "hey!");
}

#[tokio::test]
async fn separate_responders_keep_separate_tables() {
    init_tracing();
    let bus = Arc::new(InMemoryBus::new());
    let left = Responder::new(bus.clone());
    let right = Responder::new(bus.clone());

    let _left = left.answer::<Greet, _, _, _>(greet).unwrap();
    let _right = right.answer::<Greet, _, _, _>(greet).unwrap();

    assert_eq!(bus.listener_count("GREETING"), 2);
}

#[tokio::test]
async fn dropping_the_registration_cancels_it() {
    init_tracing();
    let bus = Arc::new(InMemoryBus::new());
    let responder = Responder::new(bus.clone());

    {
        let _scoped = responder.answer::<Greet, _, _, _>(greet).unwrap();
        assert!(responder.is_registered("GREETING"));
    }

    assert!(!responder.is_registered("GREETING"));
    assert_eq!(bus.listener_count("GREETING"), 0);
}
