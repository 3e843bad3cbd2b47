use std::sync::Arc;

use emitter_rpc::bus::InMemoryBus;
use emitter_rpc::{Requester, RequesterConfig, Responder, SequentialIds};
use serde_json::{json, Value};
use tokio::task::JoinSet;

use crate::support::{greet, how_are_you, init_tracing, Empty, Greet, Greeting, HowAreYou, Mood};

#[tokio::test]
async fn concurrent_requests_resolve_independently() {
    init_tracing();
    let bus = Arc::new(InMemoryBus::new());
    let responder = Responder::new(bus.clone());
    let _greet = responder.answer::<Greet, _, _, _>(greet).unwrap();
    let _mood = responder.answer::<HowAreYou, _, _, _>(how_are_you).unwrap();
    let requester = Requester::new(bus.clone());

    let hey = Greeting {
        greeting: "hey".into()
    };
    let empty = Empty {};
    let (greeting, mood) = tokio::join!(
        requester.call::<Greet>(&hey),
        requester.call::<HowAreYou>(&empty),
    );

    assert_eq!(greeting.unwrap().greeting, "hey to you too.");
    assert_eq!(mood.unwrap(), Mood { good: true });
    assert_eq!(requester.pending_count(), 0);
}

#[tokio::test]
async fn untyped_requests_use_json_values() {
    init_tracing();
    let bus = Arc::new(InMemoryBus::new());
    let responder = Responder::new(bus.clone());
    let _greet = responder.add_responder("GREETING", greet).unwrap();
    let requester = Requester::new(bus.clone());

    let reply: Value = requester
        .request("GREETING", &json!({ "greeting": "hey" }))
        .await
        .unwrap();

    assert_eq!(reply, json!({ "greeting": "hey to you too." }));
}

#[tokio::test]
async fn many_calls_on_one_topic_get_their_own_replies() {
    init_tracing();
    let bus = Arc::new(InMemoryBus::new());
    let responder = Responder::new(bus.clone());
    let _echo = responder
        .add_responder("ECHO", |n: u64| async move {
            // Finish in reverse order of arrival.
            tokio::time::sleep(std::time::Duration::from_millis(50 - n)).await;
            Ok::<_, String>(n)
        })
        .unwrap();
    let requester = Arc::new(Requester::new(bus.clone()));

    let mut calls = JoinSet::new();
    for n in 0..20u64 {
        let requester = Arc::clone(&requester);
        calls.spawn(async move { (n, requester.request::<_, u64>("ECHO", &n).await) });
    }

    while let Some(joined) = calls.join_next().await {
        let (sent, reply) = joined.unwrap();
        assert_eq!(reply.unwrap(), sent);
    }
    assert_eq!(requester.pending_count(), 0);
}

#[tokio::test]
async fn requests_are_published_on_the_topic_with_fresh_ids() {
    init_tracing();
    let bus = Arc::new(InMemoryBus::new());
    let responder = Responder::new(bus.clone());
    let _mood = responder.answer::<HowAreYou, _, _, _>(how_are_you).unwrap();
    let requester = Requester::with_id_generator(
        bus.clone(),
        RequesterConfig::default(),
        SequentialIds::with_prefix("node"),
    );

    requester.call::<HowAreYou>(&Empty {}).await.unwrap();
    requester.call::<HowAreYou>(&Empty {}).await.unwrap();

    let replies: Vec<String> = bus
        .find_all_by_prefix("HOW_ARE_YOU_response_")
        .into_iter()
        .map(|event| event.topic)
        .collect();
    assert_eq!(
        replies,
        vec![
            "HOW_ARE_YOU_response_node.0",
            "HOW_ARE_YOU_response_node.1"
        ]
    );
}
