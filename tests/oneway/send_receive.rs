use std::sync::Arc;

use emitter_rpc::bus::InMemoryBus;
use emitter_rpc::{Receiver, RegistrationError, Sender};
use serde_json::json;

use crate::support::{init_tracing, Hey, Inbox};

fn hey() -> Hey {
    Hey {
        call_message: "Hey Alice!".into(),
    }
}

#[test]
fn sent_message_reaches_the_receiver() {
    init_tracing();
    let bus = Arc::new(InMemoryBus::new());
    let receiver = Receiver::new(bus.clone());
    let inbox = Inbox::new();
    let _hey = receiver.hear::<Hey, _>(inbox.handler()).unwrap();

    Sender::new(bus.clone()).tell(&hey()).unwrap();

    assert_eq!(inbox.messages(), vec![hey()]);
}

#[test]
fn untyped_send_matches_typed_receive() {
    init_tracing();
    let bus = Arc::new(InMemoryBus::new());
    let receiver = Receiver::new(bus.clone());
    let inbox = Inbox::new();
    let _hey = receiver.hear::<Hey, _>(inbox.handler()).unwrap();

    Sender::new(bus.clone())
        .send("HEY", &json!({ "callMessage": "Hey Alice!" }))
        .unwrap();

    assert_eq!(inbox.messages(), vec![hey()]);
}

#[test]
fn cancelled_receiver_no_longer_hears() {
    init_tracing();
    let bus = Arc::new(InMemoryBus::new());
    let receiver = Receiver::new(bus.clone());
    let inbox = Inbox::new();
    let registration = receiver.hear::<Hey, _>(inbox.handler()).unwrap();
    let sender = Sender::new(bus.clone());

    sender.tell(&hey()).unwrap();
    registration.cancel();
    sender.tell(&hey()).unwrap();

    assert_eq!(inbox.messages().len(), 1);
}

#[test]
fn second_receiver_for_a_topic_is_rejected_until_cancel() {
    init_tracing();
    let bus = Arc::new(InMemoryBus::new());
    let receiver = Receiver::new(bus.clone());
    let first = receiver.hear::<Hey, _>(|_| {}).unwrap();

    let second = receiver.hear::<Hey, _>(|_| {});
    assert_eq!(
        second.unwrap_err(),
        RegistrationError::AlreadyRegistered("HEY".into())
    );

    first.cancel();
    assert!(receiver.hear::<Hey, _>(|_| {}).is_ok());
}

#[test]
fn unregistered_topic_is_dropped_silently() {
    init_tracing();
    let bus = Arc::new(InMemoryBus::new());
    let _receiver = Receiver::new(bus.clone());

    Sender::new(bus.clone()).send("NOBODY", &json!({})).unwrap();

    assert_eq!(bus.find_by_topic("NOBODY").unwrap().delivered_to, 0);
}

#[cfg(feature = "emitter")]
#[test]
fn message_crosses_the_event_emitter() {
    use emitter_rpc::bus::EmitterBus;
    use std::sync::mpsc;
    use std::sync::Mutex;
    use std::time::Duration;

    init_tracing();
    let bus = Arc::new(EmitterBus::new());
    let receiver = Receiver::new(bus.clone());
    let (tx, rx) = mpsc::channel();
    let tx = Mutex::new(tx);
    let _hey = receiver
        .hear::<Hey, _>(move |message| {
            let _ = tx.lock().unwrap().send(message);
        })
        .unwrap();

    Sender::new(bus.clone()).tell(&hey()).unwrap();

    let heard = rx.recv_timeout(Duration::from_secs(1)).unwrap();
    assert_eq!(heard, hey());
}
