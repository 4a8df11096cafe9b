#[path = "common.rs"]
mod common;

use bytes::Bytes;
use relaymq::core::broker::{Broker, BrokerConfig};
use relaymq::core::error::BrokerError;
use relaymq::core::session::SessionId;
use relaymq::core::subscription::SubscriptionId;

#[tokio::test]
async fn detached_backlog_is_flushed_once_in_order() {
    common::init_logging();

    let broker = Broker::new(BrokerConfig::default());
    let (first, first_rx) = common::session(1);
    let id = broker.subscribe("reconnect-test", &first);
    common::text(&first_rx);

    broker.detach(id, SessionId::new(1)).unwrap();

    for i in 0..5 {
        broker.publish("reconnect-test", Bytes::from(format!("msg-{i}")));
    }
    assert_eq!(broker.pending(id), Some(5));
    // Nothing leaks to the detached session's old send path.
    assert!(first_rx.is_empty());

    let (second, second_rx) = common::session(2);
    assert_eq!(broker.attach(id, &second).unwrap(), 5);

    // The ack precedes the flushed batch on the wire.
    assert_eq!(common::text(&second_rx), "OK 5");
    for i in 0..5 {
        let (header, payload) = common::delivery(&second_rx);
        assert_eq!(header.channel, "reconnect-test");
        assert_eq!(payload, format!("msg-{i}").into_bytes());
    }
    assert!(second_rx.is_empty());
    assert_eq!(broker.pending(id), Some(0));

    // Once flushed, messages are gone for good; new publishes stream live.
    broker.publish("reconnect-test", Bytes::from_static(b"fresh"));
    let (_, payload) = common::delivery(&second_rx);
    assert_eq!(payload, b"fresh");
}

#[tokio::test]
async fn attach_and_detach_enforce_ownership_and_state() {
    common::init_logging();

    let broker = Broker::new(BrokerConfig::default());
    let (owner, owner_rx) = common::session(1);
    let id = broker.subscribe("guarded", &owner);
    common::text(&owner_rx);

    // Detach by a session that does not own the subscription.
    assert_eq!(
        broker.detach(id, SessionId::new(2)),
        Err(BrokerError::NotOwner)
    );

    // Attach while still active: first holder wins.
    let (intruder, _intruder_rx) = common::session(2);
    assert_eq!(
        broker.attach(id, &intruder),
        Err(BrokerError::AlreadyActive)
    );

    // Unknown identifier.
    assert_eq!(
        broker.attach(SubscriptionId::new(404), &intruder),
        Err(BrokerError::NotFound)
    );

    // Double detach.
    broker.detach(id, SessionId::new(1)).unwrap();
    assert!(matches!(
        broker.detach(id, SessionId::new(1)),
        Err(BrokerError::InvalidState(_))
    ));
}

#[tokio::test]
async fn ungraceful_disconnect_terminates_active_subscription() {
    common::init_logging();

    let broker = Broker::new(BrokerConfig::default());
    let (owner, owner_rx) = common::session(1);
    let id = broker.subscribe("volatile", &owner);
    common::text(&owner_rx);

    // Connection goes away without a DETACH.
    broker.terminate(id, SessionId::new(1));

    let (next, _next_rx) = common::session(2);
    assert_eq!(broker.attach(id, &next), Err(BrokerError::NotFound));
    assert_eq!(broker.pending(id), None);

    // Fan-out no longer targets the dead subscription.
    broker.publish("volatile", Bytes::from_static(b"gone"));
    assert!(owner_rx.is_empty());
}

#[tokio::test]
async fn detached_subscription_survives_owner_disconnect() {
    common::init_logging();

    let broker = Broker::new(BrokerConfig::default());
    let (owner, owner_rx) = common::session(1);
    let id = broker.subscribe("parked", &owner);
    common::text(&owner_rx);

    broker.detach(id, SessionId::new(1)).unwrap();
    // The old owner's disconnect must not touch a detached subscription.
    broker.terminate(id, SessionId::new(1));

    broker.publish("parked", Bytes::from_static(b"kept"));

    let (next, next_rx) = common::session(2);
    assert_eq!(broker.attach(id, &next).unwrap(), 1);
    assert_eq!(common::text(&next_rx), "OK 1");
    let (_, payload) = common::delivery(&next_rx);
    assert_eq!(payload, b"kept");
}
