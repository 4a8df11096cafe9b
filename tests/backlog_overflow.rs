#[path = "common.rs"]
mod common;

use bytes::Bytes;
use relaymq::core::broker::{Broker, BrokerConfig};
use relaymq::core::session::SessionId;

#[tokio::test]
async fn bounded_backlog_drops_oldest_on_overflow() {
    common::init_logging();

    let broker = Broker::new(BrokerConfig { max_backlog: 3 });
    let (owner, owner_rx) = common::session(1);
    let id = broker.subscribe("bounded", &owner);
    common::text(&owner_rx);
    broker.detach(id, SessionId::new(1)).unwrap();

    for i in 0..5 {
        broker.publish("bounded", Bytes::from(format!("msg-{i}")));
    }
    assert_eq!(broker.pending(id), Some(3));

    let (next, next_rx) = common::session(2);
    assert_eq!(broker.attach(id, &next).unwrap(), 3);
    assert_eq!(common::text(&next_rx), "OK 3");

    // The two oldest were evicted; the survivors keep publish order.
    for i in 2..5 {
        let (_, payload) = common::delivery(&next_rx);
        assert_eq!(payload, format!("msg-{i}").into_bytes());
    }
    assert!(next_rx.is_empty());
}

#[tokio::test]
async fn unbounded_backlog_keeps_everything() {
    common::init_logging();

    let broker = Broker::new(BrokerConfig::default());
    let (owner, owner_rx) = common::session(1);
    let id = broker.subscribe("unbounded", &owner);
    common::text(&owner_rx);
    broker.detach(id, SessionId::new(1)).unwrap();

    for i in 0..1_000 {
        broker.publish("unbounded", Bytes::from(format!("msg-{i}")));
    }
    assert_eq!(broker.pending(id), Some(1_000));
}
