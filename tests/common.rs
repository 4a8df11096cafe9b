use std::sync::Once;

use bytes::Bytes;
use relaymq::core::protocol::{self, DeliveryHeader};
use relaymq::core::session::{SessionHandle, SessionId};

pub fn init_logging() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        relaymq::logging::init_logging();
    });
}

/// In-memory session: the engine-facing handle plus the frame queue a
/// writer task would normally drain onto the socket.
#[allow(dead_code)]
pub fn session(id: u64) -> (SessionHandle, flume::Receiver<Bytes>) {
    let (tx, rx) = flume::unbounded();
    (SessionHandle::new(SessionId::new(id), tx), rx)
}

/// Next queued frame, interpreted as one text line (ack or error).
#[allow(dead_code)]
pub fn text(rx: &flume::Receiver<Bytes>) -> String {
    let frame = rx.try_recv().expect("expected a queued frame");
    String::from_utf8(frame.to_vec())
        .unwrap()
        .trim_end()
        .to_string()
}

/// Next queued frame, interpreted as a MSG push.
#[allow(dead_code)]
pub fn delivery(rx: &flume::Receiver<Bytes>) -> (DeliveryHeader, Vec<u8>) {
    let frame = rx.try_recv().expect("expected a queued delivery");
    let newline = frame
        .iter()
        .position(|b| *b == b'\n')
        .expect("missing header line");
    let header = protocol::parse_delivery_header(std::str::from_utf8(&frame[..newline]).unwrap())
        .expect("not a MSG frame");
    let payload = frame[newline + 1..newline + 1 + header.len].to_vec();
    (header, payload)
}
