//! Line-oriented wire codec.
//!
//! Commands and responses are single UTF-8 lines terminated by `\n`;
//! numeric fields are decimal ASCII. A PUBLISH or MSG body is raw bytes of
//! the exact declared length followed by one delimiter byte that is
//! consumed and never counted as payload.
//!
//! ```text
//! AUTH <key>                      -> OK | ERR <reason>
//! SUBSCRIBE <channel>             -> OK <subscriptionId>
//! DETACH                          -> OK | ERR <reason>
//! ATTACH <subscriptionId>         -> OK <pendingCount> | ERR <reason>
//! PUBLISH <channel> <byteLength>  -> OK <messageId> | ERR <reason>
//! QUIT                            -> OK, then the transport closes
//! MSG <id> <channel> <byteLength> (async push to an active subscriber)
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::core::error::BrokerError;
use crate::core::message::Message;
use crate::core::subscription::SubscriptionId;

/// A client command, decoded from one line. A `Publish` body is read
/// separately by the session, after the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Auth { key: String },
    Subscribe { channel: String },
    Publish { channel: String, len: usize },
    Detach,
    Attach { id: SubscriptionId },
    Quit,
}

pub fn parse_command(line: &str) -> Result<Command, BrokerError> {
    match line.split_whitespace().collect::<Vec<_>>().as_slice() {
        ["AUTH", key] => Ok(Command::Auth {
            key: (*key).to_string(),
        }),
        ["SUBSCRIBE", channel] => Ok(Command::Subscribe {
            channel: (*channel).to_string(),
        }),
        ["PUBLISH", channel, len] => {
            let len: usize = len.parse().map_err(|_| BrokerError::MalformedFrame)?;
            Ok(Command::Publish {
                channel: (*channel).to_string(),
                len,
            })
        }
        ["DETACH"] => Ok(Command::Detach),
        ["ATTACH", id] => {
            let raw: u64 = id.parse().map_err(|_| BrokerError::MalformedFrame)?;
            Ok(Command::Attach {
                id: SubscriptionId::new(raw),
            })
        }
        ["QUIT"] => Ok(Command::Quit),
        _ => Err(BrokerError::MalformedFrame),
    }
}

// ───────────────────────────────────────────────────────────
// Response / push frame builders
// ───────────────────────────────────────────────────────────

pub fn encode_ok() -> Bytes {
    Bytes::from_static(b"OK\n")
}

pub fn encode_ok_value(value: u64) -> Bytes {
    Bytes::from(format!("OK {value}\n"))
}

pub fn encode_err(err: &BrokerError) -> Bytes {
    Bytes::from(format!("ERR {err}\n"))
}

/// Full `MSG` push frame: header line, payload, delimiter byte.
pub fn encode_message_frame(msg: &Message) -> Bytes {
    let header = format!("MSG {} {} {}\n", msg.id, msg.channel, msg.payload.len());
    let mut buf = BytesMut::with_capacity(header.len() + msg.payload.len() + 1);
    buf.put_slice(header.as_bytes());
    buf.put_slice(&msg.payload);
    buf.put_u8(b'\n');
    buf.freeze()
}

// ───────────────────────────────────────────────────────────
// Client-side helpers (shared by the CLI binaries and tests)
// ───────────────────────────────────────────────────────────

/// Header of an asynchronous `MSG` push, as seen by a client. The payload
/// (`len` bytes plus one delimiter) follows on the stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryHeader {
    pub id: u64,
    pub channel: String,
    pub len: usize,
}

/// Parse a `MSG ...` header line; `None` for anything else (a reader
/// distinguishes pushes from responses only by the leading token).
pub fn parse_delivery_header(line: &str) -> Option<DeliveryHeader> {
    match line.split_whitespace().collect::<Vec<_>>().as_slice() {
        ["MSG", id, channel, len] => Some(DeliveryHeader {
            id: id.parse().ok()?,
            channel: (*channel).to_string(),
            len: len.parse().ok()?,
        }),
        _ => None,
    }
}
