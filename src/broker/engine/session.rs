//! Per-connection protocol state machine.
//!
//! Each connection gets two tasks: this reader/dispatcher, and a writer
//! that drains the session's frame queue onto the socket. Responses and
//! asynchronous `MSG` pushes share the queue, so frames never interleave
//! mid-line, while pushes stay non-blocking for the publishing side.

use std::sync::Arc;

use anyhow::Result;
use bytes::{Bytes, BytesMut};
use tokio::io::{
    AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, BufReader,
    BufWriter,
};
use tracing::{debug, trace};

use crate::core::auth::{ApiKey, ApiKeyValidator};
use crate::core::broker::Broker;
use crate::core::error::BrokerError;
use crate::core::protocol::{self, Command};
use crate::core::session::{SessionHandle, SessionId};
use crate::core::subscription::SubscriptionId;

/// Caps protecting the broker from malformed or hostile clients.
const MAX_LINE_LEN: usize = 4 * 1024;
pub const MAX_PAYLOAD_LEN: usize = 64 * 1024;

struct Session {
    id: SessionId,
    authenticated: bool,
    /// The at-most-one subscription this session currently drives.
    subscription: Option<SubscriptionId>,
    handle: SessionHandle,
    broker: Arc<Broker>,
    validator: Arc<dyn ApiKeyValidator>,
}

/// Drive one connection to completion. Generic over the stream so the
/// engine never learns whether the bytes travel over TCP, TLS or an
/// in-memory duplex.
pub async fn run<S>(
    stream: S,
    session_id: SessionId,
    broker: Arc<Broker>,
    validator: Arc<dyn ApiKeyValidator>,
) -> Result<()>
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    let (read_half, write_half) = tokio::io::split(stream);
    let (frames_tx, frames_rx) = flume::unbounded::<Bytes>();
    let writer = tokio::spawn(write_frames(BufWriter::new(write_half), frames_rx));

    let mut session = Session {
        id: session_id,
        // With no configured key the connection starts out authenticated.
        authenticated: !validator.required(),
        subscription: None,
        handle: SessionHandle::new(session_id, frames_tx),
        broker: Arc::clone(&broker),
        validator,
    };

    let mut reader = BufReader::new(read_half);
    let result = session.read_loop(&mut reader).await;

    // Exactly one termination pass, whichever side closed the connection:
    // QUIT, peer disconnect and read errors all funnel through here. A
    // subscription this session detached earlier is left untouched.
    if let Some(id) = session.subscription.take() {
        broker.terminate(id, session_id);
    }
    drop(session);
    let _ = writer.await;

    result
}

impl Session {
    async fn read_loop<R>(&mut self, reader: &mut R) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut line: Vec<u8> = Vec::with_capacity(256);
        loop {
            line.clear();
            // Capped read: a client cannot grow the line buffer without bound.
            let n = (&mut *reader)
                .take((MAX_LINE_LEN + 1) as u64)
                .read_until(b'\n', &mut line)
                .await?;
            if n == 0 {
                trace!(session_id = %self.id, "peer closed the connection");
                break;
            }
            if line.last() != Some(&b'\n') {
                // Oversized line, or the peer vanished mid-line; either
                // way the stream cannot be re-framed.
                if line.len() > MAX_LINE_LEN {
                    self.respond_err(&BrokerError::MalformedFrame);
                }
                break;
            }

            let text = match std::str::from_utf8(&line[..n - 1]) {
                Ok(text) => text.trim_end_matches('\r'),
                Err(_) => {
                    self.respond_err(&BrokerError::MalformedFrame);
                    continue;
                }
            };

            let cmd = match protocol::parse_command(text) {
                Ok(cmd) => cmd,
                Err(err) => {
                    // A bad command costs one ERR line, not the connection.
                    self.respond_err(&err);
                    continue;
                }
            };

            match cmd {
                Command::Auth { key } => self.handle_auth(&key),
                Command::Quit => {
                    self.respond_ok();
                    break;
                }
                _ if !self.authenticated => self.respond_err(&BrokerError::AuthRequired),
                Command::Subscribe { channel } => self.handle_subscribe(&channel),
                Command::Detach => self.handle_detach(),
                Command::Attach { id } => self.handle_attach(id),
                Command::Publish { channel, len } => {
                    if len > MAX_PAYLOAD_LEN {
                        // The declared body is never read, so the stream
                        // cannot be re-framed past it.
                        self.respond_err(&BrokerError::PayloadTooLarge);
                        break;
                    }
                    let payload = read_payload(reader, len).await?;
                    let message_id = self.broker.publish(&channel, payload);
                    self.handle.send(protocol::encode_ok_value(message_id));
                }
            }
        }
        Ok(())
    }

    fn handle_auth(&mut self, key: &str) {
        if self.authenticated {
            self.respond_err(&BrokerError::InvalidState("already authenticated"));
        } else if self.validator.validate(&ApiKey::new(key)) {
            self.authenticated = true;
            debug!(session_id = %self.id, "session authenticated");
            self.respond_ok();
        } else {
            self.respond_err(&BrokerError::AuthFailed);
        }
    }

    fn handle_subscribe(&mut self, channel: &str) {
        if self.subscription.is_some() {
            self.respond_err(&BrokerError::InvalidState("already subscribed"));
            return;
        }
        // The engine acks `OK <id>` itself, ahead of any delivery.
        let id = self.broker.subscribe(channel, &self.handle);
        self.subscription = Some(id);
    }

    fn handle_detach(&mut self) {
        let Some(id) = self.subscription else {
            self.respond_err(&BrokerError::InvalidState("not subscribed"));
            return;
        };
        match self.broker.detach(id, self.id) {
            Ok(()) => {
                self.subscription = None;
                self.respond_ok();
            }
            Err(err) => self.respond_err(&err),
        }
    }

    fn handle_attach(&mut self, id: SubscriptionId) {
        if self.subscription.is_some() {
            self.respond_err(&BrokerError::InvalidState("already subscribed"));
            return;
        }
        match self.broker.attach(id, &self.handle) {
            // The engine already acked `OK <pending>` and flushed the
            // backlog; a second ack here would break framing.
            Ok(_flushed) => self.subscription = Some(id),
            Err(err) => self.respond_err(&err),
        }
    }

    fn respond_ok(&self) {
        self.handle.send(protocol::encode_ok());
    }

    fn respond_err(&self, err: &BrokerError) {
        self.handle.send(protocol::encode_err(err));
    }
}

/// Read a PUBLISH body: exactly `len` raw bytes plus the one delimiter
/// byte, which is consumed and not counted. A peer disappearing in the
/// middle of the body abandons the frame and ends the session.
async fn read_payload<R>(reader: &mut R, len: usize) -> Result<Bytes>
where
    R: AsyncRead + Unpin,
{
    let mut payload = BytesMut::zeroed(len);
    reader
        .read_exact(&mut payload)
        .await
        .map_err(|_| BrokerError::TransportClosed)?;
    let mut delimiter = [0u8; 1];
    reader
        .read_exact(&mut delimiter)
        .await
        .map_err(|_| BrokerError::TransportClosed)?;
    Ok(payload.freeze())
}

/// Writer half of a session: drains the frame queue onto the socket.
/// Ends when every sender is gone (session teardown) or the peer stops
/// accepting writes.
async fn write_frames<W>(
    mut writer: BufWriter<W>,
    frames: flume::Receiver<Bytes>,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Ok(frame) = frames.recv_async().await {
        writer.write_all(&frame).await?;
        // Drain whatever queued up behind it before paying for a flush.
        while let Ok(next) = frames.try_recv() {
            writer.write_all(&next).await?;
        }
        writer.flush().await?;
    }
    writer.shutdown().await?;
    Ok(())
}
