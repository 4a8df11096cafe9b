//! Session identity and the engine-facing half of a session's send path.

use std::fmt;

use bytes::Bytes;

/// Unique identifier for a connection-scoped session. Monotonic, never
/// reused for the lifetime of the broker process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub fn new(raw: u64) -> Self {
        SessionId(raw)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Cloneable handle to one session's outbound frame queue.
///
/// The engine pushes pre-encoded frames here; a per-connection writer task
/// drains the queue onto the socket. Pushes never block, so a stalled
/// subscriber cannot stall publish fan-out to anyone else.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    frames: flume::Sender<Bytes>,
}

impl SessionHandle {
    pub fn new(id: SessionId, frames: flume::Sender<Bytes>) -> Self {
        Self { id, frames }
    }

    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Queue a frame for delivery. A send to a session whose connection is
    /// already gone is dropped; the disconnect path tears down whatever
    /// state still points at this handle.
    pub fn send(&self, frame: Bytes) {
        if self.frames.send(frame).is_err() {
            tracing::trace!(session_id = %self.id, "send path closed; frame dropped");
        }
    }
}
