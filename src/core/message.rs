use bytes::Bytes;

/// Alias for a channel name. Opaque, case-sensitive, no normalization.
pub type ChannelName = String;

/// One published message. Each subscription bound to the channel at
/// publish time receives its own delivery of the same `Message`.
#[derive(Debug, Clone)]
pub struct Message {
    pub id: u64,
    pub channel: ChannelName,
    pub payload: Bytes,
    /// Enqueue time, milliseconds since the Unix epoch.
    pub timestamp: u64,
}

impl Message {
    pub fn new(id: u64, channel: impl Into<ChannelName>, payload: impl Into<Bytes>) -> Self {
        Self {
            id,
            channel: channel.into(),
            payload: payload.into(),
            timestamp: current_timestamp(),
        }
    }
}

pub fn current_timestamp() -> u64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
