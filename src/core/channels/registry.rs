use dashmap::DashMap;
use std::sync::Arc;
use tracing::debug;

use crate::core::channels::channel::Channel;
use crate::core::message::ChannelName;

/// Thread-safe store of active channels.
///
/// Channels are created lazily on the first SUBSCRIBE that names them and
/// are never removed; a channel with no members just sits idle.
#[derive(Debug, Default)]
pub struct ChannelRegistry {
    channels: DashMap<ChannelName, Arc<Channel>>,
}

impl ChannelRegistry {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arc<Channel>> {
        self.channels.get(name).map(|entry| Arc::clone(&entry))
    }

    pub fn create_or_get(&self, name: &str) -> Arc<Channel> {
        self.channels
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(channel = %name, "channel not found; creating");
                Arc::new(Channel::new(name))
            })
            .clone()
    }

    pub fn list(&self) -> Vec<ChannelName> {
        self.channels
            .iter()
            .map(|entry| entry.key().clone())
            .collect()
    }
}
