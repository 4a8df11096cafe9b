//! Delivery engine: publish fan-out plus the subscription lifecycle
//! operations the protocol dispatcher calls into.
//!
//! Owns the channel index, the subscription registry and the message-id
//! counter. Sessions get an `Arc<Broker>` handle at construction; there is
//! no ambient global state.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info};

use crate::core::channels::ChannelRegistry;
use crate::core::error::BrokerError;
use crate::core::message::Message;
use crate::core::protocol;
use crate::core::session::{SessionHandle, SessionId};
use crate::core::subscription::{SubscriptionId, SubscriptionRegistry};

#[derive(Debug, Clone)]
pub struct BrokerConfig {
    /// Backlog cap per detached subscription; 0 means unbounded.
    pub max_backlog: usize,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self { max_backlog: 0 }
    }
}

#[derive(Debug)]
pub struct Broker {
    channels: ChannelRegistry,
    subscriptions: SubscriptionRegistry,
    next_message_id: AtomicU64,
    config: BrokerConfig,
}

impl Broker {
    pub fn new(config: BrokerConfig) -> Self {
        Self {
            channels: ChannelRegistry::new(),
            subscriptions: SubscriptionRegistry::new(),
            next_message_id: AtomicU64::new(1),
            config,
        }
    }

    /// Create a subscription on `channel` owned by `session` and return
    /// its identifier. Creates the channel on first reference.
    ///
    /// The `OK <id>` ack enters the send path before the subscription is
    /// bound into the channel index, so the subscriber always sees its id
    /// ahead of any delivery.
    pub fn subscribe(&self, channel: &str, session: &SessionHandle) -> SubscriptionId {
        let subscription = self
            .subscriptions
            .create(channel, session, self.config.max_backlog);
        session.send(protocol::encode_ok_value(subscription.id().as_u64()));
        self.channels.create_or_get(channel).bind(subscription.id());
        debug!(
            subscription_id = %subscription.id(),
            channel = %channel,
            session_id = %session.id(),
            "subscription created"
        );
        subscription.id()
    }

    /// Take the subscription offline, keeping its place in line. Backlog
    /// accumulation starts with the next publish to its channel.
    pub fn detach(&self, id: SubscriptionId, session: SessionId) -> Result<(), BrokerError> {
        self.subscriptions.detach(id, session)?;
        debug!(subscription_id = %id, session_id = %session, "subscription detached");
        Ok(())
    }

    /// Resume delivery on `session`, flushing the backlog in publish
    /// order. Returns the number of messages flushed. The `OK <count>`
    /// ack and the flushed frames are pushed by the subscription itself;
    /// the dispatcher must not ack again on success.
    pub fn attach(&self, id: SubscriptionId, session: &SessionHandle) -> Result<usize, BrokerError> {
        let flushed = self.subscriptions.attach(id, session)?;
        debug!(
            subscription_id = %id,
            session_id = %session.id(),
            flushed,
            "subscription attached"
        );
        Ok(flushed)
    }

    /// Fan a message out to every subscription bound to `channel` at this
    /// instant: an immediate push for active ones, a backlog append for
    /// detached ones. Always returns a fresh message id; publishing to a
    /// channel nobody has ever subscribed to is a no-op.
    ///
    /// The channel member lock is held across the whole enumeration, so
    /// concurrent publishes to one channel serialize and every
    /// subscription observes the same per-channel order.
    pub fn publish(&self, channel: &str, payload: Bytes) -> u64 {
        let Some(chan) = self.channels.get(channel) else {
            return self.next_message_id.fetch_add(1, Ordering::Relaxed);
        };

        let members = chan.members();
        let id = self.next_message_id.fetch_add(1, Ordering::Relaxed);
        let message = Arc::new(Message::new(id, channel, payload));
        // One encode shared by every active subscriber on this channel.
        let mut wire: Option<Bytes> = None;
        for subscription_id in members.iter() {
            if let Some(subscription) = self.subscriptions.get(*subscription_id) {
                subscription.deliver(&message, &mut wire);
            }
        }
        let receivers = members.len();
        drop(members);

        debug!(message_id = id, channel = %channel, receivers, "published");
        id
    }

    /// Tear down an active subscription whose owning session is going
    /// away without having detached. Idempotent; a no-op unless `session`
    /// still owns the subscription. The backlog (none, since it was
    /// active) and the registry entries are released.
    pub fn terminate(&self, id: SubscriptionId, session: SessionId) {
        let Some(subscription) = self.subscriptions.get(id) else {
            return;
        };
        // Flip the state first, then unbind: a fan-out that already
        // snapshotted the member list sees the tombstone and skips. The
        // subscription lock is never held while taking the channel lock.
        if subscription.terminate(session) {
            if let Some(chan) = self.channels.get(subscription.channel()) {
                chan.unbind(id);
            }
            self.subscriptions.remove(id);
            info!(
                subscription_id = %id,
                channel = %subscription.channel(),
                "subscription terminated"
            );
        }
    }

    /// Backlog depth of a subscription, `None` if the id is unknown.
    pub fn pending(&self, id: SubscriptionId) -> Option<usize> {
        self.subscriptions.get(id).map(|sub| sub.pending())
    }
}
