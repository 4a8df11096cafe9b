use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use parking_lot::Mutex;
use tracing::warn;

use crate::core::error::BrokerError;
use crate::core::message::{ChannelName, Message};
use crate::core::protocol;
use crate::core::session::{SessionHandle, SessionId};

/// Unique identifier for a subscription. Monotonic, never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    pub fn new(raw: u64) -> Self {
        SubscriptionId(raw)
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug)]
enum State {
    /// Driven by a live session; deliveries go straight to its send path.
    Active { owner: SessionHandle },
    /// No owning session; deliveries accumulate in the backlog.
    Detached {
        backlog: VecDeque<Arc<Message>>,
        dropped: u64,
    },
    /// Tombstone. Observable only by a fan-out that snapshotted the
    /// channel members before the terminating side unbound this
    /// subscription from the index.
    Terminated,
}

/// One channel binding. Bound to exactly one channel for its entire life;
/// owned by the [`SubscriptionRegistry`](super::SubscriptionRegistry),
/// never by a session.
///
/// Every transition below is a single locked match on the current state,
/// so a precondition check and its transition can never be torn apart by
/// a concurrent publish, attach or detach.
#[derive(Debug)]
pub struct Subscription {
    id: SubscriptionId,
    channel: ChannelName,
    /// Backlog cap while detached; 0 means unbounded.
    max_backlog: usize,
    state: Mutex<State>,
}

impl Subscription {
    pub fn new(
        id: SubscriptionId,
        channel: impl Into<ChannelName>,
        max_backlog: usize,
        owner: SessionHandle,
    ) -> Self {
        Self {
            id,
            channel: channel.into(),
            max_backlog,
            state: Mutex::new(State::Active { owner }),
        }
    }

    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn channel(&self) -> &ChannelName {
        &self.channel
    }

    /// Route one published message: immediate push when active, backlog
    /// append when detached, nothing when terminated.
    ///
    /// `wire` caches the encoded push frame across the fan-out loop so a
    /// message delivered to many active subscribers is encoded once.
    pub fn deliver(&self, msg: &Arc<Message>, wire: &mut Option<Bytes>) {
        let mut state = self.state.lock();
        match &mut *state {
            State::Active { owner } => {
                let frame = wire
                    .get_or_insert_with(|| protocol::encode_message_frame(msg))
                    .clone();
                owner.send(frame);
            }
            State::Detached { backlog, dropped } => {
                if self.max_backlog > 0 && backlog.len() == self.max_backlog {
                    backlog.pop_front();
                    *dropped += 1;
                    warn!(
                        subscription_id = %self.id,
                        channel = %self.channel,
                        dropped = *dropped,
                        "backlog full; dropped oldest pending message"
                    );
                }
                backlog.push_back(Arc::clone(msg));
            }
            State::Terminated => {}
        }
    }

    /// Voluntary offline transition. Only the owning session may detach;
    /// the backlog starts empty and the owner reference is dropped.
    pub fn detach(&self, session: SessionId) -> Result<(), BrokerError> {
        let mut state = self.state.lock();
        match &*state {
            State::Active { owner } if owner.id() == session => {
                *state = State::Detached {
                    backlog: VecDeque::new(),
                    dropped: 0,
                };
                Ok(())
            }
            State::Active { .. } => Err(BrokerError::NotOwner),
            State::Detached { .. } => {
                Err(BrokerError::InvalidState("subscription already detached"))
            }
            State::Terminated => Err(BrokerError::NotFound),
        }
    }

    /// Resume delivery on a new session. First attacher wins; a competing
    /// attach is rejected, not queued.
    ///
    /// The `OK <pending>` ack and the entire backlog enter the send path
    /// before the state flips to active, all under the state lock, so a
    /// publish racing this attach lands strictly after the flushed batch
    /// and the flushed batch strictly after the ack.
    pub fn attach(&self, session: &SessionHandle) -> Result<usize, BrokerError> {
        let mut state = self.state.lock();
        match &mut *state {
            State::Detached { backlog, .. } => {
                let pending = backlog.len();
                session.send(protocol::encode_ok_value(pending as u64));
                for msg in backlog.drain(..) {
                    session.send(protocol::encode_message_frame(&msg));
                }
                *state = State::Active {
                    owner: session.clone(),
                };
                Ok(pending)
            }
            State::Active { .. } => Err(BrokerError::AlreadyActive),
            State::Terminated => Err(BrokerError::NotFound),
        }
    }

    /// Transition to the tombstone state if `session` still owns this
    /// subscription. Returns whether this call performed the transition;
    /// the caller then unbinds the id from the channel and the registry.
    /// A detached subscription is unaffected by any session's disconnect.
    pub fn terminate(&self, session: SessionId) -> bool {
        let mut state = self.state.lock();
        match &*state {
            State::Active { owner } if owner.id() == session => {
                *state = State::Terminated;
                true
            }
            _ => false,
        }
    }

    /// Number of messages waiting for the next attach.
    pub fn pending(&self) -> usize {
        match &*self.state.lock() {
            State::Detached { backlog, .. } => backlog.len(),
            _ => 0,
        }
    }
}
