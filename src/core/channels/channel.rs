use parking_lot::{Mutex, MutexGuard};

use crate::core::message::ChannelName;
use crate::core::subscription::SubscriptionId;

/// A named broadcast topic: the set of subscription identifiers bound to
/// it. Pure lookup index; the subscription registry owns the
/// subscriptions themselves.
#[derive(Debug)]
pub struct Channel {
    name: ChannelName,
    members: Mutex<Vec<SubscriptionId>>,
}

impl Channel {
    pub fn new(name: impl Into<ChannelName>) -> Self {
        Self {
            name: name.into(),
            members: Mutex::new(Vec::new()),
        }
    }

    pub fn name(&self) -> &ChannelName {
        &self.name
    }

    pub fn bind(&self, id: SubscriptionId) {
        self.members.lock().push(id);
    }

    pub fn unbind(&self, id: SubscriptionId) {
        self.members.lock().retain(|member| *member != id);
    }

    /// Exclusive access to the member list for the duration of a fan-out.
    ///
    /// Publish holds this guard across the entire enumeration, which is
    /// what makes publish a total order per channel. Lock order is always
    /// channel before subscription; nothing takes them the other way
    /// around.
    pub fn members(&self) -> MutexGuard<'_, Vec<SubscriptionId>> {
        self.members.lock()
    }
}
