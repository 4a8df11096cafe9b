use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::core::error::BrokerError;
use crate::core::session::{SessionHandle, SessionId};
use crate::core::subscription::subscription::{Subscription, SubscriptionId};

/// Sole owner of every live subscription, source of identifier
/// allocation, and the single point of attach/detach arbitration.
#[derive(Debug)]
pub struct SubscriptionRegistry {
    subscriptions: DashMap<SubscriptionId, Arc<Subscription>>,
    next_id: AtomicU64,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            subscriptions: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Allocate a fresh identifier and register a new subscription in the
    /// active state, bound to `owner`. Never fails.
    pub fn create(
        &self,
        channel: &str,
        owner: &SessionHandle,
        max_backlog: usize,
    ) -> Arc<Subscription> {
        let id = SubscriptionId::new(self.next_id.fetch_add(1, Ordering::Relaxed));
        let subscription = Arc::new(Subscription::new(id, channel, max_backlog, owner.clone()));
        self.subscriptions.insert(id, Arc::clone(&subscription));
        subscription
    }

    pub fn get(&self, id: SubscriptionId) -> Option<Arc<Subscription>> {
        self.subscriptions.get(&id).map(|entry| Arc::clone(&entry))
    }

    pub fn detach(&self, id: SubscriptionId, session: SessionId) -> Result<(), BrokerError> {
        let subscription = self.get(id).ok_or(BrokerError::NotFound)?;
        subscription.detach(session)
    }

    pub fn attach(&self, id: SubscriptionId, session: &SessionHandle) -> Result<usize, BrokerError> {
        let subscription = self.get(id).ok_or(BrokerError::NotFound)?;
        subscription.attach(session)
    }

    pub fn remove(&self, id: SubscriptionId) -> Option<Arc<Subscription>> {
        self.subscriptions.remove(&id).map(|(_, sub)| sub)
    }

    pub fn count(&self) -> usize {
        self.subscriptions.len()
    }
}
