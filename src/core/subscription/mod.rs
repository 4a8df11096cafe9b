//! Durable channel bindings that outlive their owning connection.

pub mod registry;
#[allow(clippy::module_inception)]
pub mod subscription;

pub use registry::SubscriptionRegistry;
pub use subscription::{Subscription, SubscriptionId};
