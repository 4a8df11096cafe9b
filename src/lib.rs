//! RelayMQ – a pub/sub message broker with detachable, replayable
//! subscriptions.
//!
//! This crate exports
//!  * `core`   – message, channel, subscription and delivery logic
//!  * `broker` – TCP server-side engine
//!  * `config` – TOML-driven runtime configuration
//!
//! Downstream applications can embed the broker engine (`start_broker`) or
//! build their own binaries on top of the library.

// ───────────────────────────────────────────────────────────
// Public modules
// ───────────────────────────────────────────────────────────
pub mod broker;
pub mod config;
pub mod core;
pub mod logging;

// ───────────────────────────────────────────────────────────
// Re-exports
// ───────────────────────────────────────────────────────────
pub use crate::broker::engine::serve as start_broker;
pub use crate::config::{load_config, Config};
pub use crate::core::broker::{Broker, BrokerConfig};
