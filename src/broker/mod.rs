//! Network-facing broker engine.
//!
//! - `engine::server`: TCP accept loop wiring connections to sessions.
//! - `engine::session`: per-connection protocol dispatcher and writer.

pub mod engine;

pub use self::engine::serve;
