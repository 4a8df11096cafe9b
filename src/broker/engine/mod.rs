pub mod server;
pub mod session;

pub use server::{serve, serve_with_listener};
