//! Server engine for the RelayMQ broker.
//!
//! Accepts TCP connections and spawns one session task per connection.
//! The engine itself only needs a reliable, ordered duplex byte stream;
//! an encrypted transport belongs to a fronting collaborator.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio::task;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::core::auth::{ApiKeyValidator, StaticApiKeyValidator};
use crate::core::broker::{Broker, BrokerConfig};
use crate::core::session::SessionId;

use super::session;

/// Starts the RelayMQ broker server, with settings from `relaymq.toml`.
pub async fn serve(cfg: Config) -> anyhow::Result<()> {
    let listener = TcpListener::bind(&cfg.server.bind_addr).await?;
    info!("starting relaymq broker on {}", cfg.server.bind_addr);

    let broker = Arc::new(Broker::new(BrokerConfig {
        max_backlog: cfg.subscriptions.max_backlog,
    }));
    let validator: Arc<dyn ApiKeyValidator> =
        Arc::new(StaticApiKeyValidator::new(cfg.auth.api_key.clone()));

    serve_with_listener(listener, broker, validator, cfg.server.max_connections).await
}

/// Accept loop over an already-bound listener. Split out from [`serve`]
/// so tests can bind an ephemeral port and drive the full protocol.
pub async fn serve_with_listener(
    listener: TcpListener,
    broker: Arc<Broker>,
    validator: Arc<dyn ApiKeyValidator>,
    max_connections: usize,
) -> anyhow::Result<()> {
    let active = Arc::new(AtomicUsize::new(0));
    let next_session = AtomicU64::new(1);

    loop {
        let (socket, peer_addr) = listener.accept().await?;
        if active.load(Ordering::Relaxed) >= max_connections {
            warn!(%peer_addr, "connection limit reached; rejecting");
            continue;
        }
        let _ = socket.set_nodelay(true);

        let session_id = SessionId::new(next_session.fetch_add(1, Ordering::Relaxed));
        info!(%peer_addr, %session_id, "client connected");

        let broker = Arc::clone(&broker);
        let validator = Arc::clone(&validator);
        let active = Arc::clone(&active);
        active.fetch_add(1, Ordering::Relaxed);

        task::spawn(async move {
            if let Err(e) = session::run(socket, session_id, broker, validator).await {
                error!(%session_id, "session error: {e:?}");
            }
            active.fetch_sub(1, Ordering::Relaxed);
            info!(%peer_addr, %session_id, "client disconnected");
        });
    }
}
