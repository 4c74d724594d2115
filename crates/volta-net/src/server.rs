//! ---
//! volta_section: "05-networking-external-interfaces"
//! volta_subsection: "module"
//! volta_type: "source"
//! volta_scope: "code"
//! volta_description: "HTTP and WebSocket server lifecycle."
//! volta_version: "v0.0.0-prealpha"
//! volta_owner: "tbd"
//! ---
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};
use volta_core::{BatchService, SessionRegistry};

use crate::{rest, websocket};

/// Shared state injected into every handler.
#[derive(Debug)]
pub(crate) struct AppState {
    pub(crate) registry: SessionRegistry,
    pub(crate) batch: BatchService,
    pub(crate) observer_buffer: usize,
}

/// Builder for the Volta server exposing `/ws` and the `/api` routes.
#[derive(Debug, Clone)]
pub struct ServerBuilder {
    listen: SocketAddr,
    registry: SessionRegistry,
    batch: BatchService,
    observer_buffer: usize,
}

impl ServerBuilder {
    /// Default depth of each observer's outbound queue.
    pub const DEFAULT_OBSERVER_BUFFER: usize = 64;

    /// Create a builder bound to `listen`.
    pub fn new(listen: SocketAddr, registry: SessionRegistry, batch: BatchService) -> Self {
        Self {
            listen,
            registry,
            batch,
            observer_buffer: Self::DEFAULT_OBSERVER_BUFFER,
        }
    }

    /// Override the per-observer outbound queue depth (minimum 1).
    pub fn with_observer_buffer(mut self, depth: usize) -> Self {
        self.observer_buffer = depth.max(1);
        self
    }

    /// Build the router without binding a socket.
    pub fn router(&self) -> Router {
        let state = Arc::new(AppState {
            registry: self.registry.clone(),
            batch: self.batch.clone(),
            observer_buffer: self.observer_buffer,
        });
        Router::new()
            .merge(websocket::routes())
            .merge(rest::routes())
            .with_state(state)
            .layer(TraceLayer::new_for_http())
    }

    /// Bind the listener and serve until [`ServerHandle::shutdown`].
    pub async fn spawn(self) -> anyhow::Result<ServerHandle> {
        let listener = TcpListener::bind(self.listen).await?;
        let local_addr = listener.local_addr()?;
        info!(address = %local_addr, "volta server listening");

        let app = self.router();
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let server = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = shutdown_rx.changed().await;
            });
            if let Err(err) = server.await {
                warn!(error = %err, "volta server exited with error");
            }
        });

        Ok(ServerHandle {
            address: local_addr,
            registry: self.registry,
            shutdown: shutdown_tx,
            task,
        })
    }
}

/// Handle for the running server.
#[derive(Debug)]
pub struct ServerHandle {
    address: SocketAddr,
    registry: SessionRegistry,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl ServerHandle {
    /// Return the bound listening address.
    pub fn local_addr(&self) -> SocketAddr {
        self.address
    }

    /// Stop every streaming session, then shut the listener down gracefully.
    pub async fn shutdown(self) -> anyhow::Result<()> {
        self.registry.shutdown().await;
        let _ = self.shutdown.send(true);
        match self.task.await {
            Ok(()) => {
                info!("volta server stopped");
                Ok(())
            }
            Err(err) => Err(anyhow::anyhow!(err)),
        }
    }
}
