//! Hub server listener
//!
//! Binds the TCP listener and serves the HTTP/WebSocket routes.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;

use crate::error::Result;
use crate::hub::BroadcastHub;
use crate::server::config::ServerConfig;
use crate::server::routes::{self, AppState};

/// Fan-out hub server
pub struct HubServer {
    config: ServerConfig,
    hub: Arc<BroadcastHub>,
}

impl HubServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        let hub = Arc::new(BroadcastHub::with_config(config.hub.clone()));
        Self::with_hub(config, hub)
    }

    /// Create a server on top of an existing hub
    pub fn with_hub(config: ServerConfig, hub: Arc<BroadcastHub>) -> Self {
        Self { config, hub }
    }

    /// Get a reference to the hub
    pub fn hub(&self) -> &Arc<BroadcastHub> {
        &self.hub
    }

    /// Get the bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }

    /// Build the HTTP router for this server
    pub fn router(&self) -> Router {
        routes::router(AppState::new(
            Arc::clone(&self.hub),
            self.config.max_connections,
        ))
    }

    /// Run the server
    ///
    /// This method blocks until the server fails.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// On shutdown every live connection is closed, so their receive loops
    /// run cleanup before this returns.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(addr = %addr, "Hub server listening");

        let hub = Arc::clone(&self.hub);
        let signal = async move {
            shutdown.await;
            tracing::info!("Shutdown signal received");
            hub.shutdown();
        };

        axum::serve(listener, self.router())
            .with_graceful_shutdown(signal)
            .await?;

        Ok(())
    }
}
