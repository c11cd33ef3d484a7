//! Server lifecycle management
//!
//! Binds the HTTP listener, keeps the rate limiter tidy and shuts down on
//! Ctrl+C or SIGTERM.

use std::net::SocketAddr;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use bvproxy_api::{create_router, AppState};

/// How often idle rate limit buckets are dropped.
const PRUNE_INTERVAL: Duration = Duration::from_secs(60);

/// bvproxy server - owns the HTTP listener and background upkeep
pub struct BvProxyServer {
    state: AppState,
}

impl BvProxyServer {
    pub const fn new(state: AppState) -> Self {
        Self { state }
    }

    /// Start the server and wait for a shutdown signal
    pub async fn start(self) -> anyhow::Result<()> {
        info!("Starting bvproxy server...");

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let http_address = self.state.config.http_address();
        let listener = tokio::net::TcpListener::bind(&http_address)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind HTTP address {http_address}: {e}"))?;
        let http_addr = listener.local_addr()?;
        info!("HTTP server listening on {}", http_addr);

        let mut http_handle = self.start_http_server(listener, shutdown_rx.clone());
        let prune_handle = self.start_rate_limit_pruner(shutdown_rx);

        let http_running = tokio::select! {
            _ = &mut http_handle => {
                error!("HTTP server stopped unexpectedly");
                false
            }
            () = shutdown_signal() => {
                info!("Shutdown signal received, starting graceful shutdown...");
                true
            }
        };

        // Signal all components to shut down
        let _ = shutdown_tx.send(true);
        if http_running {
            let _ = http_handle.await;
        }
        let _ = prune_handle.await;

        info!("bvproxy server shut down complete");
        Ok(())
    }

    /// Serve HTTP with peer addresses available to the client IP extractor
    fn start_http_server(
        &self,
        listener: tokio::net::TcpListener,
        shutdown_rx: watch::Receiver<bool>,
    ) -> JoinHandle<()> {
        let router = create_router(self.state.clone());

        tokio::spawn(async move {
            let mut rx = shutdown_rx;
            let graceful = async move {
                let _ = rx.changed().await;
            };

            if let Err(e) = axum::serve(
                listener,
                router.into_make_service_with_connect_info::<SocketAddr>(),
            )
            .with_graceful_shutdown(graceful)
            .await
            {
                error!("HTTP server error: {}", e);
            }

            info!("HTTP server shut down gracefully");
        })
    }

    fn start_rate_limit_pruner(&self, mut shutdown_rx: watch::Receiver<bool>) -> JoinHandle<()> {
        let limiter = self.state.rate_limiter.clone();

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(PRUNE_INTERVAL);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        limiter.prune();
                        debug!(tracked = limiter.tracked_keys(), "Pruned rate limit buckets");
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
        })
    }
}

/// Wait for a shutdown signal (SIGTERM or SIGINT/Ctrl+C)
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => { info!("Received Ctrl+C"); }
        () = terminate => { info!("Received SIGTERM"); }
    }
}
