//! API server lifecycle: bind → spawn background task → return a handle
//! with a shutdown channel.

use std::net::SocketAddr;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::build_router;
use crate::api::types::ApiContext;

/// Handle to a running API server.
pub struct ApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ApiServer {
    /// Signal graceful shutdown.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Wait for the server task to finish.
    pub async fn wait(self) {
        if let Err(e) = self.task.await {
            tracing::error!("API server task failed: {e}");
        }
    }
}

/// Bind `addr` and serve the API in a background task.
pub async fn start_api_server(ctx: ApiContext, addr: SocketAddr) -> std::io::Result<ApiServer> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    let addr = listener.local_addr()?;
    let app = build_router(ctx);

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    let task = tokio::spawn(async move {
        let shutdown_signal = async move {
            let _ = shutdown_rx.await;
            tracing::info!("API server received shutdown signal");
        };

        tracing::info!(%addr, "API server started");

        if let Err(e) = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal)
            .await
        {
            tracing::error!("API server error: {e}");
        }

        tracing::info!("API server stopped");
    });

    Ok(ApiServer {
        addr,
        shutdown_tx: Some(shutdown_tx),
        task,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::router::tests::test_context;

    #[tokio::test]
    async fn start_serve_and_stop() {
        let (ctx, _store, _uploads) = test_context();
        let addr: SocketAddr = "127.0.0.1:0".parse().unwrap();
        let mut server = start_api_server(ctx, addr).await.unwrap();
        assert_ne!(server.addr.port(), 0);

        let resp = reqwest::get(format!("http://{}/api/health", server.addr))
            .await
            .unwrap();
        assert!(resp.status().is_success());

        let resp = reqwest::get(format!("http://{}/api/dashboard", server.addr))
            .await
            .unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::UNAUTHORIZED);

        server.shutdown();
        server.wait().await;
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let (ctx, _store, _uploads) = test_context();
        let taken = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = taken.local_addr().unwrap();
        assert!(start_api_server(ctx, addr).await.is_err());
    }
}
