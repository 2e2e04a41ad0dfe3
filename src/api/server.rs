//! HTTP server lifecycle.
//!
//! `serve()` runs the API in the foreground until the given shutdown future
//! resolves. `start_server_on()` binds, spawns the server in a background
//! task and returns a handle with a shutdown channel.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::oneshot;
use tokio::task::JoinHandle;

use crate::api::router::api_router;
use crate::core_state::CoreState;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },
    #[error("Server error: {0}")]
    Serve(std::io::Error),
}

/// Handle to a server running in the background.
pub struct ApiServer {
    pub addr: SocketAddr,
    shutdown_tx: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl ApiServer {
    /// Ask the server to stop accepting connections. Idempotent.
    pub fn shutdown(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
            tracing::info!("API server shutdown signal sent");
        }
    }

    /// Shut down and wait for in-flight requests to finish.
    pub async fn stop(mut self) {
        self.shutdown();
        if let Err(e) = self.task.await {
            tracing::warn!("API server task ended abnormally: {e}");
        }
    }
}

async fn bind(addr: SocketAddr) -> Result<(tokio::net::TcpListener, SocketAddr), ServerError> {
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    let local = listener
        .local_addr()
        .map_err(|source| ServerError::Bind { addr, source })?;
    Ok((listener, local))
}

/// Serve on `0.0.0.0:port` until `shutdown` resolves.
pub async fn serve<F>(core: Arc<CoreState>, port: u16, shutdown: F) -> Result<(), ServerError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (listener, addr) = bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
    let app = api_router(core);

    tracing::info!(%addr, "API server listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(ServerError::Serve)?;
    tracing::info!("API server stopped");
    Ok(())
}

/// Start the server on `addr` in a background task.
///
/// Port 0 picks an ephemeral port; the bound address is in `ApiServer::addr`.
pub async fn start_server_on(core: Arc<CoreState>, addr: SocketAddr) -> Result<ApiServer, ServerError> {
    let (listener, addr) = bind(addr).await?;
    let app = api_router(core);
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
    use crate::core_state::testing::harness;
    use crate::llm::MockLlmClient;
    use crate::mail::{MockMailbox, MockMailer};

    fn localhost() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn serves_health_over_tcp() {
        let h = harness(MockLlmClient::new("{}"), MockMailer::new(), MockMailbox::default());
        let server = start_server_on(h.state.clone(), localhost())
            .await
            .expect("server should start");
        assert!(server.addr.port() > 0);

        let url = format!("http://{}/health", server.addr);
        let resp = reqwest::get(&url).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::OK);
        let body: serde_json::Value = resp.json().await.unwrap();
        assert_eq!(body["status"], "ok");

        let resp = reqwest::get(format!("http://{}/nope", server.addr)).await.unwrap();
        assert_eq!(resp.status(), reqwest::StatusCode::NOT_FOUND);

        server.stop().await;
    }

    #[tokio::test]
    async fn shutdown_is_idempotent() {
        let h = harness(MockLlmClient::new("{}"), MockMailer::new(), MockMailbox::default());
        let mut server = start_server_on(h.state.clone(), localhost())
            .await
            .expect("server should start");
        server.shutdown();
        server.shutdown();
        server.stop().await;
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let h = harness(MockLlmClient::new("{}"), MockMailer::new(), MockMailbox::default());
        let first = start_server_on(h.state.clone(), localhost()).await.unwrap();
        let err = start_server_on(h.state.clone(), first.addr).await.err().unwrap();
        assert!(matches!(err, ServerError::Bind { .. }));
        first.stop().await;
    }

    #[tokio::test]
    async fn serve_returns_after_shutdown_future() {
        let h = harness(MockLlmClient::new("{}"), MockMailer::new(), MockMailbox::default());
        serve(h.state.clone(), 0, async {}).await.unwrap();
    }
}
