//! HTTP server lifecycle: bind → serve → graceful shutdown on ctrl-c.

use tokio::net::TcpListener;

use crate::api::router::api_router;
use crate::api::types::ApiContext;

/// Bind the configured address and serve until shutdown.
pub async fn serve(ctx: ApiContext) -> std::io::Result<()> {
    let bind_addr = ctx.config.bind_addr.clone();
    let listener = TcpListener::bind(&bind_addr).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "API server listening");

    axum::serve(listener, api_router(ctx))
        .with_graceful_shutdown(shutdown_signal())
        .await
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {e}");
        return;
    }
    tracing::info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use crate::agents::client::MockAgentRunner;
    use crate::config::Config;
    use crate::db::sqlite::open_memory_database;
    use crate::extraction::vision::MockVisionExtractor;

    #[tokio::test]
    async fn server_binds_and_answers_health() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            data_dir: dir.path().to_path_buf(),
            agent_url: "http://localhost:5010".into(),
            vision_url: "http://localhost:0".into(),
            vision_api_key: String::new(),
            vision_model: "gemini-2.0-flash".into(),
            bind_addr: "127.0.0.1:0".into(),
            transcriber: "true".into(),
        };
        let ctx = ApiContext::new(
            open_memory_database().unwrap(),
            Arc::new(MockAgentRunner::new()),
            Arc::new(MockVisionExtractor::new("text")),
            config,
        );

        // Bind manually so the ephemeral port is known, then serve.
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = api_router(ctx);
        let server = tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        let body = reqwest::get(format!("http://{addr}/health"))
            .await
            .unwrap()
            .json::<serde_json::Value>()
            .await
            .unwrap();
        assert_eq!(body["status"], "healthy");

        server.abort();
    }
}
