use std::sync::Arc;

use tracing_subscriber::EnvFilter;

use vitalink::agents::client::AdkClient;
use vitalink::api::server::serve;
use vitalink::api::types::ApiContext;
use vitalink::config::{self, Config};
use vitalink::db::sqlite::open_database;
use vitalink::extraction::vision::GeminiVisionClient;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config::default_log_filter())),
        )
        .init();

    tracing::info!("{} starting v{}", config::APP_NAME, config::APP_VERSION);

    let cfg = Config::from_env();
    if cfg.vision_api_key.is_empty() {
        tracing::warn!("VITALINK_VISION_API_KEY is not set — image uploads will fail");
    }
    if let Err(e) = cfg.ensure_directories() {
        tracing::error!("Cannot create data directories under {}: {e}", cfg.data_dir.display());
        std::process::exit(1);
    }

    let db = match open_database(&cfg.database_path()) {
        Ok(conn) => conn,
        Err(e) => {
            tracing::error!("Database initialization failed: {e}");
            std::process::exit(1);
        }
    };

    let agents = Arc::new(AdkClient::new(&cfg.agent_url));
    let vision = Arc::new(GeminiVisionClient::new(
        &cfg.vision_url,
        &cfg.vision_api_key,
        &cfg.vision_model,
    ));

    let ctx = ApiContext::new(db, agents, vision, cfg);
    if let Err(e) = serve(ctx).await {
        tracing::error!("Server error: {e}");
        std::process::exit(1);
    }
}
