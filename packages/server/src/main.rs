use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use gallery_server::config::AppConfig;
use gallery_server::database::init_db;
use gallery_server::services::image::ImageService;
use gallery_server::state::AppState;
use gallery_server::{build_router, seed, storage};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database)
        .await
        .context("Failed to initialize database")?;
    let images = Arc::new(ImageService::new(db));
    let blob_store = storage::build_blob_store(&config.storage).await?;

    if config.seed.enabled {
        seed::seed_images(&*images, &*blob_store, &config.storage.container)
            .await
            .context("Failed to seed sample images")?;
    }

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid server.host / server.port")?;

    let state = AppState {
        images,
        blob_store,
        config: Arc::new(config),
    };
    let app = build_router(state);

    info!("Server running at http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
