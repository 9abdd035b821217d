use std::sync::Arc;

use anyhow::Context;
use common::compress::CompressorRegistry;
use server::config::AppConfig;
use server::database::init_db;
use server::metadata::SeaOrmMetadataStore;
use server::pipeline::{CompressionPipeline, PipelineSettings};
use server::state::AppState;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = AppConfig::load().context("Failed to load configuration")?;

    let level = config.server.log_level()?;
    tracing_subscriber::fmt().with_max_level(level).init();

    let db = init_db(&config.database.url, config.database.max_connections)
        .await
        .context("Failed to connect to database")?;
    info!("Database connected and schema synced");

    let blobs = config
        .storage
        .open()
        .await
        .context("Failed to open blob storage")?;
    info!(backend = ?config.storage.backend, path = %config.storage.path.display(), "Blob storage ready");

    let compressors = CompressorRegistry::from_config(&config.compressor);
    info!(
        ghostscript = %config.compressor.ghostscript_bin,
        jpeg_quality = config.compressor.jpeg_quality,
        "Compressors configured"
    );

    let pipeline = CompressionPipeline::new(
        compressors,
        blobs,
        Arc::new(SeaOrmMetadataStore::new(db)),
        PipelineSettings {
            max_upload_bytes: config.upload.max_bytes,
            download_base: config.download_base(),
        },
    );

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let app = server::build_router(AppState {
        pipeline: Arc::new(pipeline),
        config,
    });

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
