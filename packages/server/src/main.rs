use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use common::NoteCodec;
use common::storage::FilesystemBlobStore;
use item_server::config::AppConfig;
use item_server::database::{ensure_indexes, init_db};
use item_server::state::AppState;
use item_server::store::gc::run_blob_gc;
use item_server::store::{ItemStore, StoreSettings};
use tracing::{Level, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let db = init_db(&config.database.url)
        .await
        .context("Failed to initialize database")?;
    ensure_indexes(&db).await?;

    let blobs = FilesystemBlobStore::new(
        config.storage.blob_dir.clone().into(),
        config.storage.max_blob_size,
    )
    .await
    .context("Failed to initialize blob storage")?;

    let store = ItemStore::new(
        db,
        Arc::new(blobs),
        Arc::new(NoteCodec),
        StoreSettings::from(&config.items),
    );

    if config.items.gc_interval_secs > 0 {
        tokio::spawn(run_blob_gc(
            store.clone(),
            Duration::from_secs(config.items.gc_interval_secs),
            Duration::from_secs(config.items.gc_grace_secs),
        ));
    }

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState {
        store,
        config: Arc::new(config),
    };
    let app = item_server::build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!("Server running at http://{}", addr);
    axum::serve(listener, app).await?;

    Ok(())
}
