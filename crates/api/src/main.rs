//! Leafscan - Main Entry Point

use std::sync::Arc;

use anyhow::Context;
use api::settings::Settings;
use api::{build_pipeline, init_logging, run_server, AppState, MetadataStore};
use inference_engine::ModelRegistry;
use metrics_exporter_prometheus::PrometheusBuilder;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading settings")?;
    init_logging(&settings.logging)?;

    info!("=== Leafscan v{} ===", env!("CARGO_PKG_VERSION"));

    let metrics = PrometheusBuilder::new()
        .install_recorder()
        .context("installing Prometheus recorder")?;

    let registry = Arc::new(ModelRegistry::load(&settings.model.registry_config()));
    let metadata = MetadataStore::open(&settings.metadata)
        .await
        .context("opening disease metadata store")?;
    let pipeline = build_pipeline(&settings, Arc::clone(&registry), metadata.source())
        .await
        .context("building inference pipeline")?;

    let state = Arc::new(AppState::new(
        Arc::new(pipeline),
        settings.server.max_upload_bytes,
        Some(metrics),
    ));
    let served = run_server(state, &settings.server.addr, &settings.rate_limit).await;

    metadata.close().await;

    match Arc::try_unwrap(registry) {
        Ok(registry) => registry.teardown(),
        Err(_) => info!("Model still referenced at shutdown, skipping teardown"),
    }
    served?;
    Ok(())
}
