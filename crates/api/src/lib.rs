//! Leafscan API Server
//!
//! Thin HTTP surface over the inference pipeline: health, detection and
//! Prometheus metrics.

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::SocketAddr;
use std::sync::Arc;
use tower_governor::GovernorLayer;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

pub mod rate_limit;
pub mod routes;
pub mod settings;

use fallback::FallbackEngine;
use inference_engine::ModelRegistry;
use pipeline::InferencePipeline;
use storage::{DiseaseMetadataSource, MemoryDiseaseStore, SqliteDiseaseStore};
use taxonomy::Vocabulary;
use treatment::{TreatmentResolver, TreatmentTable};

use rate_limit::{create_governor_config, DefaultGovernorConfig, RateLimitConfig};
use settings::{LogFormat, LoggingSettings, MetadataSettings, Settings, SettingsError};

/// Application state shared across handlers
pub struct AppState {
    pub pipeline: Arc<InferencePipeline>,
    /// Largest accepted detect body
    pub max_upload_bytes: usize,
    /// Prometheus handle, absent when no recorder was installed
    pub metrics: Option<PrometheusHandle>,
    pub version: String,
    pub start_time: std::time::Instant,
}

impl AppState {
    pub fn new(
        pipeline: Arc<InferencePipeline>,
        max_upload_bytes: usize,
        metrics: Option<PrometheusHandle>,
    ) -> Self {
        Self {
            pipeline,
            max_upload_bytes,
            metrics,
            version: env!("CARGO_PKG_VERSION").to_string(),
            start_time: std::time::Instant::now(),
        }
    }
}

/// Create the application router.
///
/// When `rate_limit` is set only detection is throttled; health and metrics
/// stay reachable for pollers.
pub fn create_router(
    state: Arc<AppState>,
    rate_limit: Option<Arc<DefaultGovernorConfig>>,
) -> Router {
    let mut detect = Router::new().route(
        "/api/v1/detect",
        post(routes::detect::post_detect).layer(DefaultBodyLimit::max(state.max_upload_bytes)),
    );
    if let Some(config) = rate_limit {
        detect = detect.layer(GovernorLayer { config });
    }

    Router::new()
        .route("/api/v1/health", get(routes::health::get_health))
        .route("/metrics", get(routes::metrics::get_metrics))
        .merge(detect)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Initialize logging
pub fn init_logging(settings: &LoggingSettings) -> Result<(), SettingsError> {
    let level: Level = settings
        .level
        .parse()
        .map_err(|_| SettingsError::Invalid(format!("unknown log level {:?}", settings.level)))?;

    let builder = FmtSubscriber::builder().with_max_level(level).with_target(true);
    let result = match settings.format {
        LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
        LogFormat::Text => tracing::subscriber::set_global_default(builder.finish()),
    };
    result.map_err(|e| SettingsError::Logging(e.to_string()))
}

/// Disease metadata store selected by settings
pub enum MetadataStore {
    Memory(Arc<MemoryDiseaseStore>),
    Sqlite(SqliteDiseaseStore),
}

impl MetadataStore {
    /// Open the SQLite store when a URL is configured, else the seeded in-memory one
    pub async fn open(settings: &MetadataSettings) -> Result<Self, SettingsError> {
        match &settings.database_url {
            Some(url) => {
                let store = SqliteDiseaseStore::connect(url).await?;
                store.migrate().await?;
                store.seed_if_empty().await?;
                Ok(MetadataStore::Sqlite(store))
            }
            None => Ok(MetadataStore::Memory(Arc::new(MemoryDiseaseStore::seeded()))),
        }
    }

    pub fn source(&self) -> Arc<dyn DiseaseMetadataSource> {
        match self {
            MetadataStore::Memory(store) => Arc::clone(store) as Arc<dyn DiseaseMetadataSource>,
            MetadataStore::Sqlite(store) => Arc::new(store.clone()),
        }
    }

    /// Close database connections
    pub async fn close(&self) {
        if let MetadataStore::Sqlite(store) = self {
            store.close().await;
            info!("Disease store closed");
        }
    }
}

/// Assemble the pipeline around an already loaded registry and metadata source
pub async fn build_pipeline(
    settings: &Settings,
    registry: Arc<ModelRegistry>,
    metadata: Arc<dyn DiseaseMetadataSource>,
) -> Result<InferencePipeline, SettingsError> {
    let vocabulary = Vocabulary::load(settings.model.vocabulary, settings.model.labels_path.as_deref())?;

    let table = match &settings.treatment.table_path {
        Some(path) => TreatmentTable::from_json_file(path)?,
        None => TreatmentTable::seeded(),
    };
    info!("Treatment table with {} entries", table.len());

    let pipeline = InferencePipeline::new(
        registry,
        Arc::new(vocabulary),
        TreatmentResolver::new(table),
        metadata,
        FallbackEngine::new(settings.fallback.clone())?,
        settings.pipeline_config(),
    )?;
    Ok(pipeline)
}

/// Serve until Ctrl-C
pub async fn run_server(
    state: Arc<AppState>,
    addr: &str,
    rate_limit: &RateLimitConfig,
) -> Result<(), SettingsError> {
    let governor = create_governor_config(rate_limit)?;
    let app = create_router(state, Some(governor));

    info!("Starting API server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("API server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::{to_bytes, Body},
        extract::ConnectInfo,
        http::{header::CONTENT_TYPE, Request, StatusCode},
    };
    use image::{ImageBuffer, ImageFormat, Rgb};
    use inference_engine::{InferenceError, Model, RegistryConfig};
    use ndarray::Array4;
    use routes::detect::{DetectResponse, ErrorResponse};
    use std::io::Cursor;
    use tower::ServiceExt;

    struct FixedModel(Vec<f32>);

    impl Model for FixedModel {
        fn forward(&self, _batch: Array4<f32>) -> Result<Vec<f32>, InferenceError> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &str {
            "fixed"
        }
    }

    async fn state(registry: ModelRegistry, max_upload_bytes: usize) -> Arc<AppState> {
        let pipeline = build_pipeline(
            &Settings::default(),
            Arc::new(registry),
            Arc::new(MemoryDiseaseStore::seeded()),
        )
        .await
        .unwrap();
        Arc::new(AppState::new(Arc::new(pipeline), max_upload_bytes, None))
    }

    async fn app(registry: ModelRegistry, max_upload_bytes: usize) -> Router {
        create_router(state(registry, max_upload_bytes).await, None)
    }

    async fn limited_app() -> Router {
        let governor = create_governor_config(&RateLimitConfig::default()).unwrap();
        let state = state(ModelRegistry::load(&RegistryConfig::default()), 1024 * 1024).await;
        create_router(state, Some(governor))
    }

    fn from_peer(mut request: Request<Body>) -> Request<Body> {
        let peer: SocketAddr = "10.0.0.7:40000".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(peer));
        request
    }

    async fn fallback_app() -> Router {
        app(ModelRegistry::load(&RegistryConfig::default()), 1024 * 1024).await
    }

    fn green_png() -> Vec<u8> {
        let img = ImageBuffer::from_pixel(16, 16, Rgb([0u8, 255, 0]));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png).unwrap();
        bytes
    }

    fn detect_request(body: Vec<u8>, mime: &str) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/api/v1/detect")
            .header(CONTENT_TYPE, mime)
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_health_reports_degraded_without_model() {
        let response = fallback_app()
            .await
            .oneshot(Request::get("/api/v1/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["model"]["status"], "unavailable");
        assert_eq!(json["model"]["reason"]["reason"], "not_configured");
        assert_eq!(json["model"]["vocabulary_size"], 38);
    }

    #[tokio::test]
    async fn test_detect_fallback() {
        let response = fallback_app()
            .await
            .oneshot(detect_request(green_png(), "image/png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let detected: DetectResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(detected.outcome.clean_disease_name, "Apple scab");
        assert_eq!(detected.outcome.treatment_steps.len(), 2);
    }

    #[tokio::test]
    async fn test_detect_with_model() {
        let mut probabilities = vec![0.0; 38];
        probabilities[1] = 0.9;
        let config = RegistryConfig {
            input_size: 16,
            ..Default::default()
        };
        let registry = ModelRegistry::with_model(Arc::new(FixedModel(probabilities)), &config);

        let response = app(registry, 1024 * 1024)
            .await
            .oneshot(detect_request(green_png(), "image/png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(json["clean_disease_name"], "Black rot");
        assert_eq!(json["severity"], "HIGH");
        assert_eq!(json["path"], "model");
        assert!(json["request_id"].is_string());
    }

    #[tokio::test]
    async fn test_detect_garbage_is_bad_request() {
        let config = RegistryConfig {
            input_size: 16,
            ..Default::default()
        };
        let registry = ModelRegistry::with_model(Arc::new(FixedModel(vec![1.0])), &config);

        let response = app(registry, 1024 * 1024)
            .await
            .oneshot(detect_request(b"definitely not a png".to_vec(), "image/png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let error: ErrorResponse = serde_json::from_slice(&body).unwrap();
        assert_eq!(error.error, "decode");
    }

    #[tokio::test]
    async fn test_detect_rejects_oversized_body() {
        let app = app(ModelRegistry::load(&RegistryConfig::default()), 64).await;
        let response = app
            .oneshot(detect_request(vec![0u8; 1024], "image/png"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_health_and_metrics_are_not_rate_limited() {
        let app = limited_app().await;
        for _ in 0..15 {
            let response = app
                .clone()
                .oneshot(from_peer(
                    Request::get("/api/v1/health").body(Body::empty()).unwrap(),
                ))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);

            let response = app
                .clone()
                .oneshot(from_peer(Request::get("/metrics").body(Body::empty()).unwrap()))
                .await
                .unwrap();
            assert_ne!(response.status(), StatusCode::TOO_MANY_REQUESTS);
        }
    }

    #[tokio::test]
    async fn test_detect_is_rate_limited_per_peer() {
        let app = limited_app().await;
        let mut statuses = Vec::new();
        for _ in 0..12 {
            let response = app
                .clone()
                .oneshot(from_peer(detect_request(green_png(), "image/png")))
                .await
                .unwrap();
            statuses.push(response.status());
        }
        assert!(statuses[..10].iter().all(|s| *s == StatusCode::OK));
        assert_eq!(statuses[10], StatusCode::TOO_MANY_REQUESTS);
    }

    #[tokio::test]
    async fn test_sqlite_metadata_store_opens_seeded_and_closes() {
        let settings = MetadataSettings {
            database_url: Some("sqlite::memory:".to_string()),
        };
        let store = MetadataStore::open(&settings).await.unwrap();
        assert!(matches!(store, MetadataStore::Sqlite(_)));

        let record = store.source().lookup("Apple scab").await.unwrap().unwrap();
        assert!(record.localized_name.is_some());
        store.close().await;
    }

    #[tokio::test]
    async fn test_metrics_without_recorder() {
        let response = fallback_app()
            .await
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    }
}
