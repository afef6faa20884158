// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! HTTP server exposing the detection service.
//!
//! Routes:
//! - `GET /` banner, `GET /health` health check
//! - `POST /api/detect` multipart image upload, returns detections as JSON
//! - `GET /api/model-info` loaded model description
//! - `POST /contact` contact form (logged)
//! - `/static/uploads/*`, `/static/results/*` stored images
//! - `/swagger-ui` OpenAPI docs

pub mod handlers;
pub mod upload;

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::context::{ModelContext, ModelInfo};
use crate::detection::{BoundingBox, Detection, DetectionResult, DetectionService};
use crate::error::{InferenceError, Result};
use handlers::{ContactResponse, DetectResponse, ErrorResponse, HealthResponse};

/// Default request body limit (16 MiB).
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024;

/// Server settings.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind.
    pub host: String,
    /// Port to bind.
    pub port: u16,
    /// Where uploads are stored and served from.
    pub upload_dir: PathBuf,
    /// Where annotated results are stored and served from.
    pub results_dir: PathBuf,
    /// Maximum request body size in bytes.
    pub max_upload_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            upload_dir: PathBuf::from("static/uploads"),
            results_dir: PathBuf::from("static/results"),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl ServerConfig {
    /// Create the upload and results directories if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if a directory can't be created.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.upload_dir, &self.results_dir] {
            std::fs::create_dir_all(dir).map_err(|e| {
                InferenceError::ConfigError(format!("Failed to create {}: {e}", dir.display()))
            })?;
        }
        Ok(())
    }
}

/// Shared application state.
#[derive(Debug)]
pub struct AppState {
    pub service: DetectionService,
    pub config: ServerConfig,
}

impl AppState {
    /// State whose detection service writes into `config.results_dir`.
    #[must_use]
    pub fn new(context: Arc<ModelContext>, config: ServerConfig) -> Self {
        Self {
            service: DetectionService::new(context, config.results_dir.clone()),
            config,
        }
    }
}

// OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "YOLO Detection Server",
        description = "Upload an image, get YOLO object detections and an annotated copy.\n\n## Thresholds\n- `confidence`: Confidence threshold (default: 0.25)\n- `iou`: NMS IoU threshold (default: 0.45)",
        license(name = "AGPL-3.0", url = "https://ultralytics.com/license"),
        contact(name = "Ultralytics", url = "https://ultralytics.com")
    ),
    paths(
        handlers::root,
        handlers::health,
        handlers::model_info,
        handlers::detect,
        handlers::contact
    ),
    components(schemas(
        BoundingBox,
        Detection,
        DetectionResult,
        DetectResponse,
        ModelInfo,
        ErrorResponse,
        HealthResponse,
        ContactResponse
    )),
    tags(
        (name = "inference", description = "YOLO detection endpoints"),
        (name = "health", description = "Health check endpoints"),
        (name = "contact", description = "Contact form")
    )
)]
pub struct ApiDoc;

/// Build the application router.
pub fn router(state: Arc<AppState>) -> Router {
    let uploads = ServeDir::new(&state.config.upload_dir);
    let results = ServeDir::new(&state.config.results_dir);
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .route("/api/detect", post(handlers::detect))
        .route("/api/model-info", get(handlers::model_info))
        .route("/contact", post(handlers::contact))
        .nest_service("/static/uploads", uploads)
        .nest_service("/static/results", results)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bind and serve until the process is stopped.
///
/// # Errors
///
/// Returns an error if the directories can't be created or the address
/// can't be bound.
pub async fn serve(context: Arc<ModelContext>, config: ServerConfig) -> Result<()> {
    config.ensure_dirs()?;

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| InferenceError::ConfigError(format!("Failed to bind {addr}: {e}")))?;
    let local: SocketAddr = listener.local_addr()?;

    let app = router(Arc::new(AppState::new(context, config)));

    info!("Server listening on {local}");
    info!("Swagger UI available at http://{local}/swagger-ui/");
    axum::serve(listener, app).await?;
    Ok(())
}
