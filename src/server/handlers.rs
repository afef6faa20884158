// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Route handlers.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::multipart::MultipartError;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Multipart, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};
use tracing::{error, info};
use utoipa::{IntoParams, ToSchema};

use super::AppState;
use super::upload::{save_upload, validate_upload};
use crate::context::ModelInfo;
use crate::detection::DetectionResult;
use crate::error::InferenceError;
use crate::inference::{DEFAULT_CONFIDENCE, DEFAULT_IOU};

/// Thresholds accepted as query parameters on `/api/detect`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct DetectParams {
    /// Confidence threshold (0.0 - 1.0). Default: 0.25
    #[param(example = 0.25)]
    confidence: Option<f32>,
    /// NMS IoU threshold (0.0 - 1.0). Default: 0.45
    #[param(example = 0.45)]
    iou: Option<f32>,
}

/// Successful detection response.
#[derive(Debug, Serialize, ToSchema)]
pub struct DetectResponse {
    /// Always `true`
    pub success: bool,
    #[serde(flatten)]
    pub result: DetectionResult,
    /// Stored filename of the uploaded image
    pub uploaded_image: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Error message
    pub error: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    /// Server status
    pub status: String,
    /// Crate version
    pub version: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ContactResponse {
    pub success: bool,
    pub message: String,
}

/// Error returned by handlers, rendered as [`ErrorResponse`].
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl ApiError {
    /// Error with an explicit status.
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    /// 400 Bad Request.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    /// 500 Internal Server Error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }
}

impl From<InferenceError> for ApiError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::InvalidInput(message) => Self::bad_request(message),
            other if other.is_client_error() => Self::bad_request(other.to_string()),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::new(err.status(), err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(ErrorResponse {
            success: false,
            error: self.message,
        });
        (self.status, body).into_response()
    }
}

/// Parse a threshold form/query value.
fn parse_threshold(name: &str, value: &str) -> Result<f32, ApiError> {
    value
        .trim()
        .parse::<f32>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ApiError::bad_request(format!("Invalid {name} value: {value}")))
}

/// Root endpoint
///
/// Returns a welcome message and API information.
#[utoipa::path(
    get,
    path = "/",
    tag = "health",
    responses(
        (status = 200, description = "Welcome message", body = String)
    )
)]
pub async fn root() -> &'static str {
    "YOLO Detection Server - POST /api/detect with an image file. Swagger UI at /swagger-ui/"
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Server is healthy", body = HealthResponse)
    )
)]
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: crate::VERSION.to_string(),
    })
}

/// Model information endpoint
///
/// Returns the device, class vocabulary and load time of the model.
#[utoipa::path(
    get,
    path = "/api/model-info",
    tag = "inference",
    responses(
        (status = 200, description = "Model information", body = ModelInfo)
    )
)]
pub async fn model_info(State(state): State<Arc<AppState>>) -> Json<ModelInfo> {
    Json(state.service.context().info().clone())
}

/// Run detection on an uploaded image
///
/// Multipart form with an `image` file and optional `confidence` and `iou`
/// fields. Thresholds may also be given as query parameters; form fields win.
/// The annotated image is served from `/static/results/{result_image}`.
#[utoipa::path(
    post,
    path = "/api/detect",
    tag = "inference",
    params(DetectParams),
    request_body(content_type = "multipart/form-data", description = "Image file to analyze"),
    responses(
        (status = 200, description = "Detection successful", body = DetectResponse),
        (status = 400, description = "Bad request - missing image, bad file type or threshold", body = ErrorResponse),
        (status = 500, description = "Detection failed", body = ErrorResponse)
    )
)]
pub async fn detect(
    State(state): State<Arc<AppState>>,
    query: Result<Query<DetectParams>, QueryRejection>,
    mut multipart: Multipart,
) -> Result<Json<DetectResponse>, ApiError> {
    let Query(params) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let mut confidence = params.confidence.unwrap_or(DEFAULT_CONFIDENCE);
    let mut iou = params.iou.unwrap_or(DEFAULT_IOU);
    if !confidence.is_finite() || !iou.is_finite() {
        return Err(ApiError::bad_request("Thresholds must be finite numbers"));
    }

    let mut image: Option<(String, Vec<u8>)> = None;
    while let Some(field) = multipart.next_field().await? {
        let name = field.name().map(str::to_string);
        match name.as_deref() {
            Some("image") => {
                let filename = field.file_name().unwrap_or_default().to_string();
                let data = field.bytes().await?;
                image = Some((filename, data.to_vec()));
            }
            Some("confidence") => confidence = parse_threshold("confidence", &field.text().await?)?,
            Some("iou") => iou = parse_threshold("iou", &field.text().await?)?,
            _ => {}
        }
    }

    let Some((filename, data)) = image else {
        return Err(ApiError::bad_request("No image provided"));
    };
    validate_upload(&filename)?;

    let uploaded_image = save_upload(&state.config.upload_dir, &filename, &data).await?;
    let upload_path = state.config.upload_dir.join(&uploaded_image);

    let service = state.service.clone();
    let result = tokio::task::spawn_blocking(move || service.detect(&upload_path, confidence, iou))
        .await
        .map_err(|e| ApiError::internal(format!("Detection task failed: {e}")))?
        .map_err(|e| {
            error!("Error in detection: {e}");
            ApiError::from(e)
        })?;

    Ok(Json(DetectResponse {
        success: true,
        result,
        uploaded_image,
    }))
}

/// Contact form endpoint
///
/// Accepts `name`, `email` and `message` multipart fields and logs them.
#[utoipa::path(
    post,
    path = "/contact",
    tag = "contact",
    request_body(content_type = "multipart/form-data", description = "Contact form"),
    responses(
        (status = 200, description = "Message received", body = ContactResponse)
    )
)]
pub async fn contact(mut multipart: Multipart) -> Result<Json<ContactResponse>, ApiError> {
    let mut fields: HashMap<String, String> = HashMap::new();
    while let Some(field) = multipart.next_field().await? {
        if let Some(name) = field.name().map(str::to_string) {
            fields.insert(name, field.text().await?);
        }
    }

    let get = |key: &str| fields.get(key).map_or("", String::as_str);
    info!(
        "New contact message from {} <{}>: {}",
        get("name"),
        get("email"),
        get("message")
    );

    Ok(Json(ContactResponse {
        success: true,
        message: "Thank you for your message! We will get back to you soon.".to_string(),
    }))
}
