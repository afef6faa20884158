// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Router tests against a stub provider

mod common;

use std::io::Cursor;
use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use image::{ImageFormat, Rgb, RgbImage};
use serde_json::Value;
use tower::ServiceExt;

use common::{StubProvider, count_files, stub_context};
use yolo_detect_server::server::{AppState, ServerConfig, router};

const BOUNDARY: &str = "----yolo-test-boundary";

struct TestApp {
    router: Router,
    _dir: tempfile::TempDir,
    config: ServerConfig,
}

fn app(provider: StubProvider) -> TestApp {
    let dir = tempfile::tempdir().unwrap();
    let config = ServerConfig {
        upload_dir: dir.path().join("uploads"),
        results_dir: dir.path().join("results"),
        ..ServerConfig::default()
    };
    config.ensure_dirs().unwrap();

    let state = Arc::new(AppState::new(stub_context(provider), config.clone()));
    TestApp {
        router: router(state),
        _dir: dir,
        config,
    }
}

fn png_bytes() -> Vec<u8> {
    let mut bytes = Vec::new();
    RgbImage::from_pixel(100, 80, Rgb([50, 60, 70]))
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();
    bytes
}

enum Part<'a> {
    File(&'a str, &'a str, &'a [u8]),
    Text(&'a str, &'a str),
}

fn multipart_body(parts: &[Part<'_>]) -> Vec<u8> {
    let mut body = Vec::new();
    for part in parts {
        body.extend_from_slice(format!("--{BOUNDARY}\r\n").as_bytes());
        match part {
            Part::File(name, filename, data) => {
                body.extend_from_slice(
                    format!(
                        "Content-Disposition: form-data; name=\"{name}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                    )
                    .as_bytes(),
                );
                body.extend_from_slice(data);
            }
            Part::Text(name, value) => {
                body.extend_from_slice(
                    format!("Content-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}").as_bytes(),
                );
            }
        }
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());
    body
}

fn multipart_request(uri: &str, parts: &[Part<'_>]) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
        .body(Body::from(multipart_body(parts)))
        .unwrap()
}

async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

#[tokio::test]
async fn test_health() {
    let app = app(StubProvider::new(vec![]));
    let request = Request::builder().uri("/health").body(Body::empty()).unwrap();
    let (status, json) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["status"], "healthy");
    assert_eq!(json["version"], yolo_detect_server::VERSION);
}

#[tokio::test]
async fn test_model_info() {
    let app = app(StubProvider::new(vec![]));
    let request = Request::builder().uri("/api/model-info").body(Body::empty()).unwrap();
    let (status, json) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["device"], "CPU");
    assert_eq!(json["device_type"], "CPU");
    assert_eq!(json["num_classes"], 4);
    assert_eq!(json["classes"][1], "nut");
    assert!(json["loaded_at"].is_string());
}

#[tokio::test]
async fn test_detect_success() {
    let app = app(StubProvider::new(vec![([10.0, 10.0, 50.0, 40.0], 0.9, 2)]));
    let png = png_bytes();
    let request = multipart_request(
        "/api/detect",
        &[
            Part::File("image", "washer photo.png", &png),
            Part::Text("confidence", "0.5"),
            Part::Text("iou", "0.4"),
        ],
    );
    let (status, json) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert_eq!(json["num_detections"], 1);
    assert_eq!(json["detections"][0]["class_name"], "washer");
    assert_eq!(json["detections"][0]["bbox"]["x2"], 50.0);
    assert!((json["conf_threshold"].as_f64().unwrap() - 0.5).abs() < 1e-6);
    assert!((json["iou_threshold"].as_f64().unwrap() - 0.4).abs() < 1e-6);
    assert!(json["detection_time"].as_f64().unwrap() >= 0.0);

    let uploaded = json["uploaded_image"].as_str().unwrap();
    assert!(uploaded.ends_with("_washer_photo.png"));
    assert!(app.config.upload_dir.join(uploaded).is_file());

    let result_image = json["result_image"].as_str().unwrap();
    assert!(app.config.results_dir.join(result_image).is_file());

    // Annotated result is served statically
    let request = Request::builder()
        .uri(format!("/static/results/{result_image}"))
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_detect_query_thresholds() {
    let app = app(StubProvider::new(vec![([10.0, 10.0, 50.0, 40.0], 0.9, 0)]));
    let png = png_bytes();
    let request = multipart_request("/api/detect?confidence=0.95", &[Part::File("image", "a.png", &png)]);
    let (status, json) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["num_detections"], 0);
    assert!((json["iou_threshold"].as_f64().unwrap() - 0.45).abs() < 1e-6);
}

#[tokio::test]
async fn test_detect_missing_image() {
    let app = app(StubProvider::new(vec![]));
    let request = multipart_request("/api/detect", &[Part::Text("confidence", "0.5")]);
    let (status, json) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["success"], false);
    assert_eq!(json["error"], "No image provided");
}

#[tokio::test]
async fn test_detect_empty_filename() {
    let app = app(StubProvider::new(vec![]));
    let request = multipart_request("/api/detect", &[Part::File("image", "", b"")]);
    let (status, json) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "No file selected");
}

#[tokio::test]
async fn test_detect_invalid_extension() {
    let app = app(StubProvider::new(vec![]));
    let request = multipart_request("/api/detect", &[Part::File("image", "notes.txt", b"hello")]);
    let (status, json) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(json["error"].as_str().unwrap().starts_with("Invalid file type"));
    assert_eq!(count_files(&app.config.upload_dir), 0);
}

#[tokio::test]
async fn test_detect_invalid_threshold() {
    let app = app(StubProvider::new(vec![]));
    let png = png_bytes();
    let request = multipart_request(
        "/api/detect",
        &[Part::Text("confidence", "high"), Part::File("image", "a.png", &png)],
    );
    let (status, json) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "Invalid confidence value: high");
}

#[tokio::test]
async fn test_detect_corrupt_image_is_server_error() {
    let app = app(StubProvider::new(vec![]));
    let request = multipart_request("/api/detect", &[Part::File("image", "broken.jpg", b"not a jpeg")]);
    let (status, json) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(json["success"], false);
    assert!(json["error"].as_str().unwrap().starts_with("Detection failed"));
    assert_eq!(count_files(&app.config.results_dir), 0);
}

#[tokio::test]
async fn test_contact() {
    let app = app(StubProvider::new(vec![]));
    let request = multipart_request(
        "/contact",
        &[
            Part::Text("name", "Ada"),
            Part::Text("email", "ada@example.com"),
            Part::Text("message", "Hello"),
        ],
    );
    let (status, json) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(json["success"], true);
    assert!(json["message"].as_str().unwrap().starts_with("Thank you"));
}

#[tokio::test]
async fn test_openapi_document() {
    let app = app(StubProvider::new(vec![]));
    let request = Request::builder().uri("/api-docs/openapi.json").body(Body::empty()).unwrap();
    let (status, json) = send(&app.router, request).await;

    assert_eq!(status, StatusCode::OK);
    assert!(json["paths"]["/api/detect"]["post"].is_object());
}
