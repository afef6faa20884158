// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

#![allow(clippy::multiple_crate_versions)]

//! # YOLO Detection Server
//!
//! A small web front-end around an Ultralytics YOLO detection model exported to
//! ONNX. Upload an image, get the detected objects back as JSON together with
//! an annotated copy of the image.
//!
//! ## Components
//!
//! - [`YOLOModel`] - ONNX Runtime session, letterbox preprocessing, output
//!   decoding and per-class NMS
//! - [`Annotator`] - draws boxes and labels in the Ultralytics palette
//! - [`ModelContext`] - the model loaded once at startup plus its [`ModelInfo`]
//! - [`DetectionService`] - runs one detection, stores the annotated image and
//!   returns a [`DetectionResult`]
//! - [`server`] - axum routes (`/api/detect`, `/api/model-info`, ...)
//!
//! ## Quick Start (Library)
//!
//! ```no_run
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! use yolo_detect_server::{DetectionService, InferenceConfig, ModelContext};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let context = ModelContext::load(Path::new("models/best.onnx"), InferenceConfig::default(), None)?;
//!     let service = DetectionService::new(Arc::new(context), "static/results");
//!
//!     let result = service.detect(Path::new("part.jpg"), 0.25, 0.45)?;
//!     for detection in &result.detections {
//!         println!("{} {:.2}", detection.class_name, detection.confidence);
//!     }
//!     println!("Annotated image: {}", result.result_image);
//!     Ok(())
//! }
//! ```
//!
//! ## CLI Usage
//!
//! ```bash
//! # Start the web server
//! yolo-detect-server serve --model models/best.onnx --port 5000
//!
//! # Detect on a single image
//! yolo-detect-server detect --model models/best.onnx --source part.jpg --conf 0.5
//!
//! # Check model and directories
//! yolo-detect-server check
//! ```
//!
//! Build with `--features cuda` to run on an NVIDIA GPU.

// Modules
pub mod annotate;
pub mod cli;
pub mod context;
pub mod detection;
pub mod device;
pub mod error;
pub mod inference;
pub mod metadata;
pub mod model;
pub mod postprocessing;
pub mod preprocessing;
pub mod provider;
pub mod results;
pub mod server;
pub mod utils;

// Re-export main types for convenience
pub use annotate::Annotator;
pub use context::{ModelContext, ModelInfo};
pub use detection::{BoundingBox, Detection, DetectionResult, DetectionService};
pub use device::Device;
pub use error::{InferenceError, Result};
pub use inference::InferenceConfig;
pub use model::YOLOModel;
pub use provider::{InferenceProvider, YoloProvider};
pub use results::{Boxes, Results, Speed};

// Re-export metadata for advanced use
pub use metadata::ModelMetadata;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library name.
pub const NAME: &str = env!("CARGO_PKG_NAME");
