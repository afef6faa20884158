// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Detection service: one image in, detection summary and annotated copy out.

use std::fs::OpenOptions;
use std::io::{Cursor, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use chrono::Local;
use image::{DynamicImage, ImageFormat};
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::context::ModelContext;
use crate::error::{InferenceError, Result};
use crate::results::Results;
use crate::utils::round_to;

/// Attempts at finding an unused result filename before giving up.
const MAX_NAME_ATTEMPTS: usize = 8;

/// Axis-aligned box in original image pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct BoundingBox {
    pub x1: f32,
    pub y1: f32,
    pub x2: f32,
    pub y2: f32,
}

/// A single detected object.
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Detection {
    /// Class ID in the model vocabulary
    pub class_id: usize,
    /// Human-readable class name
    pub class_name: String,
    /// Detection confidence (0.0 - 1.0)
    pub confidence: f32,
    /// Bounding box in pixels
    pub bbox: BoundingBox,
}

/// Summary of one detection call.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct DetectionResult {
    /// Detections in provider order (highest confidence first)
    pub detections: Vec<Detection>,
    /// Filename of the annotated image inside the results directory
    pub result_image: String,
    /// Number of detections
    pub num_detections: usize,
    /// Wall time of the call in seconds, rounded to milliseconds
    pub detection_time: f64,
    /// Confidence threshold used
    pub conf_threshold: f32,
    /// NMS IoU threshold used
    pub iou_threshold: f32,
}

/// Runs detections against the shared model and stores annotated results.
#[derive(Debug, Clone)]
pub struct DetectionService {
    context: Arc<ModelContext>,
    results_dir: PathBuf,
}

impl DetectionService {
    /// Service writing annotated images into `results_dir`.
    pub fn new(context: Arc<ModelContext>, results_dir: impl Into<PathBuf>) -> Self {
        Self {
            context,
            results_dir: results_dir.into(),
        }
    }

    /// The shared model context.
    #[must_use]
    pub const fn context(&self) -> &Arc<ModelContext> {
        &self.context
    }

    /// Directory annotated images are written to.
    #[must_use]
    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    /// Detect objects in the image at `image_path`.
    ///
    /// Exactly one annotated JPEG is written on success and nothing on failure.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::DetectionFailed`] wrapping the cause when the
    /// image can't be read or decoded, the provider fails, or the result can't
    /// be written.
    pub fn detect(
        &self,
        image_path: &Path,
        confidence_threshold: f32,
        iou_threshold: f32,
    ) -> Result<DetectionResult> {
        self.run(image_path, confidence_threshold, iou_threshold)
            .map_err(InferenceError::detection_failed)
    }

    fn run(&self, image_path: &Path, confidence_threshold: f32, iou_threshold: f32) -> Result<DetectionResult> {
        let start = Instant::now();

        let image = image::open(image_path).map_err(|e| {
            InferenceError::ImageError(format!("Failed to load image {}: {e}", image_path.display()))
        })?;

        let provider = self.context.provider();
        let results = provider.predict(&image, confidence_threshold, iou_threshold)?;
        let annotated = provider.annotate(&image, &results)?;

        let detections = self.to_detections(&results);
        let result_image = self.save_result(&annotated)?;
        let detection_time = round_to(start.elapsed().as_secs_f64(), 3);

        info!(
            "{}: {} ({:.1}ms inference), saved {result_image}",
            image_path.display(),
            results.verbose(&self.context.info().classes),
            results.speed.inference.unwrap_or_default()
        );

        Ok(DetectionResult {
            num_detections: detections.len(),
            detections,
            result_image,
            detection_time,
            conf_threshold: confidence_threshold,
            iou_threshold,
        })
    }

    fn to_detections(&self, results: &Results) -> Vec<Detection> {
        let info = self.context.info();
        results
            .boxes
            .iter()
            .map(|(xyxy, confidence, class_id)| Detection {
                class_id,
                class_name: info.class_label(class_id),
                confidence,
                bbox: BoundingBox {
                    x1: xyxy[0],
                    y1: xyxy[1],
                    x2: xyxy[2],
                    y2: xyxy[3],
                },
            })
            .collect()
    }

    /// Encode as JPEG and write under a fresh `result_<timestamp>_<token>.jpg` name.
    fn save_result(&self, annotated: &DynamicImage) -> Result<String> {
        let mut encoded = Vec::new();
        DynamicImage::ImageRgb8(annotated.to_rgb8())
            .write_to(&mut Cursor::new(&mut encoded), ImageFormat::Jpeg)?;

        for _ in 0..MAX_NAME_ATTEMPTS {
            let filename = result_filename();
            let path = self.results_dir.join(&filename);

            match OpenOptions::new().write(true).create_new(true).open(&path) {
                Ok(mut file) => {
                    if let Err(e) = file.write_all(&encoded) {
                        let _ = std::fs::remove_file(&path);
                        return Err(e.into());
                    }
                    debug!("Wrote {}", path.display());
                    return Ok(filename);
                }
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {}
                Err(e) => {
                    return Err(InferenceError::IoError(format!(
                        "Failed to create {}: {e}",
                        path.display()
                    )));
                }
            }
        }

        Err(InferenceError::IoError(format!(
            "No free result filename in {} after {MAX_NAME_ATTEMPTS} attempts",
            self.results_dir.display()
        )))
    }
}

/// `<YYYYMMDD_HHMMSS>_<8 hex>` prefix shared by result and upload filenames.
#[must_use]
pub fn unique_stem() -> String {
    format!("{}_{:08x}", Local::now().format("%Y%m%d_%H%M%S"), rand::random::<u32>())
}

fn result_filename() -> String {
    format!("result_{}.jpg", unique_stem())
}
