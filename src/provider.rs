// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! The inference provider seam.
//!
//! [`DetectionService`](crate::DetectionService) only talks to a boxed
//! [`InferenceProvider`], so the ONNX backed [`YoloProvider`] can be swapped for
//! a stub in tests. Providers are shared by all requests and handle their own
//! locking.

use std::sync::Mutex;

use image::DynamicImage;

use crate::annotate::Annotator;
use crate::error::Result;
use crate::model::YOLOModel;
use crate::results::Results;
use crate::utils::lock_or_recover;

/// Common interface for object detectors.
pub trait InferenceProvider: Send + Sync {
    /// Detect objects in a single image.
    ///
    /// Thresholds are forwarded as given.
    fn predict(&self, image: &DynamicImage, confidence: f32, iou: f32) -> Result<Results>;

    /// Render `results` onto a copy of `image`.
    fn annotate(&self, image: &DynamicImage, results: &Results) -> Result<DynamicImage>;

    /// Provider name (for logging).
    fn name(&self) -> &str;
}

/// YOLO ONNX model plus the annotator for its vocabulary.
///
/// ONNX Runtime sessions run through `&mut`, so the model sits behind a mutex
/// and inference is serialized. Annotation needs no lock.
#[derive(Debug)]
pub struct YoloProvider {
    model: Mutex<YOLOModel>,
    annotator: Annotator,
}

impl YoloProvider {
    /// Wrap a loaded model.
    #[must_use]
    pub const fn new(model: YOLOModel, annotator: Annotator) -> Self {
        Self {
            model: Mutex::new(model),
            annotator,
        }
    }
}

impl InferenceProvider for YoloProvider {
    fn predict(&self, image: &DynamicImage, confidence: f32, iou: f32) -> Result<Results> {
        let mut model = lock_or_recover(&self.model, "YOLO model");
        let config = model.config().with_thresholds(confidence, iou);
        model.predict_image(image, &config)
    }

    fn annotate(&self, image: &DynamicImage, results: &Results) -> Result<DynamicImage> {
        Ok(self.annotator.annotate(image, results))
    }

    fn name(&self) -> &str {
        "YOLO (ONNX Runtime)"
    }
}
