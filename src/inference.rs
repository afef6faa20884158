// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Inference configuration.
//!
//! [`InferenceConfig`] controls how the model session is built (device, threads,
//! input size) and the default thresholds used when a caller supplies none.

use crate::device::Device;

/// Default confidence threshold applied when a request does not provide one.
pub const DEFAULT_CONFIDENCE: f32 = 0.25;

/// Default NMS `IoU` threshold applied when a request does not provide one.
pub const DEFAULT_IOU: f32 = 0.45;

/// Configuration for YOLO inference.
///
/// # Example
///
/// ```rust
/// use yolo_detect_server::InferenceConfig;
///
/// let config = InferenceConfig::new()
///     .with_confidence(0.5)
///     .with_iou(0.45)
///     .with_max_detections(100)
///     .with_imgsz(640, 640);
/// ```
#[derive(Debug, Clone)]
pub struct InferenceConfig {
    /// Confidence threshold for detections.
    /// Detections with confidence scores lower than this value will be discarded.
    pub confidence_threshold: f32,
    /// Intersection over Union (IoU) threshold for Non-Maximum Suppression (NMS).
    /// Lower values filter more duplicates.
    pub iou_threshold: f32,
    /// Maximum number of detections to return per image.
    pub max_detections: usize,
    /// Explicit input image size (height, width).
    /// If `None`, the model's metadata will be used to determine input size.
    pub imgsz: Option<(usize, usize)>,
    /// Number of intra-op threads for ONNX Runtime, `0` lets ONNX Runtime decide.
    pub num_threads: usize,
    /// Device to run on. `None` selects automatically (GPU when available).
    pub device: Option<Device>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE,
            iou_threshold: DEFAULT_IOU,
            max_detections: 300,
            imgsz: None,
            num_threads: 0,
            device: None,
        }
    }
}

impl InferenceConfig {
    /// Create a new configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the confidence threshold.
    #[must_use]
    pub const fn with_confidence(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// Set the IoU threshold for Non-Maximum Suppression (NMS).
    #[must_use]
    pub const fn with_iou(mut self, threshold: f32) -> Self {
        self.iou_threshold = threshold;
        self
    }

    /// Set the maximum number of detections to return.
    ///
    /// Only the top `max` detections (sorted by confidence) will be kept after NMS.
    #[must_use]
    pub const fn with_max_detections(mut self, max: usize) -> Self {
        self.max_detections = max;
        self
    }

    /// Set the input image size.
    ///
    /// # Arguments
    ///
    /// * `height` - The target image height.
    /// * `width` - The target image width.
    #[must_use]
    pub const fn with_imgsz(mut self, height: usize, width: usize) -> Self {
        self.imgsz = Some((height, width));
        self
    }

    /// Set the number of threads for inference. Set to `0` for auto-configuration.
    #[must_use]
    pub const fn with_threads(mut self, threads: usize) -> Self {
        self.num_threads = threads;
        self
    }

    /// Pin inference to a device instead of auto-selecting one.
    #[must_use]
    pub const fn with_device(mut self, device: Device) -> Self {
        self.device = Some(device);
        self
    }

    /// Copy of this configuration with per-request thresholds applied.
    ///
    /// Values are passed through unchanged; range checking is the caller's job.
    #[must_use]
    pub fn with_thresholds(&self, confidence: f32, iou: f32) -> Self {
        self.clone().with_confidence(confidence).with_iou(iou)
    }
}
