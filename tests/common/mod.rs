// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Shared fixtures: a deterministic provider and image helpers.

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use image::{DynamicImage, GenericImageView, Rgb, RgbImage};
use ndarray::Array2;
use yolo_detect_server::{
    Annotator, Boxes, Device, InferenceError, InferenceProvider, ModelContext, ModelInfo, Result,
    Results, Speed,
};

pub const CLASSES: [&str; 4] = ["bolt", "nut", "washer", "screw"];

/// Object the stub "sees" in every image: (xyxy, confidence, class id).
pub type StubObject = ([f32; 4], f32, usize);

/// (confidence, iou) pairs seen by `predict`, in call order.
pub type ThresholdLog = Arc<Mutex<Vec<(f32, f32)>>>;

/// Provider returning fixed objects, filtered by the confidence threshold.
pub struct StubProvider {
    objects: Vec<StubObject>,
    annotator: Annotator,
    fail: bool,
    panic_next: AtomicBool,
    calls: ThresholdLog,
}

impl StubProvider {
    pub fn new(objects: Vec<StubObject>) -> Self {
        Self {
            objects,
            annotator: Annotator::new(class_names(), None),
            fail: false,
            panic_next: AtomicBool::new(false),
            calls: ThresholdLog::default(),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new(vec![])
        }
    }

    /// Panics on the first `predict`, then behaves like [`StubProvider::new`].
    pub fn panicking_once(objects: Vec<StubObject>) -> Self {
        Self {
            panic_next: AtomicBool::new(true),
            ..Self::new(objects)
        }
    }

    /// Handle on the thresholds passed to `predict`.
    pub fn calls(&self) -> ThresholdLog {
        Arc::clone(&self.calls)
    }
}

impl InferenceProvider for StubProvider {
    fn predict(&self, image: &DynamicImage, confidence: f32, iou: f32) -> Result<Results> {
        assert!(!self.panic_next.swap(false, Ordering::SeqCst), "stub provider panic");
        self.calls.lock().unwrap().push((confidence, iou));

        if self.fail {
            return Err(InferenceError::InferenceError("stub failure".to_string()));
        }

        let (width, height) = image.dimensions();
        #[allow(clippy::cast_precision_loss)]
        let (w, h) = (width as f32, height as f32);

        let kept: Vec<&StubObject> = self.objects.iter().filter(|(_, conf, _)| *conf >= confidence).collect();
        let mut data = Array2::zeros((kept.len(), 6));
        for (i, (xyxy, conf, class_id)) in kept.iter().enumerate() {
            data[[i, 0]] = xyxy[0].clamp(0.0, w);
            data[[i, 1]] = xyxy[1].clamp(0.0, h);
            data[[i, 2]] = xyxy[2].clamp(0.0, w);
            data[[i, 3]] = xyxy[3].clamp(0.0, h);
            data[[i, 4]] = *conf;
            #[allow(clippy::cast_precision_loss)]
            {
                data[[i, 5]] = *class_id as f32;
            }
        }

        Ok(Results::new(
            (height, width),
            (640, 640),
            Boxes::new(data, (height, width)),
            Speed::new(0.1, 1.0, 0.1),
        ))
    }

    fn annotate(&self, image: &DynamicImage, results: &Results) -> Result<DynamicImage> {
        Ok(self.annotator.annotate(image, results))
    }

    fn name(&self) -> &str {
        "stub"
    }
}

pub fn class_names() -> Vec<String> {
    CLASSES.iter().map(ToString::to_string).collect()
}

pub fn stub_context(provider: StubProvider) -> Arc<ModelContext> {
    provider_context(provider)
}

/// Context over any provider, with the [`CLASSES`] vocabulary on CPU.
pub fn provider_context(provider: impl InferenceProvider + 'static) -> Arc<ModelContext> {
    let info = ModelInfo::new(Device::Cpu, class_names(), Path::new("/models/stub.onnx"));
    Arc::new(ModelContext::from_provider(info, Box::new(provider)))
}

/// Write a gray test image and return its path.
pub fn write_image(dir: &Path, name: &str, width: u32, height: u32) -> PathBuf {
    let path = dir.join(name);
    RgbImage::from_pixel(width, height, Rgb([90, 90, 90]))
        .save(&path)
        .unwrap();
    path
}

/// Number of entries in a directory.
pub fn count_files(dir: &Path) -> usize {
    std::fs::read_dir(dir).map_or(0, Iterator::count)
}
