// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Results classes for YOLO detection output.
//!
//! Boxes are stored the way Ultralytics stores them: one `(N, 6)` array of
//! `[x1, y1, x2, y2, conf, cls]` rows in original image pixel coordinates.

use std::collections::BTreeMap;

use ndarray::{Array2, ArrayView1, ArrayView2, s};

use crate::utils::pluralize;

/// Timing information for inference operations (in milliseconds).
#[derive(Debug, Clone, Default)]
pub struct Speed {
    /// Time spent on preprocessing.
    pub preprocess: Option<f64>,
    /// Time spent on model inference.
    pub inference: Option<f64>,
    /// Time spent on postprocessing.
    pub postprocess: Option<f64>,
}

impl Speed {
    /// Create a new Speed instance with all timings.
    #[must_use]
    pub const fn new(preprocess: f64, inference: f64, postprocess: f64) -> Self {
        Self {
            preprocess: Some(preprocess),
            inference: Some(inference),
            postprocess: Some(postprocess),
        }
    }
}

/// Detection results for a single image.
#[derive(Debug, Clone)]
pub struct Results {
    /// Original image shape (height, width).
    pub orig_shape: (u32, u32),
    /// Inference tensor shape (height, width) after letterboxing.
    pub inference_shape: (u32, u32),
    /// Detected boxes, highest confidence first.
    pub boxes: Boxes,
    /// Inference timing information.
    pub speed: Speed,
}

impl Results {
    /// Create a new Results instance.
    #[must_use]
    pub const fn new(
        orig_shape: (u32, u32),
        inference_shape: (u32, u32),
        boxes: Boxes,
        speed: Speed,
    ) -> Self {
        Self {
            orig_shape,
            inference_shape,
            boxes,
            speed,
        }
    }

    /// Results with no detections for an image of the given shape.
    #[must_use]
    pub fn empty(orig_shape: (u32, u32)) -> Self {
        Self::new(orig_shape, orig_shape, Boxes::empty(orig_shape), Speed::default())
    }

    /// Number of detections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    /// Check if there are no detections.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Verbose log summary of the detections, e.g. `2 persons, 1 car`.
    ///
    /// Classes are listed in ID order. Unknown IDs are printed as numbers.
    #[must_use]
    pub fn verbose(&self, names: &[String]) -> String {
        if self.is_empty() {
            return "(no detections)".to_string();
        }

        let mut counts: BTreeMap<usize, usize> = BTreeMap::new();
        for class_id in self.boxes.class_ids() {
            *counts.entry(class_id).or_insert(0) += 1;
        }

        counts
            .into_iter()
            .map(|(class_id, count)| {
                let name = names
                    .get(class_id)
                    .cloned()
                    .unwrap_or_else(|| class_id.to_string());
                if count > 1 {
                    format!("{count} {}", pluralize(&name))
                } else {
                    format!("{count} {name}")
                }
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Detection bounding boxes.
#[derive(Debug, Clone)]
pub struct Boxes {
    /// Raw data array with shape (N, 6) containing [x1, y1, x2, y2, conf, cls].
    pub data: Array2<f32>,
    /// Original image shape (height, width).
    pub orig_shape: (u32, u32),
}

impl Boxes {
    /// Create a new Boxes instance from an (N, 6) array.
    #[must_use]
    pub const fn new(data: Array2<f32>, orig_shape: (u32, u32)) -> Self {
        Self { data, orig_shape }
    }

    /// No boxes.
    #[must_use]
    pub fn empty(orig_shape: (u32, u32)) -> Self {
        Self::new(Array2::zeros((0, 6)), orig_shape)
    }

    /// Get the number of boxes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.nrows()
    }

    /// Check if there are no boxes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.nrows() == 0
    }

    /// Get boxes in xyxy format [x1, y1, x2, y2].
    #[must_use]
    pub fn xyxy(&self) -> ArrayView2<'_, f32> {
        self.data.slice(s![.., 0..4])
    }

    /// Get confidence scores.
    #[must_use]
    pub fn conf(&self) -> ArrayView1<'_, f32> {
        self.data.slice(s![.., 4])
    }

    /// Get class IDs as stored (floats).
    #[must_use]
    pub fn cls(&self) -> ArrayView1<'_, f32> {
        self.data.slice(s![.., 5])
    }

    /// Class IDs as integers.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn class_ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.cls().into_iter().map(|&c| c as usize)
    }

    /// Iterate over `([x1, y1, x2, y2], conf, class_id)` rows.
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn iter(&self) -> impl Iterator<Item = ([f32; 4], f32, usize)> + '_ {
        self.data
            .rows()
            .into_iter()
            .map(|row| ([row[0], row[1], row[2], row[3]], row[4], row[5] as usize))
    }
}
