// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Post-processing for YOLO detection output.
//!
//! Decodes the raw `[1, 4 + nc, N]` (or transposed) prediction tensor into
//! [`Boxes`]: confidence filtering, xywh to xyxy, letterbox undo, clipping
//! and per-class NMS.

use ndarray::{Array2, ArrayView2, s};

use crate::inference::InferenceConfig;
use crate::preprocessing::{PreprocessResult, clip_coords, scale_coords};
use crate::results::Boxes;
use crate::utils::nms_per_class;

/// Post-process detection model output.
///
/// YOLO detection models output shape is typically [1, 84, 8400] where:
/// - 84 = 4 (bbox) + 80 (classes for COCO)
/// - 8400 = number of predictions (varies by input size)
///
/// Malformed shapes produce no boxes rather than an error.
#[must_use]
pub fn postprocess_detect(
    output: &[f32],
    output_shape: &[usize],
    expected_classes: usize,
    preprocess: &PreprocessResult,
    config: &InferenceConfig,
) -> Boxes {
    let empty = || Boxes::empty(preprocess.orig_shape);

    // Handle both [1, 84, 8400] and [1, 8400, 84] formats
    let (num_classes, num_predictions, is_transposed) =
        parse_detect_shape(output_shape, expected_classes);

    if output.is_empty() || num_predictions == 0 {
        return empty();
    }

    let output_2d = if is_transposed {
        Array2::from_shape_vec((num_predictions, 4 + num_classes), output.to_vec()).ok()
    } else {
        Array2::from_shape_vec((4 + num_classes, num_predictions), output.to_vec())
            .ok()
            .map(|arr| arr.t().to_owned())
    };

    let Some(output_2d) = output_2d else {
        return empty();
    };

    let data = extract_detect_boxes(output_2d.view(), preprocess, config);
    Boxes::new(data, preprocess.orig_shape)
}

/// Parse detection output shape to determine format.
///
/// Returns `(num_classes, num_predictions, transposed)`. The class count is
/// derived from the shape when the model carries no vocabulary
/// (`expected_classes == 0`).
#[must_use]
pub fn parse_detect_shape(shape: &[usize], expected_classes: usize) -> (usize, usize, bool) {
    let (a, b) = match shape {
        [a, b] | [_, a, b] => (*a, *b),
        _ => return (expected_classes.max(1), 0, false),
    };

    if a < 5 && b < 5 {
        return (expected_classes.max(1), 0, false);
    }

    if expected_classes == 0 {
        // Typically num_features < num_preds (e.g., 84 < 8400)
        let (num_features, num_preds, transposed) = if a < b { (a, b, false) } else { (b, a, true) };
        return (num_features.saturating_sub(4).max(1), num_preds, transposed);
    }

    if a == 4 + expected_classes {
        (expected_classes, b, false)
    } else if b == 4 + expected_classes {
        (expected_classes, a, true)
    } else if a < b {
        (a.saturating_sub(4).max(1), b, false)
    } else {
        (b.saturating_sub(4).max(1), a, true)
    }
}

/// Number of classes a raw output shape implies, or `None` for unusable shapes.
#[must_use]
pub fn infer_num_classes(shape: &[usize]) -> Option<usize> {
    let (num_classes, num_predictions, _) = parse_detect_shape(shape, 0);
    (num_predictions > 0).then_some(num_classes)
}

/// Extract detection boxes from a `(num_predictions, 4 + nc)` prediction matrix.
fn extract_detect_boxes(
    output: ArrayView2<f32>,
    preprocess: &PreprocessResult,
    config: &InferenceConfig,
) -> Array2<f32> {
    let mut candidates = Vec::new();

    for row in output.rows() {
        let class_scores = row.slice(s![4..]);

        // Best class, NaN treated as lowest
        let Some((best_class, best_score)) = class_scores
            .iter()
            .copied()
            .enumerate()
            .filter(|(_, score)| !score.is_nan())
            .max_by(|(_, a), (_, b)| a.total_cmp(b))
        else {
            continue;
        };

        if best_score < config.confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        let xyxy = [cx - w / 2.0, cy - h / 2.0, cx + w / 2.0, cy + h / 2.0];

        let scaled = scale_coords(&xyxy, preprocess.scale, preprocess.padding);
        let clipped = clip_coords(&scaled, preprocess.orig_shape);

        candidates.push((clipped, best_score, best_class));
    }

    if candidates.is_empty() {
        return Array2::zeros((0, 6));
    }

    let keep_indices = nms_per_class(&candidates, config.iou_threshold);

    let num_kept = keep_indices.len().min(config.max_detections);
    let mut result = Array2::zeros((num_kept, 6));

    for (out_idx, &keep_idx) in keep_indices.iter().take(num_kept).enumerate() {
        let (bbox, score, class) = &candidates[keep_idx];
        result[[out_idx, 0]] = bbox[0];
        result[[out_idx, 1]] = bbox[1];
        result[[out_idx, 2]] = bbox[2];
        result[[out_idx, 3]] = bbox[3];
        result[[out_idx, 4]] = *score;
        #[allow(clippy::cast_precision_loss)]
        {
            result[[out_idx, 5]] = *class as f32;
        }
    }

    result
}
