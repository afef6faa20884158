// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Image preprocessing for YOLO inference.
//!
//! Letterbox resizing (aspect preserving, centered, gray padding), normalization
//! to [0, 1] and conversion to an NCHW tensor.

use fast_image_resize::images::Image;
use fast_image_resize::{FilterType, PixelType, ResizeAlg, ResizeOptions, Resizer};
use image::{DynamicImage, GenericImageView, RgbImage};
use ndarray::Array4;

use crate::error::{InferenceError, Result};

/// Normalized letterbox padding value (gray 114/255).
const LETTERBOX_NORM: f32 = 114.0 / 255.0;

/// Reciprocal of 255 for normalization.
const INV_255: f32 = 1.0 / 255.0;

/// Result of preprocessing an image, containing the tensor and transform info.
#[derive(Debug, Clone)]
pub struct PreprocessResult {
    /// Preprocessed image tensor in NCHW format, normalized to [0, 1].
    pub tensor: Array4<f32>,
    /// Original image dimensions (height, width).
    pub orig_shape: (u32, u32),
    /// Scale factors applied (`scale_y`, `scale_x`).
    pub scale: (f32, f32),
    /// Padding applied (`pad_top`, `pad_left`).
    pub padding: (f32, f32),
}

/// Letterbox geometry for one image.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    new_width: u32,
    new_height: u32,
    pad_left: u32,
    pad_top: u32,
    scale: (f32, f32),
}

/// Preprocess an image for YOLO inference.
///
/// # Arguments
///
/// * `image` - Input image.
/// * `target_size` - Target size as (height, width).
///
/// # Errors
///
/// Returns an error for zero-sized images or if resizing fails.
pub fn preprocess_image(image: &DynamicImage, target_size: (usize, usize)) -> Result<PreprocessResult> {
    let (orig_width, orig_height) = image.dimensions();
    if orig_width == 0 || orig_height == 0 {
        return Err(InferenceError::ImageError("Image has zero width or height".to_string()));
    }

    let letterbox = calculate_letterbox(orig_width, orig_height, target_size);
    let resized = resize_rgb(image, letterbox.new_width, letterbox.new_height)?;
    let tensor = letterbox_tensor(&resized, target_size, letterbox.pad_top, letterbox.pad_left);

    #[allow(clippy::cast_precision_loss)]
    let padding = (letterbox.pad_top as f32, letterbox.pad_left as f32);

    Ok(PreprocessResult {
        tensor,
        orig_shape: (orig_height, orig_width),
        scale: letterbox.scale,
        padding,
    })
}

/// Calculate letterbox parameters: scaled size, centered padding and scale factors.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn calculate_letterbox(orig_width: u32, orig_height: u32, target_size: (usize, usize)) -> Letterbox {
    let (target_h, target_w) = (target_size.0 as f32, target_size.1 as f32);
    let (orig_h, orig_w) = (orig_height as f32, orig_width as f32);

    let scale = (target_h / orig_h).min(target_w / orig_w);

    let new_width = ((orig_w * scale).round() as u32).max(1);
    let new_height = ((orig_h * scale).round() as u32).max(1);

    let pad_w = (target_size.1 as u32).saturating_sub(new_width);
    let pad_h = (target_size.0 as u32).saturating_sub(new_height);

    Letterbox {
        new_width,
        new_height,
        pad_left: pad_w / 2,
        pad_top: pad_h / 2,
        scale: (new_height as f32 / orig_h, new_width as f32 / orig_w),
    }
}

/// Bilinear resize to an RGB8 image of the given size.
fn resize_rgb(image: &DynamicImage, width: u32, height: u32) -> Result<RgbImage> {
    let src_rgb = image.to_rgb8();
    let (src_w, src_h) = src_rgb.dimensions();
    if (src_w, src_h) == (width, height) {
        return Ok(src_rgb);
    }

    let src_image = Image::from_vec_u8(src_w, src_h, src_rgb.into_raw(), PixelType::U8x3)
        .map_err(|e| InferenceError::ImageError(format!("Failed to wrap source image: {e}")))?;
    let mut dst_image = Image::new(width, height, PixelType::U8x3);

    let options = ResizeOptions::new().resize_alg(ResizeAlg::Convolution(FilterType::Bilinear));
    Resizer::new()
        .resize(&src_image, &mut dst_image, Some(&options))
        .map_err(|e| InferenceError::ImageError(format!("Failed to resize image: {e}")))?;

    RgbImage::from_raw(width, height, dst_image.into_vec())
        .ok_or_else(|| InferenceError::ImageError("Failed to create resized buffer".to_string()))
}

/// Place a resized image on a gray canvas and convert to a normalized NCHW tensor.
fn letterbox_tensor(
    resized: &RgbImage,
    target_size: (usize, usize),
    pad_top: u32,
    pad_left: u32,
) -> Array4<f32> {
    let (dst_h, dst_w) = target_size;
    let mut tensor = Array4::from_elem((1, 3, dst_h, dst_w), LETTERBOX_NORM);

    let (pad_top, pad_left) = (pad_top as usize, pad_left as usize);
    for (x, y, pixel) in resized.enumerate_pixels() {
        let (ty, tx) = (pad_top + y as usize, pad_left + x as usize);
        if ty >= dst_h || tx >= dst_w {
            continue;
        }
        for c in 0..3 {
            tensor[[0, c, ty, tx]] = f32::from(pixel[c]) * INV_255;
        }
    }

    tensor
}

/// Scale coordinates from model output space back to original image space.
///
/// # Arguments
///
/// * `coords` - Coordinates in model space (after letterbox).
/// * `scale` - Scale factors (`scale_y`, `scale_x`) from preprocessing.
/// * `padding` - Padding (`pad_top`, `pad_left`) from preprocessing.
#[must_use]
pub fn scale_coords(coords: &[f32; 4], scale: (f32, f32), padding: (f32, f32)) -> [f32; 4] {
    let (scale_y, scale_x) = scale;
    let (pad_top, pad_left) = padding;

    [
        (coords[0] - pad_left) / scale_x,
        (coords[1] - pad_top) / scale_y,
        (coords[2] - pad_left) / scale_x,
        (coords[3] - pad_top) / scale_y,
    ]
}

/// Clip coordinates to image bounds.
///
/// # Arguments
///
/// * `coords` - Box coordinates [x1, y1, x2, y2].
/// * `shape` - Image shape (height, width).
#[must_use]
pub fn clip_coords(coords: &[f32; 4], shape: (u32, u32)) -> [f32; 4] {
    #[allow(clippy::cast_precision_loss)]
    let (h, w) = (shape.0 as f32, shape.1 as f32);
    [
        coords[0].clamp(0.0, w),
        coords[1].clamp(0.0, h),
        coords[2].clamp(0.0, w),
        coords[3].clamp(0.0, h),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_letterbox_square() {
        let lb = calculate_letterbox(640, 640, (640, 640));
        assert_eq!((lb.new_width, lb.new_height), (640, 640));
        assert_eq!((lb.pad_left, lb.pad_top), (0, 0));
    }

    #[test]
    fn test_letterbox_wide() {
        let lb = calculate_letterbox(1280, 720, (640, 640));
        assert_eq!((lb.new_width, lb.new_height), (640, 360));
        assert_eq!(lb.pad_left, 0);
        assert_eq!(lb.pad_top, 140);
        assert!((lb.scale.0 - 0.5).abs() < 1e-6);
        assert!((lb.scale.1 - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_pads_with_gray() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 32, Rgb([255, 0, 0])));
        let result = preprocess_image(&img, (64, 64)).unwrap();

        assert_eq!(result.tensor.shape(), &[1, 3, 64, 64]);
        assert_eq!(result.orig_shape, (32, 64));
        assert!((result.padding.0 - 16.0).abs() < 1e-6);

        // Top padding row is gray, image rows are red
        assert!((result.tensor[[0, 0, 0, 0]] - LETTERBOX_NORM).abs() < 1e-6);
        assert!((result.tensor[[0, 0, 20, 10]] - 1.0).abs() < 1e-6);
        assert!(result.tensor[[0, 1, 20, 10]].abs() < 1e-6);
    }

    #[test]
    fn test_preprocess_rejects_empty_image() {
        let img = DynamicImage::ImageRgb8(RgbImage::new(0, 0));
        assert!(preprocess_image(&img, (640, 640)).is_err());
    }

    #[test]
    fn test_scale_coords() {
        let coords = [100.0, 100.0, 200.0, 200.0];
        let scaled = scale_coords(&coords, (1.0, 1.0), (10.0, 10.0));

        assert!((scaled[0] - 90.0).abs() < 1e-6);
        assert!((scaled[1] - 90.0).abs() < 1e-6);
        assert!((scaled[2] - 190.0).abs() < 1e-6);
        assert!((scaled[3] - 190.0).abs() < 1e-6);
    }

    #[test]
    fn test_clip_coords() {
        let coords = [-10.0, -20.0, 700.0, 500.0];
        let clipped = clip_coords(&coords, (480, 640));

        assert!((clipped[0] - 0.0).abs() < 1e-6);
        assert!((clipped[1] - 0.0).abs() < 1e-6);
        assert!((clipped[2] - 640.0).abs() < 1e-6);
        assert!((clipped[3] - 480.0).abs() < 1e-6);
    }
}
