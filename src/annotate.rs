// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Box and label rendering for detection results.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use ab_glyph::{FontArc, PxScale};
use image::{DynamicImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size};
use imageproc::rect::Rect;
use tracing::{info, warn};

use crate::error::{InferenceError, Result};
use crate::results::Results;
use crate::utils::class_label;

/// Assets URL for downloading fonts
const ASSETS_URL: &str = "https://github.com/ultralytics/assets/releases/download/v0.0.0";

/// Font used for labels when none is configured.
pub const DEFAULT_FONT: &str = "Arial.ttf";

/// Box outline thickness in pixels.
const LINE_WIDTH: i32 = 3;

/// Label font size in pixels.
const FONT_SIZE: f32 = 16.0;

/// Label padding in pixels.
const LABEL_PAD: i32 = 2;

/// Ultralytics Color Palette
pub const COLORS: [[u8; 3]; 20] = [
    [4, 42, 255],    // #042aff
    [11, 219, 235],  // #0bdbeb
    [243, 243, 243], // #f3f3f3
    [0, 223, 183],   // #00dfb7
    [17, 31, 104],   // #111f68
    [255, 111, 221], // #ff6fdd
    [255, 68, 79],   // #ff444f
    [204, 237, 0],   // #cced00
    [0, 243, 68],    // #00f344
    [189, 0, 255],   // #bd00ff
    [0, 180, 255],   // #00b4ff
    [221, 0, 186],   // #dd00ba
    [0, 255, 255],   // #00ffff
    [38, 192, 0],    // #26c000
    [1, 255, 179],   // #01ffb3
    [125, 36, 255],  // #7d24ff
    [123, 0, 104],   // #7b0068
    [255, 27, 108],  // #ff1b6c
    [252, 109, 47],  // #fc6d2f
    [162, 255, 11],  // #a2ff0b
];

/// Get color for a class ID
#[must_use]
pub const fn get_class_color(class_id: usize) -> Rgb<u8> {
    Rgb(COLORS[class_id % COLORS.len()])
}

/// Black or white, whichever reads better on `background`.
fn text_color(background: Rgb<u8>) -> Rgb<u8> {
    let [r, g, b] = background.0;
    let luma = 0.299 * f32::from(r) + 0.587 * f32::from(g) + 0.114 * f32::from(b);
    if luma > 150.0 { Rgb([0, 0, 0]) } else { Rgb([255, 255, 255]) }
}

/// Check if font exists in the Ultralytics config dir or download it there.
///
/// Returns `None` when the font is neither cached nor downloadable.
#[must_use]
pub fn check_font(font: &str) -> Option<PathBuf> {
    let font_name = Path::new(font).file_name()?.to_string_lossy().into_owned();
    let config_dir = dirs::config_dir()?.join("Ultralytics");
    let font_path = config_dir.join(&font_name);

    if font_path.exists() {
        return Some(font_path);
    }

    if let Err(e) = fs::create_dir_all(&config_dir) {
        warn!("Failed to create config directory {}: {e}", config_dir.display());
        return None;
    }

    let url = format!("{ASSETS_URL}/{font_name}");
    info!("Downloading {url} to {}", font_path.display());

    let response = match ureq::get(&url).call() {
        Ok(response) => response,
        Err(e) => {
            warn!("Failed to download font from {url}: {e}");
            return None;
        }
    };

    let mut file = match File::create(&font_path) {
        Ok(f) => f,
        Err(e) => {
            warn!("Failed to create font file: {e}");
            return None;
        }
    };

    let mut reader = response.into_body().into_reader();
    if let Err(e) = io::copy(&mut reader, &mut file) {
        warn!("Failed to download font: {e}");
        // Remove partial file
        let _ = fs::remove_file(&font_path);
        return None;
    }

    Some(font_path)
}

/// Load a TrueType/OpenType font from disk.
///
/// # Errors
///
/// Returns an error if the file can't be read or is not a valid font.
pub fn load_font(path: &Path) -> Result<FontArc> {
    let data = fs::read(path)?;
    FontArc::try_from_vec(data).map_err(|e| {
        InferenceError::ConfigError(format!("Invalid font file {}: {e}", path.display()))
    })
}

/// Draws detection boxes and labels onto images.
#[derive(Clone)]
pub struct Annotator {
    font: Option<FontArc>,
    class_names: Vec<String>,
}

impl Annotator {
    /// Annotator for the given vocabulary. Without a font only boxes are drawn.
    #[must_use]
    pub const fn new(class_names: Vec<String>, font: Option<FontArc>) -> Self {
        Self { font, class_names }
    }

    /// Resolve the label font: an explicit path, else the cached or
    /// downloaded default font. Failures degrade to box-only rendering.
    #[must_use]
    pub fn with_font_path(class_names: Vec<String>, font_path: Option<&Path>) -> Self {
        let path = font_path.map(Path::to_path_buf).or_else(|| check_font(DEFAULT_FONT));
        let font = path.and_then(|p| match load_font(&p) {
            Ok(font) => Some(font),
            Err(e) => {
                warn!("{e}, labels will not be drawn");
                None
            }
        });
        Self::new(class_names, font)
    }

    /// Whether labels will be drawn.
    #[must_use]
    pub const fn has_font(&self) -> bool {
        self.font.is_some()
    }

    /// Annotate an image with detection boxes and labels.
    ///
    /// Images without detections are returned unchanged.
    #[must_use]
    pub fn annotate(&self, image: &DynamicImage, results: &Results) -> DynamicImage {
        if results.is_empty() {
            return image.clone();
        }

        let mut img = image.to_rgb8();
        for (bbox, confidence, class_id) in results.boxes.iter() {
            let label = self.label(class_id, confidence);
            self.draw_box(&mut img, bbox, get_class_color(class_id), &label);
        }

        DynamicImage::ImageRgb8(img)
    }

    /// `"<name> <conf>"` text drawn above a box.
    fn label(&self, class_id: usize, confidence: f32) -> String {
        format!("{} {confidence:.2}", class_label(&self.class_names, class_id))
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap, clippy::cast_sign_loss)]
    fn draw_box(&self, img: &mut RgbImage, bbox: [f32; 4], color: Rgb<u8>, label: &str) {
        let (width, height) = img.dimensions();
        let (max_x, max_y) = (width as i32 - 1, height as i32 - 1);

        let mut x1 = bbox[0].round() as i32;
        let mut y1 = bbox[1].round() as i32;
        let mut x2 = bbox[2].round() as i32;
        let mut y2 = bbox[3].round() as i32;
        if x1 > x2 {
            std::mem::swap(&mut x1, &mut x2);
        }
        if y1 > y2 {
            std::mem::swap(&mut y1, &mut y2);
        }
        let (x1, y1) = (x1.clamp(0, max_x), y1.clamp(0, max_y));
        let (x2, y2) = (x2.clamp(0, max_x), y2.clamp(0, max_y));

        if x2 <= x1 || y2 <= y1 {
            return;
        }

        for t in 0..LINE_WIDTH {
            let tx1 = (x1 + t).min(x2);
            let ty1 = (y1 + t).min(y2);
            let tx2 = (x2 - t).max(tx1);
            let ty2 = (y2 - t).max(ty1);
            if tx2 > tx1 && ty2 > ty1 {
                let rect = Rect::at(tx1, ty1).of_size((tx2 - tx1) as u32, (ty2 - ty1) as u32);
                draw_hollow_rect_mut(img, rect, color);
            }
        }

        let Some(font) = &self.font else {
            return;
        };

        let scale = PxScale::from(FONT_SIZE);
        let (text_w, text_h) = text_size(scale, font, label);
        let label_w = text_w as i32 + 2 * LABEL_PAD;
        let label_h = text_h as i32 + 2 * LABEL_PAD;

        // Above the box if there's room, otherwise inside its top edge
        let label_y = if y1 >= label_h { y1 - label_h } else { y1 };
        let label_x = x1.min((max_x + 1 - label_w).max(0));

        draw_filled_rect_mut(
            img,
            Rect::at(label_x, label_y).of_size(label_w as u32, label_h as u32),
            color,
        );
        draw_text_mut(
            img,
            text_color(color),
            label_x + LABEL_PAD,
            label_y + LABEL_PAD,
            scale,
            font,
            label,
        );
    }
}

impl std::fmt::Debug for Annotator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Annotator")
            .field("has_font", &self.font.is_some())
            .field("num_classes", &self.class_names.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::{Boxes, Speed};
    use ndarray::array;

    fn gray_image(width: u32, height: u32) -> DynamicImage {
        DynamicImage::ImageRgb8(RgbImage::from_pixel(width, height, Rgb([128, 128, 128])))
    }

    #[test]
    fn test_class_color_wraps() {
        assert_eq!(get_class_color(0), Rgb([4, 42, 255]));
        assert_eq!(get_class_color(20), get_class_color(0));
    }

    #[test]
    fn test_text_color_contrast() {
        assert_eq!(text_color(Rgb([243, 243, 243])), Rgb([0, 0, 0]));
        assert_eq!(text_color(Rgb([17, 31, 104])), Rgb([255, 255, 255]));
    }

    #[test]
    fn test_label_text() {
        let annotator = Annotator::new(vec!["person".to_string()], None);
        assert_eq!(annotator.label(0, 0.873), "person 0.87");
        assert_eq!(annotator.label(5, 0.5), "class5 0.50");
    }

    #[test]
    fn test_no_detections_leaves_image_unchanged() {
        let annotator = Annotator::new(vec!["person".to_string()], None);
        let image = gray_image(64, 48);
        let results = Results::empty((48, 64));

        let annotated = annotator.annotate(&image, &results);
        assert_eq!(annotated.to_rgb8().as_raw(), image.to_rgb8().as_raw());
    }

    #[test]
    fn test_box_drawn_in_class_color() {
        let annotator = Annotator::new(vec!["person".to_string(), "car".to_string()], None);
        let image = gray_image(100, 100);
        let boxes = Boxes::new(array![[10.0, 10.0, 60.0, 60.0, 0.9, 1.0]], (100, 100));
        let results = Results::new((100, 100), (640, 640), boxes, Speed::default());

        let annotated = annotator.annotate(&image, &results).to_rgb8();
        assert_eq!(*annotated.get_pixel(10, 30), get_class_color(1));
        assert_eq!(*annotated.get_pixel(12, 30), get_class_color(1));
        // Interior untouched
        assert_eq!(*annotated.get_pixel(35, 35), Rgb([128, 128, 128]));
    }

    #[test]
    fn test_degenerate_box_skipped() {
        let annotator = Annotator::new(vec!["person".to_string()], None);
        let image = gray_image(50, 50);
        let boxes = Boxes::new(array![[20.0, 20.0, 20.0, 40.0, 0.9, 0.0]], (50, 50));
        let results = Results::new((50, 50), (640, 640), boxes, Speed::default());

        let annotated = annotator.annotate(&image, &results);
        assert_eq!(annotated.to_rgb8().as_raw(), image.to_rgb8().as_raw());
    }

    #[test]
    fn test_invalid_font_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("font.ttf");
        fs::write(&path, b"garbage").unwrap();
        assert!(load_font(&path).is_err());

        let annotator = Annotator::with_font_path(vec![], Some(&path));
        assert!(!annotator.has_font());
    }
}
