// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! ONNX model metadata parsing.
//!
//! Ultralytics exports store their configuration (task, stride, input size and
//! the class vocabulary) as custom metadata properties on the ONNX model. The
//! values are YAML scalars, except `names` which is a Python dict literal.

use std::collections::{BTreeMap, HashMap};

use crate::error::{InferenceError, Result};
use crate::utils::fallback_class_name;

/// Task string Ultralytics writes for detection models.
pub const DETECT_TASK: &str = "detect";

/// Metadata keys written by the Ultralytics ONNX exporter.
pub const METADATA_KEYS: [&str; 12] = [
    "description", "author", "date", "version", "license", "docs", "stride", "task", "batch",
    "imgsz", "names", "channels",
];

/// Metadata extracted from an Ultralytics YOLO ONNX model.
#[derive(Debug, Clone)]
pub struct ModelMetadata {
    /// Model description (e.g., "Ultralytics YOLO11n model trained on coco.yaml").
    pub description: String,
    /// Model author.
    pub author: String,
    /// Ultralytics version used for export.
    pub version: String,
    /// The task this model performs, as written by the exporter.
    pub task: String,
    /// Model stride (typically 32 for YOLO).
    pub stride: u32,
    /// Input image size as (height, width).
    pub imgsz: (usize, usize),
    /// Class ID to class name mapping, ordered by ID.
    pub names: BTreeMap<usize, String>,
}

impl ModelMetadata {
    /// Build metadata from individual ONNX custom metadata properties.
    ///
    /// # Errors
    ///
    /// Returns an error if a present value is malformed.
    pub fn from_properties(properties: &HashMap<String, String>) -> Result<Self> {
        if properties.is_empty() {
            return Ok(Self::default());
        }

        let mut yaml = String::new();
        for key in METADATA_KEYS {
            if let Some(value) = properties.get(key) {
                yaml.push_str(key);
                yaml.push_str(": ");
                yaml.push_str(value);
                yaml.push('\n');
            }
        }
        Self::from_yaml_str(&yaml)
    }

    /// Parse metadata from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if a numeric field cannot be parsed.
    pub fn from_yaml_str(yaml_str: &str) -> Result<Self> {
        let mut metadata = Self::default();

        for line in yaml_str.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim().trim_matches('\'').trim_matches('"');

            match key {
                "description" => metadata.description = value.to_string(),
                "author" => metadata.author = value.to_string(),
                "version" => metadata.version = value.to_string(),
                "task" => metadata.task = value.to_lowercase(),
                "stride" => {
                    metadata.stride = value.parse().map_err(|_| {
                        InferenceError::MetadataError(format!("Invalid stride value: {value}"))
                    })?;
                }
                _ => {
                    // Class entries inside a YAML `names:` block
                    if let Ok(class_id) = key.parse::<usize>() {
                        metadata.names.insert(class_id, value.to_string());
                    }
                }
            }
        }

        if let Some(imgsz_line) = yaml_str.lines().find(|l| l.trim_start().starts_with("imgsz:")) {
            metadata.imgsz = Self::parse_imgsz(yaml_str, imgsz_line);
        }

        if metadata.names.is_empty() {
            metadata.names = Self::parse_names_dict(yaml_str);
        }

        Ok(metadata)
    }

    /// Parse `imgsz`, either inline (`[640, 640]`) or as a YAML list.
    fn parse_imgsz(yaml_str: &str, imgsz_line: &str) -> (usize, usize) {
        if let (Some(start), Some(end)) = (imgsz_line.find('['), imgsz_line.find(']')) {
            let values: Vec<usize> = imgsz_line[start + 1..end]
                .split(',')
                .filter_map(|s| s.trim().parse().ok())
                .collect();
            if values.len() >= 2 {
                return (values[0], values[1]);
            }
            if let [size] = values[..] {
                return (size, size);
            }
        }

        let values: Vec<usize> = yaml_str
            .lines()
            .skip_while(|l| !l.trim_start().starts_with("imgsz:"))
            .skip(1)
            .map(str::trim)
            .take_while(|l| l.starts_with('-'))
            .filter_map(|l| l.trim_start_matches('-').trim().parse().ok())
            .collect();

        match values[..] {
            [h, w, ..] => (h, w),
            [size] => (size, size),
            [] => (640, 640),
        }
    }

    /// Parse a Python dict such as `names: {0: 'person', 1: 'bicycle'}`.
    fn parse_names_dict(yaml_str: &str) -> BTreeMap<usize, String> {
        let mut names = BTreeMap::new();

        let Some(start) = yaml_str.find("names:") else {
            return names;
        };
        let after = yaml_str[start + "names:".len()..].trim_start();
        let Some(body) = after.strip_prefix('{') else {
            return names;
        };
        let body = body.find('}').map_or(body, |end| &body[..end]);

        for entry in body.split(',') {
            if let Some((key, value)) = entry.split_once(':') {
                if let Ok(class_id) = key.trim().parse::<usize>() {
                    let value = value.trim().trim_matches('\'').trim_matches('"');
                    names.insert(class_id, value.to_string());
                }
            }
        }

        names
    }

    /// Whether the exporter marked this model as a detection model.
    ///
    /// Models without a task entry are assumed to be detectors.
    #[must_use]
    pub fn is_detection(&self) -> bool {
        self.task.is_empty() || self.task == DETECT_TASK
    }

    /// Get the number of classes in this model.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.names.keys().next_back().map_or(0, |&max| max + 1)
    }

    /// Ordered class vocabulary, indexed by class ID.
    ///
    /// Gaps in the ID space are filled with `class<N>` so that the vocabulary
    /// can always be indexed by any ID below [`Self::num_classes`].
    #[must_use]
    pub fn class_names(&self) -> Vec<String> {
        (0..self.num_classes())
            .map(|id| self.names.get(&id).cloned().unwrap_or_else(|| fallback_class_name(id)))
            .collect()
    }
}

impl Default for ModelMetadata {
    fn default() -> Self {
        Self {
            description: String::new(),
            author: "Ultralytics".to_string(),
            version: String::new(),
            task: String::new(),
            stride: 32,
            imgsz: (640, 640),
            names: BTreeMap::new(),
        }
    }
}
