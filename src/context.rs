// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Process-wide model state.
//!
//! The model is loaded once at startup into a [`ModelContext`], which is then
//! shared through an `Arc` by every request. Both halves are read-only after
//! load; the provider serializes inference internally.

use std::path::Path;

use chrono::Local;
use serde::Serialize;
use tracing::{debug, info};
use utoipa::ToSchema;

use crate::annotate::Annotator;
use crate::device::Device;
use crate::error::{InferenceError, Result};
use crate::inference::InferenceConfig;
use crate::model::YOLOModel;
use crate::provider::{InferenceProvider, YoloProvider};
use crate::utils::class_label;

/// Timestamp format of [`ModelInfo::loaded_at`].
pub const LOADED_AT_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Read-only description of the loaded model.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ModelInfo {
    /// Device descriptor, e.g. `CPU` or `CUDA:0`
    pub device: String,
    /// `CPU` or `GPU`
    pub device_type: String,
    /// Class vocabulary ordered by class ID
    pub classes: Vec<String>,
    /// Number of classes
    pub num_classes: usize,
    /// Canonical path of the weights file
    pub model_path: String,
    /// Local load time, `YYYY-MM-DD HH:MM:SS`
    pub loaded_at: String,
}

impl ModelInfo {
    /// Describe a model loaded now.
    #[must_use]
    pub fn new(device: Device, classes: Vec<String>, model_path: &Path) -> Self {
        Self {
            device: device.descriptor(),
            device_type: device.device_type().to_string(),
            num_classes: classes.len(),
            classes,
            model_path: model_path.display().to_string(),
            loaded_at: Local::now().format(LOADED_AT_FORMAT).to_string(),
        }
    }

    /// Class name for an ID, if it is in the vocabulary.
    #[must_use]
    pub fn class_name(&self, class_id: usize) -> Option<&str> {
        self.classes.get(class_id).map(String::as_str)
    }

    /// Class name for an ID, falling back to `class<N>` outside the vocabulary.
    #[must_use]
    pub fn class_label(&self, class_id: usize) -> String {
        class_label(&self.classes, class_id)
    }
}

/// Loaded model plus its description, shared by all requests.
pub struct ModelContext {
    info: ModelInfo,
    provider: Box<dyn InferenceProvider>,
}

impl ModelContext {
    /// Load the detection model at `path`.
    ///
    /// `font` overrides the label font; without it the default font is
    /// resolved (and downloaded if needed).
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::ModelLoadError`] if the weights are missing,
    /// unreadable or not a detection model.
    pub fn load(path: &Path, config: InferenceConfig, font: Option<&Path>) -> Result<Self> {
        if !path.is_file() {
            return Err(InferenceError::ModelLoadError(format!(
                "Model weights not found at {}",
                path.display()
            )));
        }

        let model = YOLOModel::load_with_config(path, config)?;
        let info = ModelInfo::new(model.device(), model.names().to_vec(), model.model_path());
        let annotator = Annotator::with_font_path(info.classes.clone(), font);

        info!(
            "Model loaded on {} with {} classes from {}",
            info.device, info.num_classes, info.model_path
        );

        Ok(Self::from_provider(info, Box::new(YoloProvider::new(model, annotator))))
    }

    /// Wrap an already constructed provider.
    #[must_use]
    pub fn from_provider(info: ModelInfo, provider: Box<dyn InferenceProvider>) -> Self {
        debug!("Using {} inference provider", provider.name());
        Self { info, provider }
    }

    /// Description of the loaded model.
    #[must_use]
    pub const fn info(&self) -> &ModelInfo {
        &self.info
    }

    /// The shared inference provider.
    #[must_use]
    pub fn provider(&self) -> &dyn InferenceProvider {
        self.provider.as_ref()
    }
}

impl std::fmt::Debug for ModelContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelContext").field("info", &self.info).finish_non_exhaustive()
    }
}
