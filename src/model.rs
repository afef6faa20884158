// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! YOLO model loading and inference.
//!
//! This module provides the main `YOLOModel` struct for loading ONNX detection
//! models and running inference on decoded images.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use image::DynamicImage;
use ndarray::Array4;
#[cfg(feature = "cuda")]
use ort::execution_providers::CUDAExecutionProvider;
use ort::session::Session;
use ort::session::builder::GraphOptimizationLevel;
use ort::value::TensorRef;
use tracing::{debug, warn};

use crate::device::{Device, cuda_available};
use crate::error::{InferenceError, Result};
use crate::inference::InferenceConfig;
use crate::metadata::{METADATA_KEYS, ModelMetadata};
use crate::postprocessing::{infer_num_classes, postprocess_detect};
use crate::preprocessing::preprocess_image;
use crate::results::{Results, Speed};
use crate::utils::fallback_class_name;

/// YOLO detection model backed by an ONNX Runtime session.
///
/// # Example
///
/// ```no_run
/// use yolo_detect_server::{InferenceConfig, YOLOModel};
///
/// let mut model = YOLOModel::load("yolo11n.onnx")?;
/// let image = image::open("bus.jpg")?;
/// let results = model.predict_image(&image, &InferenceConfig::default())?;
/// println!("Found {} detections", results.len());
/// # Ok::<(), yolo_detect_server::InferenceError>(())
/// ```
pub struct YOLOModel {
    /// ONNX Runtime session.
    session: Session,
    /// Model metadata (task, classes, etc.).
    metadata: ModelMetadata,
    /// Ordered class vocabulary.
    class_names: Vec<String>,
    /// Input tensor name.
    input_name: String,
    /// Output tensor names.
    output_names: Vec<String>,
    /// Inference configuration.
    config: InferenceConfig,
    /// Device the session was built for.
    device: Device,
    /// Canonical path of the loaded weights.
    model_path: PathBuf,
}

impl YOLOModel {
    /// Load a YOLO model from an ONNX file with the default configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the model file doesn't exist or can't be loaded.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        Self::load_with_config(path, InferenceConfig::default())
    }

    /// Load a YOLO model with custom configuration.
    ///
    /// The model is warmed up once before returning, which also establishes
    /// the class count for models exported without a vocabulary.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::ModelLoadError`] if the file doesn't exist,
    /// ONNX Runtime rejects it, or it is not a detection model.
    pub fn load_with_config<P: AsRef<Path>>(path: P, config: InferenceConfig) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(InferenceError::ModelLoadError(format!(
                "Model file not found: {}",
                path.display()
            )));
        }
        let model_path = path.canonicalize()?;

        let device = resolve_device(config.device);
        let session = build_session(path, &config, device)?;

        let metadata = Self::extract_metadata(&session)?;
        if !metadata.is_detection() {
            return Err(InferenceError::ModelLoadError(format!(
                "Expected a detection model, got task '{}'",
                metadata.task
            )));
        }

        let input_name = session
            .inputs
            .first()
            .map_or_else(|| "images".to_string(), |i| i.name.clone());
        let output_names: Vec<String> = session.outputs.iter().map(|o| o.name.clone()).collect();
        if output_names.is_empty() {
            return Err(InferenceError::ModelLoadError("Model has no outputs".to_string()));
        }

        // Update config with model metadata if not overridden
        let config = InferenceConfig {
            imgsz: config.imgsz.or(Some(metadata.imgsz)),
            device: Some(device),
            ..config
        };

        let mut model = Self {
            session,
            class_names: metadata.class_names(),
            metadata,
            input_name,
            output_names,
            config,
            device,
            model_path,
        };

        let output_shape = model.warmup()?;
        if model.class_names.is_empty() {
            let num_classes = infer_num_classes(&output_shape).ok_or_else(|| {
                InferenceError::ModelLoadError(format!(
                    "Unsupported output shape {output_shape:?} for a detection model"
                ))
            })?;
            warn!("Model has no class names in its metadata, using class0..class{}", num_classes - 1);
            model.class_names = (0..num_classes).map(fallback_class_name).collect();
        }

        debug!(
            "Loaded {} ({} classes, imgsz {:?}, {})",
            model.model_path.display(),
            model.class_names.len(),
            model.imgsz(),
            model.device.descriptor()
        );
        Ok(model)
    }

    /// Run inference on a dummy input and return the raw output shape.
    fn warmup(&mut self) -> Result<Vec<usize>> {
        let (height, width) = self.imgsz();
        let dummy_input = Array4::<f32>::zeros((1, 3, height, width));
        let (_, shape) = self
            .run_inference(&dummy_input)
            .map_err(|e| InferenceError::ModelLoadError(format!("Warmup inference failed: {e}")))?;
        Ok(shape)
    }

    /// Extract metadata from the ONNX model session.
    fn extract_metadata(session: &Session) -> Result<ModelMetadata> {
        let model_metadata = session
            .metadata()
            .map_err(|e| InferenceError::ModelLoadError(format!("Failed to get model metadata: {e}")))?;

        let mut properties: HashMap<String, String> = HashMap::new();
        for key in METADATA_KEYS {
            if let Ok(Some(value)) = model_metadata.custom(key) {
                properties.insert(key.to_string(), value);
            }
        }

        ModelMetadata::from_properties(&properties)
    }

    /// Run detection on a decoded image.
    ///
    /// Thresholds and the detection cap are taken from `config`; the input
    /// size always comes from the model.
    ///
    /// # Errors
    ///
    /// Returns an error if preprocessing or the ONNX Runtime call fails.
    pub fn predict_image(&mut self, image: &DynamicImage, config: &InferenceConfig) -> Result<Results> {
        let target_size = self.imgsz();

        let start_preprocess = Instant::now();
        let preprocess_result = preprocess_image(image, target_size)?;
        let preprocess_time = start_preprocess.elapsed().as_secs_f64() * 1000.0;

        let start_inference = Instant::now();
        let (output_data, output_shape) = self.run_inference(&preprocess_result.tensor)?;
        let inference_time = start_inference.elapsed().as_secs_f64() * 1000.0;

        let start_postprocess = Instant::now();
        let boxes = postprocess_detect(
            &output_data,
            &output_shape,
            self.class_names.len(),
            &preprocess_result,
            config,
        );
        let postprocess_time = start_postprocess.elapsed().as_secs_f64() * 1000.0;

        #[allow(clippy::cast_possible_truncation)]
        let inference_shape = (target_size.0 as u32, target_size.1 as u32);

        Ok(Results::new(
            preprocess_result.orig_shape,
            inference_shape,
            boxes,
            Speed::new(preprocess_time, inference_time, postprocess_time),
        ))
    }

    /// Run the ONNX model inference.
    fn run_inference(&mut self, input: &Array4<f32>) -> Result<(Vec<f32>, Vec<usize>)> {
        let input_contiguous = input.as_standard_layout();

        let input_tensor = TensorRef::from_array_view(&input_contiguous)
            .map_err(|e| InferenceError::InferenceError(format!("Failed to create input tensor: {e}")))?;

        let outputs = self
            .session
            .run(ort::inputs![self.input_name.as_str() => input_tensor])
            .map_err(|e| InferenceError::InferenceError(format!("Inference failed: {e}")))?;

        let output_name = &self.output_names[0];
        let output = outputs
            .get(output_name.as_str())
            .ok_or_else(|| InferenceError::InferenceError(format!("Output '{output_name}' not found")))?;

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::InferenceError(format!("Failed to extract output: {e}")))?;

        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let shape_vec: Vec<usize> = shape.iter().map(|&d| d as usize).collect();

        Ok((data.to_vec(), shape_vec))
    }

    /// Ordered class vocabulary.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.class_names
    }

    /// Get the number of classes.
    #[must_use]
    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    /// Model input size (height, width).
    #[must_use]
    pub fn imgsz(&self) -> (usize, usize) {
        self.config.imgsz.unwrap_or(self.metadata.imgsz)
    }

    /// Device the session runs on.
    #[must_use]
    pub const fn device(&self) -> Device {
        self.device
    }

    /// Configuration the model was loaded with.
    #[must_use]
    pub const fn config(&self) -> &InferenceConfig {
        &self.config
    }

    /// Get the model metadata.
    #[must_use]
    pub const fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    /// Canonical path of the loaded weights.
    #[must_use]
    pub fn model_path(&self) -> &Path {
        &self.model_path
    }
}

impl std::fmt::Debug for YOLOModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YOLOModel")
            .field("model_path", &self.model_path)
            .field("num_classes", &self.class_names.len())
            .field("imgsz", &self.imgsz())
            .field("device", &self.device)
            .finish_non_exhaustive()
    }
}

/// Explicit device if usable, otherwise the best available one.
fn resolve_device(requested: Option<Device>) -> Device {
    match requested {
        Some(Device::Cuda(index)) if !cuda_available() => {
            warn!("CUDA:{index} requested but the CUDA execution provider is unavailable, using CPU");
            Device::Cpu
        }
        Some(device) => device,
        None => Device::auto(),
    }
}

/// Build an optimized ONNX Runtime session for `device`.
fn build_session(path: &Path, config: &InferenceConfig, device: Device) -> Result<Session> {
    #[allow(unused_mut)]
    let mut builder = Session::builder()
        .map_err(|e| InferenceError::ModelLoadError(format!("Failed to create session builder: {e}")))?;

    #[cfg(feature = "cuda")]
    {
        if let Device::Cuda(index) = device {
            #[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
            let device_id = index as i32;
            builder = builder
                .with_execution_providers([CUDAExecutionProvider::default().with_device_id(device_id).build()])
                .map_err(|e| InferenceError::ModelLoadError(format!("Failed to register CUDA EP: {e}")))?;
        }
    }
    #[cfg(not(feature = "cuda"))]
    let _ = device;

    builder
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| InferenceError::ModelLoadError(format!("Failed to set optimization level: {e}")))?
        .with_intra_threads(config.num_threads)
        .map_err(|e| InferenceError::ModelLoadError(format!("Failed to set intra-thread count: {e}")))?
        .commit_from_file(path)
        .map_err(|e| InferenceError::ModelLoadError(format!("Failed to load model: {e}")))
}
