// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! `detect` command: one image, JSON on stdout.

use std::sync::Arc;

use crate::cli::args::DetectArgs;
use crate::context::ModelContext;
use crate::detection::DetectionService;
use crate::error::{InferenceError, Result};
use crate::{section, verbose};

/// Load the model, run one detection and print the result.
///
/// # Errors
///
/// Returns an error if the model can't be loaded, the results directory
/// can't be created, or detection fails.
pub fn run_detect(args: &DetectArgs) -> Result<()> {
    std::fs::create_dir_all(&args.results_dir).map_err(|e| {
        InferenceError::ConfigError(format!("Failed to create {}: {e}", args.results_dir.display()))
    })?;

    let context = ModelContext::load(
        &args.model.model,
        args.model.inference_config(),
        args.model.font.as_deref(),
    )?;
    let info = context.info().clone();

    section!("Detecting {}", args.source.display());
    verbose!("Model: {} ({} classes) on {}", info.model_path, info.num_classes, info.device);

    let service = DetectionService::new(Arc::new(context), args.results_dir.clone());
    let result = service.detect(&args.source, args.conf, args.iou)?;

    let json = serde_json::to_string_pretty(&result)
        .map_err(|e| InferenceError::IoError(format!("Failed to serialize result: {e}")))?;
    println!("{json}");

    verbose!(
        "Results saved to {}",
        args.results_dir.join(&result.result_image).display()
    );
    Ok(())
}
