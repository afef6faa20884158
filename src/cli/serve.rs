// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! `serve` command: load the model once, then run the HTTP server.

use std::sync::Arc;

use crate::cli::args::ServeArgs;
use crate::context::ModelContext;
use crate::error::Result;
use crate::server::serve;
use crate::{section, success, verbose};

/// Load the model and serve until stopped.
///
/// # Errors
///
/// Returns an error if the model can't be loaded or the server fails to start.
pub async fn run_serve(args: ServeArgs) -> Result<()> {
    let config = args.server_config();

    section!("LOADING YOLO MODEL");
    verbose!("Loading model from: {}", args.model.model.display());

    let model_args = args.model.clone();
    let context = tokio::task::spawn_blocking(move || {
        ModelContext::load(&model_args.model, model_args.inference_config(), model_args.font.as_deref())
    })
    .await
    .map_err(|e| crate::InferenceError::ModelLoadError(format!("Model loading task failed: {e}")))??;

    let info = context.info();
    success!("Model loaded on {} ({})", info.device, info.device_type);
    verbose!("Number of classes: {}", info.num_classes);
    verbose!("Classes: {}", preview(&info.classes, 5));

    section!("Starting server on http://{}:{}", config.host, config.port);
    serve(Arc::new(context), config).await
}

/// First `n` items joined by commas, with an ellipsis if truncated.
fn preview(items: &[String], n: usize) -> String {
    let shown = items.iter().take(n).map(String::as_str).collect::<Vec<_>>().join(", ");
    if items.len() > n { format!("{shown}, ...") } else { shown }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_preview() {
        let items: Vec<String> = ["a", "b", "c"].iter().map(ToString::to_string).collect();
        assert_eq!(preview(&items, 5), "a, b, c");
        assert_eq!(preview(&items, 2), "a, b, ...");
        assert_eq!(preview(&[], 2), "");
    }
}
