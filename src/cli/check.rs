// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! `check` command: verify the environment before serving.

use std::path::Path;

use crate::cli::args::CheckArgs;
use crate::device::cuda_available;
use crate::{cli_error, cli_warn, section, success, verbose};

/// Size of a file in megabytes.
#[allow(clippy::cast_precision_loss)]
fn size_mb(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0)
}

/// Run all checks. Returns `false` if the model file is missing.
pub fn run_check(args: &CheckArgs) -> bool {
    section!("YOLO DETECTION SERVER - SYSTEM CHECK");

    verbose!("[1/4] Version");
    verbose!("      {} v{}", crate::NAME, crate::VERSION);

    verbose!("[2/4] Execution providers");
    success!("      CPU available");
    if cuda_available() {
        success!("      CUDA available");
    } else if cfg!(feature = "cuda") {
        cli_warn!("      CUDA support compiled in but no usable GPU found");
    } else {
        verbose!("      CUDA not compiled in (build with --features cuda)");
    }

    verbose!("[3/4] Model file");
    let model_ok = check_model(&args.model);

    verbose!("[4/4] Storage directories");
    check_dir("Upload", &args.upload_dir);
    check_dir("Results", &args.results_dir);

    section!("SUMMARY");
    if model_ok {
        success!("Ready to serve");
    } else {
        cli_error!("Model missing, the server will not start");
    }
    model_ok
}

fn check_model(path: &Path) -> bool {
    match std::fs::metadata(path) {
        Ok(meta) if meta.is_file() => {
            verbose!("      Model found: {}", path.display());
            verbose!("      Size: {:.2} MB", size_mb(meta.len()));
            success!("      Model file exists");
            true
        }
        _ => {
            cli_error!("      Model not found at: {}", path.display());
            false
        }
    }
}

fn check_dir(label: &str, path: &Path) {
    if path.is_dir() {
        success!("      {label} directory: {}", path.display());
    } else {
        cli_warn!("      {label} directory missing (created on serve): {}", path.display());
    }
}
