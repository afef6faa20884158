// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::device::Device;
use crate::inference::{DEFAULT_CONFIDENCE, DEFAULT_IOU, InferenceConfig};
use crate::server::{DEFAULT_MAX_UPLOAD_BYTES, ServerConfig};

/// Default model location.
pub const DEFAULT_MODEL: &str = "models/best.onnx";

/// CLI arguments parser.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = r#"Examples:
    yolo-detect-server serve --model models/best.onnx --port 5000
    yolo-detect-server detect --model models/best.onnx --source part.jpg --conf 0.5
    yolo-detect-server check --model models/best.onnx

Environment:
    MODEL_PATH, DEVICE, HOST, PORT, UPLOAD_DIR, RESULTS_DIR, RUST_LOG"#)]
pub struct Cli {
    #[command(subcommand)]
    /// Subcommand to execute.
    pub command: Commands,

    /// Only print warnings and errors
    #[arg(short, long, global = true, default_value_t = false)]
    pub quiet: bool,
}

/// Commands for the CLI.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the detection web server
    Serve(ServeArgs),
    /// Run detection on a single image and print the result as JSON
    Detect(DetectArgs),
    /// Check the model file, execution providers and storage directories
    Check(CheckArgs),
}

/// Model loading options shared by `serve` and `detect`.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Path to ONNX detection model file
    #[arg(short, long, env = "MODEL_PATH", default_value = DEFAULT_MODEL)]
    pub model: PathBuf,

    /// Device to use (cpu, cuda, cuda:N). Picks CUDA:0 when available if omitted
    #[arg(long, env = "DEVICE")]
    pub device: Option<Device>,

    /// ONNX Runtime intra-op threads (0 = auto)
    #[arg(long, default_value_t = 0)]
    pub threads: usize,

    /// Label font file. Defaults to Arial.ttf in the Ultralytics config dir
    #[arg(long)]
    pub font: Option<PathBuf>,
}

impl ModelArgs {
    /// Inference configuration for these options.
    #[must_use]
    pub fn inference_config(&self) -> InferenceConfig {
        let config = InferenceConfig::new().with_threads(self.threads);
        match self.device {
            Some(device) => config.with_device(device),
            None => config,
        }
    }
}

/// Arguments for the serve command.
#[derive(Args, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Address to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    pub host: String,

    /// Port to bind
    #[arg(short, long, env = "PORT", default_value_t = 5000)]
    pub port: u16,

    /// Directory for uploaded images
    #[arg(long, env = "UPLOAD_DIR", default_value = "static/uploads")]
    pub upload_dir: PathBuf,

    /// Directory for annotated results
    #[arg(long, env = "RESULTS_DIR", default_value = "static/results")]
    pub results_dir: PathBuf,

    /// Maximum upload size in bytes
    #[arg(long, default_value_t = DEFAULT_MAX_UPLOAD_BYTES)]
    pub max_upload_bytes: usize,
}

impl ServeArgs {
    /// Server settings for these options.
    #[must_use]
    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            upload_dir: self.upload_dir.clone(),
            results_dir: self.results_dir.clone(),
            max_upload_bytes: self.max_upload_bytes,
        }
    }
}

/// Arguments for the detect command.
#[derive(Args, Debug)]
pub struct DetectArgs {
    #[command(flatten)]
    pub model: ModelArgs,

    /// Image to run detection on
    #[arg(short, long)]
    pub source: PathBuf,

    /// Confidence threshold
    #[arg(long, default_value_t = DEFAULT_CONFIDENCE)]
    pub conf: f32,

    /// `IoU` threshold for NMS
    #[arg(long, default_value_t = DEFAULT_IOU)]
    pub iou: f32,

    /// Directory for the annotated result
    #[arg(long, env = "RESULTS_DIR", default_value = "static/results")]
    pub results_dir: PathBuf,
}

/// Arguments for the check command.
#[derive(Args, Debug)]
pub struct CheckArgs {
    /// Path to ONNX detection model file
    #[arg(short, long, env = "MODEL_PATH", default_value = DEFAULT_MODEL)]
    pub model: PathBuf,

    /// Directory for uploaded images
    #[arg(long, env = "UPLOAD_DIR", default_value = "static/uploads")]
    pub upload_dir: PathBuf,

    /// Directory for annotated results
    #[arg(long, env = "RESULTS_DIR", default_value = "static/results")]
    pub results_dir: PathBuf,
}
