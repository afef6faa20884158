// Ultralytics 🚀 AGPL-3.0 License - https://ultralytics.com/license

//! Hardware device selection for inference.

use std::fmt;
use std::str::FromStr;

/// Hardware device for inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    /// CPU (Central Processing Unit).
    Cpu,
    /// CUDA (Compute Unified Device Architecture) for NVIDIA GPUs.
    /// The argument specifies the device index (e.g., 0 for the first GPU).
    Cuda(usize),
}

impl Device {
    /// Pick the best available device: the first CUDA GPU when usable, otherwise CPU.
    #[must_use]
    pub fn auto() -> Self {
        if cuda_available() { Self::Cuda(0) } else { Self::Cpu }
    }

    /// Whether this device is a GPU.
    #[must_use]
    pub const fn is_gpu(&self) -> bool {
        matches!(self, Self::Cuda(_))
    }

    /// Human readable device descriptor, e.g. `CPU` or `CUDA:0`.
    #[must_use]
    pub fn descriptor(&self) -> String {
        match self {
            Self::Cpu => "CPU".to_string(),
            Self::Cuda(i) => format!("CUDA:{i}"),
        }
    }

    /// Coarse device type, `GPU` or `CPU`.
    #[must_use]
    pub const fn device_type(&self) -> &'static str {
        if self.is_gpu() { "GPU" } else { "CPU" }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(i) => write!(f, "cuda:{i}"),
        }
    }
}

impl FromStr for Device {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.to_lowercase();
        match s.as_str() {
            "cpu" => Ok(Self::Cpu),
            "gpu" => Ok(Self::Cuda(0)),
            _ => s.strip_prefix("cuda").map_or_else(
                || Err(format!("Unknown device: {s}")),
                |rest| {
                    let index = parse_device_index(rest).unwrap_or(0);
                    Ok(Self::Cuda(index))
                },
            ),
        }
    }
}

/// Helper to parse device index from string (e.g. ":0")
fn parse_device_index(s: &str) -> Option<usize> {
    if s.is_empty() {
        return None;
    }
    s.strip_prefix(':')
        .and_then(|index_str| index_str.parse::<usize>().ok())
}

/// Whether the CUDA execution provider can be used in this build and on this host.
#[must_use]
pub fn cuda_available() -> bool {
    #[cfg(feature = "cuda")]
    {
        use ort::execution_providers::{CUDAExecutionProvider, ExecutionProvider};
        CUDAExecutionProvider::default().is_available().unwrap_or(false)
    }
    #[cfg(not(feature = "cuda"))]
    {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_device() {
        assert_eq!(Device::from_str("cpu").unwrap(), Device::Cpu);
        assert_eq!(Device::from_str("CPU").unwrap(), Device::Cpu);
        assert_eq!(Device::from_str("gpu").unwrap(), Device::Cuda(0));
        assert_eq!(Device::from_str("cuda").unwrap(), Device::Cuda(0));
        assert_eq!(Device::from_str("cuda:0").unwrap(), Device::Cuda(0));
        assert_eq!(Device::from_str("cuda:1").unwrap(), Device::Cuda(1));
        assert!(Device::from_str("tpu").is_err());
    }

    #[test]
    fn test_descriptor() {
        assert_eq!(Device::Cpu.descriptor(), "CPU");
        assert_eq!(Device::Cuda(0).descriptor(), "CUDA:0");
        assert_eq!(Device::Cpu.device_type(), "CPU");
        assert_eq!(Device::Cuda(1).device_type(), "GPU");
    }

    #[cfg(not(feature = "cuda"))]
    #[test]
    fn test_auto_without_cuda_is_cpu() {
        assert_eq!(Device::auto(), Device::Cpu);
    }
}
