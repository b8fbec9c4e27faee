use crate::error::{Error, Result};
pub use candle_core::Device;
use std::fmt;
use std::str::FromStr;

/// Which device to run inference on, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DeviceRequest {
    /// First CUDA device if one is usable, CPU otherwise.
    #[default]
    Auto,
    Cpu,
    Cuda(usize),
}

impl DeviceRequest {
    pub fn resolve(self) -> Result<Device> {
        let device = match self {
            Self::Auto => Device::cuda_if_available(0)?,
            Self::Cpu => Device::Cpu,
            Self::Cuda(ordinal) => Device::new_cuda(ordinal)?,
        };
        Ok(device)
    }
}

impl FromStr for DeviceRequest {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "cpu" => Ok(Self::Cpu),
            "cuda" | "gpu" => Ok(Self::Cuda(0)),
            other => other
                .strip_prefix("cuda:")
                .and_then(|ordinal| ordinal.parse().ok())
                .map(Self::Cuda)
                .ok_or_else(|| Error::ConfigError(format!("unknown device '{s}'"))),
        }
    }
}

impl fmt::Display for DeviceRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => write!(f, "auto"),
            Self::Cpu => write!(f, "cpu"),
            Self::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
        }
    }
}
