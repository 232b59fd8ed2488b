//! ONNX Runtime configuration types.

use crate::core::errors::ClassifyError;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Graph optimization levels for ONNX Runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OrtGraphOptimizationLevel {
    /// Disable all optimizations.
    DisableAll,
    /// Enable basic optimizations.
    Level1,
    /// Enable extended optimizations.
    Level2,
    /// Enable all optimizations.
    #[default]
    Level3,
}

/// The compute target a session is created on.
///
/// `Default` lets the runtime pick the best accelerator it can register and
/// fall back to the CPU silently. Every other variant is an explicit request:
/// if it cannot be registered, session creation fails.
///
/// Parses from device strings such as `"default"`, `"cpu"`, `"cuda"`,
/// `"cuda:1"`, `"directml:0"` or `"coreml"`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum ExecutionTarget {
    /// Best available accelerator, CPU as the last resort.
    #[default]
    Default,
    /// CPU execution provider.
    Cpu,
    /// NVIDIA CUDA execution provider.
    Cuda {
        /// CUDA device ID.
        device_id: i32,
    },
    /// DirectML execution provider (Windows only).
    DirectML {
        /// DirectML adapter index.
        device_id: i32,
    },
    /// CoreML execution provider (macOS/iOS only).
    CoreML,
}

impl ExecutionTarget {
    /// Whether this target must be registered successfully for a session to
    /// be created.
    pub fn is_explicit(&self) -> bool {
        !matches!(self, ExecutionTarget::Default)
    }
}

impl std::fmt::Display for ExecutionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExecutionTarget::Default => write!(f, "default"),
            ExecutionTarget::Cpu => write!(f, "cpu"),
            ExecutionTarget::Cuda { device_id } => write!(f, "cuda:{device_id}"),
            ExecutionTarget::DirectML { device_id } => write!(f, "directml:{device_id}"),
            ExecutionTarget::CoreML => write!(f, "coreml"),
        }
    }
}

impl FromStr for ExecutionTarget {
    type Err = ClassifyError;

    fn from_str(device: &str) -> Result<Self, Self::Err> {
        let device = device.trim().to_lowercase();
        let (kind, index) = match device.split_once(':') {
            Some((kind, index)) => {
                let id = index.parse::<i32>().map_err(|_| {
                    ClassifyError::config_error_with_context(
                        "target",
                        &device,
                        "device index must be an integer",
                    )
                })?;
                if id < 0 {
                    return Err(ClassifyError::config_error_with_context(
                        "target",
                        &device,
                        "device index must not be negative",
                    ));
                }
                (kind, Some(id))
            }
            None => (device.as_str(), None),
        };

        match (kind, index) {
            ("default" | "auto", None) => Ok(ExecutionTarget::Default),
            ("cpu", None) => Ok(ExecutionTarget::Cpu),
            ("cuda" | "gpu", id) => Ok(ExecutionTarget::Cuda {
                device_id: id.unwrap_or(0),
            }),
            ("directml" | "dml", id) => Ok(ExecutionTarget::DirectML {
                device_id: id.unwrap_or(0),
            }),
            ("coreml", None) => Ok(ExecutionTarget::CoreML),
            _ => Err(ClassifyError::config_error(format!(
                "Unsupported device: {}. Supported devices: default, cpu, cuda[:N], directml[:N], coreml",
                device
            ))),
        }
    }
}

impl TryFrom<String> for ExecutionTarget {
    type Error = ClassifyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<ExecutionTarget> for String {
    fn from(target: ExecutionTarget) -> Self {
        target.to_string()
    }
}

/// Configuration for ONNX Runtime sessions.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OrtSessionConfig {
    /// Number of threads used to parallelize execution within nodes
    pub intra_threads: Option<usize>,
    /// Number of threads used to parallelize execution across nodes
    pub inter_threads: Option<usize>,
    /// Enable parallel execution mode
    pub parallel_execution: Option<bool>,
    /// Graph optimization level
    pub optimization_level: Option<OrtGraphOptimizationLevel>,
    /// Enable memory pattern optimization
    pub enable_mem_pattern: Option<bool>,
}

impl OrtSessionConfig {
    /// Creates a new OrtSessionConfig with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the number of intra-op threads.
    pub fn with_intra_threads(mut self, threads: usize) -> Self {
        self.intra_threads = Some(threads);
        self
    }

    /// Sets the number of inter-op threads.
    pub fn with_inter_threads(mut self, threads: usize) -> Self {
        self.inter_threads = Some(threads);
        self
    }

    /// Enables or disables parallel execution.
    pub fn with_parallel_execution(mut self, enabled: bool) -> Self {
        self.parallel_execution = Some(enabled);
        self
    }

    /// Sets the graph optimization level.
    pub fn with_optimization_level(mut self, level: OrtGraphOptimizationLevel) -> Self {
        self.optimization_level = Some(level);
        self
    }

    /// Enables or disables memory pattern optimization.
    pub fn with_memory_pattern(mut self, enable: bool) -> Self {
        self.enable_mem_pattern = Some(enable);
        self
    }

    /// Gets the effective graph optimization level.
    pub fn get_optimization_level(&self) -> OrtGraphOptimizationLevel {
        self.optimization_level.unwrap_or_default()
    }

    /// Checks thread counts.
    pub fn validate(&self) -> Result<(), ClassifyError> {
        if self.intra_threads == Some(0) {
            return Err(ClassifyError::config_error_with_context(
                "session.intra_threads",
                "0",
                "must be at least 1 when set",
            ));
        }
        if self.inter_threads == Some(0) {
            return Err(ClassifyError::config_error_with_context(
                "session.inter_threads",
                "0",
                "must be at least 1 when set",
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ort_session_config_builder() {
        let config = OrtSessionConfig::new()
            .with_intra_threads(4)
            .with_inter_threads(2)
            .with_optimization_level(OrtGraphOptimizationLevel::Level2)
            .with_memory_pattern(true);

        assert_eq!(config.intra_threads, Some(4));
        assert_eq!(config.inter_threads, Some(2));
        assert_eq!(
            config.get_optimization_level(),
            OrtGraphOptimizationLevel::Level2
        );
        assert_eq!(config.enable_mem_pattern, Some(true));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_threads_rejected() {
        let config = OrtSessionConfig::new().with_intra_threads(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_targets() {
        assert_eq!(
            "default".parse::<ExecutionTarget>().unwrap(),
            ExecutionTarget::Default
        );
        assert_eq!("CPU".parse::<ExecutionTarget>().unwrap(), ExecutionTarget::Cpu);
        assert_eq!(
            "cuda".parse::<ExecutionTarget>().unwrap(),
            ExecutionTarget::Cuda { device_id: 0 }
        );
        assert_eq!(
            "cuda:1".parse::<ExecutionTarget>().unwrap(),
            ExecutionTarget::Cuda { device_id: 1 }
        );
        assert_eq!(
            "dml:2".parse::<ExecutionTarget>().unwrap(),
            ExecutionTarget::DirectML { device_id: 2 }
        );
        assert!("cuda:x".parse::<ExecutionTarget>().is_err());
        assert!("tpu".parse::<ExecutionTarget>().is_err());
        assert!("cpu:1".parse::<ExecutionTarget>().is_err());
    }

    #[test]
    fn test_target_display_round_trips_through_serde() {
        let target = ExecutionTarget::DirectML { device_id: 1 };
        let json = serde_json::to_string(&target).unwrap();
        assert_eq!(json, "\"directml:1\"");
        let parsed: ExecutionTarget = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, target);
        assert!(!ExecutionTarget::Default.is_explicit());
        assert!(target.is_explicit());
    }
}
