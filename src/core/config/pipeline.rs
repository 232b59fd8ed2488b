//! Top-level pipeline configuration.

use super::{ExecutionTarget, OrtSessionConfig, PreprocessConfig};
use crate::core::errors::{ClassifyError, ClassifyResult};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Number of ranked predictions reported by default.
pub const DEFAULT_TOP_N: usize = 3;

/// Everything one classification run needs.
///
/// Can be built in code with the `with_*` methods or read from JSON:
///
/// ```json
/// {
///   "model_path": "assets/squeezenet.onnx",
///   "image_path": "assets/kitten_224.png",
///   "labels_path": "assets/labels.json",
///   "top_n": 3,
///   "target": "default",
///   "session": { "intra_threads": 4 },
///   "preprocess": { "resize_filter": "Lanczos3" }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Path to the ONNX model artifact.
    pub model_path: PathBuf,
    /// Path to the image to classify.
    pub image_path: PathBuf,
    /// Path to the label dictionary.
    pub labels_path: PathBuf,
    /// Number of ranked predictions to report.
    pub top_n: usize,
    /// Execution target for the session.
    pub target: ExecutionTarget,
    /// ONNX Runtime session options.
    pub session: OrtSessionConfig,
    /// Image preprocessing options.
    pub preprocess: PreprocessConfig,
    /// Correlation label attached to the evaluation.
    pub run_id: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::new(),
            image_path: PathBuf::new(),
            labels_path: PathBuf::new(),
            top_n: DEFAULT_TOP_N,
            target: ExecutionTarget::Default,
            session: OrtSessionConfig::default(),
            preprocess: PreprocessConfig::default(),
            run_id: "RunId".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Creates a configuration for the three input files.
    pub fn new(
        model_path: impl Into<PathBuf>,
        image_path: impl Into<PathBuf>,
        labels_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            model_path: model_path.into(),
            image_path: image_path.into(),
            labels_path: labels_path.into(),
            ..Self::default()
        }
    }

    /// Reads a configuration from a JSON file.
    pub fn from_json_file(path: &Path) -> ClassifyResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ClassifyError::config_error(format!(
                "Failed to read configuration from '{}': {}",
                path.display(),
                e
            ))
        })?;
        serde_json::from_str(&content).map_err(|e| {
            ClassifyError::config_error(format!(
                "Failed to parse configuration '{}': {}",
                path.display(),
                e
            ))
        })
    }

    /// Sets the model artifact path.
    pub fn with_model_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.model_path = path.into();
        self
    }

    /// Sets the input image path.
    pub fn with_image_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.image_path = path.into();
        self
    }

    /// Sets the label file path.
    pub fn with_labels_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.labels_path = path.into();
        self
    }

    /// Sets the number of ranked predictions.
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Sets the execution target.
    pub fn with_target(mut self, target: ExecutionTarget) -> Self {
        self.target = target;
        self
    }

    /// Sets the ONNX Runtime session options.
    pub fn with_session(mut self, session: OrtSessionConfig) -> Self {
        self.session = session;
        self
    }

    /// Sets the preprocessing options.
    pub fn with_preprocess(mut self, preprocess: PreprocessConfig) -> Self {
        self.preprocess = preprocess;
        self
    }

    /// Sets the evaluation correlation label.
    pub fn with_run_id(mut self, run_id: impl Into<String>) -> Self {
        self.run_id = run_id.into();
        self
    }

    /// Validates the configuration without touching the file system.
    pub fn validate(&self) -> ClassifyResult<()> {
        for (field, path) in [
            ("model_path", &self.model_path),
            ("image_path", &self.image_path),
            ("labels_path", &self.labels_path),
        ] {
            if path.as_os_str().is_empty() {
                return Err(ClassifyError::config_error(format!("{field} is required")));
            }
        }
        if self.top_n == 0 {
            return Err(ClassifyError::config_error_with_context(
                "top_n",
                "0",
                "must be at least 1",
            ));
        }
        self.session.validate()?;
        self.preprocess.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_new_uses_defaults() {
        let config = PipelineConfig::new("m.onnx", "i.png", "l.json");
        assert_eq!(config.top_n, 3);
        assert_eq!(config.target, ExecutionTarget::Default);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_paths_fail_validation() {
        let err = PipelineConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("model_path"));
    }

    #[test]
    fn test_zero_top_n_fails_validation() {
        let config = PipelineConfig::new("m.onnx", "i.png", "l.json").with_top_n(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_json_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{
                "model_path": "models/squeezenet.onnx",
                "image_path": "kitten.png",
                "labels_path": "labels.json",
                "top_n": 5,
                "target": "cuda:1",
                "session": {{ "intra_threads": 2 }},
                "preprocess": {{ "resize_filter": "Lanczos3", "channel_order": "Rgb" }}
            }}"#
        )
        .unwrap();

        let config = PipelineConfig::from_json_file(file.path()).unwrap();
        assert_eq!(config.top_n, 5);
        assert_eq!(config.target, ExecutionTarget::Cuda { device_id: 1 });
        assert_eq!(config.session.intra_threads, Some(2));
        assert_eq!(
            config.preprocess.channel_order,
            Some(crate::processors::ChannelOrder::Rgb)
        );
        assert_eq!(config.preprocess.default_input_size, (224, 224));
        assert_eq!(config.run_id, "RunId");
    }

    #[test]
    fn test_from_json_file_rejects_bad_target() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{ "target": "quantum" }}"#).unwrap();
        assert!(PipelineConfig::from_json_file(file.path()).is_err());
    }
}
