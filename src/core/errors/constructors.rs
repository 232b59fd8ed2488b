//! Constructor helpers for [`ClassifyError`].
//!
//! Call sites pick the taxonomy variant explicitly; there is no blanket
//! conversion from backend errors so every failure names its stage.
//!
//! ```rust
//! use oar_classify::core::errors::{ClassifyError, PipelineStage};
//!
//! let error = ClassifyError::binding_error("data", "expected rank 4, got rank 2");
//! assert_eq!(error.stage(), PipelineStage::Binding);
//! ```

use super::types::{ClassifyError, OpaqueError, SimpleError};
use std::path::Path;

impl ClassifyError {
    /// Creates a `ResourceNotFound` error for a missing file.
    pub fn resource_not_found(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::ResourceNotFound {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Creates a `MalformedLabels` error with an underlying parse error.
    pub fn malformed_labels(
        path: impl AsRef<Path>,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::MalformedLabels {
            path: path.as_ref().to_path_buf(),
            context: context.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a `MalformedLabels` error without an underlying cause.
    pub fn malformed_labels_msg(path: impl AsRef<Path>, context: impl Into<String>) -> Self {
        Self::MalformedLabels {
            path: path.as_ref().to_path_buf(),
            context: context.into(),
            source: None,
        }
    }

    /// Creates a `ModelLoad` error.
    ///
    /// # Arguments
    /// * `model_path` - Path to the model file
    /// * `context` - Short reason description
    /// * `source` - Optional underlying error
    pub fn model_load_error(
        model_path: impl AsRef<Path>,
        context: impl Into<String>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        Self::ModelLoad {
            path: model_path.as_ref().to_path_buf(),
            context: context.into(),
            source: source.map(|e| Box::new(e) as OpaqueError),
        }
    }

    /// Creates an `ImageDecode` error wrapping an I/O or codec failure.
    pub fn image_decode(
        path: impl AsRef<Path>,
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ImageDecode {
            path: path.as_ref().to_path_buf(),
            context: context.into(),
            source: Box::new(source),
        }
    }

    /// Creates a `ColorConversion` error.
    pub fn color_conversion(
        context: impl Into<String>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        Self::ColorConversion {
            context: context.into(),
            source: source.map(|e| Box::new(e) as OpaqueError),
        }
    }

    /// Creates a `ColorConversion` error from a message alone.
    pub fn color_conversion_msg(context: impl Into<String>) -> Self {
        Self::color_conversion(context, None::<SimpleError>)
    }

    /// Creates a `SessionInit` error for the given execution target.
    pub fn session_init(
        target: impl std::fmt::Display,
        context: impl Into<String>,
        source: Option<impl std::error::Error + Send + Sync + 'static>,
    ) -> Self {
        Self::SessionInit {
            target: target.to_string(),
            context: context.into(),
            source: source.map(|e| Box::new(e) as OpaqueError),
        }
    }

    /// Creates a `Binding` error for a declared input.
    pub fn binding_error(input_name: impl Into<String>, context: impl Into<String>) -> Self {
        Self::Binding {
            input_name: input_name.into(),
            context: context.into(),
        }
    }

    /// Creates an `Evaluation` error tagged with the run id.
    pub fn evaluation_error(
        run_id: impl Into<String>,
        context: impl Into<String>,
        source: Option<OpaqueError>,
    ) -> Self {
        Self::Evaluation {
            run_id: run_id.into(),
            context: context.into(),
            source,
        }
    }

    /// Creates an `IndexMismatch` error.
    pub fn index_mismatch(outputs: usize, labels: usize) -> Self {
        Self::IndexMismatch { outputs, labels }
    }

    /// Creates a configuration error.
    pub fn config_error(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a configuration error naming the offending field.
    ///
    /// # Arguments
    ///
    /// * `field` - The field where the error occurred.
    /// * `value` - The value of the field.
    /// * `reason` - The reason for the error.
    pub fn config_error_with_context(field: &str, value: &str, reason: &str) -> Self {
        Self::Config {
            message: format!(
                "Configuration error in field '{}' with value '{}': {}",
                field, value, reason
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::PipelineStage;

    #[test]
    fn test_stage_mapping() {
        let err = ClassifyError::index_mismatch(1000, 999);
        assert_eq!(err.stage(), PipelineStage::Ranking);
        assert_eq!(
            err.to_string(),
            "output vector has 1000 entries but the label table has 999"
        );

        let err = ClassifyError::color_conversion_msg("unsupported profile");
        assert_eq!(err.stage(), PipelineStage::ImageNormalization);
    }

    #[test]
    fn test_report_includes_cause_chain() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = ClassifyError::image_decode("cat.png", "failed to open image file", io);
        let report = err.report();
        assert!(report.starts_with("failed to decode image 'cat.png'"));
        assert!(report.ends_with(": no such file"));
    }

    #[test]
    fn test_exit_code_propagates_os_error() {
        let io = std::io::Error::from_raw_os_error(2);
        let err = ClassifyError::image_decode("missing.png", "failed to open image file", io);
        assert_eq!(err.exit_code(), 2);

        let err = ClassifyError::binding_error("data", "rank mismatch");
        assert_eq!(err.exit_code(), 1);
    }

    #[test]
    fn test_config_error_with_context() {
        let err = ClassifyError::config_error_with_context("top_n", "0", "must be at least 1");
        assert_eq!(err.stage(), PipelineStage::Configuration);
        assert!(err.to_string().contains("top_n"));
    }
}
