//! Error types for the classification pipeline.
//!
//! Every stage of the pipeline reports failures as a [`ClassifyError`]. The
//! variants follow the pipeline's failure taxonomy, [`ClassifyError::stage`]
//! names the stage that failed, and [`ClassifyError::report`] renders the
//! message together with its cause chain for the log sink.
//!
//! # Usage
//!
//! ```rust
//! use oar_classify::core::errors::{ClassifyError, PipelineStage};
//!
//! let error = ClassifyError::model_load_error(
//!     "models/squeezenet.onnx",
//!     "model file does not exist",
//!     Some(std::io::Error::new(std::io::ErrorKind::NotFound, "not found")),
//! );
//! assert_eq!(error.stage(), PipelineStage::ModelLoading);
//! ```

pub mod constructors;
pub mod types;

pub use types::{ClassifyError, OpaqueError, PipelineStage, SimpleError};

/// Convenient result alias for pipeline operations.
pub type ClassifyResult<T> = Result<T, ClassifyError>;
