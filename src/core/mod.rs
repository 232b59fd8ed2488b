//! Core building blocks of the classification pipeline.
//!
//! This module contains:
//! - Configuration types
//! - Error handling
//! - Model loading, inference engines and sessions
//! - Tensor type aliases

pub mod config;
pub mod errors;
pub mod inference;
pub mod tensor;

pub use config::{ExecutionTarget, OrtSessionConfig, PipelineConfig, PreprocessConfig};
pub use errors::{ClassifyError, ClassifyResult, PipelineStage};
pub use inference::{InferenceEngine, InferenceSession, ModelHandle, OrtEngine};
pub use tensor::{Tensor4D, TensorD};
