//! Backend seams for model loading and execution.
//!
//! [`InferenceEngine`] loads model artifacts and prepares executors for an
//! execution target; [`Executor`] runs one forward pass. The ONNX Runtime
//! implementation lives in [`super::ort_engine`].

use super::model::ModelHandle;
use crate::core::config::ExecutionTarget;
use crate::core::errors::{ClassifyResult, OpaqueError};
use crate::core::tensor::TensorD;
use std::path::Path;

/// Runs forward passes for one prepared model.
pub trait Executor {
    /// Executes the model on named input tensors and returns the named outputs
    /// in declaration order.
    ///
    /// `run_id` only tags diagnostics.
    fn run(
        &mut self,
        inputs: &[(String, TensorD)],
        run_id: &str,
    ) -> Result<Vec<(String, TensorD)>, OpaqueError>;
}

/// Loads models and prepares executors on a compute target.
pub trait InferenceEngine {
    /// Executor type produced by this engine.
    type Executor: Executor;

    /// Short engine name for logs.
    fn name(&self) -> &str;

    /// Loads and introspects a model artifact.
    ///
    /// Fails with `ModelLoad` if the artifact is missing or malformed.
    fn load_model(&self, path: &Path) -> ClassifyResult<ModelHandle>;

    /// Prepares the model for execution on `target`.
    ///
    /// Fails with `SessionInit` if the target is unavailable.
    fn create_executor(
        &self,
        model: &ModelHandle,
        target: &ExecutionTarget,
    ) -> ClassifyResult<Self::Executor>;
}
