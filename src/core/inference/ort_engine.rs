//! ONNX Runtime implementation of the inference seams.

use super::engine::{Executor, InferenceEngine};
use super::model::{ElementType, FeatureDescriptor, FeatureKind, ModelHandle, ModelMetadata};
use crate::core::config::{ExecutionTarget, OrtGraphOptimizationLevel, OrtSessionConfig};
use crate::core::errors::{ClassifyError, ClassifyResult, OpaqueError, SimpleError};
use crate::core::tensor::TensorD;
use crate::utils::blocking;
use ort::execution_providers::ExecutionProviderDispatch;
use ort::logging::LogLevel;
use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::{RunOptions, Session, SessionInputValue};
use ort::tensor::TensorElementType;
use ort::value::{TensorRef, ValueType};
use std::borrow::Cow;
use std::path::Path;
use tracing::{debug, warn};

/// Loads ONNX models and creates ONNX Runtime sessions.
#[derive(Debug, Clone, Default)]
pub struct OrtEngine {
    session_config: OrtSessionConfig,
}

impl OrtEngine {
    pub fn new(session_config: OrtSessionConfig) -> Self {
        Self { session_config }
    }

    pub fn session_config(&self) -> &OrtSessionConfig {
        &self.session_config
    }

    fn apply_ort_config(&self, mut builder: SessionBuilder) -> Result<SessionBuilder, ort::Error> {
        let cfg = &self.session_config;
        builder = builder.with_log_level(LogLevel::Error)?;
        if let Some(intra) = cfg.intra_threads {
            builder = builder.with_intra_threads(intra)?;
        }
        if let Some(inter) = cfg.inter_threads {
            builder = builder.with_inter_threads(inter)?;
        }
        if let Some(par) = cfg.parallel_execution {
            builder = builder.with_parallel_execution(par)?;
        }
        if let Some(enable) = cfg.enable_mem_pattern {
            builder = builder.with_memory_pattern(enable)?;
        }
        let mapped = match cfg.get_optimization_level() {
            OrtGraphOptimizationLevel::DisableAll => GraphOptimizationLevel::Disable,
            OrtGraphOptimizationLevel::Level1 => GraphOptimizationLevel::Level1,
            OrtGraphOptimizationLevel::Level2 => GraphOptimizationLevel::Level2,
            OrtGraphOptimizationLevel::Level3 => GraphOptimizationLevel::Level3,
        };
        builder.with_optimization_level(mapped)
    }

    /// Builds the execution provider list for a target.
    ///
    /// `Default` registers every compiled-in accelerator in preference order
    /// and lets ONNX Runtime fall back to the CPU when none of them can be
    /// used. Explicit targets are registered with `error_on_failure` so an
    /// unavailable device fails the session instead of silently running on
    /// the CPU.
    fn build_execution_providers(
        target: &ExecutionTarget,
    ) -> Result<Vec<ExecutionProviderDispatch>, ort::Error> {
        let mut providers = Vec::new();
        match target {
            ExecutionTarget::Default => {
                #[cfg(feature = "cuda")]
                providers.push(ort::execution_providers::CUDAExecutionProvider::default().build());
                #[cfg(feature = "directml")]
                providers
                    .push(ort::execution_providers::DirectMLExecutionProvider::default().build());
                #[cfg(feature = "coreml")]
                providers.push(ort::execution_providers::CoreMLExecutionProvider::default().build());
            }
            ExecutionTarget::Cpu => {
                providers.push(
                    ort::execution_providers::CPUExecutionProvider::default()
                        .build()
                        .error_on_failure(),
                );
            }
            #[cfg(feature = "cuda")]
            ExecutionTarget::Cuda { device_id } => {
                providers.push(
                    ort::execution_providers::CUDAExecutionProvider::default()
                        .with_device_id(*device_id)
                        .build()
                        .error_on_failure(),
                );
            }
            #[cfg(feature = "directml")]
            ExecutionTarget::DirectML { device_id } => {
                providers.push(
                    ort::execution_providers::DirectMLExecutionProvider::default()
                        .with_device_id(*device_id)
                        .build()
                        .error_on_failure(),
                );
            }
            #[cfg(feature = "coreml")]
            ExecutionTarget::CoreML => {
                providers.push(
                    ort::execution_providers::CoreMLExecutionProvider::default()
                        .build()
                        .error_on_failure(),
                );
            }
            #[cfg(not(feature = "cuda"))]
            ExecutionTarget::Cuda { .. } => {
                return Err(ort::Error::new(
                    "CUDA execution provider requested but cuda feature is not enabled",
                ));
            }
            #[cfg(not(feature = "directml"))]
            ExecutionTarget::DirectML { .. } => {
                return Err(ort::Error::new(
                    "DirectML execution provider requested but directml feature is not enabled",
                ));
            }
            #[cfg(not(feature = "coreml"))]
            ExecutionTarget::CoreML => {
                return Err(ort::Error::new(
                    "CoreML execution provider requested but coreml feature is not enabled",
                ));
            }
        }
        Ok(providers)
    }
}

impl InferenceEngine for OrtEngine {
    type Executor = OrtExecutor;

    fn name(&self) -> &str {
        "onnxruntime"
    }

    fn load_model(&self, path: &Path) -> ClassifyResult<ModelHandle> {
        let bytes = blocking::read_file_blocking(path).map_err(|e| {
            ClassifyError::model_load_error(path, "failed to read model file", Some(e))
        })?;

        // Introspection only; execution sessions are built per target later.
        let session = Session::builder()
            .and_then(|b| b.with_log_level(LogLevel::Error))
            .and_then(|b| b.with_optimization_level(GraphOptimizationLevel::Disable))
            .and_then(|b| b.commit_from_memory(&bytes))
            .map_err(|e| {
                ClassifyError::model_load_error(path, "failed to parse ONNX model", Some(e))
            })?;

        let inputs: Vec<FeatureDescriptor> = session
            .inputs
            .iter()
            .map(|input| describe(&input.name, &input.input_type))
            .collect();
        let outputs: Vec<FeatureDescriptor> = session
            .outputs
            .iter()
            .map(|output| describe(&output.name, &output.output_type))
            .collect();
        if inputs.is_empty() || outputs.is_empty() {
            return Err(ClassifyError::model_load_error(
                path,
                format!(
                    "model declares {} inputs and {} outputs; at least one of each is required",
                    inputs.len(),
                    outputs.len()
                ),
                None::<SimpleError>,
            ));
        }

        let metadata = read_metadata(&session).map_err(|e| {
            ClassifyError::model_load_error(path, "failed to read model metadata", Some(e))
        })?;

        debug!(
            "Loaded model '{}' ({} bytes): inputs [{}], outputs [{}], {} metadata entries",
            path.display(),
            bytes.len(),
            join(&inputs),
            join(&outputs),
            metadata.len()
        );

        Ok(ModelHandle::from_parts(path, bytes, inputs, outputs, metadata))
    }

    fn create_executor(
        &self,
        model: &ModelHandle,
        target: &ExecutionTarget,
    ) -> ClassifyResult<OrtExecutor> {
        let to_session_error = |context: &str, e: ort::Error| {
            ClassifyError::session_init(target, context.to_string(), Some(e))
        };

        let builder = Session::builder()
            .and_then(|b| self.apply_ort_config(b))
            .map_err(|e| to_session_error("invalid session options", e))?;
        let providers = Self::build_execution_providers(target)
            .map_err(|e| to_session_error("execution provider not available", e))?;
        let builder = if providers.is_empty() {
            builder
        } else {
            builder
                .with_execution_providers(providers)
                .map_err(|e| to_session_error("failed to register execution provider", e))?
        };
        let session = builder
            .commit_from_memory(model.bytes())
            .map_err(|e| to_session_error("failed to create ONNX session", e))?;

        let output_names = session.outputs.iter().map(|o| o.name.clone()).collect();
        Ok(OrtExecutor {
            session,
            output_names,
        })
    }
}

/// A committed ONNX Runtime session.
pub struct OrtExecutor {
    session: Session,
    output_names: Vec<String>,
}

impl std::fmt::Debug for OrtExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrtExecutor")
            .field("output_names", &self.output_names)
            .finish()
    }
}

impl Executor for OrtExecutor {
    fn run(
        &mut self,
        inputs: &[(String, TensorD)],
        run_id: &str,
    ) -> Result<Vec<(String, TensorD)>, OpaqueError> {
        let mut session_inputs: Vec<(Cow<'_, str>, SessionInputValue<'_>)> =
            Vec::with_capacity(inputs.len());
        for (name, tensor) in inputs {
            let value = TensorRef::from_array_view(tensor.view())?;
            session_inputs.push((Cow::Borrowed(name.as_str()), value.into()));
        }

        let mut options = RunOptions::new()?;
        options.set_tag(run_id)?;
        let outputs = self.session.run_with_options(session_inputs, &options)?;

        let mut results = Vec::with_capacity(self.output_names.len());
        for name in &self.output_names {
            let (shape, data) = outputs[name.as_str()].try_extract_tensor::<f32>()?;
            let dims: Vec<usize> = shape.iter().map(|&d| d.max(0) as usize).collect();
            let tensor = TensorD::from_shape_vec(dims, data.to_vec())?;
            results.push((name.clone(), tensor));
        }
        Ok(results)
    }
}

fn describe(name: &str, value_type: &ValueType) -> FeatureDescriptor {
    let kind = match value_type {
        ValueType::Tensor { ty, shape, .. } => FeatureKind::Tensor {
            element_type: element_type(*ty),
            shape: shape.iter().copied().collect(),
        },
        other => FeatureKind::Other(format!("{other:?}")),
    };
    FeatureDescriptor {
        name: name.to_string(),
        kind,
    }
}

fn element_type(ty: TensorElementType) -> ElementType {
    match ty {
        TensorElementType::Float32 => ElementType::Float32,
        TensorElementType::Float16 => ElementType::Float16,
        TensorElementType::Float64 => ElementType::Float64,
        TensorElementType::Int8 => ElementType::Int8,
        TensorElementType::Int32 => ElementType::Int32,
        TensorElementType::Int64 => ElementType::Int64,
        TensorElementType::Uint8 => ElementType::Uint8,
        TensorElementType::Bool => ElementType::Bool,
        other => ElementType::Other(format!("{other:?}")),
    }
}

fn read_metadata(session: &Session) -> Result<ModelMetadata, ort::Error> {
    let meta = session.metadata()?;
    let mut entries = Vec::new();
    for key in meta.custom_keys()? {
        match meta.custom(&key)? {
            Some(value) => entries.push((key, value)),
            None => warn!("Metadata key '{}' listed without a value", key),
        }
    }
    let non_empty = |value: String| Some(value).filter(|v| !v.is_empty());
    let mut metadata = ModelMetadata::from_entries(entries);
    metadata.name = meta.name().ok().and_then(non_empty);
    metadata.producer = meta.producer().ok().and_then(non_empty);
    metadata.description = meta.description().ok().and_then(non_empty);
    metadata.domain = meta.domain().ok().and_then(non_empty);
    metadata.version = meta.version().ok();
    Ok(metadata)
}

fn join(features: &[FeatureDescriptor]) -> String {
    features
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_missing_model_is_model_load_error() {
        let err = OrtEngine::default()
            .load_model(Path::new("/nonexistent/squeezenet.onnx"))
            .unwrap_err();
        assert!(matches!(err, ClassifyError::ModelLoad { .. }));
        assert!(err.report().contains("failed to read model file"));
    }

    #[test]
    fn test_garbage_model_is_model_load_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"definitely not protobuf").unwrap();
        let err = OrtEngine::default().load_model(file.path()).unwrap_err();
        assert!(matches!(err, ClassifyError::ModelLoad { .. }));
    }

    #[test]
    fn test_explicit_providers_fail_instead_of_falling_back() {
        #[cfg(not(any(feature = "cuda", feature = "directml", feature = "coreml")))]
        assert!(
            OrtEngine::build_execution_providers(&ExecutionTarget::Default)
                .unwrap()
                .is_empty()
        );
        assert_eq!(
            OrtEngine::build_execution_providers(&ExecutionTarget::Cpu)
                .unwrap()
                .len(),
            1
        );
        #[cfg(not(feature = "cuda"))]
        assert!(
            OrtEngine::build_execution_providers(&ExecutionTarget::Cuda { device_id: 0 }).is_err()
        );
    }
}
