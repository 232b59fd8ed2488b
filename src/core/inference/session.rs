//! Inference sessions: input binding and evaluation.

use super::engine::{Executor, InferenceEngine};
use super::model::{ElementType, FeatureDescriptor, FeatureKind, ModelHandle};
use crate::core::config::ExecutionTarget;
use crate::core::errors::{ClassifyError, ClassifyResult};
use crate::core::tensor::TensorD;
use ndarray::{Array, Dimension};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of an [`InferenceSession`].
///
/// `Uninitialized` is never observed on a constructed session; creation either
/// yields a `Ready` session or fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Ready,
    Bound,
    Evaluated,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionState::Uninitialized => write!(f, "uninitialized"),
            SessionState::Ready => write!(f, "ready"),
            SessionState::Bound => write!(f, "bound"),
            SessionState::Evaluated => write!(f, "evaluated"),
        }
    }
}

/// Input tensors associated with declared input names of one session.
#[derive(Debug, Clone)]
pub struct Binding {
    session_id: u64,
    inputs: Vec<(String, TensorD)>,
}

impl Binding {
    /// Bound input names in bind order.
    pub fn input_names(&self) -> impl Iterator<Item = &str> {
        self.inputs.iter().map(|(name, _)| name.as_str())
    }

    /// Bound tensor for an input name.
    pub fn get(&self, name: &str) -> Option<&TensorD> {
        self.inputs
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, tensor)| tensor)
    }
}

/// Named output tensors of one evaluation, in model declaration order.
#[derive(Debug, Clone)]
pub struct Outputs {
    tensors: Vec<(String, TensorD)>,
}

impl Outputs {
    pub fn get(&self, name: &str) -> Option<&TensorD> {
        self.tensors
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, tensor)| tensor)
    }

    /// Removes and returns the tensor for `name`.
    pub fn take(&mut self, name: &str) -> Option<TensorD> {
        let index = self.tensors.iter().position(|(n, _)| n == name)?;
        Some(self.tensors.remove(index).1)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tensors.iter().map(|(name, _)| name.as_str())
    }

    pub fn len(&self) -> usize {
        self.tensors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tensors.is_empty()
    }
}

/// A model prepared for execution on one target.
///
/// Evaluation takes `&mut self`, so one session never runs two forward passes
/// at the same time. Sharing a session across threads needs external
/// serialization.
pub struct InferenceSession<X: Executor> {
    id: u64,
    executor: X,
    model_name: String,
    inputs: Vec<FeatureDescriptor>,
    outputs: Vec<FeatureDescriptor>,
    target: ExecutionTarget,
    state: SessionState,
}

impl<X: Executor> std::fmt::Debug for InferenceSession<X> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferenceSession")
            .field("id", &self.id)
            .field("model_name", &self.model_name)
            .field("target", &self.target)
            .field("state", &self.state)
            .finish()
    }
}

impl<X: Executor> InferenceSession<X> {
    /// Prepares `model` for execution on `target`.
    ///
    /// Fails with `SessionInit` if the engine cannot use the target.
    pub fn create<E>(engine: &E, model: &ModelHandle, target: &ExecutionTarget) -> ClassifyResult<Self>
    where
        E: InferenceEngine<Executor = X>,
    {
        let executor = engine.create_executor(model, target)?;
        let id = NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed);
        debug!(
            "Created session {} for '{}' on '{}' ({})",
            id,
            model.display_name(),
            target,
            engine.name()
        );
        Ok(Self {
            id,
            executor,
            model_name: model.display_name(),
            inputs: model.input_features().to_vec(),
            outputs: model.output_features().to_vec(),
            target: target.clone(),
            state: SessionState::Ready,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn target(&self) -> &ExecutionTarget {
        &self.target
    }

    /// Binds a tensor to a declared input.
    ///
    /// Fails with `Binding` if `input_name` is not a declared input, the
    /// declared element type is not `f32`, or the tensor's rank or any static
    /// dimension differs from the declaration.
    pub fn bind<D: Dimension>(
        &mut self,
        input_name: &str,
        tensor: Array<f32, D>,
    ) -> ClassifyResult<Binding> {
        let descriptor = self
            .inputs
            .iter()
            .find(|d| d.name == input_name)
            .ok_or_else(|| {
                let declared: Vec<&str> = self.inputs.iter().map(|d| d.name.as_str()).collect();
                ClassifyError::binding_error(
                    input_name,
                    format!("not a declared input of '{}' (declared: {:?})", self.model_name, declared),
                )
            })?;
        check_tensor_contract(descriptor, tensor.shape())?;

        self.state = SessionState::Bound;
        Ok(Binding {
            session_id: self.id,
            inputs: vec![(input_name.to_string(), tensor.into_dyn())],
        })
    }

    /// Runs one blocking forward pass over `binding`.
    ///
    /// `run_id` is an opaque correlation label for diagnostics.
    pub fn evaluate(&mut self, binding: &Binding, run_id: &str) -> ClassifyResult<Outputs> {
        let first_input = binding.input_names().next().unwrap_or_default().to_string();
        if binding.session_id != self.id {
            return Err(ClassifyError::binding_error(
                first_input,
                "binding was created by a different session",
            ));
        }
        if !matches!(self.state, SessionState::Bound | SessionState::Evaluated) {
            return Err(ClassifyError::binding_error(
                first_input,
                format!("cannot evaluate a session in state '{}'", self.state),
            ));
        }

        debug!("Evaluating '{}' run '{}'", self.model_name, run_id);
        let tensors = self.executor.run(&binding.inputs, run_id).map_err(|e| {
            ClassifyError::evaluation_error(
                run_id,
                format!("forward pass of '{}' on '{}' failed", self.model_name, self.target),
                Some(e),
            )
        })?;
        if tensors.is_empty() {
            return Err(ClassifyError::evaluation_error(
                run_id,
                format!("model '{}' produced no outputs", self.model_name),
                None,
            ));
        }

        self.state = SessionState::Evaluated;
        Ok(Outputs { tensors })
    }

    /// Declared outputs of the session's model.
    pub fn output_features(&self) -> &[FeatureDescriptor] {
        &self.outputs
    }
}

fn check_tensor_contract(descriptor: &FeatureDescriptor, actual: &[usize]) -> ClassifyResult<()> {
    let (element_type, declared) = match &descriptor.kind {
        FeatureKind::Tensor {
            element_type,
            shape,
        } => (element_type, shape),
        FeatureKind::Other(kind) => {
            return Err(ClassifyError::binding_error(
                &descriptor.name,
                format!("input is declared as {kind}, not a tensor"),
            ));
        }
    };

    if *element_type != ElementType::Float32 {
        return Err(ClassifyError::binding_error(
            &descriptor.name,
            format!("input expects {element_type:?} elements but the tensor is Float32"),
        ));
    }
    if declared.len() != actual.len() {
        return Err(ClassifyError::binding_error(
            &descriptor.name,
            format!(
                "expected rank {} {:?}, got rank {} {:?}",
                declared.len(),
                declared,
                actual.len(),
                actual
            ),
        ));
    }
    for (axis, (&want, &got)) in declared.iter().zip(actual).enumerate() {
        if want > 0 && want as usize != got {
            return Err(ClassifyError::binding_error(
                &descriptor.name,
                format!(
                    "dimension {axis} must be {want}, got {got} (declared {declared:?}, actual {actual:?})"
                ),
            ));
        }
    }
    Ok(())
}
