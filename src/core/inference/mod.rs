//! Model loading, execution targets and inference sessions.
//!
//! The [`engine`] traits separate the pipeline from ONNX Runtime; the
//! production implementation is [`OrtEngine`].

pub mod engine;
pub mod model;
pub mod ort_engine;
pub mod session;

pub use engine::{Executor, InferenceEngine};
pub use model::{ElementType, FeatureDescriptor, FeatureKind, ModelHandle, ModelMetadata};
pub use ort_engine::{OrtEngine, OrtExecutor};
pub use session::{Binding, InferenceSession, Outputs, SessionState};
