//! Configuration for the classification pipeline.
//!
//! All configuration types are serde-serializable so a whole run can be
//! described in one JSON file, and each offers `with_*` builder methods.

pub mod onnx;
pub mod pipeline;
pub mod preprocess;

pub use onnx::*;
pub use pipeline::{DEFAULT_TOP_N, PipelineConfig};
pub use preprocess::PreprocessConfig;
