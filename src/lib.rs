//! # OAR Classify
//!
//! Single-image classification with ONNX models. A run inspects the model's
//! metadata, decides whether to color-manage the input to sRGB, decodes and
//! packs the image into the model's input tensor, evaluates the model once and
//! ranks the output against a label table.
//!
//! ## Modules
//!
//! * [`core`] - Configuration, errors, model loading and inference sessions
//! * [`processors`] - Image decoding, color policy, normalization and ranking
//! * [`pipeline`] - The classification pipeline and its log sinks
//! * [`utils`] - Label tables, blocking I/O and tracing setup
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use oar_classify::prelude::*;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = PipelineConfig::new(
//!     "models/squeezenet1.1-7.onnx",
//!     "images/kitten.png",
//!     "models/labels.json",
//! )
//! .with_target("cpu".parse()?);
//!
//! let pipeline = ClassificationPipeline::new(config)?;
//! let report = pipeline.run(&mut StdoutSink)?;
//! if let Some(top) = report.top() {
//!     println!("best match: {} ({})", top.label, top.probability);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ### JSON Configuration
//!
//! ```rust,no_run
//! use oar_classify::prelude::*;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // {
//! //   "model_path": "models/squeezenet1.1-7.onnx",
//! //   "image_path": "images/kitten.png",
//! //   "labels_path": "models/labels.json",
//! //   "top_n": 5,
//! //   "target": "cuda:0",
//! //   "session": { "intra_threads": 4 },
//! //   "preprocess": { "resize_filter": "Lanczos3" }
//! // }
//! let config = PipelineConfig::from_json_file(Path::new("classify.json"))?;
//! let predictions = classify(config, &mut TracingSink)?;
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod pipeline;
pub mod processors;
pub mod utils;

/// Prelude module for convenient imports.
///
/// ```rust
/// use oar_classify::prelude::*;
/// ```
pub mod prelude {
    pub use crate::core::{
        ClassifyError, ClassifyResult, ExecutionTarget, ModelHandle, OrtSessionConfig,
        PipelineConfig, PipelineStage, PreprocessConfig,
    };
    pub use crate::pipeline::{
        ClassificationPipeline, LogSink, RunReport, StdoutSink, TracingSink, classify,
    };
    pub use crate::processors::{ColorManagementPolicy, RankedResult};
    pub use crate::utils::LabelTable;
}
