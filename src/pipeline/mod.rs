//! The classification pipeline.
//!
//! [`ClassificationPipeline`] sequences model loading, color policy,
//! preprocessing, inference and ranking for one image, reporting progress to a
//! [`LogSink`] and returning a [`RunReport`].

mod orchestration;
mod result;
pub mod sink;

pub use orchestration::{ClassificationPipeline, RunContext, classify};
pub use result::RunReport;
pub use sink::{LogSink, StdoutSink, TracingSink};
