//! Outcome of a classification run.

use crate::processors::{ColorPolicyDecision, RankedResult};
use std::fmt;
use std::time::Duration;

/// Predictions and timings of one successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Correlation label the run was evaluated under.
    pub run_id: String,
    /// Ranked predictions, best first.
    pub predictions: Vec<RankedResult>,
    /// Wall-clock time spent loading the model.
    pub model_load: Duration,
    /// Wall-clock time spent in the forward pass.
    pub evaluate: Duration,
    /// Color policy the image was normalized under.
    pub color_policy: ColorPolicyDecision,
}

impl RunReport {
    /// The best prediction, if any were requested.
    pub fn top(&self) -> Option<&RankedResult> {
        self.predictions.first()
    }
}

impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Run '{}':", self.run_id)?;
        writeln!(f, "  Model load: {:.2?}", self.model_load)?;
        writeln!(f, "  Evaluate: {:.2?}", self.evaluate)?;
        writeln!(f, "  Color policy: {}", self.color_policy.policy)?;
        for (rank, prediction) in self.predictions.iter().enumerate() {
            writeln!(f, "  {}. [{}] {}", rank + 1, prediction.class_index, prediction)?;
        }
        Ok(())
    }
}
