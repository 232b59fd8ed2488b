//! Error types for the classification pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed error used as the `source` of pipeline errors.
pub type OpaqueError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Stage of the classification pipeline an error originated in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// Configuration validation before any I/O happens.
    Configuration,
    /// Reading the label dictionary.
    LabelLoading,
    /// Loading and introspecting the model artifact.
    ModelLoading,
    /// Decoding the input image file.
    ImageDecoding,
    /// Color management, orientation and tensor packing.
    ImageNormalization,
    /// Creating the inference session on the execution target.
    SessionCreation,
    /// Binding an input tensor to the session.
    Binding,
    /// Running the forward pass.
    Evaluation,
    /// Ranking the output vector against the label table.
    Ranking,
}

impl std::fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PipelineStage::Configuration => write!(f, "configuration"),
            PipelineStage::LabelLoading => write!(f, "label loading"),
            PipelineStage::ModelLoading => write!(f, "model loading"),
            PipelineStage::ImageDecoding => write!(f, "image decoding"),
            PipelineStage::ImageNormalization => write!(f, "image normalization"),
            PipelineStage::SessionCreation => write!(f, "session creation"),
            PipelineStage::Binding => write!(f, "binding"),
            PipelineStage::Evaluation => write!(f, "evaluation"),
            PipelineStage::Ranking => write!(f, "ranking"),
        }
    }
}

/// Errors raised by the classification pipeline.
///
/// Every stage fails fast: nothing is retried and no partial result is
/// produced once one of these has been returned.
#[derive(Error, Debug)]
pub enum ClassifyError {
    /// A required resource file does not exist.
    #[error("resource not found: '{}'", path.display())]
    ResourceNotFound {
        /// Path that was looked up.
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The label source could not be parsed as an ordered key to label mapping.
    #[error("malformed labels in '{}': {context}", path.display())]
    MalformedLabels {
        path: PathBuf,
        context: String,
        #[source]
        source: Option<OpaqueError>,
    },

    /// The model artifact is missing or could not be parsed.
    #[error("failed to load model '{}': {context}", path.display())]
    ModelLoad {
        path: PathBuf,
        context: String,
        #[source]
        source: Option<OpaqueError>,
    },

    /// The image file could not be opened or decoded.
    #[error("failed to decode image '{}': {context}", path.display())]
    ImageDecode {
        path: PathBuf,
        context: String,
        #[source]
        source: OpaqueError,
    },

    /// Pixels could not be produced under the requested color transform.
    #[error("color conversion failed: {context}")]
    ColorConversion {
        context: String,
        #[source]
        source: Option<OpaqueError>,
    },

    /// The execution target is unavailable or the session could not be built.
    #[error("failed to create session on '{target}': {context}")]
    SessionInit {
        target: String,
        context: String,
        #[source]
        source: Option<OpaqueError>,
    },

    /// A tensor does not satisfy the declared input contract.
    #[error("binding input '{input_name}' failed: {context}")]
    Binding { input_name: String, context: String },

    /// The forward pass failed.
    #[error("evaluation '{run_id}' failed: {context}")]
    Evaluation {
        run_id: String,
        context: String,
        #[source]
        source: Option<OpaqueError>,
    },

    /// The output vector and the label table disagree in length.
    #[error("output vector has {outputs} entries but the label table has {labels}")]
    IndexMismatch { outputs: usize, labels: usize },

    /// Invalid pipeline configuration.
    #[error("configuration: {message}")]
    Config { message: String },
}

impl ClassifyError {
    /// Returns the pipeline stage this error belongs to.
    pub fn stage(&self) -> PipelineStage {
        match self {
            ClassifyError::ResourceNotFound { .. } | ClassifyError::MalformedLabels { .. } => {
                PipelineStage::LabelLoading
            }
            ClassifyError::ModelLoad { .. } => PipelineStage::ModelLoading,
            ClassifyError::ImageDecode { .. } => PipelineStage::ImageDecoding,
            ClassifyError::ColorConversion { .. } => PipelineStage::ImageNormalization,
            ClassifyError::SessionInit { .. } => PipelineStage::SessionCreation,
            ClassifyError::Binding { .. } => PipelineStage::Binding,
            ClassifyError::Evaluation { .. } => PipelineStage::Evaluation,
            ClassifyError::IndexMismatch { .. } => PipelineStage::Ranking,
            ClassifyError::Config { .. } => PipelineStage::Configuration,
        }
    }

    /// Iterates over the underlying causes, outermost first, excluding `self`.
    pub fn causes(&self) -> impl Iterator<Item = &(dyn std::error::Error + 'static)> {
        std::iter::successors(std::error::Error::source(self), |e| e.source())
    }

    /// Formats the error followed by its cause chain on a single line.
    pub fn report(&self) -> String {
        let mut line = self.to_string();
        for cause in self.causes() {
            line.push_str(": ");
            line.push_str(&cause.to_string());
        }
        line
    }

    /// Process exit status for this error.
    ///
    /// Uses the raw OS error code of the first I/O error in the cause chain when
    /// there is one, otherwise 1.
    pub fn exit_code(&self) -> i32 {
        self.causes()
            .filter_map(|e| e.downcast_ref::<std::io::Error>())
            .find_map(|io| io.raw_os_error())
            .filter(|code| *code != 0)
            .unwrap_or(1)
    }
}

/// A plain message error used as a source when no richer cause exists.
#[derive(Debug, Clone)]
pub struct SimpleError {
    message: String,
}

impl SimpleError {
    /// Creates a new error with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl std::fmt::Display for SimpleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for SimpleError {}
