//! The classification pipeline.
//!
//! One run walks the stages in a fixed order: load model, load labels, derive
//! the color policy, decode and normalize the image, create the session, bind
//! input 0, evaluate, rank output 0. The first failing stage ends the run;
//! its error is logged to the sink and returned.

use super::result::RunReport;
use super::sink::LogSink;
use crate::core::config::PipelineConfig;
use crate::core::errors::{ClassifyError, ClassifyResult, SimpleError};
use crate::core::inference::{
    FeatureDescriptor, InferenceEngine, InferenceSession, ModelHandle, OrtEngine,
};
use crate::processors::{ColorPolicyDecision, RankedResult, TensorLayout, decode, normalize, rank};
use crate::utils::LabelTable;
use std::time::{Duration, Instant};
use tracing::{debug, error, info};

/// Per-run state threaded through the stages.
pub struct RunContext<'a> {
    run_id: String,
    sink: &'a mut dyn LogSink,
    model_load: Duration,
    evaluate: Duration,
}

impl<'a> RunContext<'a> {
    pub fn new(run_id: impl Into<String>, sink: &'a mut dyn LogSink) -> Self {
        Self {
            run_id: run_id.into(),
            sink,
            model_load: Duration::ZERO,
            evaluate: Duration::ZERO,
        }
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Sends one line to the sink.
    pub fn log(&mut self, line: impl AsRef<str>) {
        self.sink.log(line.as_ref());
    }
}

fn timed<T>(op: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let value = op();
    (value, start.elapsed())
}

/// Single-image classifier over an [`InferenceEngine`].
///
/// # Example
///
/// ```rust,no_run
/// use oar_classify::prelude::*;
///
/// let config = PipelineConfig::new("squeezenet.onnx", "kitten.png", "labels.json");
/// let pipeline = ClassificationPipeline::new(config)?;
/// let report = pipeline.run(&mut StdoutSink)?;
/// println!("{}", report);
/// # Ok::<(), ClassifyError>(())
/// ```
pub struct ClassificationPipeline<E: InferenceEngine = OrtEngine> {
    config: PipelineConfig,
    engine: E,
}

impl ClassificationPipeline<OrtEngine> {
    /// Creates a pipeline backed by ONNX Runtime.
    pub fn new(config: PipelineConfig) -> ClassifyResult<Self> {
        let engine = OrtEngine::new(config.session.clone());
        Self::with_engine(config, engine)
    }
}

impl<E: InferenceEngine> ClassificationPipeline<E> {
    /// Creates a pipeline on a custom engine. Fails with `Config` when the
    /// configuration does not validate.
    pub fn with_engine(config: PipelineConfig, engine: E) -> ClassifyResult<Self> {
        config.validate()?;
        Ok(Self { config, engine })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Runs the pipeline once, logging progress and results to `sink`.
    ///
    /// On failure the last line sent to the sink names the failing stage and
    /// its cause chain.
    pub fn run<S: LogSink>(&self, sink: &mut S) -> ClassifyResult<RunReport> {
        let mut ctx = RunContext::new(self.config.run_id.clone(), sink);
        match self.run_stages(&mut ctx) {
            Ok(report) => Ok(report),
            Err(err) => {
                error!(
                    "Run '{}' failed in {}: {}",
                    ctx.run_id(),
                    err.stage(),
                    err.report()
                );
                ctx.log(format!("{} failed: {}", err.stage(), err.report()));
                Err(err)
            }
        }
    }

    fn run_stages(&self, ctx: &mut RunContext<'_>) -> ClassifyResult<RunReport> {
        let config = &self.config;

        ctx.log(format!(
            "Loading modelfile '{}' on the '{}' device",
            config.model_path.display(),
            config.target
        ));
        let (model, elapsed) = timed(|| self.engine.load_model(&config.model_path));
        let model = model?;
        ctx.model_load = elapsed;
        ctx.log(format!("model file loaded in {} ms", elapsed.as_millis()));
        info!("Loaded model '{}' in {:.2?}", model.display_name(), elapsed);

        let labels = LabelTable::load(&config.labels_path)?;

        ctx.log("Getting color management mode...");
        let color_policy = ColorPolicyDecision::from_metadata(model.metadata());
        if let Some(line) = color_policy.log_line() {
            ctx.log(line);
        }
        debug!("Color policy: {:?}", color_policy);

        ctx.log("Loading the image...");
        let input = primary_input(&model)?;
        let layout = TensorLayout::resolve(&input, model.metadata(), &config.preprocess)?;
        let raw = decode(&config.image_path)?;
        let tensor = normalize(raw, color_policy.policy, &layout, &config.preprocess)?;

        let mut session = InferenceSession::create(&self.engine, &model, &config.target)?;

        ctx.log("Binding...");
        let binding = session.bind(&input.name, tensor)?;

        ctx.log("Running the model...");
        let run_id = ctx.run_id().to_string();
        let (outputs, elapsed) = timed(|| session.evaluate(&binding, &run_id));
        let outputs = outputs?;
        ctx.evaluate = elapsed;
        ctx.log(format!("model run took {} ms", elapsed.as_millis()));
        info!("Evaluated run '{}' in {:.2?}", run_id, elapsed);

        let output_name = &model.output_features()[0].name;
        let scores = outputs.get(output_name).ok_or_else(|| {
            ClassifyError::evaluation_error(
                &run_id,
                format!("output '{output_name}' missing from evaluation results"),
                None,
            )
        })?;
        let scores: Vec<f32> = scores.iter().copied().collect();

        let predictions = rank(&scores, &labels, config.top_n)?;
        for prediction in &predictions {
            ctx.log(prediction.to_string());
        }

        Ok(RunReport {
            run_id,
            predictions,
            model_load: ctx.model_load,
            evaluate: ctx.evaluate,
            color_policy,
        })
    }
}

/// Classifies one image with a fresh ONNX Runtime pipeline.
pub fn classify(
    config: PipelineConfig,
    sink: &mut impl LogSink,
) -> ClassifyResult<Vec<RankedResult>> {
    let report = ClassificationPipeline::new(config)?.run(sink)?;
    Ok(report.predictions)
}

fn primary_input(model: &ModelHandle) -> ClassifyResult<FeatureDescriptor> {
    model.input_features().first().cloned().ok_or_else(|| {
        ClassifyError::model_load_error(
            model.path(),
            "model declares no inputs",
            None::<SimpleError>,
        )
    })
}
