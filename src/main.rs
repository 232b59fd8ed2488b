//! Command-line front end: classifies one image and prints the run log.
//!
//! ```bash
//! oar-classify --model squeezenet.onnx --image kitten.png --labels labels.json
//! oar-classify --config classify.json --device cuda:0 --top-n 5
//! ```

use clap::Parser;
use oar_classify::core::{ClassifyError, ClassifyResult, ExecutionTarget, PipelineConfig};
use oar_classify::pipeline::{ClassificationPipeline, StdoutSink};
use std::path::PathBuf;
use tracing::{debug, info};

/// Command-line arguments
#[derive(Parser)]
#[command(name = "oar-classify")]
#[command(about = "Classifies an image with an ONNX model and prints the top predictions")]
struct Args {
    /// Path to the ONNX model file
    #[arg(short, long)]
    model: Option<PathBuf>,

    /// Path to the input image
    #[arg(short, long)]
    image: Option<PathBuf>,

    /// Path to the label file (JSON object, JSON array or one label per line)
    #[arg(short, long)]
    labels: Option<PathBuf>,

    /// JSON configuration file; command-line flags override its values
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Execution target (e.g., 'default', 'cpu', 'cuda', 'cuda:0', 'directml:1', 'coreml')
    #[arg(long)]
    device: Option<String>,

    /// Number of predictions to print
    #[arg(long)]
    top_n: Option<usize>,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let args = Args::parse();
    oar_classify::utils::init_tracing(if args.verbose { "debug" } else { "warn" });

    if let Err(err) = run(args) {
        // The failing stage has already been printed.
        std::process::exit(err.exit_code());
    }
}

fn run(args: Args) -> ClassifyResult<()> {
    let config = build_config(args).inspect_err(print_failure)?;
    debug!("Configuration: {:?}", config);

    let pipeline = ClassificationPipeline::new(config).inspect_err(print_failure)?;
    let report = pipeline.run(&mut StdoutSink)?;
    info!(
        "Model load {:.2?}, evaluate {:.2?}",
        report.model_load, report.evaluate
    );
    Ok(())
}

fn print_failure(err: &ClassifyError) {
    println!("{} failed: {}", err.stage(), err.report());
}

fn build_config(args: Args) -> ClassifyResult<PipelineConfig> {
    let mut config = match &args.config {
        Some(path) => PipelineConfig::from_json_file(path)?,
        None => PipelineConfig::default(),
    };

    if let Some(model) = args.model {
        config = config.with_model_path(model);
    }
    if let Some(image) = args.image {
        config = config.with_image_path(image);
    }
    if let Some(labels) = args.labels {
        config = config.with_labels_path(labels);
    }
    if let Some(device) = args.device {
        config = config.with_target(device.parse::<ExecutionTarget>()?);
    }
    if let Some(top_n) = args.top_n {
        config = config.with_top_n(top_n);
    }

    if config.model_path.as_os_str().is_empty() {
        return Err(ClassifyError::config_error(
            "a model is required (--model or model_path in --config)",
        ));
    }
    Ok(config)
}
