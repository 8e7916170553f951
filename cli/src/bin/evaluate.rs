//! Streaming mIoU evaluation
//!
//! Restores a scoring network, walks the evaluation list once and prints the
//! running mean IoU every few steps. The final summary is written to
//! `<save-dir>/summary.json`.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --release --bin evaluate -- --model snapshots/ --flipped-eval
//! ```

use std::fs;

use anyhow::{Context, Result};
use clap::Parser;
use pspnet_eval::{
    format_metric, load_score_net, resolve_checkpoint, DatasetSource, EvaluationDriver,
    PrefetchSource, SegmentationDataset,
};
use pspnet_eval_cli::{
    create_device, get_backend_name, write_summary, Args, ConsoleReporter, SelectedBackend,
};
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = args.resolve_config()?;
    config
        .validate()
        .context("Invalid evaluation configuration")?;
    println!(
        "{}",
        serde_json::to_string_pretty(&config).context("Failed to serialize configuration")?
    );

    fs::create_dir_all(&args.save_dir).with_context(|| {
        format!(
            "Failed to create save directory: {}",
            args.save_dir.display()
        )
    })?;

    let device = create_device();
    println!("Using backend: {}", get_backend_name());

    let checkpoint = resolve_checkpoint(&args.model)
        .with_context(|| format!("Failed to resolve model: {}", args.model.display()))?;
    let model = load_score_net::<SelectedBackend>(&config.model, &checkpoint, &device)
        .context("Failed to load model weights")?;

    let dataset = SegmentationDataset::new(&config).context("Failed to open dataset")?;
    let mut source = PrefetchSource::spawn(DatasetSource::new(dataset));

    let mut reporter = ConsoleReporter::stdout();
    if args.save_predictions {
        reporter = reporter.with_prediction_dir(args.save_dir.join("predictions"));
    }

    let mut driver = EvaluationDriver::<SelectedBackend, _>::new(&config, model, device)?;
    let summary = driver
        .run(&mut source, &mut reporter)
        .context("Evaluation failed")?;

    println!("Mean IoU: {}", format_metric(summary.mean_iou));
    println!("Pixel accuracy: {}", format_metric(summary.pixel_accuracy));
    if let Some(mean_secs) = summary.mean_inference_secs {
        println!("average inference time: {mean_secs:.4}");
    }

    let summary_path = write_summary(&summary, &args.save_dir)?;
    println!("Summary written to {}", summary_path.display());

    Ok(())
}
