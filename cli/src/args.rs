//! Command-line arguments of `evaluate`.

use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use pspnet_eval::EvalConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Evaluate a segmentation model by streaming mean IoU", long_about = None)]
pub struct Args {
    /// Whether to measure inference time
    #[arg(long)]
    pub measure_time: bool,

    /// Path to a model record or a directory of records
    #[arg(long, default_value = "./snapshots/")]
    pub model: PathBuf,

    /// Where the summary and saved predictions go
    #[arg(long, default_value = "./output/")]
    pub save_dir: PathBuf,

    /// Whether to fuse the scores of the mirrored image
    #[arg(long)]
    pub flipped_eval: bool,

    /// Evaluation configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Dataset root directory
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// List file of `image label` pairs
    #[arg(long)]
    pub data_list: Option<PathBuf>,

    /// Number of samples to evaluate
    #[arg(long)]
    pub num_steps: Option<usize>,

    /// Save colorized predictions at every report step
    #[arg(long)]
    pub save_predictions: bool,
}

impl Args {
    /// The configuration file if given, defaults otherwise, with flags applied on top.
    pub fn resolve_config(&self) -> Result<EvalConfig> {
        let config = if let Some(config_path) = &self.config {
            let config_str = fs::read_to_string(config_path).with_context(|| {
                format!("Failed to read config file: {}", config_path.display())
            })?;
            serde_json::from_str::<EvalConfig>(&config_str).with_context(|| {
                format!("Failed to parse config file: {}", config_path.display())
            })?
        } else {
            EvalConfig::new()
        };

        Ok(self.apply_overrides(config))
    }

    /// Apply command line overrides. Switches only ever turn features on.
    pub fn apply_overrides(&self, mut config: EvalConfig) -> EvalConfig {
        config.measure_time |= self.measure_time;
        config.flipped_eval |= self.flipped_eval;

        if let Some(data_dir) = &self.data_dir {
            config.data_dir = data_dir.clone();
        }
        if let Some(data_list) = &self.data_list {
            config.data_list = data_list.clone();
        }
        if let Some(num_steps) = self.num_steps {
            config.num_steps = num_steps;
        }

        config
    }
}
