//! Evaluation configuration.
//!
//! The defaults reproduce the Cityscapes validation setup: 19 classes, the
//! `255` don't-care label, 500 validation images at 1024x2048 and the BGR
//! ImageNet mean.

use std::path::PathBuf;

use burn::prelude::*;

use crate::{
    error::{EvalError, EvalResult},
    model::ScoreNetConfig,
};

/// Main configuration for an evaluation run.
#[derive(Config, Debug)]
pub struct EvalConfig {
    /// Number of semantic classes predicted by the model.
    #[config(default = 19)]
    pub num_classes: usize,
    /// Label value marking pixels excluded from evaluation.
    #[config(default = 255)]
    pub ignore_label: u32,
    /// Number of samples to evaluate.
    #[config(default = 500)]
    pub num_steps: usize,
    /// Input resolution as `[height, width]`.
    #[config(default = "[1024, 2048]")]
    pub input_size: [usize; 2],
    /// Per-channel image mean in BGR order.
    #[config(default = "[103.939, 116.779, 123.68]")]
    pub img_mean: [f32; 3],
    /// Fuse the scores of the horizontally mirrored image.
    #[config(default = false)]
    pub flipped_eval: bool,
    /// Record per-step inference latency.
    #[config(default = false)]
    pub measure_time: bool,
    /// Emit a progress report every this many steps.
    #[config(default = 10)]
    pub report_every: usize,
    /// Root directory the dataset list is relative to.
    #[config(default = "PathBuf::from(\"./datasets\")")]
    pub data_dir: PathBuf,
    /// List file with one `image label` pair per line.
    #[config(default = "PathBuf::from(\"./list/eval_list.txt\")")]
    pub data_list: PathBuf,
    /// Scoring network configuration.
    #[config(default = "ScoreNetConfig::new()")]
    pub model: ScoreNetConfig,
}

impl EvalConfig {
    /// Check the configuration for logical consistency.
    pub fn validate(&self) -> EvalResult<()> {
        if self.num_classes == 0 {
            return Err(EvalError::Configuration {
                reason: "num_classes must be at least 1".to_string(),
            });
        }

        if (self.ignore_label as usize) < self.num_classes {
            return Err(EvalError::Configuration {
                reason: format!(
                    "ignore_label {} collides with a class id (num_classes = {})",
                    self.ignore_label, self.num_classes
                ),
            });
        }

        if self.num_steps == 0 {
            return Err(EvalError::Configuration {
                reason: "num_steps must be at least 1".to_string(),
            });
        }

        if self.report_every == 0 {
            return Err(EvalError::Configuration {
                reason: "report_every must be at least 1".to_string(),
            });
        }

        if self.input_size.contains(&0) {
            return Err(EvalError::Configuration {
                reason: format!("input_size must be non-zero, got {:?}", self.input_size),
            });
        }

        if self.model.num_classes != self.num_classes {
            return Err(EvalError::Configuration {
                reason: format!(
                    "model predicts {} classes but evaluation expects {}",
                    self.model.num_classes, self.num_classes
                ),
            });
        }

        Ok(())
    }
}
