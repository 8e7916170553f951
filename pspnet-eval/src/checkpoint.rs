//! Checkpoint discovery and weight restoration.

use std::path::{Path, PathBuf};

use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};

use crate::{
    error::{EvalError, EvalResult},
    model::{ScoreNet, ScoreNetConfig},
};

const RECORD_EXTENSION: &str = "mpk";

/// A resolved model record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Checkpoint {
    /// Path of the record file.
    pub path: PathBuf,
    /// Training step parsed from a `-<step>` suffix, e.g. `model.ckpt-60000.mpk`.
    pub step: Option<usize>,
}

impl Checkpoint {
    fn from_path(path: PathBuf) -> Self {
        let step = parse_step(&path);
        Self { path, step }
    }
}

/// Resolve `model` to a record file.
///
/// `model` may name a record directly or a directory of records, in which case the
/// record with the highest step wins and the lexicographically last name breaks ties.
pub fn resolve_checkpoint(model: &Path) -> EvalResult<Checkpoint> {
    if model.is_file() {
        return Ok(Checkpoint::from_path(model.to_path_buf()));
    }

    if !model.is_dir() {
        return Err(EvalError::CheckpointNotFound {
            path: model.to_path_buf(),
        });
    }

    let entries = std::fs::read_dir(model)?;
    let mut records = Vec::new();
    for entry in entries {
        let path = entry?.path();
        let is_record = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case(RECORD_EXTENSION));
        if path.is_file() && is_record {
            records.push(Checkpoint::from_path(path));
        }
    }

    records
        .into_iter()
        .max_by(|a, b| {
            (a.step.is_some(), a.step, &a.path).cmp(&(b.step.is_some(), b.step, &b.path))
        })
        .ok_or_else(|| EvalError::CheckpointNotFound {
            path: model.to_path_buf(),
        })
}

/// Initialize a [`ScoreNet`] from `config` and restore its weights from `checkpoint`.
pub fn load_score_net<B: Backend>(
    config: &ScoreNetConfig,
    checkpoint: &Checkpoint,
    device: &B::Device,
) -> EvalResult<ScoreNet<B>> {
    let model = config.init::<B>(device);

    let recorder = NamedMpkFileRecorder::<FullPrecisionSettings>::new();
    let record = recorder
        .load(checkpoint.path.clone(), device)
        .map_err(|e| EvalError::WeightLoadingFailed {
            reason: format!("{}: {e}", checkpoint.path.display()),
        })?;

    tracing::info!(
        path = %checkpoint.path.display(),
        step = ?checkpoint.step,
        "restored model parameters"
    );

    Ok(model.load_record(record))
}

fn parse_step(path: &Path) -> Option<usize> {
    path.file_stem()?
        .to_str()?
        .rsplit_once('-')?
        .1
        .parse()
        .ok()
}
