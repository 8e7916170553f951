//! Console progress output and summary files.

use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use pspnet_eval::{
    format_metric, save_decoded, EvalSummary, ProgressReport, ProgressReporter,
    CITYSCAPES_PALETTE,
};

/// Prints `Finish`/`mIoU` lines and optionally saves the reported predictions.
pub struct ConsoleReporter<W: Write = io::Stdout> {
    out: W,
    prediction_dir: Option<PathBuf>,
}

impl ConsoleReporter {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write> ConsoleReporter<W> {
    pub const fn new(out: W) -> Self {
        Self {
            out,
            prediction_dir: None,
        }
    }

    /// Save a colorized prediction into `dir` at every report step.
    pub fn with_prediction_dir(mut self, dir: PathBuf) -> Self {
        self.prediction_dir = Some(dir);
        self
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn save_prediction(&self, report: &ProgressReport<'_>) {
        let Some(dir) = &self.prediction_dir else {
            return;
        };

        let path = dir.join(format!("step_{:05}.png", report.step));
        let saved = fs::create_dir_all(dir)
            .map_err(pspnet_eval::EvalError::from)
            .and_then(|()| save_decoded(report.prediction, &CITYSCAPES_PALETTE, &path));
        if let Err(err) = saved {
            tracing::warn!(
                step = report.step,
                path = %path.display(),
                error = %err,
                "could not save prediction"
            );
        }
    }
}

impl<W: Write> ProgressReporter for ConsoleReporter<W> {
    fn progress(&mut self, report: &ProgressReport<'_>) {
        // Console output is best effort.
        let _ = writeln!(self.out, "Finish {}/{}", report.step, report.total_steps);
        let _ = writeln!(
            self.out,
            "step {} mIoU: {}",
            report.step,
            format_metric(report.mean_iou)
        );
        self.save_prediction(report);
    }

    fn inference_time(&mut self, _step: usize, mean_secs: f64) {
        let _ = writeln!(self.out, "average inference time: {mean_secs:.4}");
    }
}

/// Write `summary.json` into `save_dir` and return its path.
pub fn write_summary(summary: &EvalSummary, save_dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(save_dir)
        .with_context(|| format!("Failed to create save directory: {}", save_dir.display()))?;

    let path = save_dir.join("summary.json");
    let json = serde_json::to_string_pretty(summary).context("Failed to serialize summary")?;
    fs::write(&path, json)
        .with_context(|| format!("Failed to write summary: {}", path.display()))?;

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pspnet_eval::PredictionMap;

    fn report(step: usize, mean_iou: Option<f64>, prediction: &PredictionMap) -> ProgressReport<'_> {
        ProgressReport {
            step,
            total_steps: 500,
            mean_iou,
            prediction,
        }
    }

    #[test]
    fn test_progress_lines() {
        let prediction = PredictionMap::filled(1, 1, 0);
        let mut reporter = ConsoleReporter::new(Vec::new());

        reporter.progress(&report(10, Some(0.5), &prediction));
        reporter.inference_time(11, 0.25);
        reporter.progress(&report(20, None, &prediction));

        let output = String::from_utf8(reporter.into_inner()).unwrap();
        assert_eq!(
            output,
            "Finish 10/500\nstep 10 mIoU: 0.50000\naverage inference time: 0.2500\n\
             Finish 20/500\nstep 20 mIoU: n/a\n"
        );
    }

    #[test]
    fn test_saves_predictions_at_report_steps() {
        let dir = tempfile::tempdir().unwrap();
        let prediction_dir = dir.path().join("predictions");
        let prediction = PredictionMap::new(1, 2, vec![0, 1]).unwrap();
        let mut reporter =
            ConsoleReporter::new(Vec::new()).with_prediction_dir(prediction_dir.clone());

        reporter.progress(&report(0, None, &prediction));
        reporter.progress(&report(10, None, &prediction));

        assert!(prediction_dir.join("step_00000.png").is_file());
        assert!(prediction_dir.join("step_00010.png").is_file());
    }

    #[test]
    fn test_write_summary() {
        let dir = tempfile::tempdir().unwrap();
        let summary = EvalSummary {
            steps_completed: 2,
            total_steps: 2,
            mean_iou: Some(0.75),
            pixel_accuracy: Some(0.8),
            per_class_iou: vec![Some(1.0), Some(0.5), None],
            confusion_matrix: vec![vec![2, 0, 0], vec![1, 1, 0], vec![0, 0, 0]],
            mean_inference_secs: None,
            stopped_early: false,
        };

        let path = write_summary(&summary, &dir.path().join("out")).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(value["mean_iou"], 0.75);
        assert_eq!(value["per_class_iou"][2], serde_json::Value::Null);
        assert_eq!(value["confusion_matrix"][1][0], 1);
        assert_eq!(value["stopped_early"], false);
    }
}
