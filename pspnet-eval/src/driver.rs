//! The evaluation loop.
//!
//! [`EvaluationDriver`] pulls one sample at a time, scores it (twice with flip
//! evaluation), fuses, decodes, filters and accumulates before touching the
//! next sample. It owns the run's confusion matrix; nothing else can write it.

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Instant,
};

use burn::{prelude::*, tensor::backend::Backend};
use burn_extra_ops::TensorExtraOps;
use serde::Serialize;

use crate::{
    config::EvalConfig,
    decode::Decoder,
    error::{EvalError, EvalResult},
    filter::LabelFilter,
    fuse::AugmentationFuser,
    map::PredictionMap,
    metrics::{ConfusionAccumulator, InferenceTimer},
    model::ScoreProducer,
    source::{Sample, SampleSource},
};

/// Lifecycle of a driver. A finished driver cannot be run again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriverState {
    Idle,
    Running { step: usize },
    Finished,
}

/// Requests a graceful stop after the step in progress.
#[derive(Debug, Clone, Default)]
pub struct StopHandle(Arc<AtomicBool>);

impl StopHandle {
    pub fn request_stop(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_stop_requested(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Periodic progress of a run.
#[derive(Debug)]
pub struct ProgressReport<'a> {
    /// Zero-based index of the step just completed.
    pub step: usize,
    pub total_steps: usize,
    /// Running mean IoU including this step.
    pub mean_iou: Option<f64>,
    /// Decoded prediction of this step.
    pub prediction: &'a PredictionMap,
}

/// Receives progress and latency reports from the driver.
pub trait ProgressReporter {
    fn progress(&mut self, report: &ProgressReport<'_>);

    /// Called after every timed step with the running mean latency.
    fn inference_time(&mut self, _step: usize, _mean_secs: f64) {}
}

/// Reports through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogReporter;

impl ProgressReporter for LogReporter {
    fn progress(&mut self, report: &ProgressReport<'_>) {
        tracing::info!(
            step = report.step,
            total = report.total_steps,
            miou = %format_metric(report.mean_iou),
            "evaluation progress"
        );
    }

    fn inference_time(&mut self, step: usize, mean_secs: f64) {
        tracing::info!(step, mean_secs, "average inference time");
    }
}

/// `0.59722` style formatting with `n/a` for undefined metrics.
pub fn format_metric(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |value| format!("{value:.5}"))
}

/// Final result of a run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalSummary {
    pub steps_completed: usize,
    pub total_steps: usize,
    pub mean_iou: Option<f64>,
    pub pixel_accuracy: Option<f64>,
    pub per_class_iou: Vec<Option<f64>>,
    /// Rows are true classes, columns predicted classes.
    pub confusion_matrix: Vec<Vec<u64>>,
    pub mean_inference_secs: Option<f64>,
    pub stopped_early: bool,
}

/// Runs the streaming evaluation over a sample source.
pub struct EvaluationDriver<B: Backend, P> {
    producer: P,
    device: B::Device,
    fuser: AugmentationFuser,
    decoder: Decoder,
    filter: LabelFilter,
    accumulator: ConfusionAccumulator,
    timer: Option<InferenceTimer>,
    num_steps: usize,
    report_every: usize,
    state: DriverState,
    stop: StopHandle,
}

impl<B: Backend, P: ScoreProducer<B>> EvaluationDriver<B, P> {
    pub fn new(config: &EvalConfig, producer: P, device: B::Device) -> EvalResult<Self> {
        config.validate()?;

        Ok(Self {
            producer,
            device,
            fuser: AugmentationFuser::new(config.flipped_eval),
            decoder: Decoder::new(),
            filter: LabelFilter::new(config.num_classes),
            accumulator: ConfusionAccumulator::new(config.num_classes),
            timer: config.measure_time.then(InferenceTimer::new),
            num_steps: config.num_steps,
            report_every: config.report_every,
            state: DriverState::Idle,
            stop: StopHandle::default(),
        })
    }

    pub const fn state(&self) -> DriverState {
        self.state
    }

    /// Handle for stopping the run from elsewhere, e.g. a reporter or another thread.
    pub fn stop_handle(&self) -> StopHandle {
        self.stop.clone()
    }

    pub const fn accumulator(&self) -> &ConfusionAccumulator {
        &self.accumulator
    }

    pub fn mean_iou(&self) -> Option<f64> {
        self.accumulator.mean_iou()
    }

    pub fn mean_inference_secs(&self) -> Option<f64> {
        self.timer.as_ref().and_then(InferenceTimer::mean_secs)
    }

    /// Evaluate `num_steps` samples from `source`.
    ///
    /// The driver is `Finished` afterwards, whether the run succeeded or not.
    pub fn run<S, R>(&mut self, source: &mut S, reporter: &mut R) -> EvalResult<EvalSummary>
    where
        S: SampleSource + ?Sized,
        R: ProgressReporter + ?Sized,
    {
        if self.state != DriverState::Idle {
            return Err(EvalError::Configuration {
                reason: "an evaluation driver can only run once".to_string(),
            });
        }

        let result = self.run_steps(source, reporter);
        self.state = DriverState::Finished;
        result
    }

    fn run_steps<S, R>(&mut self, source: &mut S, reporter: &mut R) -> EvalResult<EvalSummary>
    where
        S: SampleSource + ?Sized,
        R: ProgressReporter + ?Sized,
    {
        if let Some(available) = source.len_hint() {
            if available < self.num_steps {
                return Err(EvalError::Configuration {
                    reason: format!(
                        "{} steps requested but the dataset only holds {available} samples",
                        self.num_steps
                    ),
                });
            }
        }

        tracing::info!(
            num_steps = self.num_steps,
            flipped_eval = self.fuser.is_enabled(),
            "starting evaluation"
        );

        let mut completed = 0;
        let mut stopped_early = false;
        for step in 0..self.num_steps {
            if self.stop.is_stop_requested() {
                tracing::info!(completed, "stop requested, finishing early");
                stopped_early = true;
                break;
            }

            self.state = DriverState::Running { step };
            let sample = source.next_sample()?;
            let prediction = self.evaluate_sample(step, sample)?;
            completed += 1;

            if step > 0 {
                if let Some(mean_secs) = self.mean_inference_secs() {
                    reporter.inference_time(step, mean_secs);
                }
            }

            if step % self.report_every == 0 {
                reporter.progress(&ProgressReport {
                    step,
                    total_steps: self.num_steps,
                    mean_iou: self.accumulator.mean_iou(),
                    prediction: &prediction,
                });
            }
        }

        Ok(self.summary(completed, stopped_early))
    }

    /// Score, fuse, decode, filter and accumulate one sample.
    fn evaluate_sample(&mut self, step: usize, sample: Sample) -> EvalResult<PredictionMap> {
        let target = sample.dims();
        let start = Instant::now();

        // [H, W, 3] -> [3, H, W]
        let image = Tensor::<B, 3>::from_data(sample.image, &self.device).permute([2, 0, 1]);
        let scores = if self.fuser.is_enabled() {
            let flipped = self.producer.infer(image.clone().mirror_width());
            let original = self.producer.infer(image);
            self.fuser.fuse_mirrored(original, flipped)?
        } else {
            self.producer.infer(image)
        };

        // Decoding reads the scores back, so the measurement covers the device work.
        let prediction = self.decoder.decode(scores, target)?;
        if step > 0 {
            if let Some(timer) = self.timer.as_mut() {
                timer.record(start.elapsed());
            }
        }

        let valid = self.filter.filter(&prediction, &sample.label)?;
        self.accumulator.update_valid(&valid)?;
        Ok(prediction)
    }

    fn summary(&self, steps_completed: usize, stopped_early: bool) -> EvalSummary {
        let matrix = self.accumulator.matrix();
        EvalSummary {
            steps_completed,
            total_steps: self.num_steps,
            mean_iou: matrix.mean_iou(),
            pixel_accuracy: matrix.pixel_accuracy(),
            per_class_iou: matrix.per_class_iou(),
            confusion_matrix: matrix.rows(),
            mean_inference_secs: self.mean_inference_secs(),
            stopped_early,
        }
    }
}
