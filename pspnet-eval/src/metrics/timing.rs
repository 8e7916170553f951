//! Inference latency bookkeeping.

use std::time::Duration;

/// Ordered per-step latency samples with a running mean.
#[derive(Debug, Clone, Default)]
pub struct InferenceTimer {
    samples: Vec<Duration>,
}

impl InferenceTimer {
    pub const fn new() -> Self {
        Self {
            samples: Vec::new(),
        }
    }

    pub fn record(&mut self, elapsed: Duration) {
        self.samples.push(elapsed);
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Mean latency in seconds, `None` before the first sample.
    pub fn mean_secs(&self) -> Option<f64> {
        if self.samples.is_empty() {
            return None;
        }
        let total: f64 = self.samples.iter().map(Duration::as_secs_f64).sum();
        Some(total / self.samples.len() as f64)
    }
}
