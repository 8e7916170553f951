//! Ignore-label filtering.

use crate::{
    error::{EvalError, EvalResult},
    map::{LabelMap, PredictionMap},
};

/// Predicted and true classes of the pixels that take part in the evaluation.
///
/// Position `i` of both sequences refers to the same source pixel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidPixels {
    pub predicted: Vec<u32>,
    pub truth: Vec<u32>,
}

impl ValidPixels {
    pub fn len(&self) -> usize {
        self.truth.len()
    }

    pub fn is_empty(&self) -> bool {
        self.truth.is_empty()
    }
}

/// Drops pixels whose label is the ignore value or otherwise out of range.
#[derive(Debug, Clone, Copy)]
pub struct LabelFilter {
    num_classes: usize,
}

impl LabelFilter {
    pub const fn new(num_classes: usize) -> Self {
        Self { num_classes }
    }

    /// Pair up prediction and label for every pixel with a label `<= num_classes - 1`,
    /// in row-major order.
    pub fn filter(&self, prediction: &PredictionMap, label: &LabelMap) -> EvalResult<ValidPixels> {
        if prediction.dims() != label.dims() {
            return Err(EvalError::shape_mismatch(label.dims(), prediction.dims()));
        }

        let (predicted, truth) = prediction
            .as_slice()
            .iter()
            .zip(label.as_slice())
            .filter(|&(_, &truth)| (truth as usize) < self.num_classes)
            .map(|(&predicted, &truth)| (predicted, truth))
            .unzip();

        Ok(ValidPixels { predicted, truth })
    }
}
