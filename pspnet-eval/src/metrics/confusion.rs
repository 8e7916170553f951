//! Streaming confusion-matrix accounting and mean IoU.
//!
//! The matrix is updated one step at a time from the valid pixels of each
//! sample, so the full prediction and ground-truth arrays of the run never
//! have to be held in memory.

use crate::{
    error::{EvalError, EvalResult},
    filter::ValidPixels,
};

/// Square `num_classes x num_classes` count matrix.
///
/// Cell `[t][p]` counts the pixels whose true class is `t` and predicted class is `p`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfusionMatrix {
    num_classes: usize,
    counts: Vec<u64>,
}

impl ConfusionMatrix {
    pub fn new(num_classes: usize) -> Self {
        Self {
            num_classes,
            counts: vec![0; num_classes * num_classes],
        }
    }

    /// Build a matrix from explicit rows (true class per row).
    pub fn from_rows(rows: &[Vec<u64>]) -> EvalResult<Self> {
        let num_classes = rows.len();
        let mut counts = Vec::with_capacity(num_classes * num_classes);
        for row in rows {
            if row.len() != num_classes {
                return Err(EvalError::shape_mismatch(num_classes, row.len()));
            }
            counts.extend_from_slice(row);
        }

        Ok(Self {
            num_classes,
            counts,
        })
    }

    pub const fn num_classes(&self) -> usize {
        self.num_classes
    }

    /// Count of pixels with true class `truth` predicted as `predicted`.
    ///
    /// # Panics
    /// If either class id is `>= num_classes`.
    pub fn get(&self, truth: usize, predicted: usize) -> u64 {
        assert!(
            truth < self.num_classes && predicted < self.num_classes,
            "class ({truth}, {predicted}) out of range for {} classes",
            self.num_classes
        );
        self.counts[truth * self.num_classes + predicted]
    }

    /// Number of pixels whose true class is `class`.
    ///
    /// # Panics
    /// If `class >= num_classes`.
    pub fn row_sum(&self, class: usize) -> u64 {
        assert!(
            class < self.num_classes,
            "class {class} out of range for {} classes",
            self.num_classes
        );
        let start = class * self.num_classes;
        self.counts[start..start + self.num_classes].iter().sum()
    }

    /// Number of pixels predicted as `class`.
    ///
    /// # Panics
    /// If `class >= num_classes`.
    pub fn col_sum(&self, class: usize) -> u64 {
        (0..self.num_classes).map(|row| self.get(row, class)).sum()
    }

    /// Total number of counted pixels.
    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn rows(&self) -> Vec<Vec<u64>> {
        self.counts
            .chunks(self.num_classes.max(1))
            .map(<[u64]>::to_vec)
            .collect()
    }

    /// Intersection over union of a single class, `None` when the class never
    /// appears in either the labels or the predictions.
    ///
    /// # Panics
    /// If `class >= num_classes`.
    pub fn class_iou(&self, class: usize) -> Option<f64> {
        let intersection = self.get(class, class);
        let union = self.row_sum(class) + self.col_sum(class) - intersection;
        (union > 0).then(|| intersection as f64 / union as f64)
    }

    pub fn per_class_iou(&self) -> Vec<Option<f64>> {
        (0..self.num_classes).map(|c| self.class_iou(c)).collect()
    }

    /// Mean IoU over the classes with a non-zero union.
    ///
    /// Classes with an empty union are left out of the mean rather than counted
    /// as zero. Returns `None` when no class has any union at all.
    pub fn mean_iou(&self) -> Option<f64> {
        let ious: Vec<f64> = self.per_class_iou().into_iter().flatten().collect();
        if ious.is_empty() {
            return None;
        }
        Some(ious.iter().sum::<f64>() / ious.len() as f64)
    }

    /// Fraction of counted pixels that were predicted correctly.
    pub fn pixel_accuracy(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let correct: u64 = (0..self.num_classes).map(|c| self.get(c, c)).sum();
        Some(correct as f64 / total as f64)
    }
}

/// Owns the run's confusion matrix; `update` is its only mutation path.
#[derive(Debug, Clone)]
pub struct ConfusionAccumulator {
    matrix: ConfusionMatrix,
}

impl ConfusionAccumulator {
    pub fn new(num_classes: usize) -> Self {
        Self {
            matrix: ConfusionMatrix::new(num_classes),
        }
    }

    /// Count every `(truth[i], predicted[i])` pair.
    ///
    /// The whole batch is validated before any cell changes, so a rejected update
    /// leaves the matrix untouched.
    pub fn update(&mut self, predicted: &[u32], truth: &[u32]) -> EvalResult<()> {
        if predicted.len() != truth.len() {
            return Err(EvalError::shape_mismatch(truth.len(), predicted.len()));
        }

        let num_classes = self.matrix.num_classes;
        if let Some(&class) = predicted
            .iter()
            .chain(truth)
            .find(|&&class| class as usize >= num_classes)
        {
            return Err(EvalError::ClassOutOfRange { class, num_classes });
        }

        for (&p, &t) in predicted.iter().zip(truth) {
            self.matrix.counts[t as usize * num_classes + p as usize] += 1;
        }
        Ok(())
    }

    /// Count the output of the label filter.
    pub fn update_valid(&mut self, pixels: &ValidPixels) -> EvalResult<()> {
        self.update(&pixels.predicted, &pixels.truth)
    }

    pub fn mean_iou(&self) -> Option<f64> {
        self.matrix.mean_iou()
    }

    pub const fn matrix(&self) -> &ConfusionMatrix {
        &self.matrix
    }
}
