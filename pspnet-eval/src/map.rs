//! Per-pixel class maps.

use crate::error::{EvalError, EvalResult};

/// A row-major `[height, width]` grid of class ids.
///
/// Used both for ground-truth labels, which may carry the ignore value, and for
/// decoded predictions, which always hold ids in `[0, num_classes - 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassMap {
    height: usize,
    width: usize,
    data: Vec<u32>,
}

/// Ground-truth labels as supplied by the dataset.
pub type LabelMap = ClassMap;

/// Arg-max class ids produced by the decoder.
pub type PredictionMap = ClassMap;

impl ClassMap {
    /// Create a map from row-major data.
    pub fn new(height: usize, width: usize, data: Vec<u32>) -> EvalResult<Self> {
        if data.len() != height * width {
            return Err(EvalError::shape_mismatch(
                [height, width],
                format!("{} values", data.len()),
            ));
        }

        Ok(Self {
            height,
            width,
            data,
        })
    }

    /// Create a map where every pixel holds `value`.
    pub fn filled(height: usize, width: usize, value: u32) -> Self {
        Self {
            height,
            width,
            data: vec![value; height * width],
        }
    }

    pub const fn height(&self) -> usize {
        self.height
    }

    pub const fn width(&self) -> usize {
        self.width
    }

    /// `[height, width]`
    pub const fn dims(&self) -> [usize; 2] {
        [self.height, self.width]
    }

    pub fn get(&self, row: usize, col: usize) -> Option<u32> {
        if row >= self.height || col >= self.width {
            return None;
        }
        self.data.get(row * self.width + col).copied()
    }

    pub fn as_slice(&self) -> &[u32] {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_wrong_length() {
        let result = ClassMap::new(2, 3, vec![0; 5]);
        assert!(matches!(result, Err(EvalError::ShapeMismatch { .. })));
    }

    #[test]
    fn test_row_major_access() {
        let map = ClassMap::new(2, 3, vec![0, 1, 2, 3, 4, 5]).unwrap();

        assert_eq!(map.dims(), [2, 3]);
        assert_eq!(map.get(0, 2), Some(2));
        assert_eq!(map.get(1, 0), Some(3));
        assert_eq!(map.get(2, 0), None);
        assert_eq!(map.get(0, 3), None);
    }
}
