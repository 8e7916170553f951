//! Score upsampling and arg-max decoding.

use burn::{prelude::*, tensor::backend::Backend};
use burn_extra_ops::TensorExtraOps;

use crate::{
    error::{EvalError, EvalResult},
    map::PredictionMap,
};

/// Turns a reduced-resolution score tensor into a full-resolution class map.
#[derive(Debug, Clone, Copy, Default)]
pub struct Decoder;

impl Decoder {
    pub const fn new() -> Self {
        Self
    }

    /// Upsample the scores to the target resolution and take the per-pixel arg-max.
    ///
    /// # Arguments
    /// * `scores` - Class scores with shape `[C, h, w]`
    /// * `target` - Output `[height, width]`, the resolution of the ground-truth labels
    ///
    /// # Returns
    /// A prediction map of exactly `target` dimensions with ids in `[0, C - 1]`.
    /// Ties resolve to the lowest class index.
    pub fn decode<B: Backend>(
        &self,
        scores: Tensor<B, 3>,
        target: [usize; 2],
    ) -> EvalResult<PredictionMap> {
        let [num_classes, height, width] = scores.dims();
        if num_classes == 0 || height == 0 || width == 0 {
            return Err(EvalError::shape_mismatch(
                "non-empty [C, h, w] scores",
                [num_classes, height, width],
            ));
        }
        if target.contains(&0) {
            return Err(EvalError::shape_mismatch("non-empty target", target));
        }

        let [out_height, out_width] = target;
        let classes = scores
            .resize_aligned(target)
            .argmax(0)
            .reshape([out_height * out_width])
            .into_data()
            .iter::<i64>()
            .map(|class| class as u32)
            .collect();

        PredictionMap::new(out_height, out_width, classes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::{backend::NdArray, tensor::TensorData};

    type TestBackend = NdArray<f32>;

    fn scores(values: Vec<f32>, shape: [usize; 3]) -> Tensor<TestBackend, 3> {
        Tensor::from_data(TensorData::new(values, shape), &Default::default())
    }

    #[test]
    fn test_output_matches_target_dims() {
        let device = Default::default();
        let decoder = Decoder::new();
        let input = Tensor::<TestBackend, 3>::random(
            [5, 3, 4],
            burn::tensor::Distribution::Normal(0.0, 1.0),
            &device,
        );

        let prediction = decoder.decode(input, [17, 23]).unwrap();

        assert_eq!(prediction.dims(), [17, 23]);
        assert!(prediction.as_slice().iter().all(|&class| class < 5));
    }

    #[test]
    fn test_constant_winner_fills_map() {
        let decoder = Decoder::new();
        // Class 1 dominates everywhere.
        let input = scores(vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0], [2, 2, 2]);

        let prediction = decoder.decode(input, [4, 4]).unwrap();
        assert_eq!(prediction.as_slice(), &[1; 16]);
    }

    #[test]
    fn test_boundary_follows_aligned_interpolation() {
        let decoder = Decoder::new();
        // Class 0 scores fall left to right, class 1 scores rise: they cross at the
        // middle column of a 1x5 upsampling.
        let input = scores(vec![1.0, 0.0, 0.0, 1.0], [2, 1, 2]);

        let prediction = decoder.decode(input, [1, 5]).unwrap();
        // Column 2 is an exact tie (0.5 vs 0.5) and resolves to class 0.
        assert_eq!(prediction.as_slice(), &[0, 0, 0, 1, 1]);
    }

    #[test]
    fn test_ties_resolve_to_lowest_class() {
        let decoder = Decoder::new();
        let input = scores(vec![2.0, 2.0, 2.0, 2.0, 2.0, 2.0], [3, 1, 2]);

        let prediction = decoder.decode(input, [2, 3]).unwrap();
        assert_eq!(prediction.as_slice(), &[0; 6]);
    }

    #[test]
    fn test_rejects_empty_target() {
        let decoder = Decoder::new();
        let input = scores(vec![0.0; 4], [1, 2, 2]);

        assert!(matches!(
            decoder.decode(input, [0, 4]),
            Err(EvalError::ShapeMismatch { .. })
        ));
    }
}
