//! Bilinear resizing with aligned corners.
//!
//! Burn's `interpolate` does not let the caller choose the corner alignment,
//! so this module builds the resize out of `select` and a linear blend along
//! each spatial axis. With aligned corners, output index `i` samples the
//! source coordinate `i * (in - 1) / (out - 1)`, which makes the first and
//! last samples of both grids coincide.

use burn::{
    prelude::*,
    tensor::{Int, Shape, TensorData},
};

/// Source sampling positions for one axis.
///
/// Returns the lower neighbour, the upper neighbour and the blend weight of
/// the upper neighbour for every output index.
pub fn aligned_sample_positions(in_len: usize, out_len: usize) -> (Vec<i64>, Vec<i64>, Vec<f32>) {
    let mut lower = Vec::with_capacity(out_len);
    let mut upper = Vec::with_capacity(out_len);
    let mut weights = Vec::with_capacity(out_len);

    let last = in_len.saturating_sub(1);
    let scale = if out_len > 1 {
        last as f64 / (out_len - 1) as f64
    } else {
        0.0
    };

    for i in 0..out_len {
        let src = i as f64 * scale;
        let low = (src.floor() as usize).min(last);
        let high = (low + 1).min(last);
        lower.push(low as i64);
        upper.push(high as i64);
        weights.push((src - low as f64) as f32);
    }

    (lower, upper, weights)
}

/// Resize a single axis of `tensor` to `out_len` with aligned-corner linear
/// interpolation.
pub fn resize_axis_aligned<B: Backend, const D: usize>(
    tensor: Tensor<B, D>,
    dim: usize,
    out_len: usize,
) -> Tensor<B, D> {
    let in_len = tensor.dims()[dim];
    if in_len == out_len {
        return tensor;
    }

    let device = tensor.device();
    let (lower, upper, weights) = aligned_sample_positions(in_len, out_len);

    let lower = Tensor::<B, 1, Int>::from_data(TensorData::new(lower, [out_len]), &device);
    let upper = Tensor::<B, 1, Int>::from_data(TensorData::new(upper, [out_len]), &device);

    // Broadcast the weights along every axis except `dim`.
    let mut weight_shape = [1usize; D];
    weight_shape[dim] = out_len;
    let weights = Tensor::<B, 1>::from_data(TensorData::new(weights, [out_len]), &device)
        .reshape(Shape::new(weight_shape));

    let low = tensor.clone().select(dim, lower);
    let high = tensor.select(dim, upper);

    low.clone() + (high - low) * weights
}

/// Resize the two trailing (height, width) axes of `tensor` to `size`.
///
/// # Arguments
/// * `tensor` - Input tensor whose last two axes are spatial, e.g. `[C, H, W]`
///   or `[N, C, H, W]`
/// * `size` - Target `[height, width]`
///
/// # Returns
/// The resized tensor; leading axes are untouched.
pub fn resize_bilinear_aligned<B: Backend, const D: usize>(
    tensor: Tensor<B, D>,
    size: [usize; 2],
) -> Tensor<B, D> {
    assert!(D >= 2, "bilinear resize needs at least two spatial axes");
    let [height, width] = size;

    let tensor = resize_axis_aligned(tensor, D - 2, height);
    resize_axis_aligned(tensor, D - 1, width)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn assert_close(actual: &[f32], expected: &[f32]) {
        assert_eq!(actual.len(), expected.len());
        for (a, e) in actual.iter().zip(expected) {
            assert!((a - e).abs() < 1e-5, "expected {e}, got {a}");
        }
    }

    #[test]
    fn test_sample_positions_align_corners() {
        let (lower, upper, weights) = aligned_sample_positions(3, 5);

        assert_eq!(lower, vec![0, 0, 1, 1, 2]);
        assert_eq!(upper, vec![1, 1, 2, 2, 2]);
        assert_close(&weights, &[0.0, 0.5, 0.0, 0.5, 0.0]);
    }

    #[test]
    fn test_sample_positions_single_output() {
        let (lower, upper, weights) = aligned_sample_positions(4, 1);

        assert_eq!(lower, vec![0]);
        assert_eq!(upper, vec![1]);
        assert_close(&weights, &[0.0]);
    }

    #[test]
    fn test_sample_positions_single_input() {
        let (lower, upper, weights) = aligned_sample_positions(1, 3);

        assert_eq!(lower, vec![0, 0, 0]);
        assert_eq!(upper, vec![0, 0, 0]);
        assert_close(&weights, &[0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_resize_keeps_corners_and_interpolates_midpoints() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 3>::from_data(
            TensorData::new(vec![0.0f32, 2.0, 4.0, 6.0], [1, 2, 2]),
            &device,
        );

        let output = resize_bilinear_aligned(input, [3, 3]);
        assert_eq!(output.dims(), [1, 3, 3]);

        let values: Vec<f32> = output.into_data().iter::<f32>().collect();
        assert_close(
            &values,
            &[0.0, 1.0, 2.0, 2.0, 3.0, 4.0, 4.0, 5.0, 6.0],
        );
    }

    #[test]
    fn test_resize_is_identity_for_same_size() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 3>::from_data(
            TensorData::new(vec![1.0f32, -2.0, 3.5, 0.25, 7.0, 8.0], [2, 1, 3]),
            &device,
        );

        let output = resize_bilinear_aligned(input, [1, 3]);
        let values: Vec<f32> = output.into_data().iter::<f32>().collect();
        assert_close(&values, &[1.0, -2.0, 3.5, 0.25, 7.0, 8.0]);
    }

    #[test]
    fn test_resize_channels_are_independent() {
        let device = Default::default();
        let input = Tensor::<TestBackend, 3>::from_data(
            TensorData::new(vec![0.0f32, 10.0, 100.0, 100.0], [2, 1, 2]),
            &device,
        );

        let output = resize_bilinear_aligned(input, [1, 3]);
        let values: Vec<f32> = output.into_data().iter::<f32>().collect();
        assert_close(&values, &[0.0, 5.0, 10.0, 100.0, 100.0, 100.0]);
    }
}
