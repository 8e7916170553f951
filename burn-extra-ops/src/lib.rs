//! Additional operations for the Burn deep learning framework
//!
//! This crate provides operations that are commonly used in dense prediction but are not
//! available in the core Burn framework with the exact semantics segmentation evaluation needs.

use burn::prelude::*;

mod resize;

// Convenient re-exports
pub use resize::{aligned_sample_positions, resize_axis_aligned, resize_bilinear_aligned};

/// Additional operations for Burn tensors with trailing `[.., height, width]` axes
pub trait TensorExtraOps<B: Backend, const D: usize> {
    /// Bilinear resize of the two trailing axes with aligned corners
    fn resize_aligned(self, size: [usize; 2]) -> Self;

    /// Mirror the tensor along its trailing (width) axis
    fn mirror_width(self) -> Self;
}

impl<B: Backend, const D: usize> TensorExtraOps<B, D> for Tensor<B, D> {
    fn resize_aligned(self, size: [usize; 2]) -> Self {
        resize_bilinear_aligned(self, size)
    }

    fn mirror_width(self) -> Self {
        self.flip([D as isize - 1])
    }
}
