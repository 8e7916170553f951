//! Horizontal-flip test-time augmentation.

use burn::{prelude::*, tensor::backend::Backend};
use burn_extra_ops::TensorExtraOps;

use crate::error::{EvalError, EvalResult};

/// Combines the scores of an image with the scores of its mirror image.
///
/// Fusion is a plain element-wise sum. Arg-max is invariant to the uniform
/// factor of two, so no averaging is applied.
#[derive(Debug, Clone, Copy, Default)]
pub struct AugmentationFuser {
    enabled: bool,
}

impl AugmentationFuser {
    pub const fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Fuse `original` with `flipped_corrected`.
    ///
    /// # Arguments
    /// * `original` - Scores `[C, h, w]` of the unmirrored image
    /// * `flipped_corrected` - Scores of the mirrored image, already mirrored back so
    ///   that pixel coordinates line up with `original`
    ///
    /// # Returns
    /// The element-wise sum when flip evaluation is enabled, `original` otherwise.
    pub fn fuse<B: Backend>(
        &self,
        original: Tensor<B, 3>,
        flipped_corrected: Tensor<B, 3>,
    ) -> EvalResult<Tensor<B, 3>> {
        let expected = original.dims();
        let actual = flipped_corrected.dims();
        if expected != actual {
            return Err(EvalError::shape_mismatch(expected, actual));
        }

        if self.enabled {
            Ok(original + flipped_corrected)
        } else {
            Ok(original)
        }
    }

    /// Like [`fuse`](Self::fuse) but takes the raw scores of the mirrored image and
    /// mirrors them back along the width axis first.
    pub fn fuse_mirrored<B: Backend>(
        &self,
        original: Tensor<B, 3>,
        flipped_raw: Tensor<B, 3>,
    ) -> EvalResult<Tensor<B, 3>> {
        self.fuse(original, flipped_raw.mirror_width())
    }
}
