//! Scoring networks.
//!
//! The evaluation pipeline only needs something that maps a normalized image to
//! raw per-pixel class scores at reduced resolution. [`ScoreProducer`] is that
//! capability; [`ScoreNet`] is a compact fully-convolutional implementation whose
//! weights are restored from a Burn record.

use burn::{
    nn::{
        conv::{Conv2d, Conv2dConfig},
        PaddingConfig2d, Relu,
    },
    prelude::*,
};

/// Produces raw class scores for one image.
///
/// Implementations must be deterministic for fixed parameters.
pub trait ScoreProducer<B: Backend> {
    /// Score a normalized image.
    ///
    /// # Arguments
    /// * `image` - Image tensor with shape `[3, H, W]`
    ///
    /// # Returns
    /// Unnormalized scores with shape `[num_classes, h, w]` at the model's output
    /// resolution.
    fn infer(&self, image: Tensor<B, 3>) -> Tensor<B, 3>;
}

impl<B: Backend, P: ScoreProducer<B> + ?Sized> ScoreProducer<B> for &P {
    fn infer(&self, image: Tensor<B, 3>) -> Tensor<B, 3> {
        (**self).infer(image)
    }
}

/// Configuration of [`ScoreNet`].
#[derive(Config, Debug)]
pub struct ScoreNetConfig {
    /// Number of output classes.
    #[config(default = 19)]
    pub num_classes: usize,
    /// Channels of every downsampling stage.
    #[config(default = 64)]
    pub hidden_channels: usize,
    /// Number of stride-2 stages; the output stride is `2^num_downsamples`.
    #[config(default = 3)]
    pub num_downsamples: usize,
}

impl ScoreNetConfig {
    /// Initializes a `ScoreNet` module.
    pub fn init<B: Backend>(&self, device: &Device<B>) -> ScoreNet<B> {
        let mut stages = Vec::with_capacity(self.num_downsamples);
        let mut in_channels = 3;
        for _ in 0..self.num_downsamples {
            stages.push(
                Conv2dConfig::new([in_channels, self.hidden_channels], [3, 3])
                    .with_stride([2, 2])
                    .with_padding(PaddingConfig2d::Explicit(1, 1))
                    .init(device),
            );
            in_channels = self.hidden_channels;
        }

        let classifier = Conv2dConfig::new([in_channels, self.num_classes], [1, 1]).init(device);

        ScoreNet {
            stages,
            classifier,
            activation: Relu::new(),
        }
    }

    /// Spatial size of the score map for an input of `[height, width]`.
    pub fn output_size(&self, input: [usize; 2]) -> [usize; 2] {
        input.map(|len| (0..self.num_downsamples).fold(len, |len, _| len.div_ceil(2)))
    }
}

/// Strided convolution stack followed by a 1x1 classifier.
#[derive(Module, Debug)]
pub struct ScoreNet<B: Backend> {
    stages: Vec<Conv2d<B>>,
    classifier: Conv2d<B>,
    activation: Relu,
}

impl<B: Backend> ScoreNet<B> {
    /// # Shapes
    /// - input: `[N, 3, H, W]`
    /// - output: `[N, num_classes, h, w]`
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self
            .stages
            .iter()
            .fold(x, |x, stage| self.activation.forward(stage.forward(x)));
        self.classifier.forward(x)
    }
}

impl<B: Backend> ScoreProducer<B> for ScoreNet<B> {
    fn infer(&self, image: Tensor<B, 3>) -> Tensor<B, 3> {
        self.forward(image.unsqueeze::<4>()).squeeze::<3>(0)
    }
}
