//! Streaming mean-IoU evaluation of semantic segmentation models with Burn.
//!
//! Samples flow one at a time through the scoring network, optional
//! horizontal-flip fusion, arg-max decoding at label resolution and the
//! ignore-label filter into a single confusion matrix owned by the
//! [`EvaluationDriver`].

mod checkpoint;
mod config;
mod dataset;
mod decode;
mod driver;
mod error;
mod filter;
mod fuse;
mod map;
pub mod metrics;
mod model;
mod source;
mod visualize;


pub use checkpoint::{load_score_net, resolve_checkpoint, Checkpoint};
pub use config::EvalConfig;
pub use dataset::{parse_list, SegmentationDataset};
pub use decode::Decoder;
pub use driver::{
    format_metric, DriverState, EvalSummary, EvaluationDriver, LogReporter, ProgressReport,
    ProgressReporter, StopHandle,
};
pub use error::{EvalError, EvalResult};
pub use filter::{LabelFilter, ValidPixels};
pub use fuse::AugmentationFuser;
pub use map::{ClassMap, LabelMap, PredictionMap};
pub use metrics::{ConfusionAccumulator, ConfusionMatrix, InferenceTimer};
pub use model::{ScoreNet, ScoreNetConfig, ScoreNetRecord, ScoreProducer};
pub use source::{DatasetSource, PrefetchSource, Sample, SampleSource, VecSource};
pub use visualize::{decode_labels, save_decoded, CITYSCAPES_PALETTE};
