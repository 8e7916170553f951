//! Metrics for segmentation evaluation.
//!
//! This module implements the streaming confusion-matrix accounting behind
//! mean IoU and the latency bookkeeping used when inference time is measured.

// Module declarations
pub mod confusion;
pub mod timing;

pub use confusion::*;
pub use timing::*;
