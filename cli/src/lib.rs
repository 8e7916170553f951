//! PSPNet evaluation command line
//!
//! Backend selection, argument handling and console reporting for the
//! `evaluate` binary.
//!
//! ## Usage
//!
//! ```bash
//! # Evaluate the latest record in ./snapshots/ on the default list
//! cargo run --release --bin evaluate
//!
//! # Flip evaluation with timing on a custom list
//! cargo run --release --bin evaluate -- --flipped-eval --measure-time \
//!     --data-dir /data/cityscapes --data-list list/val.txt
//!
//! # Use the wgpu backend and keep colorized predictions
//! cargo run --release --no-default-features --features wgpu --bin evaluate -- \
//!     --model snapshots/model.ckpt-60000.mpk --save-predictions
//! ```

pub mod args;
pub mod backend;
pub mod reporter;

pub use args::Args;
pub use backend::{create_device, get_backend_name, SelectedBackend, SelectedDevice};
pub use reporter::{write_summary, ConsoleReporter};
