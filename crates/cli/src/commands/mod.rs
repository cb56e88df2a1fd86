//! CLI commands for best-arm inference on synthetic experiments.

pub mod calibrate;
pub mod common;
pub mod multiple;
pub mod single;

pub use calibrate::{run_calibrate, CalibrateArgs};
pub use multiple::{run_multiple, MultipleArgs};
pub use single::{run_single, SingleArgs};
