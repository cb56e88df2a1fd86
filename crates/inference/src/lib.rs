//! Winner's-curse-corrected inference for the best arm of a k-arm experiment.
//!
//! The best arm is chosen on one random subset of units and its mean is
//! tested on the complement ([`SplitEstimator`]). [`RandomizationTest`]
//! averages that split p-value over many splits and calibrates the average
//! against a permutation distribution built from the null-implied means and
//! the residuals of [`ResidualModel`].

pub mod calibration;
pub mod permutation;
pub mod residual;
pub mod selector;
pub mod split;
pub mod streams;
pub mod synthetic;
mod workers;

pub use best_arm_core::{InferenceError, Observations, Result, Trial};
pub use calibration::{calibrate, CalibrationSummary};
pub use permutation::{MultipleTestReport, RandomizationTest};
pub use residual::{ResidualDecomposition, ResidualModel};
pub use selector::ArmSelector;
pub use split::{SplitEstimate, SplitEstimator};
pub use streams::{RngStreams, StreamDomain};
pub use synthetic::SyntheticDesign;
