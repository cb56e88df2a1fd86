//! Error types for best-arm inference.
//!
//! Every failure in the inference core is surfaced as an [`InferenceError`].
//! Errors raised inside an aggregate call are wrapped in
//! [`InferenceError::TrialFailed`] so the caller can tell which split or
//! permutation replicate produced them.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Convenience alias used throughout the inference crates.
pub type Result<T> = std::result::Result<T, InferenceError>;

/// Locates a single Monte-Carlo trial inside an aggregate test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trial {
    /// One of the real-data splits used for the observed statistic.
    ObservedSplit {
        /// Split index.
        split: usize,
    },
    /// A split evaluated on a permuted, residual-randomized dataset.
    Permutation {
        /// Permutation replicate index.
        replicate: usize,
        /// Split index within the replicate.
        split: usize,
    },
    /// One dataset of a repeated-sampling calibration study.
    Replication {
        /// Replication index.
        index: usize,
    },
}

impl fmt::Display for Trial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ObservedSplit { split } => write!(f, "observed split {split}"),
            Self::Permutation { replicate, split } => {
                write!(f, "permutation {replicate}, split {split}")
            }
            Self::Replication { index } => write!(f, "replication {index}"),
        }
    }
}

/// Errors produced by the inference core.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InferenceError {
    /// Outcome and arm-label vectors differ in length.
    #[error("length mismatch: {outcomes} outcomes but {arms} arm labels")]
    LengthMismatch {
        /// Number of outcomes.
        outcomes: usize,
        /// Number of arm labels.
        arms: usize,
    },

    /// No observations were supplied.
    #[error("observation set is empty")]
    EmptyObservations,

    /// An outcome is NaN or infinite.
    #[error("outcome at index {index} is not finite: {value}")]
    NonFiniteOutcome {
        /// Unit index.
        index: usize,
        /// Offending value.
        value: f64,
    },

    /// Arm labels do not cover exactly `{0, ..., n_arms - 1}`.
    #[error(
        "arm labels must be exactly {{0..{n_arms}}}: missing {missing:?}, unexpected {unexpected:?}"
    )]
    InvalidArmSupport {
        /// Declared or implied number of arms.
        n_arms: usize,
        /// Labels in range that never occur.
        missing: Vec<usize>,
        /// Labels that fall outside the range.
        unexpected: Vec<usize>,
    },

    /// Split size outside `0 < b < n`.
    #[error("split size {split_size} must satisfy 0 < b < {n_samples}")]
    InvalidSplitSize {
        /// Requested split size.
        split_size: usize,
        /// Number of observations.
        n_samples: usize,
    },

    /// A scalar parameter is NaN or infinite.
    #[error("{name} must be finite, got {value}")]
    NonFiniteParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// A probability-valued parameter lies outside `(0, 1)`.
    #[error("{name} must lie strictly between 0 and 1, got {value}")]
    InvalidProbability {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// A trial count was zero.
    #[error("{name} must be positive")]
    ZeroTrialCount {
        /// Parameter name.
        name: &'static str,
    },

    /// A selection index set is malformed.
    #[error("invalid selection set: {reason}")]
    InvalidSelection {
        /// What is wrong with it.
        reason: String,
    },

    /// The selection subset contains no arm at all.
    #[error("selection subset contains no observations")]
    EmptySelection,

    /// The selected arm has too few estimation-set observations.
    #[error("arm {arm} has {count} estimation observation(s); at least 2 are required")]
    InsufficientEstimationData {
        /// Selected arm.
        arm: usize,
        /// Observations of that arm in the estimation set.
        count: usize,
    },

    /// The selected arm's estimation outcomes have zero spread.
    #[error("arm {arm} has zero standard error over {count} estimation observations")]
    ZeroStandardError {
        /// Selected arm.
        arm: usize,
        /// Observations of that arm in the estimation set.
        count: usize,
    },

    /// A synthetic design is inconsistent.
    #[error("invalid synthetic design: {reason}")]
    InvalidDesign {
        /// What is wrong with it.
        reason: String,
    },

    /// A worker pool could not be created.
    #[error("thread pool: {0}")]
    ThreadPool(String),

    /// A trial inside an aggregate test failed.
    #[error("{trial} failed: {source}")]
    TrialFailed {
        /// Which trial.
        trial: Trial,
        /// The underlying failure.
        source: Box<InferenceError>,
    },
}

impl InferenceError {
    /// Wraps an error with the trial that raised it.
    #[must_use]
    pub fn in_trial(self, trial: Trial) -> Self {
        Self::TrialFailed {
            trial,
            source: Box::new(self),
        }
    }

    /// Returns true for per-trial numeric failures (too little data or zero
    /// spread in the estimation set), looking through trial wrappers.
    #[must_use]
    pub fn is_degenerate_trial(&self) -> bool {
        match self {
            Self::InsufficientEstimationData { .. } | Self::ZeroStandardError { .. } => true,
            Self::TrialFailed { source, .. } => source.is_degenerate_trial(),
            _ => false,
        }
    }

    /// Returns the failing trial if this error came from an aggregate call.
    #[must_use]
    pub fn trial(&self) -> Option<Trial> {
        match self {
            Self::TrialFailed { trial, .. } => Some(*trial),
            _ => None,
        }
    }
}
