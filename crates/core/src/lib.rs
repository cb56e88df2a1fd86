//! Core types for best-arm inference: validated observations, the error
//! taxonomy, summary statistics and layered configuration.

pub mod config;
pub mod config_loader;
pub mod error;
pub mod observations;
pub mod stats;

pub use config::{DesignSettings, EngineSettings, InferenceConfig, ResidualBasis};
pub use config_loader::ConfigLoader;
pub use error::{InferenceError, Result, Trial};
pub use observations::Observations;
pub use stats::VarianceEstimator;
