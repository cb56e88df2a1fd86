use serde::{Deserialize, Serialize};

use crate::stats::VarianceEstimator;

/// Which per-arm means the residuals are taken against.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResidualBasis {
    /// Residuals against the means with the winning arm set to the null
    /// value, so that `Y = mu[Z] + eps` for the returned `mu`.
    #[default]
    Nulled,
    /// Residuals against the observed per-arm means.
    Observed,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InferenceConfig {
    pub engine: EngineSettings,
    pub design: DesignSettings,
}

/// Settings for the randomization test engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineSettings {
    /// Selection-set size b.
    pub split_size: usize,
    /// Hypothesized mean of the selected arm.
    pub null_value: f64,
    /// Real-data splits averaged into the observed statistic.
    pub num_splits: usize,
    /// Permutation replicates in the reference distribution.
    pub num_permutations: usize,
    /// Root seed; `None` draws one from entropy.
    pub seed: Option<u64>,
    /// Worker threads for trial loops; 0 uses the global rayon pool.
    pub num_threads: usize,
    pub variance_estimator: VarianceEstimator,
    pub residual_basis: ResidualBasis,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            split_size: 50,
            null_value: 0.0,
            num_splits: 20,
            num_permutations: 500,
            seed: None,
            num_threads: 0,
            variance_estimator: VarianceEstimator::default(),
            residual_basis: ResidualBasis::default(),
        }
    }
}

/// Synthetic balanced normal design used by the CLI and tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DesignSettings {
    pub samples: usize,
    pub means: Vec<f64>,
    pub variances: Vec<f64>,
}

impl Default for DesignSettings {
    fn default() -> Self {
        Self {
            samples: 100,
            means: vec![0.0, 0.0],
            variances: vec![1.0, 1.0],
        }
    }
}
