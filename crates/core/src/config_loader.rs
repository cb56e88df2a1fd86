use crate::config::InferenceConfig;
use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Json, Serialized, Toml},
    Figment,
};
use std::path::Path;
use tracing::debug;

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/Inference.toml";

/// Prefix for environment overrides, e.g. `BEST_ARM_ENGINE__NUM_SPLITS=50`.
pub const ENV_PREFIX: &str = "BEST_ARM_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads configuration by layering built-in defaults, the default TOML
    /// file, an optional JSON file, and environment variables.
    ///
    /// # Errors
    ///
    /// Returns an error if a present configuration file cannot be parsed.
    pub fn load() -> Result<InferenceConfig> {
        Self::figment(Path::new(DEFAULT_CONFIG_PATH))
            .join(Json::file("config/Inference.json"))
            .extract()
            .context("failed to load inference configuration")
    }

    /// Loads configuration from a specific TOML file, still applying defaults
    /// and environment overrides.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or a value has the wrong
    /// type.
    pub fn load_from(path: &Path) -> Result<InferenceConfig> {
        debug!(path = %path.display(), "loading inference configuration");
        Self::figment(path)
            .extract()
            .with_context(|| format!("failed to load configuration from {}", path.display()))
    }

    fn figment(path: &Path) -> Figment {
        Figment::from(Serialized::defaults(InferenceConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }
}
