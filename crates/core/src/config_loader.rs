use std::path::Path;

use anyhow::{Context, Result};
use figment::{
    providers::{Env, Format, Json, Toml},
    Figment,
};

use crate::config::EngineConfig;
use crate::experiment::{TestConfiguration, TestData};

/// Environment variable prefix for engine settings, e.g. `ABTEST_BAYESIAN__SEED=7`.
pub const ENV_PREFIX: &str = "ABTEST_";

pub struct ConfigLoader;

impl ConfigLoader {
    /// Loads engine configuration by merging TOML, environment variables, and JSON.
    ///
    /// Missing files are skipped; unset values fall back to defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file cannot be parsed or a value is out of domain.
    pub fn load() -> Result<EngineConfig> {
        Self::extract(
            Figment::new()
                .merge(Toml::file("config/Config.toml"))
                .merge(Self::env())
                .join(Json::file("config/Config.json")),
        )
    }

    /// Loads engine configuration with a specific profile overlay.
    ///
    /// # Errors
    ///
    /// Returns an error if a present file cannot be parsed or a value is out of domain.
    pub fn load_with_profile(profile: &str) -> Result<EngineConfig> {
        Self::extract(
            Figment::new()
                .merge(Toml::file("config/Config.toml"))
                .merge(Toml::file(format!("config/Config.{profile}.toml")))
                .merge(Self::env())
                .join(Json::file("config/Config.json")),
        )
    }

    /// Loads engine configuration from an explicit TOML file plus environment.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be parsed or a value is out of domain.
    pub fn load_from(path: impl AsRef<Path>) -> Result<EngineConfig> {
        Self::extract(
            Figment::new()
                .merge(Toml::file(path.as_ref()))
                .merge(Self::env()),
        )
    }

    /// Loads an experiment description (`[design]` and optional `[data]` tables)
    /// from a TOML or JSON file, chosen by extension.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_experiment(path: impl AsRef<Path>) -> Result<ExperimentFile> {
        let path = path.as_ref();
        let figment = match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Figment::new().merge(Json::file(path)),
            _ => Figment::new().merge(Toml::file(path)),
        };
        figment
            .extract()
            .with_context(|| format!("failed to load experiment from {}", path.display()))
    }

    fn env() -> Env {
        Env::prefixed(ENV_PREFIX).split("__")
    }

    fn extract(figment: Figment) -> Result<EngineConfig> {
        let config: EngineConfig = figment
            .extract()
            .context("failed to load engine configuration")?;
        config.validate()?;
        tracing::debug!(?config, "engine configuration loaded");
        Ok(config)
    }
}

/// Experiment inputs as stored on disk.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct ExperimentFile {
    pub design: TestConfiguration,
    #[serde(default)]
    pub data: Option<TestData>,
}
