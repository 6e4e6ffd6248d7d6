pub mod config;
pub mod config_loader;
pub mod error;
pub mod experiment;
pub mod numeric;
pub mod random;

pub use config::{BayesianSettings, EngineConfig, FrequentistSettings, RoiSettings};
pub use config_loader::{ConfigLoader, ExperimentFile};
pub use error::{DegenerateResult, EngineError, Result};
pub use experiment::{validate_probability, TestConfiguration, TestData};
pub use numeric::{inverse_normal, normal_cdf};
pub use random::{beta_random, gamma_random, seeded_source, standard_normal, UniformSource};
