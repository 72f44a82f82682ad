//! Configuration loading and validation.

mod types;
mod validation;

pub use types::*;

use crate::error::Result;
use std::path::Path;

/// Environment variable overriding the source password.
pub const SOURCE_PASSWORD_ENV: &str = "PGSYNC_SOURCE_PASSWORD";
/// Environment variable overriding the target password.
pub const TARGET_PASSWORD_ENV: &str = "PGSYNC_TARGET_PASSWORD";

impl Config {
    /// Load configuration from a YAML file, applying environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Parse configuration from a YAML string, applying environment overrides.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let mut config: Config = serde_yaml::from_str(yaml)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Pull credentials from the environment when set.
    fn apply_env_overrides(&mut self) {
        if let Ok(password) = std::env::var(SOURCE_PASSWORD_ENV) {
            self.source.password = password;
        }
        if let Ok(password) = std::env::var(TARGET_PASSWORD_ENV) {
            self.target.password = password;
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<()> {
        validation::validate(self)
    }
}
