//! Runtime configuration.
//!
//! ```yaml
//! deployment:
//!   api_url: https://engine.example.com/flowable-rest/
//!   user: admin
//!   password: secret
//!   deployment_path: app-repository/deployments
//!   timeout_secs: 30
//! ```
//!
//! Every field has a default; `MODELER_DEPLOYMENT_URL`,
//! `MODELER_DEPLOYMENT_USER` and `MODELER_DEPLOYMENT_PASSWORD` override the
//! file.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_DEPLOYMENT_URL: &str = "MODELER_DEPLOYMENT_URL";
pub const ENV_DEPLOYMENT_USER: &str = "MODELER_DEPLOYMENT_USER";
pub const ENV_DEPLOYMENT_PASSWORD: &str = "MODELER_DEPLOYMENT_PASSWORD";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelerConfig {
    pub deployment: DeploymentConfig,
}

/// Where and how deployable archives are published.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeploymentConfig {
    pub api_url: String,
    pub user: String,
    pub password: String,
    pub deployment_path: String,
    pub timeout_secs: u64,
}

impl Default for DeploymentConfig {
    fn default() -> Self {
        Self {
            api_url: "http://localhost:8080/flowable-rest/".to_string(),
            user: "admin".to_string(),
            password: "test".to_string(),
            deployment_path: "app-repository/deployments".to_string(),
            timeout_secs: 30,
        }
    }
}

impl DeploymentConfig {
    /// Full deployment endpoint: `api_url` joined with `deployment_path`.
    pub fn deployment_url(&self) -> String {
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            self.deployment_path.trim_start_matches('/')
        )
    }
}

impl ModelerConfig {
    pub fn from_yaml_str(input: &str) -> Result<Self, ConfigError> {
        if input.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(input)?)
    }

    /// Read a YAML file and apply environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let input = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_yaml_str(&input)?.with_env_overrides();
        tracing::debug!(path = %path.display(), url = %config.deployment.api_url, "loaded config");
        Ok(config)
    }

    /// Apply overrides from the process environment.
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(|name| std::env::var(name).ok())
    }

    /// Apply overrides from `lookup`, which maps a variable name to its value.
    pub fn with_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let deployment = &mut self.deployment;
        for (name, field) in [
            (ENV_DEPLOYMENT_URL, &mut deployment.api_url),
            (ENV_DEPLOYMENT_USER, &mut deployment.user),
            (ENV_DEPLOYMENT_PASSWORD, &mut deployment.password),
        ] {
            if let Some(value) = lookup(name).filter(|v| !v.is_empty()) {
                *field = value;
            }
        }
        self
    }
}
