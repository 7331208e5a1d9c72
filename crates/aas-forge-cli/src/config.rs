//! CLI configuration.

use aas_forge_schema::{ValidatorConfig, XsdSource};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::time::Duration;

/// CLI configuration.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    /// Validation service settings
    pub validator: ValidatorConfig,
}

impl CliConfig {
    /// Load configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `AAS_FORGE_VALIDATOR_URL`: validation service endpoint
    /// - `AAS_FORGE_SCHEMA_URL`: where to fetch the AAS XSD
    /// - `AAS_FORGE_SCHEMA_PATH`: local AAS XSD; takes precedence over the URL
    /// - `AAS_FORGE_TIMEOUT_SECS`: bound on each service call
    /// - `AAS_FORGE_BEARER_TOKEN`: token sent to the validation service
    ///
    /// # Errors
    ///
    /// Returns error if a URL or the timeout is malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(url) = var("AAS_FORGE_VALIDATOR_URL") {
            url::Url::parse(&url).context("Invalid AAS_FORGE_VALIDATOR_URL")?;
            config.validator.validator_url = url;
        }

        if let Some(url) = var("AAS_FORGE_SCHEMA_URL") {
            url::Url::parse(&url).context("Invalid AAS_FORGE_SCHEMA_URL")?;
            config.validator.schema = XsdSource::Url(url);
        }

        if let Some(path) = var("AAS_FORGE_SCHEMA_PATH") {
            config.validator.schema = XsdSource::File(PathBuf::from(path));
        }

        if let Some(secs) = var("AAS_FORGE_TIMEOUT_SECS") {
            let secs: u64 = secs.parse().context("Invalid AAS_FORGE_TIMEOUT_SECS")?;
            config.validator.timeout = Duration::from_secs(secs);
        }

        if let Some(token) = var("AAS_FORGE_BEARER_TOKEN") {
            config.validator.bearer_token = Some(token);
        }

        Ok(config)
    }
}
