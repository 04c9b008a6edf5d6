//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{DeployerConfig, Network};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable selecting the network, as honoured by the Aptos SDKs.
pub const NETWORK_ENV_VAR: &str = "APTOS_NETWORK";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<DeployerConfig, ConfigError> {
    finish(read_config(Some(path))?)
}

/// Parse the file when given, otherwise start from defaults. Nothing is validated.
pub fn read_config(path: Option<&Path>) -> Result<DeployerConfig, ConfigError> {
    let Some(path) = path else {
        return Ok(DeployerConfig::default());
    };
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_config(&content)
}

/// Parse a TOML document without validating it.
pub fn parse_config(content: &str) -> Result<DeployerConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// A network name that did not parse and was left unapplied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IgnoredNetwork {
    /// Where the name came from: `APTOS_NETWORK` or `--network`.
    pub origin: &'static str,
    pub name: String,
    pub reason: String,
}

/// Apply the environment's network, then the command line's on top of it.
///
/// Returns the names that were not understood; the caller logs them once a
/// subscriber exists.
pub fn select_network(
    config: &mut DeployerConfig,
    env_name: Option<&str>,
    cli_name: Option<&str>,
) -> Vec<IgnoredNetwork> {
    [(NETWORK_ENV_VAR, env_name), ("--network", cli_name)]
        .into_iter()
        .filter_map(|(origin, name)| {
            let name = name.map(str::trim).filter(|n| !n.is_empty())?;
            match name.parse::<Network>() {
                Ok(network) => {
                    config.network.network = network;
                    None
                }
                Err(reason) => Some(IgnoredNetwork {
                    origin,
                    name: name.to_string(),
                    reason,
                }),
            }
        })
        .collect()
}

/// Validate a fully assembled configuration.
pub fn finish(config: DeployerConfig) -> Result<DeployerConfig, ConfigError> {
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}
