//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use crate::config::schema::AgriConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Path of the config file, when not given on the command line.
pub const CONFIG_PATH_ENV_VAR: &str = "AGRIDATUM_CONFIG";

/// Blockfrost project id.
pub const PROJECT_ID_ENV_VAR: &str = "BLOCKFROST_PROJECT_ID";

/// Error type for configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    Io(std::io::Error),
    Parse(toml::de::Error),
    Validation(Vec<ValidationError>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(e) => write!(f, "IO error: {}", e),
            ConfigError::Parse(e) => write!(f, "Parse error: {}", e),
            ConfigError::Validation(errors) => {
                write!(f, "Validation failed: ")?;
                for (i, err) in errors.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", err)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Parse and validate configuration from TOML text, applying environment
/// overrides in between.
pub fn parse_config(content: &str) -> Result<AgriConfig, ConfigError> {
    let mut config: AgriConfig = toml::from_str(content).map_err(ConfigError::Parse)?;
    apply_env_overrides(&mut config);

    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<AgriConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(ConfigError::Io)?;
    parse_config(&content)
}

/// Load from `path`, else from `AGRIDATUM_CONFIG`, else defaults plus
/// environment overrides.
pub fn load_or_default(path: Option<&Path>) -> Result<AgriConfig, ConfigError> {
    if let Some(path) = path {
        return load_config(path);
    }
    match std::env::var(CONFIG_PATH_ENV_VAR) {
        Ok(from_env) if !from_env.trim().is_empty() => load_config(Path::new(&from_env)),
        _ => parse_config(""),
    }
}

/// Secrets and deployment-specific values come from the environment.
/// A project id in the environment also turns the chain integration on.
fn apply_env_overrides(config: &mut AgriConfig) {
    if let Ok(project_id) = std::env::var(PROJECT_ID_ENV_VAR) {
        if !project_id.trim().is_empty() {
            config.chain.project_id = project_id.trim().to_string();
            config.chain.enabled = true;
        }
    }
}
