//! Configuration
//!
//! The bot reads one JSON5 file. Every field has a default, so a missing file
//! or a partial file is fine.
//!
//! ```json5
//! {
//!   voting: { expirySeconds: 300, commandPrefix: "!" },
//!   logging: { level: "info", format: "text" },
//! }
//! ```

use crate::logging::LoggingConfig;
use crate::polls::{VotingSettings, DEFAULT_EXPIRY_DELAY};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Environment variable naming the config file
pub const CONFIG_PATH_ENV_VAR: &str = "VOTEBOT_CONFIG_PATH";

/// File name used under the platform config directory
const CONFIG_FILE_NAME: &str = "config.json5";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Root configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BotConfig {
    /// Poll behaviour
    pub voting: VotingConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Poll behaviour settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct VotingConfig {
    /// Seconds an evaluated poll stays readable before removal
    pub expiry_seconds: u64,
    /// Command prefix shown in voting instructions
    pub command_prefix: String,
}

impl Default for VotingConfig {
    fn default() -> Self {
        Self {
            expiry_seconds: DEFAULT_EXPIRY_DELAY.as_secs(),
            command_prefix: "!".to_string(),
        }
    }
}

impl VotingConfig {
    /// Settings for the voting service
    pub fn settings(&self) -> VotingSettings {
        VotingSettings {
            expiry_delay: Duration::from_secs(self.expiry_seconds),
            command_prefix: self.command_prefix.clone(),
        }
    }
}

impl BotConfig {
    /// Check values serde cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.voting.expiry_seconds == 0 {
            return Err(ConfigError::Invalid(
                "voting.expirySeconds must be greater than 0".to_string(),
            ));
        }
        if self.voting.command_prefix.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "voting.commandPrefix must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve the config file path: `VOTEBOT_CONFIG_PATH`, else
/// `<config dir>/votebot/config.json5`, else `./votebot.json5`
pub fn get_config_path() -> PathBuf {
    if let Some(path) = std::env::var_os(CONFIG_PATH_ENV_VAR).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    dirs::config_dir()
        .map(|dir| dir.join("votebot").join(CONFIG_FILE_NAME))
        .unwrap_or_else(|| PathBuf::from("votebot.json5"))
}

/// Load the config from the resolved path
pub fn load_config() -> Result<BotConfig, ConfigError> {
    load_config_from(&get_config_path())
}

/// Load and validate the config at `path`. A missing file yields defaults.
pub fn load_config_from(path: &Path) -> Result<BotConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No config file, using defaults");
            return Ok(BotConfig::default());
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    let config = parse_config(&raw).map_err(|message| ConfigError::Parse {
        path: path.to_path_buf(),
        message,
    })?;
    config.validate()?;
    Ok(config)
}

/// Parse JSON5 config text
pub fn parse_config(raw: &str) -> Result<BotConfig, String> {
    if raw.trim().is_empty() {
        return Ok(BotConfig::default());
    }
    json5::from_str::<BotConfig>(raw).map_err(|e| e.to_string())
}
