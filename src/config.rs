//! Environment-driven configuration.
//!
//! All settings come from `SENPAI_*` environment variables, with a `.env`
//! file loaded first if present. Only the API key is mandatory.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("SENPAI_API_KEY is not set")]
    MissingApiKey,

    #[error("invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("no data directory available; set SENPAI_DATA_DIR")]
    NoDataDir,
}

pub const DEFAULT_BASE_URL: &str = "https://api.cerebras.ai/v1";
pub const DEFAULT_MODEL: &str = "qwen-3-235b-a22b";
pub const DEFAULT_TEMPERATURE: f32 = 0.6;
pub const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub data_dir: PathBuf,
    pub user_id: String,
}

impl Config {
    /// Load configuration from the environment (and `.env`, if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let api_key = std::env::var("SENPAI_API_KEY").map_err(|_| ConfigError::MissingApiKey)?;

        let base_url = env_or("SENPAI_BASE_URL", DEFAULT_BASE_URL);
        let model = env_or("SENPAI_MODEL", DEFAULT_MODEL);
        let temperature = parse_env("SENPAI_TEMPERATURE", DEFAULT_TEMPERATURE)?;
        let max_tokens = parse_env("SENPAI_MAX_TOKENS", DEFAULT_MAX_TOKENS)?;
        let user_id = env_or("SENPAI_USER_ID", "default");

        let data_dir = match std::env::var("SENPAI_DATA_DIR") {
            Ok(dir) => PathBuf::from(dir),
            Err(_) => dirs::data_local_dir()
                .map(|d| d.join("senpai"))
                .ok_or(ConfigError::NoDataDir)?,
        };

        Ok(Self {
            api_key,
            base_url,
            model,
            temperature,
            max_tokens,
            data_dir,
            user_id,
        })
    }
}

fn env_or(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_env<T: std::str::FromStr>(name: &'static str, default: T) -> Result<T, ConfigError> {
    match std::env::var(name) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(default),
    }
}
