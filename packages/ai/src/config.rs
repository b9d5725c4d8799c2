// ABOUTME: Generation service configuration loaded from the environment
// ABOUTME: Missing API key is allowed and means every section falls back to placeholder content

use std::env;
use std::time::Duration;

use doculens_core::constants::{
    ANTHROPIC_API_KEY, DOCULENS_AI_BASE_URL, DOCULENS_AI_MAX_TOKENS, DOCULENS_AI_MODEL,
    DOCULENS_AI_TEMPERATURE, DOCULENS_AI_TIMEOUT_SECS,
};
use thiserror::Error;

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-3-haiku-20240307";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value}")]
    InvalidNumber { var: &'static str, value: String },

    #[error("{var} is out of range: {value}")]
    OutOfRange { var: &'static str, value: String },
}

#[derive(Debug, Clone)]
pub struct GenerationConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Upper bound for a single section call, connection included
    pub timeout: Duration,
    pub base_url: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            base_url: DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl GenerationConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let api_key = env::var(ANTHROPIC_API_KEY)
            .ok()
            .filter(|key| !key.trim().is_empty());

        let model = env::var(DOCULENS_AI_MODEL).unwrap_or(defaults.model);

        let max_tokens = parse_var(DOCULENS_AI_MAX_TOKENS, defaults.max_tokens)?;
        if max_tokens == 0 {
            return Err(ConfigError::OutOfRange {
                var: DOCULENS_AI_MAX_TOKENS,
                value: max_tokens.to_string(),
            });
        }

        let temperature = parse_var(DOCULENS_AI_TEMPERATURE, defaults.temperature)?;
        if !(0.0..=1.0).contains(&temperature) {
            return Err(ConfigError::OutOfRange {
                var: DOCULENS_AI_TEMPERATURE,
                value: temperature.to_string(),
            });
        }

        let timeout_secs = parse_var(DOCULENS_AI_TIMEOUT_SECS, DEFAULT_TIMEOUT_SECS)?;
        if timeout_secs == 0 {
            return Err(ConfigError::OutOfRange {
                var: DOCULENS_AI_TIMEOUT_SECS,
                value: timeout_secs.to_string(),
            });
        }

        let base_url = env::var(DOCULENS_AI_BASE_URL)
            .map(|url| url.trim_end_matches('/').to_string())
            .unwrap_or(defaults.base_url);

        Ok(Self {
            api_key,
            model,
            max_tokens,
            temperature,
            timeout: Duration::from_secs(timeout_secs),
            base_url,
        })
    }
}

fn parse_var<T: std::str::FromStr>(var: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(var) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map_err(|_| ConfigError::InvalidNumber { var, value }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Environment is process-global; keep every env-mutating assertion in one test.
    #[test]
    fn test_config_from_env() {
        env::remove_var(DOCULENS_AI_MODEL);
        env::remove_var(DOCULENS_AI_MAX_TOKENS);
        env::remove_var(DOCULENS_AI_TEMPERATURE);
        env::remove_var(DOCULENS_AI_TIMEOUT_SECS);
        env::remove_var(DOCULENS_AI_BASE_URL);

        let config = GenerationConfig::from_env().unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, DEFAULT_MAX_TOKENS);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.base_url, DEFAULT_BASE_URL);

        env::set_var(DOCULENS_AI_TIMEOUT_SECS, "30");
        env::set_var(DOCULENS_AI_BASE_URL, "http://localhost:9999/");
        let config = GenerationConfig::from_env().unwrap();
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.base_url, "http://localhost:9999");

        env::set_var(DOCULENS_AI_MAX_TOKENS, "lots");
        assert_eq!(
            GenerationConfig::from_env().unwrap_err(),
            ConfigError::InvalidNumber {
                var: DOCULENS_AI_MAX_TOKENS,
                value: "lots".to_string()
            }
        );
        env::remove_var(DOCULENS_AI_MAX_TOKENS);

        env::set_var(DOCULENS_AI_TEMPERATURE, "1.5");
        assert!(matches!(
            GenerationConfig::from_env(),
            Err(ConfigError::OutOfRange { .. })
        ));

        env::remove_var(DOCULENS_AI_TEMPERATURE);
        env::remove_var(DOCULENS_AI_TIMEOUT_SECS);
        env::remove_var(DOCULENS_AI_BASE_URL);
    }
}
