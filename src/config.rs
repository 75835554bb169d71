use crate::evaluator::DEFAULT_MAX_DEPTH;
use custom_error::custom_error;
use std::env;
use tracing_subscriber::EnvFilter;

pub const MAX_DEPTH_VAR: &str = "BANANA_MAX_DEPTH";
pub const LOG_VAR: &str = "BANANA_LOG";

static DEFAULT_LOG_FILTER: &str = "warn";

custom_error! {
    pub ConfigError

    InvalidMaxDepth{value: String, source: std::num::ParseIntError} = "invalid BANANA_MAX_DEPTH value {value}: {source}",
    ZeroMaxDepth = "BANANA_MAX_DEPTH must be at least 1",
    InvalidLogFilter{value: String, source: tracing_subscriber::filter::ParseError} = "invalid BANANA_LOG value {value}: {source}",
}

/// Runtime settings for the interpreter binary.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub max_depth: usize,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            log_filter: DEFAULT_LOG_FILTER.to_owned(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from `lookup`, which plays the role of the process
    /// environment. Unset variables fall back to their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(MAX_DEPTH_VAR) {
            let max_depth = value
                .trim()
                .parse::<usize>()
                .map_err(|source| ConfigError::InvalidMaxDepth {
                    value: value.clone(),
                    source,
                })?;
            if max_depth == 0 {
                return Err(ConfigError::ZeroMaxDepth);
            }
            config.max_depth = max_depth;
        }

        if let Some(value) = lookup(LOG_VAR) {
            config.log_filter = value;
        }
        config.env_filter()?;

        Ok(config)
    }

    pub fn env_filter(&self) -> Result<EnvFilter, ConfigError> {
        EnvFilter::try_new(&self.log_filter).map_err(|source| ConfigError::InvalidLogFilter {
            value: self.log_filter.clone(),
            source,
        })
    }
}
