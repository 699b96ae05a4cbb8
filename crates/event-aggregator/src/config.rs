//! Aggregator configuration from environment variables.

use std::env;

use crate::errors::ConfigError;

/// Default name used in log fields.
pub const DEFAULT_NAME: &str = "default";

/// Default number of registry slots reserved up front.
pub const DEFAULT_INITIAL_CAPACITY: usize = 16;

/// Settings for one [`EventAggregator`](crate::EventAggregator).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatorConfig {
    /// Name attached to every log line of this aggregator
    pub name: String,

    /// Registry slots reserved at construction
    pub initial_capacity: usize,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            initial_capacity: DEFAULT_INITIAL_CAPACITY,
        }
    }
}

impl AggregatorConfig {
    /// Config with the given name and default capacity.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Create configuration from environment variables, falling back to
    /// defaults for anything missing or unparsable.
    ///
    /// # Environment Variables
    ///
    /// - `AGGREGATOR_NAME`: Aggregator name (default: default)
    /// - `AGGREGATOR_INITIAL_CAPACITY`: Registry slots reserved up front (default: 16)
    pub fn from_env() -> Self {
        Self::try_from_env().unwrap_or_default()
    }

    /// Like [`from_env`](Self::from_env), but reports unparsable values.
    pub fn try_from_env() -> Result<Self, ConfigError> {
        let name = env::var("AGGREGATOR_NAME").unwrap_or_else(|_| DEFAULT_NAME.to_string());

        let initial_capacity = match env::var("AGGREGATOR_INITIAL_CAPACITY") {
            Ok(raw) => parse_capacity(&raw)?,
            Err(_) => DEFAULT_INITIAL_CAPACITY,
        };

        Ok(Self {
            name,
            initial_capacity,
        })
    }
}

fn parse_capacity(raw: &str) -> Result<usize, ConfigError> {
    raw.trim().parse().map_err(|_| ConfigError::Invalid {
        key: "AGGREGATOR_INITIAL_CAPACITY",
        value: raw.to_string(),
    })
}
