//! Logging configuration, read from the environment.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Json,
    Pretty,
    Compact,
}

impl LogFormat {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "json" => Some(LogFormat::Json),
            "pretty" => Some(LogFormat::Pretty),
            "compact" => Some(LogFormat::Compact),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directives, e.g. `info,essentials_infra=debug`.
    pub filter: String,
    pub format: LogFormat,
    /// Unrecognized `ESSENTIALS_LOG_FORMAT` value, reported once logging is up.
    #[serde(skip)]
    pub rejected_format: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
            format: LogFormat::Json,
            rejected_format: None,
        }
    }
}

impl ObservabilityConfig {
    pub const FILTER_VAR: &'static str = "RUST_LOG";
    pub const FORMAT_VAR: &'static str = "ESSENTIALS_LOG_FORMAT";

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let raw_format = lookup(Self::FORMAT_VAR);
        let format = raw_format.as_deref().map(LogFormat::parse);
        let rejected_format = match format {
            Some(None) => raw_format.clone(),
            _ => None,
        };

        Self {
            filter: lookup(Self::FILTER_VAR)
                .filter(|f| !f.trim().is_empty())
                .unwrap_or(defaults.filter),
            format: format.flatten().unwrap_or(defaults.format),
            rejected_format,
        }
    }
}
