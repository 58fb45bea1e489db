//! Structured logging setup
//!
//! One `tracing` subscriber for the whole process, writing to stderr:
//! - `json`: one JSON object per line
//! - `pretty`: human-readable, multi-line
//!
//! `RUST_LOG`, when set, overrides the configured level.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::{fmt as fmt_layer, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use super::{ObservabilityError, ObservabilityResult};

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// One JSON object per line
    #[default]
    Json,
    /// Human-readable output
    Pretty,
}

impl LogFormat {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogFormat::Json => "json",
            LogFormat::Pretty => "pretty",
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LogFormat {
    type Err = ObservabilityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "json" => Ok(LogFormat::Json),
            "pretty" => Ok(LogFormat::Pretty),
            other => Err(ObservabilityError::InvalidConfig(format!(
                "unknown log format '{}'",
                other
            ))),
        }
    }
}

/// Build the level filter, letting `RUST_LOG` win over `level`
pub fn build_filter(level: &str) -> ObservabilityResult<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|e| ObservabilityError::InvalidConfig(format!("log level '{}': {}", level, e)))
}

/// Check a level directive without installing anything
pub fn validate_level(level: &str) -> ObservabilityResult<()> {
    EnvFilter::try_new(level)
        .map(|_| ())
        .map_err(|e| ObservabilityError::InvalidConfig(format!("log level '{}': {}", level, e)))
}

/// Install the global subscriber.
///
/// # Errors
///
/// Fails on an invalid level or when a global subscriber is already set.
pub fn init_logging(format: LogFormat, level: &str) -> ObservabilityResult<()> {
    let filter = build_filter(level)?;

    let result = match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt_layer::layer()
                    .json()
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    };

    result.map_err(|e| ObservabilityError::InitFailed(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parsing() {
        assert_eq!("json".parse::<LogFormat>().unwrap(), LogFormat::Json);
        assert_eq!("PRETTY".parse::<LogFormat>().unwrap(), LogFormat::Pretty);
        assert!("xml".parse::<LogFormat>().is_err());
        assert_eq!(LogFormat::default(), LogFormat::Json);
    }

    #[test]
    fn test_format_serde() {
        assert_eq!(
            serde_json::to_string(&LogFormat::Pretty).unwrap(),
            "\"pretty\""
        );
    }

    #[test]
    fn test_validate_level() {
        assert!(validate_level("info").is_ok());
        assert!(validate_level("unirest=debug,tower_http=info").is_ok());
        assert!(validate_level("unirest=loudest").is_err());
    }
}
