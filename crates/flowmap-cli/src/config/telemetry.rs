//! Logging configuration.

use clap::{Args, ValueEnum};
use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

/// Output format of log lines.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[derive(ValueEnum, AsRefStr, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per line.
    Json,
}

/// Logging options.
///
/// Verbosity is controlled with `RUST_LOG` (default: `info`).
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
pub struct TelemetryConfig {
    /// Log line format.
    #[arg(
        long,
        global = true,
        env = "FLOWMAP_LOG_FORMAT",
        value_enum,
        default_value_t = LogFormat::Text
    )]
    #[serde(default)]
    pub log_format: LogFormat,
}
