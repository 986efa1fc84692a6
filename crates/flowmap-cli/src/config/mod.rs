//! CLI configuration management.
//!
//! This module defines the complete CLI configuration hierarchy:
//!
//! ```text
//! Cli
//! ├── command: Command             # import, compile or check
//! ├── engine: EngineArgs           # script indent, strict mode, entry fallback
//! └── telemetry: TelemetryConfig   # log format
//! ```
//!
//! All options can be provided via CLI arguments or `FLOWMAP_*` environment
//! variables. Use `--help` to see all available options.
//!
//! # Example
//!
//! ```bash
//! flowmap --strict check workflow.yaml
//!
//! # Or via environment variables
//! FLOWMAP_STRICT=true flowmap check workflow.yaml
//! ```

mod engine;
mod telemetry;

use std::process;

use clap::Parser;
use serde::{Deserialize, Serialize};

pub use self::engine::EngineArgs;
pub use self::telemetry::{LogFormat, TelemetryConfig};
use crate::TRACING_TARGET_STARTUP;
use crate::command::Command;

/// Complete CLI configuration.
#[derive(Debug, Clone, Parser, Serialize, Deserialize)]
#[command(name = "flowmap")]
#[command(about = "Convert workflow documents to editor graphs and back")]
#[command(version)]
pub struct Cli {
    /// Operation to run.
    #[command(subcommand)]
    pub command: Command,

    /// Import and compile options.
    #[clap(flatten)]
    pub engine: EngineArgs,

    /// Logging options.
    #[clap(flatten)]
    pub telemetry: TelemetryConfig,
}

impl Cli {
    /// Loads environment variables from .env file (if enabled) and parses CLI arguments.
    ///
    /// The .env file is loaded first so that clap's `env` fallbacks can see
    /// its values.
    pub fn init() -> Self {
        Self::load_dotenv();
        Self::parse()
    }

    /// Loads environment variables from .env file if the dotenv feature is enabled.
    #[cfg(feature = "dotenv")]
    fn load_dotenv() {
        if let Err(err) = dotenvy::dotenv()
            && !err.not_found()
        {
            eprintln!("Warning: failed to load .env file: {err}");
        }
    }

    /// No-op when dotenv feature is disabled.
    #[cfg(not(feature = "dotenv"))]
    fn load_dotenv() {}

    /// Logs build information and configuration at debug level.
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_STARTUP,
            version = env!("CARGO_PKG_VERSION"),
            pid = process::id(),
            features = ?Self::enabled_features(),
            "Build information"
        );
        self.engine.log();
    }

    /// Returns a list of enabled compile-time features.
    fn enabled_features() -> Vec<&'static str> {
        [cfg!(feature = "dotenv").then_some("dotenv")]
            .into_iter()
            .flatten()
            .collect()
    }
}
