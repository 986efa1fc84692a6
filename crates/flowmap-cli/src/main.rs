#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod command;
mod config;
mod telemetry;

use std::process;

use anyhow::Context;
use flowmap_core::engine::Engine;
use flowmap_core::registry::NodeRegistry;

use crate::config::Cli;

// Tracing target constants
pub const TRACING_TARGET_STARTUP: &str = "flowmap_cli::startup";
pub const TRACING_TARGET_COMMAND: &str = "flowmap_cli::command";
pub const TRACING_TARGET_CONFIG: &str = "flowmap_cli::config";

fn main() {
    let Err(error) = run() else {
        process::exit(0);
    };

    if tracing::enabled!(tracing::Level::ERROR) {
        tracing::error!(
            target: TRACING_TARGET_COMMAND,
            error = %format!("{error:#}"),
            "command failed"
        );
    } else {
        eprintln!("Error: {error:#}");
    }

    process::exit(1);
}

/// Main application entry point.
fn run() -> anyhow::Result<()> {
    let cli = Cli::init();

    telemetry::init_tracing(cli.telemetry.log_format)?;
    cli.log();

    let config = cli
        .engine
        .to_engine_config()
        .context("invalid engine configuration")?;
    let engine = Engine::new(config, NodeRegistry::builtin());

    cli.command.run(&engine)
}
