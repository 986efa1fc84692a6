//! Engine configuration.

use anyhow::anyhow;
use clap::Args;
use flowmap_core::engine::{EngineConfig, EngineConfigBuilder};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_CONFIG;

/// Import and compile options.
///
/// # Environment Variables
///
/// - `FLOWMAP_SCRIPT_INDENT` - Extra indent of script block lines (default: 2)
/// - `FLOWMAP_STRICT` - Fail on unregistered state types instead of skipping them
/// - `FLOWMAP_NO_ENTRY_FALLBACK` - Do not treat the first state as the entry state
#[derive(Debug, Clone, Args, Serialize, Deserialize)]
#[must_use = "config does nothing unless you use it"]
pub struct EngineArgs {
    /// Extra indentation, in columns, of embedded script block lines.
    #[arg(long, global = true, env = "FLOWMAP_SCRIPT_INDENT", default_value_t = 2)]
    pub script_indent: usize,

    /// Fail when a state has an unregistered type.
    #[arg(long, global = true, env = "FLOWMAP_STRICT")]
    #[serde(default)]
    pub strict: bool,

    /// Leave the start node unconnected when the document names no entry state.
    #[arg(long, global = true, env = "FLOWMAP_NO_ENTRY_FALLBACK")]
    #[serde(default)]
    pub no_entry_fallback: bool,
}

impl EngineArgs {
    /// Builds the library configuration.
    pub fn to_engine_config(&self) -> anyhow::Result<EngineConfig> {
        EngineConfigBuilder::default()
            .script_indent(self.script_indent)
            .skip_unregistered(!self.strict)
            .entry_fallback(!self.no_entry_fallback)
            .build()
            .map_err(|e| anyhow!("{e}"))
    }

    /// Logs the configuration at debug level.
    pub fn log(&self) {
        tracing::debug!(
            target: TRACING_TARGET_CONFIG,
            script_indent = self.script_indent,
            strict = self.strict,
            no_entry_fallback = self.no_entry_fallback,
            "Engine configuration"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_indent_rejected() {
        let args = EngineArgs {
            script_indent: 0,
            strict: false,
            no_entry_fallback: false,
        };
        assert!(args.to_engine_config().is_err());
    }
}
