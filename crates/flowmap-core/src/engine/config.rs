//! Engine configuration.

use derive_builder::Builder;

use crate::transform::script::DEFAULT_INDENT;

/// Configuration for import and compile.
#[derive(Debug, Clone, PartialEq, Eq, Builder)]
#[builder(setter(into), build_fn(validate = "Self::validate"))]
pub struct EngineConfig {
    /// Extra indent, in columns, of script block literal lines.
    #[builder(default = "DEFAULT_INDENT")]
    pub script_indent: usize,

    /// Wire the start node to the first state when the document names no
    /// entry state.
    #[builder(default = "true")]
    pub entry_fallback: bool,

    /// Skip states of unregistered types instead of failing the import.
    #[builder(default = "true")]
    pub skip_unregistered: bool,
}

impl EngineConfigBuilder {
    fn validate(&self) -> Result<(), String> {
        if let Some(indent) = self.script_indent
            && indent == 0
        {
            return Err("script_indent must be at least 1".into());
        }
        Ok(())
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            script_indent: DEFAULT_INDENT,
            entry_fallback: true,
            skip_unregistered: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let config = EngineConfigBuilder::default().build().unwrap();
        assert_eq!(config, EngineConfig::default());
    }

    #[test]
    fn test_builder_rejects_zero_indent() {
        let result = EngineConfigBuilder::default().script_indent(0usize).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_builder_overrides() {
        let config = EngineConfigBuilder::default()
            .script_indent(4usize)
            .skip_unregistered(false)
            .build()
            .unwrap();
        assert_eq!(config.script_indent, 4);
        assert!(!config.skip_unregistered);
        assert!(config.entry_fallback);
    }
}
