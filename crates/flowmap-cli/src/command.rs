//! Subcommands.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::Subcommand;
use flowmap_core::engine::{Engine, ImportReport};
use flowmap_core::graph::{GraphDefinition, WorkflowGraph};
use serde::{Deserialize, Serialize};

use crate::TRACING_TARGET_COMMAND;

/// Operation to run.
#[derive(Debug, Clone, Subcommand, Serialize, Deserialize)]
pub enum Command {
    /// Convert a YAML workflow document into a graph snapshot (JSON).
    Import {
        /// Document to read.
        input: PathBuf,
        /// Where to write the snapshot; stdout if omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Convert a graph snapshot (JSON) back into a YAML workflow document.
    Compile {
        /// Snapshot to read.
        input: PathBuf,
        /// Where to write the document; stdout if omitted.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Import and re-compile a document, printing the normalized result.
    ///
    /// Fails if any state is skipped.
    Check {
        /// Document to read.
        input: PathBuf,
    },
}

impl Command {
    /// Runs the command.
    pub fn run(&self, engine: &Engine) -> anyhow::Result<()> {
        match self {
            Self::Import { input, output } => {
                let text = read(input)?;
                let snapshot = import(engine, &text)
                    .with_context(|| format!("failed to import {}", input.display()))?;
                write(output.as_deref(), &snapshot)
            }
            Self::Compile { input, output } => {
                let text = read(input)?;
                let document = compile(engine, &text)
                    .with_context(|| format!("failed to compile {}", input.display()))?;
                write(output.as_deref(), &document)
            }
            Self::Check { input } => {
                let text = read(input)?;
                let document = check(engine, &text)
                    .with_context(|| format!("check failed for {}", input.display()))?;
                write(None, &document)
            }
        }
    }
}

/// Imports YAML document text and returns the graph snapshot as JSON.
fn import(engine: &Engine, text: &str) -> anyhow::Result<String> {
    let ImportReport { graph, skipped } = engine.import_yaml(text)?;
    for state in &skipped {
        tracing::warn!(
            target: TRACING_TARGET_COMMAND,
            state = %state.id,
            type_name = %state.type_name,
            "State was not imported"
        );
    }

    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        nodes = graph.node_count(),
        edges = graph.edge_count(),
        "Document imported"
    );
    Ok(graph.to_definition().to_json()?)
}

/// Compiles a JSON graph snapshot and returns the YAML document.
fn compile(engine: &Engine, text: &str) -> anyhow::Result<String> {
    let definition = GraphDefinition::from_json(text).context("invalid graph snapshot")?;
    let graph = WorkflowGraph::from_definition(definition)?;
    Ok(engine.compile_yaml(&graph)?)
}

/// Imports and re-compiles YAML document text.
fn check(engine: &Engine, text: &str) -> anyhow::Result<String> {
    let report = engine.import_yaml(text)?;
    if !report.skipped.is_empty() {
        let ids: Vec<&str> = report.skipped.iter().map(|state| state.id.as_str()).collect();
        bail!("states of unregistered types: {}", ids.join(", "));
    }

    let yaml = engine.compile_yaml(&report.graph)?;
    tracing::info!(
        target: TRACING_TARGET_COMMAND,
        nodes = report.graph.node_count(),
        "Document is valid"
    );
    Ok(yaml)
}

fn read(path: &Path) -> anyhow::Result<String> {
    fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))
}

fn write(path: Option<&Path>, text: &str) -> anyhow::Result<()> {
    match path {
        Some(path) => {
            fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))
        }
        None => io::stdout()
            .lock()
            .write_all(text.as_bytes())
            .context("failed to write to stdout"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOCUMENT: &str = r#"
start:
  state: a
states:
- id: a
  type: noop
  transition: b
- id: b
  type: delay
  duration: PT5S
"#;

    #[test]
    fn test_import_then_compile() {
        let engine = Engine::with_defaults();
        let snapshot = import(&engine, DOCUMENT).unwrap();
        let yaml = compile(&engine, &snapshot).unwrap();
        assert!(yaml.contains("transition: b"));
        assert!(yaml.contains("duration: PT5S"));
    }

    #[test]
    fn test_check_rejects_skipped_states() {
        let engine = Engine::with_defaults();
        let text = "states:\n- id: a\n  type: teleport\n- id: b\n  type: noop\n";
        let error = check(&engine, text).unwrap_err();
        assert!(error.to_string().contains("a"));
    }

    #[test]
    fn test_compile_rejects_invalid_snapshot() {
        let engine = Engine::with_defaults();
        assert!(compile(&engine, "{\"nodes\": 3}").is_err());
    }
}
