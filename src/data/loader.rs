// ============================================================
// Layer 4 — Example Loader
// ============================================================
// Reads pre-encoded document/query pairs from a JSON file.
//
// Accepted file shapes:
//   A single example
//     { "id": "q1", "document": [[[...], ...], ...], "query": [[...], ...] }
//
//   or an array of them
//     [ { "id": "q1", ... }, { "id": "q2", ... } ]
//
// Feature vectors are whatever the upstream encoder produced.
// The loader only parses; width and capacity are checked later
// by the batcher so that every rejection names the example.
//
// Reference: Rust Book §9 (Error Handling)

use anyhow::{Context, Result};
use serde::Deserialize;
use std::{fs, path::Path};

use crate::domain::example::FusionExample;
use crate::domain::traits::ExampleSource;

/// Loads FusionExamples from one JSON file.
/// Implements the ExampleSource trait from Layer 3.
pub struct ExampleLoader {
    path: String,
}

impl ExampleLoader {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }
}

impl ExampleSource for ExampleLoader {
    fn describe(&self) -> String {
        format!("file '{}'", self.path)
    }

    fn load_all(&self) -> Result<Vec<FusionExample>> {
        let path = Path::new(&self.path);
        let json = fs::read_to_string(path)
            .with_context(|| format!("Cannot read examples from '{}'", path.display()))?;

        let examples = parse_examples(&json)
            .with_context(|| format!("Invalid example JSON in '{}'", path.display()))?;

        tracing::info!("Loaded {} examples from '{}'", examples.len(), self.path);
        Ok(examples)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ExampleFile {
    Many(Vec<FusionExample>),
    One(FusionExample),
}

/// Parse a JSON string holding one example or an array of examples.
pub fn parse_examples(json: &str) -> Result<Vec<FusionExample>> {
    let file: ExampleFile = serde_json::from_str(json)
        .context("Expected an example object or an array of example objects")?;

    let examples = match file {
        ExampleFile::Many(examples) => examples,
        ExampleFile::One(example)   => vec![example],
    };

    for ex in &examples {
        if ex.document.is_empty() {
            tracing::warn!("Example '{}' has no sentences", ex.id);
        }
    }

    Ok(examples)
}
