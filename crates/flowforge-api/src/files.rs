use std::path::Path;

use anyhow::{Context, Result};
use flowforge_core::{SchemaEnvelope, Step};

/// Reads a standalone `{ "schema": [...] }` document from disk.
pub fn read_schema_file(path: &Path) -> Result<Vec<Step>> {
    ensure_json(path)?;
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let envelope: SchemaEnvelope = serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(envelope.schema)
}

/// Writes a standalone `{ "schema": [...] }` document, creating parent
/// directories as needed.
pub fn write_schema_file(path: &Path, schema: &[Step]) -> Result<()> {
    ensure_json(path)?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let envelope = SchemaEnvelope {
        schema: schema.to_vec(),
    };
    let content =
        serde_json::to_string_pretty(&envelope).context("Failed to serialize schema")?;
    std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
}

fn ensure_json(path: &Path) -> Result<()> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if !is_json {
        anyhow::bail!("Only .json workflow files are supported: {}", path.display());
    }
    Ok(())
}
