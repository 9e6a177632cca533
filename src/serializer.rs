//! Reading and writing OpenAPI documents as YAML or JSON.

use crate::document::OpenApiDocument;
use anyhow::{Context, Result};
use log::debug;
use std::fs;
use std::path::Path;

/// Parses a document from JSON or YAML text.
///
/// YAML is a superset of JSON, so a single YAML parse accepts both formats.
pub fn parse_document(content: &str) -> Result<OpenApiDocument> {
    serde_yaml::from_str(content).context("Failed to parse OpenAPI document")
}

/// Reads and parses the document at `path`.
///
/// # Arguments
///
/// * `path` - Path of a YAML or JSON OpenAPI document
///
/// # Returns
///
/// Returns the parsed document with unknown fields preserved.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a valid OpenAPI document.
pub fn load_document(path: &Path) -> Result<OpenApiDocument> {
    debug!("Loading OpenAPI document from {}", path.display());
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    parse_document(&content).with_context(|| format!("Invalid OpenAPI document: {}", path.display()))
}

/// Serializes an OpenAPI document to YAML format.
pub fn serialize_yaml(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to YAML");
    serde_yaml::to_string(doc).context("Failed to serialize OpenAPI document to YAML")
}

/// Serializes an OpenAPI document to JSON format with pretty printing.
pub fn serialize_json(doc: &OpenApiDocument) -> Result<String> {
    debug!("Serializing OpenAPI document to JSON");
    serde_json::to_string_pretty(doc).context("Failed to serialize OpenAPI document to JSON")
}

/// Writes string content to a file, creating parent directories as needed.
pub fn write_to_file(content: &str, path: &Path) -> Result<()> {
    debug!("Writing content to file: {}", path.display());

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    fs::write(path, content)
        .with_context(|| format!("Failed to write to file: {}", path.display()))?;

    debug!("Successfully wrote {} bytes to {}", content.len(), path.display());
    Ok(())
}
