//! Rendering of the schema document
//!
//! The document is handed over as an ordered mapping, so both formats keep
//! the class and property order produced by the collector.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::schema::document::SchemaDocument;

/// Supported output formats
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
}

/// Render the document in the requested format
pub fn render(document: &SchemaDocument, format: OutputFormat) -> Result<String> {
    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(document)?,
        OutputFormat::Yaml => serde_yaml::to_string(document)?,
    };

    Ok(rendered)
}
