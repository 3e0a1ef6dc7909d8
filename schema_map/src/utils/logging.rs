//! Logging utilities for SchemaMap
//!
//! Standard output carries the rendered document, so log records go to
//! stderr unless a file is configured.

use std::fs::File;
use std::path::Path;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{Error, Result};

/// Parse a level name, defaulting to WARN
pub fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "error" => Level::ERROR,
        _ => Level::WARN,
    }
}

/// Initialize logging based on configuration
pub fn init_logging(config: &Option<LoggingConfig>) -> Result<()> {
    let default_config = LoggingConfig::default();
    let config = config.as_ref().unwrap_or(&default_config);
    let level = parse_level(&config.level);

    let directive: Directive = format!("schema_map={}", level.as_str().to_lowercase())
        .parse()
        .map_err(|e| Error::ConfigError(format!("Invalid log level: {}", e)))?;
    let env_filter = EnvFilter::from_default_env().add_directive(directive);
    let json = config.format.to_lowercase() == "json";

    let result = match &config.file {
        Some(file_path) => {
            if let Some(parent) = Path::new(file_path).parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = Mutex::new(File::create(file_path)?);

            if json {
                let subscriber = fmt::Subscriber::builder()
                    .json()
                    .with_env_filter(env_filter)
                    .with_writer(file)
                    .finish();
                tracing::subscriber::set_global_default(subscriber)
            } else {
                let subscriber = fmt::Subscriber::builder()
                    .with_env_filter(env_filter)
                    .with_ansi(false)
                    .with_writer(file)
                    .finish();
                tracing::subscriber::set_global_default(subscriber)
            }
        }
        None if json => {
            let subscriber = fmt::Subscriber::builder()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
        None => {
            let subscriber = fmt::Subscriber::builder()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .finish();
            tracing::subscriber::set_global_default(subscriber)
        }
    };

    result.map_err(|e| Error::Unknown(e.to_string()))
}
