//! Configuration handling for SchemaMap

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fs;

use crate::error::{Error, Result};
use crate::output::OutputFormat;

/// Load configuration from a TOML file
pub fn load_from_file(path: &str) -> Result<Config> {
    let config_str = fs::read_to_string(path)
        .map_err(|e| Error::ConfigError(format!("Failed to read config file: {}", e)))?;

    let config: Config = toml::from_str(&config_str)
        .map_err(|e| Error::ConfigError(format!("Failed to parse config file: {}", e)))?;

    Ok(config)
}

/// Represents the complete SchemaMap configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub naming: NamingConfig,
    pub type_mapping: TypeMappingConfig,
    pub output: OutputConfig,
    pub logging: Option<LoggingConfig>,
}

/// Database connection configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct DatabaseConfig {
    /// `sqlite`, `postgres` or `mysql`; inferred from `url` when absent
    pub driver: Option<String>,
    pub url: String,
    pub pool_size: Option<u32>,
    pub timeout_seconds: Option<u64>,
    /// Schema to reflect. Table names are qualified only when this is set.
    pub schema: Option<String>,
}

pub const DEFAULT_SOURCE: &str = "sqlite://sample.db";

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            driver: None,
            url: DEFAULT_SOURCE.to_string(),
            pool_size: None,
            timeout_seconds: None,
            schema: None,
        }
    }
}

impl DatabaseConfig {
    /// Driver name, falling back to the URL scheme
    pub fn driver(&self) -> Result<String> {
        if let Some(driver) = &self.driver {
            return Ok(driver.to_lowercase());
        }

        let scheme = self
            .url
            .split(':')
            .next()
            .unwrap_or_default()
            .to_lowercase();

        match scheme.as_str() {
            "sqlite" => Ok("sqlite".to_string()),
            "postgres" | "postgresql" => Ok("postgres".to_string()),
            "mysql" | "mariadb" => Ok("mysql".to_string()),
            _ => Err(Error::ConfigError(format!(
                "Cannot infer database driver from url: {}",
                self.url
            ))),
        }
    }
}

/// Identifier normalization settings
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct NamingConfig {
    /// Namespace markers stripped from the start of every name fragment
    pub ignore_prefixes: Vec<String>,
    /// Reference markers stripped from the end of every name fragment
    pub ignore_suffixes: Vec<String>,
    pub separator: char,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            ignore_prefixes: Vec::new(),
            ignore_suffixes: vec!["_id".to_string()],
            separator: '_',
        }
    }
}

/// Native type to canonical tag configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct TypeMappingConfig {
    /// Tag used for every primary-key column
    pub identifier: String,
    /// Extra entries, merged over the built-in defaults
    pub tags: IndexMap<String, String>,
}

impl Default for TypeMappingConfig {
    fn default() -> Self {
        Self {
            identifier: "ID".to_string(),
            tags: IndexMap::new(),
        }
    }
}

/// Output configuration
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
#[serde(default)]
pub struct OutputConfig {
    pub format: OutputFormat,
}

/// Logging configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
            file: None,
            format: "text".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;
    use std::io::Write;

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: Config = toml::from_str(
            r#"
            [naming]
            ignore_prefixes = ["pokemon_v2_"]
            "#,
        )
        .unwrap();

        assert_eq!(config.naming.ignore_prefixes, vec!["pokemon_v2_".to_string()]);
        assert_eq!(config.naming.ignore_suffixes, vec!["_id".to_string()]);
        assert_eq!(config.database.url, DEFAULT_SOURCE);
        assert_eq!(config.type_mapping.identifier, "ID");
        assert_eq!(config.output.format, OutputFormat::Json);
        assert!(config.logging.is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
            [database]
            url = "postgres://localhost/shop"
            schema = "sales"

            [type_mapping]
            identifier = "Id"
            tags = {{ numeric = "Decimal", boolean = "Boolean" }}

            [output]
            format = "yaml"

            [logging]
            level = "debug"
            "#
        )
        .unwrap();

        let config = load_from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.database.driver().unwrap(), "postgres");
        assert_eq!(config.database.schema.as_deref(), Some("sales"));
        assert_eq!(config.type_mapping.identifier, "Id");
        assert_eq!(
            config.type_mapping.tags.keys().collect::<Vec<_>>(),
            vec!["numeric", "boolean"]
        );
        assert_eq!(config.output.format, OutputFormat::Yaml);
        assert_eq!(config.logging.unwrap().level, "debug");
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_from_file("/nonexistent/schema_map.toml").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }

    #[rstest]
    #[case("sqlite://sample.db", "sqlite")]
    #[case("sqlite::memory:", "sqlite")]
    #[case("postgresql://localhost/db", "postgres")]
    #[case("mysql://root@localhost/db", "mysql")]
    fn test_driver_inference(#[case] url: &str, #[case] expected: &str) {
        let config = DatabaseConfig {
            url: url.to_string(),
            ..DatabaseConfig::default()
        };
        assert_eq!(config.driver().unwrap(), expected);
    }

    #[test]
    fn test_driver_inference_rejects_unknown_scheme() {
        let config = DatabaseConfig {
            url: "oracle://localhost".to_string(),
            ..DatabaseConfig::default()
        };
        assert!(matches!(config.driver(), Err(Error::ConfigError(_))));
    }
}
