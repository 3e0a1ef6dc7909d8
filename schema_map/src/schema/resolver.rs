//! Column type resolution
//!
//! Maps native column types onto the small set of canonical tags used in the
//! document. Lookups ignore case and type parameters, so `VARCHAR(255)` and
//! `varchar` resolve alike.

use indexmap::IndexMap;
use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::TypeMappingConfig;
use crate::schema::types::Column;

/// Tag reported when a column has no native type at all
pub const FALLBACK_TAG: &str = "Unknown";

static DEFAULT_TAGS: Lazy<IndexMap<&'static str, &'static str>> = Lazy::new(|| {
    let integers = [
        "integer", "int", "int2", "int4", "int8", "smallint", "tinyint", "mediumint",
        "bigint", "serial", "bigserial", "smallserial",
    ];
    let texts = [
        "text", "varchar", "char", "character", "character varying", "nchar", "nvarchar",
        "varying character", "native character", "clob", "tinytext", "mediumtext",
        "longtext", "string",
    ];

    integers
        .iter()
        .map(|t| (*t, "Integer"))
        .chain(texts.iter().map(|t| (*t, "String")))
        .collect()
});

static TYPE_PARAMS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s*\(.*\)").expect("valid type parameter pattern"));

/// Lookup key for a native type: lowercase, no parameters, single spaces
fn lookup_key(native: &str) -> String {
    TYPE_PARAMS
        .replace_all(native, "")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Resolves native column types to canonical tags
#[derive(Debug, Clone)]
pub struct TypeResolver {
    identifier: String,
    mapping: IndexMap<String, String>,
}

impl Default for TypeResolver {
    fn default() -> Self {
        Self::from_config(&TypeMappingConfig::default())
    }
}

impl TypeResolver {
    /// Built-in defaults with the configured entries layered on top
    pub fn from_config(config: &TypeMappingConfig) -> Self {
        let mut mapping: IndexMap<String, String> = DEFAULT_TAGS
            .iter()
            .map(|(native, tag)| (native.to_string(), tag.to_string()))
            .collect();

        for (native, tag) in &config.tags {
            mapping.insert(lookup_key(native), tag.clone());
        }

        Self {
            identifier: config.identifier.clone(),
            mapping,
        }
    }

    /// Canonical tag for a column. Never fails: unmapped types are reported
    /// and fall back to the native type itself.
    pub fn resolve(&self, column: &Column) -> String {
        if column.primary_key {
            return self.identifier.clone();
        }

        if let Some(tag) = self.mapping.get(&lookup_key(&column.data_type)) {
            return tag.clone();
        }

        let native = column.data_type.trim();
        tracing::warn!(
            column = %column.name,
            native_type = %native,
            "Schema has an unmapped column type"
        );

        if native.is_empty() {
            FALLBACK_TAG.to_string()
        } else {
            native.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io;
    use std::sync::{Arc, Mutex};

    #[rstest]
    #[case("INTEGER", "Integer")]
    #[case("bigint", "Integer")]
    #[case("VARCHAR(255)", "String")]
    #[case("character varying", "String")]
    #[case("Character  Varying (40)", "String")]
    #[case("TEXT", "String")]
    fn test_mapped_types(#[case] native: &str, #[case] expected: &str) {
        let resolver = TypeResolver::default();
        assert_eq!(resolver.resolve(&Column::new("value", native)), expected);
    }

    #[rstest]
    #[case("TEXT")]
    #[case("uuid")]
    #[case("")]
    fn test_primary_key_is_identifier(#[case] native: &str) {
        let resolver = TypeResolver::default();
        assert_eq!(resolver.resolve(&Column::new("id", native).primary_key()), "ID");
    }

    #[rstest]
    #[case("DATETIME", "DATETIME")]
    #[case(" numeric(10,2) ", "numeric(10,2)")]
    #[case("", FALLBACK_TAG)]
    fn test_unmapped_types_fall_back(#[case] native: &str, #[case] expected: &str) {
        let resolver = TypeResolver::default();
        let tag = resolver.resolve(&Column::new("value", native));
        assert!(!tag.is_empty());
        assert_eq!(tag, expected);
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn resolve_logged(column: &Column) -> (String, String) {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::WARN)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();

        let resolver = TypeResolver::default();
        let tag = tracing::subscriber::with_default(subscriber, || resolver.resolve(column));
        (tag, logs.contents())
    }

    #[test]
    fn test_unmapped_type_is_reported() {
        let (tag, logs) = resolve_logged(&Column::new("created_at", "DATETIME"));
        assert_eq!(tag, "DATETIME");
        assert!(logs.contains("unmapped column type"));
        assert!(logs.contains("created_at"));
    }

    #[test]
    fn test_mapped_type_is_silent() {
        let (tag, logs) = resolve_logged(&Column::new("name", "TEXT"));
        assert_eq!(tag, "String");
        assert!(logs.is_empty());
    }

    #[test]
    fn test_configured_tags() {
        let mut config = TypeMappingConfig::default();
        config.identifier = "Id".to_string();
        config.tags.insert("BOOLEAN".to_string(), "Boolean".to_string());
        config.tags.insert("text".to_string(), "Text".to_string());

        let resolver = TypeResolver::from_config(&config);
        assert_eq!(resolver.resolve(&Column::new("flag", "boolean")), "Boolean");
        assert_eq!(resolver.resolve(&Column::new("body", "TEXT")), "Text");
        assert_eq!(resolver.resolve(&Column::new("id", "INTEGER").primary_key()), "Id");
    }
}
