//! SchemaMap: derive a canonical schema document from a relational database
//!
//! SchemaMap reflects tables, columns and foreign keys, maps every table to a
//! class, names every relationship (including many-to-many through
//! association tables) and emits a deterministically ordered document.

pub mod config;
pub mod db;
pub mod error;
pub mod naming;
pub mod output;
pub mod schema;
pub mod utils;

// Re-export main types for easier access
pub use config::Config;
pub use db::connection::DatabaseConnection;
pub use error::{Error, Result};
pub use naming::{NameNormalizer, NamingStrategy, RelationshipNamer};
pub use output::OutputFormat;
pub use schema::collector::SchemaCollector;
pub use schema::document::SchemaDocument;
pub use schema::mapper::Mapper;
pub use schema::reflector::{DatabaseReflector, SchemaReflector};
pub use schema::resolver::TypeResolver;

use schema::types::DatabaseSchema;

/// Initialize SchemaMap with the specified configuration file
pub async fn init(config_path: &str) -> Result<SchemaMapClient> {
    let config = config::load_from_file(config_path)?;
    SchemaMapClient::new(config).await
}

/// Turn a reflected schema into the schema document.
///
/// Performs no I/O: naming, mapping and collection only.
pub fn build_document(schema: &DatabaseSchema, config: &Config) -> Result<SchemaDocument> {
    let namer = RelationshipNamer::new(NameNormalizer::from_config(&config.naming)?);
    let resolver = TypeResolver::from_config(&config.type_mapping);

    let classes = Mapper::new(&namer).map(schema)?;
    SchemaCollector::new(&resolver, &namer).collect(classes)
}

/// The main client for generating schema documents
pub struct SchemaMapClient {
    config: Config,
    reflector: DatabaseReflector,
}

impl SchemaMapClient {
    /// Create a new SchemaMap client from configuration
    pub async fn new(config: Config) -> Result<Self> {
        let connection = DatabaseConnection::connect(&config.database).await?;
        Ok(Self::with_connection(config, connection))
    }

    /// Create a client on an existing connection
    pub fn with_connection(config: Config, connection: DatabaseConnection) -> Self {
        let reflector = DatabaseReflector::new(connection, config.database.schema.clone());
        Self { config, reflector }
    }

    /// Reflect the current database schema
    pub async fn reflect(&self) -> Result<DatabaseSchema> {
        self.reflector.reflect().await
    }

    /// Reflect the database and build the schema document
    pub async fn generate(&self) -> Result<SchemaDocument> {
        let schema = self.reflect().await?;
        build_document(&schema, &self.config)
    }

    /// Reflect, build and render in the configured format
    pub async fn render(&self) -> Result<String> {
        let document = self.generate().await?;
        output::render(&document, self.config.output.format)
    }
}
