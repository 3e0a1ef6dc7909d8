//! Schema module for SchemaMap
//!
//! This module handles schema reflection, class mapping, type resolution and
//! assembly of the final document.

pub mod collector;
pub mod document;
pub mod mapper;
pub mod reflector;
pub mod resolver;
pub mod types;

// Re-export key types
pub use collector::SchemaCollector;
pub use document::{
    ClassEntry, ColumnDescriptor, ColumnPair, Direction, RelationshipDescriptor, SchemaDocument,
};
pub use mapper::{MappedClass, Mapper, Property};
pub use reflector::{DatabaseReflector, SchemaReflector};
pub use resolver::TypeResolver;
pub use types::{Column, ColumnRef, DatabaseSchema, ForeignKey, Table};
