//! Naming engine
//!
//! Turns raw table and column names into class names and relationship names.

pub mod normalizer;
pub mod relationship;

pub use normalizer::NameNormalizer;
pub use relationship::{NamingStrategy, RelationshipNamer};
