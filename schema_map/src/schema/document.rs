//! The canonical schema document
//!
//! Everything in here is derived data: built once by the collector and
//! handed to a formatter untouched.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Navigational direction of a relationship
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Direction {
    OneToMany,
    ManyToOne,
    ManyToMany,
}

impl Direction {
    /// Whether navigating in this direction yields a collection
    pub fn uselist(&self) -> bool {
        !matches!(self, Direction::ManyToOne)
    }
}

/// A `from` / `to` pair of fully-qualified column references
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnPair {
    pub from: String,
    pub to: String,
}

/// Canonical description of a plain column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    #[serde(rename = "type")]
    pub type_: String,
    pub nullable: bool,
}

/// One direction of a relationship
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelationshipDescriptor {
    pub table: String,
    pub clsname: String,
    pub direction: Direction,
    pub uselist: bool,
    /// Primary pair, then the secondary pair for many-to-many
    pub relation: Vec<ColumnPair>,
}

/// Everything known about one mapped table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassEntry {
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<IndexMap<String, ColumnDescriptor>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relationship: Option<IndexMap<String, RelationshipDescriptor>>,
}

impl ClassEntry {
    pub fn new(table: &str) -> Self {
        Self {
            table: table.to_string(),
            column: None,
            relationship: None,
        }
    }

    pub fn add_column(&mut self, name: &str, column: ColumnDescriptor) {
        self.column
            .get_or_insert_with(IndexMap::new)
            .insert(name.to_string(), column);
    }

    pub fn add_relationship(&mut self, name: &str, relationship: RelationshipDescriptor) {
        self.relationship
            .get_or_insert_with(IndexMap::new)
            .insert(name.to_string(), relationship);
    }
}

/// Canonical class name → entry, ordered by backing table fullname
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaDocument {
    classes: IndexMap<String, ClassEntry>,
}

impl SchemaDocument {
    /// Insert an entry, returning the one it replaced. A replaced entry
    /// keeps its original position.
    pub fn insert(&mut self, class_name: String, entry: ClassEntry) -> Option<ClassEntry> {
        self.classes.insert(class_name, entry)
    }

    pub fn get(&self, class_name: &str) -> Option<&ClassEntry> {
        self.classes.get(class_name)
    }

    pub fn len(&self) -> usize {
        self.classes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.classes.is_empty()
    }

    pub fn class_names(&self) -> impl Iterator<Item = &str> {
        self.classes.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &ClassEntry)> {
        self.classes.iter()
    }
}
