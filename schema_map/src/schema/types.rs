//! Type definitions for reflected database schema objects

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Join an optional schema and a table name into a fullname
pub fn qualify(schema: Option<&str>, name: &str) -> String {
    match schema {
        Some(schema) => format!("{}.{}", schema, name),
        None => name.to_string(),
    }
}

/// The unqualified part of a table fullname
pub fn base_name(fullname: &str) -> &str {
    fullname.rsplit('.').next().unwrap_or(fullname)
}

/// Represents a reflected database schema
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseSchema {
    /// Tables keyed by fullname
    pub tables: IndexMap<String, Table>,
    pub schema_name: Option<String>,
}

impl DatabaseSchema {
    /// Create a new empty database schema
    pub fn new(schema_name: Option<String>) -> Self {
        Self {
            tables: IndexMap::new(),
            schema_name,
        }
    }

    /// Add a table to the schema
    pub fn add_table(&mut self, table: Table) {
        self.tables.insert(table.fullname(), table);
    }

    pub fn table(&self, fullname: &str) -> Option<&Table> {
        self.tables.get(fullname)
    }

    /// Sort tables by fullname
    pub fn sort(&mut self) {
        self.tables.sort_keys();
    }
}

/// Represents a database table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub schema: Option<String>,
    pub columns: Vec<Column>,
    pub foreign_keys: Vec<ForeignKey>,
}

impl Table {
    /// Create a new table with the given name
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            schema: None,
            columns: Vec::new(),
            foreign_keys: Vec::new(),
        }
    }

    /// Set the schema the table lives in
    pub fn in_schema(mut self, schema: Option<&str>) -> Self {
        self.schema = schema.map(str::to_string);
        self
    }

    /// Schema-qualified name, or the bare name without a schema
    pub fn fullname(&self) -> String {
        qualify(self.schema.as_deref(), &self.name)
    }

    /// Add a column to the table
    pub fn add_column(&mut self, column: Column) {
        self.columns.push(column);
    }

    /// Add a foreign key to the table
    pub fn add_foreign_key(&mut self, fk: ForeignKey) {
        self.foreign_keys.push(fk);
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary key columns in declaration order
    pub fn primary_key(&self) -> Vec<&Column> {
        self.columns.iter().filter(|c| c.primary_key).collect()
    }
}

/// Represents a database column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub data_type: String,
    pub nullable: bool,
    pub primary_key: bool,
}

impl Column {
    /// Create a new non-null column with the given name and type
    pub fn new(name: &str, data_type: &str) -> Self {
        Self {
            name: name.to_string(),
            data_type: data_type.to_string(),
            nullable: false,
            primary_key: false,
        }
    }

    /// Set whether the column is nullable
    pub fn nullable(mut self, nullable: bool) -> Self {
        self.nullable = nullable;
        self
    }

    /// Mark the column as part of the primary key
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.nullable = false;
        self
    }
}

/// A column reference qualified by its table fullname
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnRef {
    pub table: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(table: &str, column: &str) -> Self {
        Self {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// Represents a foreign key constraint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKey {
    pub name: Option<String>,
    /// Fullname of the table owning `columns`
    pub table: String,
    pub columns: Vec<String>,
    /// Fullname of the referenced table
    pub ref_table: String,
    pub ref_columns: Vec<String>,
}

impl ForeignKey {
    /// Single-column foreign key `table.column -> ref_table.ref_column`
    pub fn new(table: &str, column: &str, ref_table: &str, ref_column: &str) -> Self {
        Self {
            name: None,
            table: table.to_string(),
            columns: vec![column.to_string()],
            ref_table: ref_table.to_string(),
            ref_columns: vec![ref_column.to_string()],
        }
    }

    /// Human-readable label used in diagnostics
    pub fn label(&self) -> String {
        let name = self.name.as_deref().unwrap_or("unnamed");
        format!(
            "foreign key {} ({}) -> {}({})",
            name,
            self.columns.join(", "),
            self.ref_table,
            self.ref_columns.join(", ")
        )
    }

    /// The single `(local, referenced)` column pair
    pub fn single_pair(&self) -> Option<(ColumnRef, ColumnRef)> {
        match (self.columns.as_slice(), self.ref_columns.as_slice()) {
            ([column], [ref_column]) => Some((
                ColumnRef::new(&self.table, column),
                ColumnRef::new(&self.ref_table, ref_column),
            )),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fullname() {
        let table = Table::new("orders");
        assert_eq!(table.fullname(), "orders");
        assert_eq!(table.in_schema(Some("sales")).fullname(), "sales.orders");
        assert_eq!(base_name("sales.orders"), "orders");
        assert_eq!(base_name("orders"), "orders");
    }

    #[test]
    fn test_single_pair() {
        let fk = ForeignKey::new("orders", "customer_id", "customers", "id");
        let (local, remote) = fk.single_pair().unwrap();
        assert_eq!(local.to_string(), "orders.customer_id");
        assert_eq!(remote.to_string(), "customers.id");

        let composite = ForeignKey {
            columns: vec!["a".to_string(), "b".to_string()],
            ref_columns: vec!["x".to_string(), "y".to_string()],
            ..fk
        };
        assert!(composite.single_pair().is_none());
    }

    #[test]
    fn test_primary_key_columns() {
        let mut table = Table::new("orders");
        table.add_column(Column::new("id", "INTEGER").primary_key());
        table.add_column(Column::new("note", "TEXT").nullable(true));
        let pk: Vec<&str> = table.primary_key().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(pk, vec!["id"]);
        assert!(!table.column("id").unwrap().nullable);
    }
}
