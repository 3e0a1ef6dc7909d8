//! Relationship naming
//!
//! Every foreign key gets two names: a scalar one on the owning class
//! ("belongs to") and a collection one on the referenced class ("has many").
//! For a many-to-many through an association table both sides are
//! collections and the association table takes the intermediate slot.

use crate::error::{Error, Result};
use crate::naming::normalizer::NameNormalizer;
use crate::schema::types::{base_name, ForeignKey, Table};

/// Naming callbacks used while building mapped classes
pub trait NamingStrategy {
    /// Canonical class name for a table fullname
    fn class_name(&self, tablename: &str) -> String;

    /// Name of the scalar property on `local` pointing at `referenced`
    fn name_scalar(&self, local: &Table, referenced: &Table, constraint: &ForeignKey) -> Result<String>;

    /// Name of the collection property on `local` yielding rows of `referenced`
    fn name_collection(&self, local: &Table, referenced: &Table, constraint: &ForeignKey) -> Result<String>;
}

/// Default naming strategy built on [`NameNormalizer`]
#[derive(Debug, Clone, Default)]
pub struct RelationshipNamer {
    normalizer: NameNormalizer,
}

impl RelationshipNamer {
    pub fn new(normalizer: NameNormalizer) -> Self {
        Self { normalizer }
    }

    /// The constraint's owning table, when it is neither endpoint
    fn intermediate<'a>(local: &Table, referenced: &Table, constraint: &'a ForeignKey) -> Option<&'a str> {
        let owner = constraint.table.as_str();
        if owner != local.fullname() && owner != referenced.fullname() {
            Some(base_name(owner))
        } else {
            None
        }
    }

    /// The constraint's column when it lives on `table`
    fn column_on<'a>(table: &Table, constraint: &'a ForeignKey) -> Option<&'a str> {
        if constraint.table == table.fullname() {
            constraint.columns.first().map(String::as_str)
        } else {
            None
        }
    }
}

fn ensure_single_column(constraint: &ForeignKey) -> Result<()> {
    if constraint.columns.len() == 1 && constraint.ref_columns.len() == 1 {
        Ok(())
    } else {
        Err(Error::composite_key(
            &constraint.table,
            format!("{} spans more than one column", constraint.label()),
        ))
    }
}

impl NamingStrategy for RelationshipNamer {
    fn class_name(&self, tablename: &str) -> String {
        self.normalizer.class_name(tablename)
    }

    fn name_scalar(&self, local: &Table, referenced: &Table, constraint: &ForeignKey) -> Result<String> {
        ensure_single_column(constraint)?;

        let chain = std::iter::once(referenced.name.as_str())
            .chain(Self::intermediate(local, referenced, constraint))
            .chain(Self::column_on(local, constraint));

        Ok(self.normalizer.normalize(chain))
    }

    fn name_collection(&self, local: &Table, referenced: &Table, constraint: &ForeignKey) -> Result<String> {
        ensure_single_column(constraint)?;

        let chain: Vec<&str> = Self::intermediate(local, referenced, constraint)
            .into_iter()
            .chain(Self::column_on(referenced, constraint))
            .chain(std::iter::once(referenced.name.as_str()))
            .collect();

        // Words naming the class the collection lives on add nothing.
        let own = self.normalizer.tokens(&local.name);
        let mut name = self.normalizer.normalize_excluding(&chain, &own);
        if name.is_empty() {
            name = self.normalizer.normalize(&chain);
        }

        Ok(self.normalizer.plural(&name))
    }
}
