//! Assembly of the schema document from mapped classes

use crate::error::{Error, Result};
use crate::naming::NamingStrategy;
use crate::schema::document::{
    ClassEntry, ColumnDescriptor, ColumnPair, Direction, RelationshipDescriptor, SchemaDocument,
};
use crate::schema::mapper::{ColumnProperty, MappedClass, Property, RelationshipProperty};
use crate::schema::resolver::TypeResolver;
use crate::schema::types::ColumnRef;

/// Walks mapped classes and emits the ordered [`SchemaDocument`]
pub struct SchemaCollector<'a> {
    resolver: &'a TypeResolver,
    naming: &'a dyn NamingStrategy,
}

impl<'a> SchemaCollector<'a> {
    pub fn new(resolver: &'a TypeResolver, naming: &'a dyn NamingStrategy) -> Self {
        Self { resolver, naming }
    }

    /// Collect classes in table fullname order, properties in key order
    pub fn collect<I>(&self, classes: I) -> Result<SchemaDocument>
    where
        I: IntoIterator<Item = MappedClass>,
    {
        let mut classes: Vec<MappedClass> = classes.into_iter().collect();
        classes.sort_by_key(MappedClass::fullname);

        let mut document = SchemaDocument::default();
        for class in &classes {
            let class_name = self.naming.class_name(&class.fullname());
            let entry = self.collect_class(class)?;
            if document.insert(class_name.clone(), entry).is_some() {
                tracing::warn!(
                    class = %class_name,
                    table = %class.fullname(),
                    "Class name shared by several tables, keeping the last one"
                );
            }
        }

        tracing::info!(classes = document.len(), "Collected schema document");
        Ok(document)
    }

    fn collect_class(&self, class: &MappedClass) -> Result<ClassEntry> {
        let fullname = class.fullname();

        let primary_key = class.table.primary_key();
        if primary_key.len() > 1 {
            let columns: Vec<&str> = primary_key.iter().map(|c| c.name.as_str()).collect();
            return Err(Error::composite_key(
                &fullname,
                format!("primary key ({}) spans more than one column", columns.join(", ")),
            ));
        }

        let mut entry = ClassEntry::new(&fullname);

        let mut keys: Vec<&String> = class.properties.keys().collect();
        keys.sort();

        for key in keys {
            match &class.properties[key] {
                Property::Relationship(rel) => {
                    let descriptor = self.collect_relationship(&fullname, key, rel)?;
                    entry.add_relationship(key, descriptor);
                }
                Property::Column(prop) => {
                    let descriptor = self.collect_column(&fullname, key, prop)?;
                    entry.add_column(key, descriptor);
                }
            }
        }

        Ok(entry)
    }

    fn collect_column(&self, table: &str, key: &str, prop: &ColumnProperty) -> Result<ColumnDescriptor> {
        let [column] = prop.columns.as_slice() else {
            return Err(Error::composite_key(
                table,
                format!("property '{}' is backed by {} columns", key, prop.columns.len()),
            ));
        };

        Ok(ColumnDescriptor {
            type_: self.resolver.resolve(column),
            nullable: column.nullable,
        })
    }

    fn collect_relationship(
        &self,
        table: &str,
        key: &str,
        rel: &RelationshipProperty,
    ) -> Result<RelationshipDescriptor> {
        let mut relation = Vec::new();

        if let Some((referenced, referencing)) = single_pair(table, key, &rel.synchronize_pairs)? {
            relation.push(match rel.direction {
                Direction::ManyToOne => pair(referencing, referenced),
                Direction::OneToMany | Direction::ManyToMany => pair(referenced, referencing),
            });
        }

        if let Some(association) = &rel.secondary {
            let Some((referenced, referencing)) = single_pair(table, key, &rel.secondary_synchronize_pairs)? else {
                return Err(Error::ReflectionError(format!(
                    "relationship '{}' on '{}' goes through '{}' without a join to the target",
                    key, table, association
                )));
            };
            relation.push(pair(referencing, referenced));
        }

        tracing::debug!(
            table = %table,
            relationship = %key,
            direction = ?rel.direction,
            secondary = ?rel.secondary,
            back_populates = ?rel.back_populates,
            "Collected relationship"
        );

        Ok(RelationshipDescriptor {
            table: rel.target.clone(),
            clsname: self.naming.class_name(&rel.target),
            direction: rel.direction,
            uselist: rel.uselist,
            relation,
        })
    }
}

fn single_pair<'p>(
    table: &str,
    key: &str,
    pairs: &'p [(ColumnRef, ColumnRef)],
) -> Result<Option<&'p (ColumnRef, ColumnRef)>> {
    match pairs {
        [] => Ok(None),
        [only] => Ok(Some(only)),
        _ => Err(Error::composite_key(
            table,
            format!("relationship '{}' joins on {} column pairs", key, pairs.len()),
        )),
    }
}

fn pair(from: &ColumnRef, to: &ColumnRef) -> ColumnPair {
    ColumnPair {
        from: from.to_string(),
        to: to.to_string(),
    }
}
