//! Mapping of reflected tables onto classes with navigable relationships
//!
//! Pure association tables become many-to-many relationships instead of
//! classes; every other table with a primary key becomes a class. Each
//! foreign key yields a scalar property on the owning class and a collection
//! property on the referenced one, named through a [`NamingStrategy`].

use indexmap::IndexMap;

use crate::error::{Error, Result};
use crate::naming::NamingStrategy;
use crate::schema::document::Direction;
use crate::schema::types::{Column, ColumnRef, DatabaseSchema, ForeignKey, Table};

/// A class mapped onto one table
#[derive(Debug, Clone, PartialEq)]
pub struct MappedClass {
    pub table: Table,
    pub class_name: String,
    pub properties: IndexMap<String, Property>,
}

impl MappedClass {
    pub fn new(table: Table, class_name: String) -> Self {
        let properties = table
            .columns
            .iter()
            .map(|column| {
                (
                    column.name.clone(),
                    Property::Column(ColumnProperty {
                        columns: vec![column.clone()],
                    }),
                )
            })
            .collect();

        Self {
            table,
            class_name,
            properties,
        }
    }

    pub fn fullname(&self) -> String {
        self.table.fullname()
    }

    pub fn relationship(&self, key: &str) -> Option<&RelationshipProperty> {
        match self.properties.get(key) {
            Some(Property::Relationship(rel)) => Some(rel),
            _ => None,
        }
    }
}

/// A mapped attribute
#[derive(Debug, Clone, PartialEq)]
pub enum Property {
    Column(ColumnProperty),
    Relationship(RelationshipProperty),
}

/// A plain attribute backed by table columns
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnProperty {
    pub columns: Vec<Column>,
}

/// A navigable attribute
#[derive(Debug, Clone, PartialEq)]
pub struct RelationshipProperty {
    /// Fullname of the table the relationship yields rows of
    pub target: String,
    pub direction: Direction,
    pub uselist: bool,
    /// Association table fullname for many-to-many
    pub secondary: Option<String>,
    /// `(referenced, referencing)` pairs joining the owner to the target,
    /// or to the association table
    pub synchronize_pairs: Vec<(ColumnRef, ColumnRef)>,
    /// `(referenced, referencing)` pairs joining the association table to
    /// the target
    pub secondary_synchronize_pairs: Vec<(ColumnRef, ColumnRef)>,
    /// Name of the opposite property, when it exists
    pub back_populates: Option<String>,
}

/// The two foreign keys of a pure association table.
///
/// A table qualifies when it carries exactly two foreign-key constraints
/// and every one of its columns takes part in one of them.
pub fn association_keys(table: &Table) -> Option<(&ForeignKey, &ForeignKey)> {
    let [first, second] = table.foreign_keys.as_slice() else {
        return None;
    };

    let all_linked = table.columns.iter().all(|column| {
        first.columns.contains(&column.name) || second.columns.contains(&column.name)
    });

    if all_linked && !table.columns.is_empty() {
        Some((first, second))
    } else {
        None
    }
}

/// Pair a foreign key as `(referenced, referencing)`
fn key_pair(fk: &ForeignKey) -> Result<(ColumnRef, ColumnRef)> {
    fk.single_pair()
        .map(|(local, remote)| (remote, local))
        .ok_or_else(|| {
            Error::composite_key(&fk.table, format!("{} spans more than one column", fk.label()))
        })
}

/// Builds mapped classes from a reflected schema
pub struct Mapper<'a> {
    naming: &'a dyn NamingStrategy,
}

impl<'a> Mapper<'a> {
    pub fn new(naming: &'a dyn NamingStrategy) -> Self {
        Self { naming }
    }

    /// Map every eligible table, in fullname order
    pub fn map(&self, schema: &DatabaseSchema) -> Result<Vec<MappedClass>> {
        let mut tables: Vec<&Table> = schema.tables.values().collect();
        tables.sort_by_key(|t| t.fullname());

        let mut classes: IndexMap<String, MappedClass> = IndexMap::new();
        let mut associations = Vec::new();

        for table in tables {
            if let Some(keys) = association_keys(table) {
                tracing::debug!(table = %table.fullname(), "Treating table as association table");
                associations.push((table, keys));
            } else if table.primary_key().is_empty() {
                tracing::warn!(table = %table.fullname(), "Skipping table without primary key");
            } else {
                let class_name = self.naming.class_name(&table.fullname());
                classes.insert(table.fullname(), MappedClass::new(table.clone(), class_name));
            }
        }

        let fullnames: Vec<String> = classes.keys().cloned().collect();
        for fullname in &fullnames {
            let table = classes[fullname].table.clone();
            for fk in &table.foreign_keys {
                self.add_foreign_key(&mut classes, &table, fk)?;
            }
        }

        for (table, (first, second)) in associations {
            self.add_many_to_many(&mut classes, table, first, second)?;
        }

        tracing::debug!(classes = classes.len(), "Mapped schema");
        Ok(classes.into_values().collect())
    }

    fn add_foreign_key(
        &self,
        classes: &mut IndexMap<String, MappedClass>,
        local: &Table,
        fk: &ForeignKey,
    ) -> Result<()> {
        let Some(referenced) = classes.get(&fk.ref_table).map(|c| c.table.clone()) else {
            tracing::debug!(
                table = %local.fullname(),
                referenced = %fk.ref_table,
                "Foreign key points at an unmapped table"
            );
            return Ok(());
        };

        let scalar_name = self.naming.name_scalar(local, &referenced, fk)?;
        let collection_name = self.naming.name_collection(&referenced, local, fk)?;
        let pair = key_pair(fk)?;

        let local_name = local.fullname();
        let referenced_name = referenced.fullname();

        let scalar_free = !classes[&local_name].properties.contains_key(&scalar_name);
        let collection_free = !classes[&referenced_name].properties.contains_key(&collection_name)
            && !(local_name == referenced_name && collection_name == scalar_name);

        if scalar_free {
            classes[&local_name].properties.insert(
                scalar_name.clone(),
                Property::Relationship(RelationshipProperty {
                    target: referenced_name.clone(),
                    direction: Direction::ManyToOne,
                    uselist: Direction::ManyToOne.uselist(),
                    secondary: None,
                    synchronize_pairs: vec![pair.clone()],
                    secondary_synchronize_pairs: Vec::new(),
                    back_populates: collection_free.then(|| collection_name.clone()),
                }),
            );
        } else {
            tracing::warn!(
                class = %classes[&local_name].class_name,
                property = %scalar_name,
                "Relationship name already taken, skipping"
            );
        }

        if collection_free {
            classes[&referenced_name].properties.insert(
                collection_name,
                Property::Relationship(RelationshipProperty {
                    target: local_name,
                    direction: Direction::OneToMany,
                    uselist: Direction::OneToMany.uselist(),
                    secondary: None,
                    synchronize_pairs: vec![pair],
                    secondary_synchronize_pairs: Vec::new(),
                    back_populates: scalar_free.then_some(scalar_name),
                }),
            );
        } else {
            tracing::warn!(
                class = %classes[&referenced_name].class_name,
                property = %collection_name,
                "Relationship name already taken, skipping"
            );
        }

        Ok(())
    }

    fn add_many_to_many(
        &self,
        classes: &mut IndexMap<String, MappedClass>,
        association: &Table,
        first: &ForeignKey,
        second: &ForeignKey,
    ) -> Result<()> {
        let (Some(left), Some(right)) = (
            classes.get(&first.ref_table).map(|c| c.table.clone()),
            classes.get(&second.ref_table).map(|c| c.table.clone()),
        ) else {
            tracing::warn!(
                table = %association.fullname(),
                first = %first.ref_table,
                second = %second.ref_table,
                "Association table links unmapped tables, skipping many-to-many"
            );
            return Ok(());
        };

        let left_name = self.naming.name_collection(&left, &right, first)?;
        let right_name = self.naming.name_collection(&right, &left, second)?;
        let left_pair = key_pair(first)?;
        let right_pair = key_pair(second)?;

        let left_fullname = left.fullname();
        let right_fullname = right.fullname();

        let left_free = !classes[&left_fullname].properties.contains_key(&left_name);
        let right_free = !classes[&right_fullname].properties.contains_key(&right_name)
            && !(left_fullname == right_fullname && left_name == right_name);

        if left_free {
            classes[&left_fullname].properties.insert(
                left_name.clone(),
                Property::Relationship(RelationshipProperty {
                    target: right_fullname.clone(),
                    direction: Direction::ManyToMany,
                    uselist: Direction::ManyToMany.uselist(),
                    secondary: Some(association.fullname()),
                    synchronize_pairs: vec![left_pair.clone()],
                    secondary_synchronize_pairs: vec![right_pair.clone()],
                    back_populates: right_free.then(|| right_name.clone()),
                }),
            );
        } else {
            tracing::warn!(
                class = %classes[&left_fullname].class_name,
                property = %left_name,
                "Relationship name already taken, skipping"
            );
        }

        if right_free {
            classes[&right_fullname].properties.insert(
                right_name,
                Property::Relationship(RelationshipProperty {
                    target: left_fullname,
                    direction: Direction::ManyToMany,
                    uselist: Direction::ManyToMany.uselist(),
                    secondary: Some(association.fullname()),
                    synchronize_pairs: vec![right_pair],
                    secondary_synchronize_pairs: vec![left_pair],
                    back_populates: left_free.then_some(left_name),
                }),
            );
        } else {
            tracing::warn!(
                class = %classes[&right_fullname].class_name,
                property = %right_name,
                "Relationship name already taken, skipping"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::naming::RelationshipNamer;
    use pretty_assertions::assert_eq;

    fn entity(name: &str, columns: &[(&str, &str)]) -> Table {
        let mut table = Table::new(name);
        table.add_column(Column::new("id", "INTEGER").primary_key());
        for (column, data_type) in columns {
            table.add_column(Column::new(column, data_type));
        }
        table
    }

    fn find<'c>(classes: &'c [MappedClass], name: &str) -> &'c MappedClass {
        classes.iter().find(|c| c.class_name == name).unwrap()
    }

    #[test]
    fn test_association_detection() {
        let mut pure = Table::new("student_courses");
        pure.add_column(Column::new("student_id", "INTEGER"));
        pure.add_column(Column::new("course_id", "INTEGER"));
        pure.add_foreign_key(ForeignKey::new("student_courses", "student_id", "students", "id"));
        pure.add_foreign_key(ForeignKey::new("student_courses", "course_id", "courses", "id"));
        assert!(association_keys(&pure).is_some());

        let mut payload = pure.clone();
        payload.add_column(Column::new("grade", "TEXT"));
        assert!(association_keys(&payload).is_none());

        let mut single = entity("orders", &[("customer_id", "INTEGER")]);
        single.add_foreign_key(ForeignKey::new("orders", "customer_id", "customers", "id"));
        assert!(association_keys(&single).is_none());
    }

    #[test]
    fn test_map_foreign_key() {
        let mut schema = DatabaseSchema::new(None);
        schema.add_table(entity("customers", &[("name", "TEXT")]));
        let mut orders = entity("orders", &[("customer_id", "INTEGER")]);
        orders.add_foreign_key(ForeignKey::new("orders", "customer_id", "customers", "id"));
        schema.add_table(orders);

        let namer = RelationshipNamer::default();
        let classes = Mapper::new(&namer).map(&schema).unwrap();
        assert_eq!(
            classes.iter().map(|c| c.class_name.as_str()).collect::<Vec<_>>(),
            vec!["Customer", "Order"]
        );

        let customer = find(&classes, "Order").relationship("customer").unwrap();
        assert_eq!(customer.direction, Direction::ManyToOne);
        assert!(!customer.uselist);
        assert_eq!(customer.target, "customers");
        assert_eq!(customer.back_populates.as_deref(), Some("orders"));
        assert_eq!(
            customer.synchronize_pairs,
            vec![(ColumnRef::new("customers", "id"), ColumnRef::new("orders", "customer_id"))]
        );

        let orders = find(&classes, "Customer").relationship("orders").unwrap();
        assert_eq!(orders.direction, Direction::OneToMany);
        assert!(orders.uselist);
        assert_eq!(orders.target, "orders");
    }

    #[test]
    fn test_map_many_to_many() {
        let mut schema = DatabaseSchema::new(None);
        schema.add_table(entity("students", &[]));
        schema.add_table(entity("courses", &[]));
        let mut link = Table::new("student_courses");
        link.add_column(Column::new("student_id", "INTEGER"));
        link.add_column(Column::new("course_id", "INTEGER"));
        link.add_foreign_key(ForeignKey::new("student_courses", "student_id", "students", "id"));
        link.add_foreign_key(ForeignKey::new("student_courses", "course_id", "courses", "id"));
        schema.add_table(link);

        let namer = RelationshipNamer::default();
        let classes = Mapper::new(&namer).map(&schema).unwrap();
        assert_eq!(classes.len(), 2);

        let courses = find(&classes, "Student").relationship("courses").unwrap();
        assert_eq!(courses.direction, Direction::ManyToMany);
        assert!(courses.uselist);
        assert_eq!(courses.secondary.as_deref(), Some("student_courses"));
        assert_eq!(
            courses.synchronize_pairs,
            vec![(ColumnRef::new("students", "id"), ColumnRef::new("student_courses", "student_id"))]
        );
        assert_eq!(
            courses.secondary_synchronize_pairs,
            vec![(ColumnRef::new("courses", "id"), ColumnRef::new("student_courses", "course_id"))]
        );

        let students = find(&classes, "Course").relationship("students").unwrap();
        assert_eq!(students.target, "students");
        assert_eq!(students.back_populates.as_deref(), Some("courses"));
    }

    #[test]
    fn test_association_with_payload_is_a_class() {
        let mut schema = DatabaseSchema::new(None);
        schema.add_table(entity("students", &[]));
        schema.add_table(entity("courses", &[]));
        let mut enrollment = entity("enrollments", &[("student_id", "INTEGER"), ("course_id", "INTEGER")]);
        enrollment.add_foreign_key(ForeignKey::new("enrollments", "student_id", "students", "id"));
        enrollment.add_foreign_key(ForeignKey::new("enrollments", "course_id", "courses", "id"));
        schema.add_table(enrollment);

        let namer = RelationshipNamer::default();
        let classes = Mapper::new(&namer).map(&schema).unwrap();
        assert_eq!(classes.len(), 3);
        assert!(find(&classes, "Student").relationship("enrollments").is_some());
        assert!(find(&classes, "Enrollment").relationship("student").is_some());
        assert!(find(&classes, "Enrollment").relationship("course").is_some());
    }

    #[test]
    fn test_tables_without_primary_key_are_skipped() {
        let mut schema = DatabaseSchema::new(None);
        let mut log = Table::new("audit_log");
        log.add_column(Column::new("message", "TEXT"));
        schema.add_table(log);

        let namer = RelationshipNamer::default();
        assert!(Mapper::new(&namer).map(&schema).unwrap().is_empty());
    }

    #[test]
    fn test_association_to_unmapped_table_is_skipped() {
        let mut schema = DatabaseSchema::new(None);
        schema.add_table(entity("students", &[]));
        let mut courses = Table::new("courses");
        courses.add_column(Column::new("code", "TEXT"));
        schema.add_table(courses);
        let mut link = Table::new("student_courses");
        link.add_column(Column::new("student_id", "INTEGER"));
        link.add_column(Column::new("course_code", "TEXT"));
        link.add_foreign_key(ForeignKey::new("student_courses", "student_id", "students", "id"));
        link.add_foreign_key(ForeignKey::new("student_courses", "course_code", "courses", "code"));
        schema.add_table(link);

        let namer = RelationshipNamer::default();
        let classes = Mapper::new(&namer).map(&schema).unwrap();
        assert_eq!(classes.len(), 1);
        assert!(classes[0]
            .properties
            .values()
            .all(|p| matches!(p, Property::Column(_))));
    }

    #[test]
    fn test_taken_name_is_not_overwritten() {
        let mut schema = DatabaseSchema::new(None);
        schema.add_table(entity("customers", &[]));
        let mut orders = entity("orders", &[("customer", "TEXT"), ("customer_id", "INTEGER")]);
        orders.add_foreign_key(ForeignKey::new("orders", "customer_id", "customers", "id"));
        schema.add_table(orders);

        let namer = RelationshipNamer::default();
        let classes = Mapper::new(&namer).map(&schema).unwrap();
        let order = find(&classes, "Order");
        assert!(matches!(order.properties.get("customer"), Some(Property::Column(_))));

        let orders = find(&classes, "Customer").relationship("orders").unwrap();
        assert_eq!(orders.back_populates, None);
    }

    #[test]
    fn test_composite_foreign_key_aborts() {
        let mut schema = DatabaseSchema::new(None);
        schema.add_table(entity("customers", &[]));
        let mut orders = entity("orders", &[("customer_id", "INTEGER"), ("region", "TEXT")]);
        orders.add_foreign_key(ForeignKey {
            name: Some("fk_orders_customer".to_string()),
            table: "orders".to_string(),
            columns: vec!["customer_id".to_string(), "region".to_string()],
            ref_table: "customers".to_string(),
            ref_columns: vec!["id".to_string(), "region".to_string()],
        });
        schema.add_table(orders);

        let namer = RelationshipNamer::default();
        let err = Mapper::new(&namer).map(&schema).unwrap_err();
        assert!(matches!(err, Error::UnsupportedCompositeKey { .. }));
    }
}
