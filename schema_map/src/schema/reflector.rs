//! Database schema reflection
//!
//! Each supported database gets an adapter implementing [`SchemaReflector`].
//! Adapters only list what is there; naming and mapping happen later.

use async_trait::async_trait;
use indexmap::IndexMap;
use sqlx::{FromRow, MySql, Pool, Postgres, Row, Sqlite};

use crate::db::connection::DatabaseConnection;
use crate::error::{Error, Result};
use crate::schema::types::{qualify, Column, DatabaseSchema, ForeignKey, Table};

/// Schema discovery capability
#[async_trait]
pub trait SchemaReflector: Send + Sync {
    /// Explicitly configured schema, if any
    fn schema_name(&self) -> Option<&str>;

    /// Names of all base tables
    async fn list_tables(&self) -> Result<Vec<String>>;

    /// Columns of a table in declaration order
    async fn list_columns(&self, table: &str) -> Result<Vec<Column>>;

    /// Foreign keys declared on a table
    async fn list_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>>;

    /// Reflect every table, ordered by fullname
    async fn reflect(&self) -> Result<DatabaseSchema> {
        let schema_name = self.schema_name().map(str::to_string);
        let mut schema = DatabaseSchema::new(schema_name.clone());

        for name in self.list_tables().await? {
            let mut table = Table::new(&name).in_schema(schema_name.as_deref());
            table.columns = self.list_columns(&name).await?;
            table.foreign_keys = self.list_foreign_keys(&name).await?;

            tracing::debug!(
                table = %table.fullname(),
                columns = table.columns.len(),
                foreign_keys = table.foreign_keys.len(),
                "Reflected table"
            );
            schema.add_table(table);
        }

        schema.sort();
        Ok(schema)
    }
}

/// Reflector dispatching on the connection's driver
pub struct DatabaseReflector {
    connection: DatabaseConnection,
    schema: Option<String>,
}

impl DatabaseReflector {
    pub fn new(connection: DatabaseConnection, schema: Option<String>) -> Self {
        Self { connection, schema }
    }

    /// Reflect the configured schema
    pub async fn reflect(&self) -> Result<DatabaseSchema> {
        let schema = self.schema.as_deref();
        let reflected = match &self.connection {
            DatabaseConnection::Postgres(pool) => PostgresReflector { pool, schema }.reflect().await?,
            DatabaseConnection::MySql(pool) => MySqlReflector { pool, schema }.reflect().await?,
            DatabaseConnection::Sqlite(pool) => SqliteReflector { pool, schema }.reflect().await?,
        };

        tracing::info!(
            driver = self.connection.driver_name(),
            tables = reflected.tables.len(),
            "Reflected database schema"
        );
        Ok(reflected)
    }
}

#[derive(FromRow)]
struct TableRow {
    table_name: String,
}

#[derive(FromRow)]
struct ColumnRow {
    column_name: String,
    data_type: String,
    is_nullable: String,
    character_maximum_length: Option<i64>,
}

#[derive(FromRow)]
struct KeyColumnRow {
    column_name: String,
}

#[derive(FromRow)]
struct ForeignKeyRow {
    constraint_name: String,
    column_name: String,
    table_schema: String,
    ref_schema: String,
    ref_table: String,
    ref_column: String,
}

/// Group per-column foreign key rows into constraints, keeping row order
fn group_foreign_keys(table: &str, configured: Option<&str>, rows: Vec<ForeignKeyRow>) -> Vec<ForeignKey> {
    let mut foreign_keys: IndexMap<String, ForeignKey> = IndexMap::new();

    for row in rows {
        let ref_table = if configured.is_some() || row.ref_schema != row.table_schema {
            qualify(Some(&row.ref_schema), &row.ref_table)
        } else {
            row.ref_table
        };

        let fk = foreign_keys
            .entry(row.constraint_name.clone())
            .or_insert_with(|| ForeignKey {
                name: Some(row.constraint_name),
                table: qualify(configured, table),
                columns: Vec::new(),
                ref_table,
                ref_columns: Vec::new(),
            });
        fk.columns.push(row.column_name);
        fk.ref_columns.push(row.ref_column);
    }

    foreign_keys.into_values().collect()
}

/// PostgreSQL schema reflector
pub struct PostgresReflector<'a> {
    pub pool: &'a Pool<Postgres>,
    pub schema: Option<&'a str>,
}

#[async_trait]
impl<'a> SchemaReflector for PostgresReflector<'a> {
    fn schema_name(&self) -> Option<&str> {
        self.schema
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let sql = r#"
            SELECT table_name::text AS table_name
            FROM information_schema.tables
            WHERE table_schema = COALESCE($1::text, current_schema())
              AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = sqlx::query_as::<_, TableRow>(sql)
            .bind(self.schema)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| r.table_name).collect())
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<Column>> {
        let sql = r#"
            SELECT
                column_name::text AS column_name,
                data_type::text AS data_type,
                is_nullable::text AS is_nullable,
                character_maximum_length::bigint AS character_maximum_length
            FROM information_schema.columns
            WHERE table_schema = COALESCE($1::text, current_schema())
              AND table_name = $2
            ORDER BY ordinal_position
        "#;

        let column_rows = sqlx::query_as::<_, ColumnRow>(sql)
            .bind(self.schema)
            .bind(table)
            .fetch_all(self.pool)
            .await?;

        let sql = r#"
            SELECT kcu.column_name::text AS column_name
            FROM information_schema.table_constraints tc
            JOIN information_schema.key_column_usage kcu
                ON tc.constraint_name = kcu.constraint_name
                AND tc.table_schema = kcu.table_schema
                AND tc.table_name = kcu.table_name
            WHERE tc.constraint_type = 'PRIMARY KEY'
              AND tc.table_schema = COALESCE($1::text, current_schema())
              AND tc.table_name = $2
            ORDER BY kcu.ordinal_position
        "#;

        let pk_rows = sqlx::query_as::<_, KeyColumnRow>(sql)
            .bind(self.schema)
            .bind(table)
            .fetch_all(self.pool)
            .await?;

        let columns = column_rows
            .into_iter()
            .map(|col| {
                let mut data_type = col.data_type;
                if let Some(max_length) = col.character_maximum_length {
                    if data_type == "character varying" {
                        data_type = format!("varchar({})", max_length);
                    }
                }

                let column = Column::new(&col.column_name, &data_type).nullable(col.is_nullable == "YES");
                if pk_rows.iter().any(|pk| pk.column_name == col.column_name) {
                    column.primary_key()
                } else {
                    column
                }
            })
            .collect();

        Ok(columns)
    }

    async fn list_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>> {
        let sql = r#"
            SELECT
                con.conname::text AS constraint_name,
                att.attname::text AS column_name,
                ns.nspname::text AS table_schema,
                ref_ns.nspname::text AS ref_schema,
                ref_cls.relname::text AS ref_table,
                ref_att.attname::text AS ref_column
            FROM pg_constraint con
            JOIN pg_class cls ON cls.oid = con.conrelid
            JOIN pg_namespace ns ON ns.oid = cls.relnamespace
            JOIN pg_class ref_cls ON ref_cls.oid = con.confrelid
            JOIN pg_namespace ref_ns ON ref_ns.oid = ref_cls.relnamespace
            CROSS JOIN LATERAL unnest(con.conkey, con.confkey)
                WITH ORDINALITY AS k(attnum, ref_attnum, ord)
            JOIN pg_attribute att
                ON att.attrelid = con.conrelid AND att.attnum = k.attnum
            JOIN pg_attribute ref_att
                ON ref_att.attrelid = con.confrelid AND ref_att.attnum = k.ref_attnum
            WHERE con.contype = 'f'
              AND ns.nspname = COALESCE($1::text, current_schema())
              AND cls.relname = $2
            ORDER BY con.conname, k.ord
        "#;

        let rows = sqlx::query_as::<_, ForeignKeyRow>(sql)
            .bind(self.schema)
            .bind(table)
            .fetch_all(self.pool)
            .await?;

        Ok(group_foreign_keys(table, self.schema, rows))
    }
}

#[derive(FromRow)]
struct MySqlColumnRow {
    column_name: String,
    data_type: String,
    is_nullable: String,
    column_key: String,
}

/// MySQL schema reflector
pub struct MySqlReflector<'a> {
    pub pool: &'a Pool<MySql>,
    pub schema: Option<&'a str>,
}

#[async_trait]
impl<'a> SchemaReflector for MySqlReflector<'a> {
    fn schema_name(&self) -> Option<&str> {
        self.schema
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let sql = r#"
            SELECT CAST(table_name AS CHAR) AS table_name
            FROM information_schema.tables
            WHERE table_schema = COALESCE(?, DATABASE())
              AND table_type = 'BASE TABLE'
            ORDER BY table_name
        "#;

        let rows = sqlx::query_as::<_, TableRow>(sql)
            .bind(self.schema)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| r.table_name).collect())
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<Column>> {
        let sql = r#"
            SELECT
                CAST(column_name AS CHAR) AS column_name,
                CAST(data_type AS CHAR) AS data_type,
                CAST(is_nullable AS CHAR) AS is_nullable,
                CAST(column_key AS CHAR) AS column_key
            FROM information_schema.columns
            WHERE table_schema = COALESCE(?, DATABASE())
              AND table_name = ?
            ORDER BY ordinal_position
        "#;

        let rows = sqlx::query_as::<_, MySqlColumnRow>(sql)
            .bind(self.schema)
            .bind(table)
            .fetch_all(self.pool)
            .await?;

        let columns = rows
            .into_iter()
            .map(|col| {
                let column = Column::new(&col.column_name, &col.data_type).nullable(col.is_nullable == "YES");
                if col.column_key == "PRI" {
                    column.primary_key()
                } else {
                    column
                }
            })
            .collect();

        Ok(columns)
    }

    async fn list_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>> {
        let sql = r#"
            SELECT
                CAST(constraint_name AS CHAR) AS constraint_name,
                CAST(column_name AS CHAR) AS column_name,
                CAST(table_schema AS CHAR) AS table_schema,
                CAST(referenced_table_schema AS CHAR) AS ref_schema,
                CAST(referenced_table_name AS CHAR) AS ref_table,
                CAST(referenced_column_name AS CHAR) AS ref_column
            FROM information_schema.key_column_usage
            WHERE table_schema = COALESCE(?, DATABASE())
              AND table_name = ?
              AND referenced_table_name IS NOT NULL
            ORDER BY constraint_name, ordinal_position
        "#;

        let rows = sqlx::query_as::<_, ForeignKeyRow>(sql)
            .bind(self.schema)
            .bind(table)
            .fetch_all(self.pool)
            .await?;

        Ok(group_foreign_keys(table, self.schema, rows))
    }
}

/// Quote an identifier for interpolation into a PRAGMA
fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQLite schema reflector
pub struct SqliteReflector<'a> {
    pub pool: &'a Pool<Sqlite>,
    pub schema: Option<&'a str>,
}

impl<'a> SqliteReflector<'a> {
    fn prefix(&self) -> String {
        self.schema
            .map(|s| format!("{}.", quote_ident(s)))
            .unwrap_or_default()
    }

    /// Primary key column names of a table, in key order
    async fn primary_key(&self, table: &str) -> Result<Vec<String>> {
        let pragma = format!("PRAGMA {}table_info({})", self.prefix(), quote_ident(table));
        let rows = sqlx::query(&pragma).fetch_all(self.pool).await?;

        let mut keyed = Vec::new();
        for row in rows {
            let pk: i64 = row.try_get("pk")?;
            if pk > 0 {
                keyed.push((pk, row.try_get::<String, _>("name")?));
            }
        }
        keyed.sort();

        Ok(keyed.into_iter().map(|(_, name)| name).collect())
    }
}

#[async_trait]
impl<'a> SchemaReflector for SqliteReflector<'a> {
    fn schema_name(&self) -> Option<&str> {
        self.schema
    }

    async fn list_tables(&self) -> Result<Vec<String>> {
        let sql = format!(
            "SELECT name AS table_name FROM {}sqlite_master \
             WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
            self.prefix()
        );
        let rows = sqlx::query_as::<_, TableRow>(&sql)
            .fetch_all(self.pool)
            .await?;

        Ok(rows.into_iter().map(|r| r.table_name).collect())
    }

    async fn list_columns(&self, table: &str) -> Result<Vec<Column>> {
        let pragma = format!("PRAGMA {}table_info({})", self.prefix(), quote_ident(table));
        let rows = sqlx::query(&pragma).fetch_all(self.pool).await?;

        let mut columns = Vec::with_capacity(rows.len());
        for row in rows {
            let name: String = row.try_get("name")?;
            let data_type: String = row.try_get("type")?;
            let notnull: i64 = row.try_get("notnull")?;
            let pk: i64 = row.try_get("pk")?;

            let column = Column::new(&name, &data_type).nullable(notnull == 0);
            columns.push(if pk > 0 { column.primary_key() } else { column });
        }

        Ok(columns)
    }

    async fn list_foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>> {
        let pragma = format!("PRAGMA {}foreign_key_list({})", self.prefix(), quote_ident(table));
        let rows = sqlx::query(&pragma).fetch_all(self.pool).await?;

        let mut foreign_keys: IndexMap<i64, ForeignKey> = IndexMap::new();
        for row in rows {
            let id: i64 = row.try_get("id")?;
            let ref_table: String = row.try_get("table")?;
            let from: String = row.try_get("from")?;
            let to: Option<String> = row.try_get("to")?;

            let fk = foreign_keys.entry(id).or_insert_with(|| ForeignKey {
                name: None,
                table: qualify(self.schema, table),
                columns: Vec::new(),
                ref_table: qualify(self.schema, &ref_table),
                ref_columns: Vec::new(),
            });
            fk.columns.push(from);
            if let Some(to) = to {
                fk.ref_columns.push(to);
            }
        }

        let mut resolved = Vec::with_capacity(foreign_keys.len());
        for (_, mut fk) in foreign_keys {
            // REFERENCES without a column list targets the primary key
            if fk.ref_columns.is_empty() {
                let ref_name = crate::schema::types::base_name(&fk.ref_table).to_string();
                fk.ref_columns = self.primary_key(&ref_name).await?;
                if fk.ref_columns.is_empty() {
                    return Err(Error::ReflectionError(format!(
                        "Foreign key on '{}' references '{}', which has no primary key",
                        table, ref_name
                    )));
                }
            }
            resolved.push(fk);
        }
        resolved.sort_by_key(|fk| fk.columns.clone());

        Ok(resolved)
    }
}
