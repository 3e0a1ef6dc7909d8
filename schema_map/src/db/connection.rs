//! Database connection handling
//!
//! This module provides functionality to establish database connections.

use sqlx::{
    mysql::MySqlPoolOptions, postgres::PgPoolOptions, sqlite::SqlitePoolOptions, MySql, Pool,
    Postgres, Sqlite,
};

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};

/// Enumeration of supported database types
#[derive(Debug, Clone)]
pub enum DatabaseConnection {
    Postgres(Pool<Postgres>),
    MySql(Pool<MySql>),
    Sqlite(Pool<Sqlite>),
}

impl DatabaseConnection {
    /// Create a new database connection from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool_size = config.pool_size.unwrap_or(4);
        let timeout = std::time::Duration::from_secs(config.timeout_seconds.unwrap_or(30));
        let driver = config.driver()?;

        tracing::debug!(driver = %driver, url = %config.url, "Connecting to database");

        match driver.as_str() {
            "postgres" => {
                let pool = PgPoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(timeout)
                    .connect(&config.url)
                    .await?;

                Ok(DatabaseConnection::Postgres(pool))
            }
            "mysql" => {
                let pool = MySqlPoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(timeout)
                    .connect(&config.url)
                    .await?;

                Ok(DatabaseConnection::MySql(pool))
            }
            "sqlite" => {
                let pool = SqlitePoolOptions::new()
                    .max_connections(pool_size)
                    .acquire_timeout(timeout)
                    .connect(&config.url)
                    .await?;

                Ok(DatabaseConnection::Sqlite(pool))
            }
            _ => Err(Error::DatabaseError(format!(
                "Unsupported database driver: {}",
                driver
            ))),
        }
    }

    /// Name of the driver behind this connection
    pub fn driver_name(&self) -> &'static str {
        match self {
            DatabaseConnection::Postgres(_) => "postgres",
            DatabaseConnection::MySql(_) => "mysql",
            DatabaseConnection::Sqlite(_) => "sqlite",
        }
    }

    /// Close the underlying pool
    pub async fn close(&self) {
        match self {
            DatabaseConnection::Postgres(pool) => pool.close().await,
            DatabaseConnection::MySql(pool) => pool.close().await,
            DatabaseConnection::Sqlite(pool) => pool.close().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unsupported_driver() {
        let config = DatabaseConfig {
            driver: Some("oracle".to_string()),
            ..DatabaseConfig::default()
        };
        let err = DatabaseConnection::connect(&config).await.unwrap_err();
        assert!(matches!(err, Error::DatabaseError(_)));
    }

    #[tokio::test]
    async fn test_connect_sqlite_memory() {
        let config = DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            pool_size: Some(1),
            ..DatabaseConfig::default()
        };
        let connection = DatabaseConnection::connect(&config).await.unwrap();
        assert_eq!(connection.driver_name(), "sqlite");
        connection.close().await;
    }
}
