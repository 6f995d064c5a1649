use std::time::Duration;

use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions};

use super::{CatalogError, ConnectParams, bytes_to_mb, descriptor};
use crate::ir::{ColumnDescriptor, ForeignKey};

/// MySQL / MariaDB. One pool, not bound to a database; every query names
/// its schema.
pub struct MySqlCatalog {
    pool: MySqlPool,
}

impl MySqlCatalog {
    pub async fn connect(params: &ConnectParams) -> Result<Self, CatalogError> {
        let options = MySqlConnectOptions::new()
            .host(&params.host)
            .port(params.port())
            .username(&params.user)
            .password(&params.password);

        let pool = MySqlPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(options)
            .await
            .map_err(CatalogError::Connect)?;

        Ok(Self { pool })
    }

    pub async fn list_databases(&self) -> Result<Vec<String>, CatalogError> {
        // Cast to CHAR to avoid BINARY type mismatch with Rust String
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT CAST(SCHEMA_NAME AS CHAR)
            FROM information_schema.SCHEMATA
            WHERE SCHEMA_NAME NOT IN ('information_schema', 'mysql', 'performance_schema', 'sys')
            ORDER BY SCHEMA_NAME
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    pub async fn list_tables(&self, database: &str) -> Result<Vec<String>, CatalogError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT CAST(TABLE_NAME AS CHAR)
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = ? AND TABLE_TYPE = 'BASE TABLE'
            ORDER BY TABLE_NAME
            "#,
        )
        .bind(database)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    pub async fn table_schema(
        &self,
        database: &str,
        table: &str,
    ) -> Result<Vec<ColumnDescriptor>, CatalogError> {
        let rows: Vec<(String, String, String, Option<String>, String, String)> = sqlx::query_as(
            r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR),
                CAST(COLUMN_TYPE AS CHAR),
                CAST(IS_NULLABLE AS CHAR),
                CAST(COLUMN_DEFAULT AS CHAR),
                CAST(COLUMN_KEY AS CHAR),
                CAST(EXTRA AS CHAR)
            FROM information_schema.COLUMNS
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            ORDER BY ORDINAL_POSITION
            "#,
        )
        .bind(database)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(name, data_type, is_nullable, default, key, extra)| {
                descriptor(name, data_type, is_nullable == "YES", &key, default, extra)
            })
            .collect())
    }

    pub async fn foreign_keys(
        &self,
        database: &str,
        table: &str,
    ) -> Result<Vec<ForeignKey>, CatalogError> {
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            r#"
            SELECT
                CAST(COLUMN_NAME AS CHAR),
                CAST(REFERENCED_TABLE_NAME AS CHAR),
                CAST(REFERENCED_COLUMN_NAME AS CHAR)
            FROM information_schema.KEY_COLUMN_USAGE
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
              AND REFERENCED_TABLE_NAME IS NOT NULL
            ORDER BY CONSTRAINT_NAME, ORDINAL_POSITION
            "#,
        )
        .bind(database)
        .bind(table)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(column, referenced_table, referenced_column)| ForeignKey {
                column,
                referenced_table,
                referenced_column,
            })
            .collect())
    }

    /// Exact row count and data plus index size.
    pub async fn table_size(
        &self,
        database: &str,
        table: &str,
    ) -> Result<(i64, Option<f64>), CatalogError> {
        let count_sql = format!(
            "SELECT COUNT(*) FROM {}.{}",
            quote_ident(database),
            quote_ident(table)
        );
        let (row_count,): (i64,) = sqlx::query_as(&count_sql).fetch_one(&self.pool).await?;

        let size: Option<(u64,)> = sqlx::query_as(
            r#"
            SELECT CAST(COALESCE(DATA_LENGTH, 0) + COALESCE(INDEX_LENGTH, 0) AS UNSIGNED)
            FROM information_schema.TABLES
            WHERE TABLE_SCHEMA = ? AND TABLE_NAME = ?
            "#,
        )
        .bind(database)
        .bind(table)
        .fetch_optional(&self.pool)
        .await?;

        Ok((row_count, size.map(|(bytes,)| bytes_to_mb(bytes))))
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn quote_ident(name: &str) -> String {
    format!("`{}`", name.replace('`', "``"))
}
