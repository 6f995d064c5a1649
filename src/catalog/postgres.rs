use std::collections::HashMap;
use std::time::Duration;

use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions};
use tokio::sync::Mutex;

use super::{CatalogError, ConnectParams, bytes_to_mb, descriptor};
use crate::ir::{ColumnDescriptor, ForeignKey};

const DEFAULT_DATABASE: &str = "postgres";
const SCHEMA: &str = "public";

/// PostgreSQL. A connection is bound to one database, so a pool is opened
/// per database on first use.
pub struct PostgresCatalog {
    options: PgConnectOptions,
    pools: Mutex<HashMap<String, PgPool>>,
}

impl PostgresCatalog {
    pub async fn connect(params: &ConnectParams) -> Result<Self, CatalogError> {
        let options = PgConnectOptions::new()
            .host(&params.host)
            .port(params.port())
            .username(&params.user)
            .password(&params.password);

        let catalog = Self {
            options,
            pools: Mutex::new(HashMap::new()),
        };
        // Fail at connect time on bad credentials
        catalog.pool(None).await?;
        Ok(catalog)
    }

    async fn pool(&self, database: Option<&str>) -> Result<PgPool, CatalogError> {
        let database = database
            .filter(|d| !d.is_empty())
            .unwrap_or(DEFAULT_DATABASE);

        let mut pools = self.pools.lock().await;
        if let Some(pool) = pools.get(database) {
            return Ok(pool.clone());
        }

        let pool = PgPoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(30))
            .connect_with(self.options.clone().database(database))
            .await
            .map_err(CatalogError::Connect)?;
        tracing::debug!(database, "opened postgres pool");

        pools.insert(database.to_string(), pool.clone());
        Ok(pool)
    }

    pub async fn list_databases(&self) -> Result<Vec<String>, CatalogError> {
        let pool = self.pool(None).await?;
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT datname::text
            FROM pg_database
            WHERE datistemplate = false
              AND datname NOT IN ('postgres', 'template0', 'template1')
            ORDER BY datname
            "#,
        )
        .fetch_all(&pool)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    pub async fn list_tables(&self, database: Option<&str>) -> Result<Vec<String>, CatalogError> {
        let pool = self.pool(database).await?;
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT tablename::text
            FROM pg_tables
            WHERE schemaname = $1
            ORDER BY tablename
            "#,
        )
        .bind(SCHEMA)
        .fetch_all(&pool)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    pub async fn table_schema(
        &self,
        database: Option<&str>,
        table: &str,
    ) -> Result<Vec<ColumnDescriptor>, CatalogError> {
        let pool = self.pool(database).await?;

        let column_rows: Vec<(String, String, String, Option<String>)> = sqlx::query_as(
            r#"
            SELECT
                column_name::text,
                data_type::text,
                is_nullable::text,
                column_default::text
            FROM information_schema.columns
            WHERE table_schema = $1 AND table_name = $2
            ORDER BY ordinal_position
            "#,
        )
        .bind(SCHEMA)
        .bind(table)
        .fetch_all(&pool)
        .await?;

        let pk_rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT a.attname::text
            FROM pg_index i
            JOIN pg_attribute a ON a.attrelid = i.indrelid AND a.attnum = ANY(i.indkey)
            JOIN pg_class c ON c.oid = i.indrelid
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE i.indisprimary
              AND n.nspname = $1
              AND c.relname = $2
            "#,
        )
        .bind(SCHEMA)
        .bind(table)
        .fetch_all(&pool)
        .await?;

        let pk_columns: Vec<String> = pk_rows.into_iter().map(|(name,)| name).collect();

        Ok(column_rows
            .into_iter()
            .map(|(name, data_type, is_nullable, default)| {
                let key = if pk_columns.contains(&name) { "PRI" } else { "" };
                let extra = match &default {
                    Some(d) if d.starts_with("nextval(") => "auto_increment".to_string(),
                    _ => String::new(),
                };
                descriptor(name, data_type, is_nullable == "YES", key, default, extra)
            })
            .collect())
    }

    pub async fn foreign_keys(
        &self,
        database: Option<&str>,
        table: &str,
    ) -> Result<Vec<ForeignKey>, CatalogError> {
        let pool = self.pool(database).await?;
        let rows: Vec<(String, String, String)> = sqlx::query_as(
            r#"
            SELECT
                kcu.column_name::text,
                ccu.table_name::text,
                ccu.column_name::text
            FROM information_schema.table_constraints AS tc
            JOIN information_schema.key_column_usage AS kcu
              ON tc.constraint_name = kcu.constraint_name
              AND tc.table_schema = kcu.table_schema
            JOIN information_schema.constraint_column_usage AS ccu
              ON ccu.constraint_name = tc.constraint_name
              AND ccu.table_schema = tc.table_schema
            WHERE tc.constraint_type = 'FOREIGN KEY'
              AND tc.table_schema = $1
              AND tc.table_name = $2
            ORDER BY tc.constraint_name, kcu.ordinal_position
            "#,
        )
        .bind(SCHEMA)
        .bind(table)
        .fetch_all(&pool)
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

    /// Exact row count and total relation size (heap, indexes and TOAST).
    pub async fn table_size(
        &self,
        database: Option<&str>,
        table: &str,
    ) -> Result<(i64, Option<f64>), CatalogError> {
        let pool = self.pool(database).await?;

        let count_sql = format!(
            "SELECT COUNT(*) FROM {}.{}",
            quote_ident(SCHEMA),
            quote_ident(table)
        );
        let (row_count,): (i64,) = sqlx::query_as(&count_sql).fetch_one(&pool).await?;

        let size: Option<(i64,)> = sqlx::query_as(
            r#"
            SELECT pg_total_relation_size(c.oid)
            FROM pg_class c
            JOIN pg_namespace n ON n.oid = c.relnamespace
            WHERE n.nspname = $1 AND c.relname = $2
            "#,
        )
        .bind(SCHEMA)
        .bind(table)
        .fetch_optional(&pool)
        .await?;

        Ok((
            row_count,
            size.map(|(bytes,)| bytes_to_mb(bytes.max(0) as u64)),
        ))
    }

    pub async fn close(&self) {
        let pools: Vec<PgPool> = self.pools.lock().await.drain().map(|(_, p)| p).collect();
        for pool in pools {
            pool.close().await;
        }
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
