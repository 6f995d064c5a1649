use std::time::Duration;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};

use super::{CatalogError, descriptor};
use crate::ir::{ColumnDescriptor, ForeignKey};

/// SQLite file, opened read-only. The file must already exist.
pub struct SqliteCatalog {
    pool: SqlitePool,
}

impl SqliteCatalog {
    pub async fn connect(path: &str) -> Result<Self, CatalogError> {
        if path.is_empty() {
            return Err(CatalogError::MissingParameter("database file path"));
        }

        let options = SqliteConnectOptions::new()
            .filename(path)
            .read_only(true)
            .create_if_missing(false)
            .busy_timeout(Duration::from_secs(30));

        let pool = SqlitePoolOptions::new()
            .max_connections(2)
            .acquire_timeout(Duration::from_secs(10))
            .connect_with(options)
            .await
            .map_err(CatalogError::Connect)?;

        Ok(Self { pool })
    }

    pub async fn list_tables(&self) -> Result<Vec<String>, CatalogError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name NOT LIKE 'sqlite_%'",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|(name,)| name).collect())
    }

    pub async fn table_schema(&self, table: &str) -> Result<Vec<ColumnDescriptor>, CatalogError> {
        let pragma = format!("PRAGMA table_info({})", quote_ident(table));
        let rows: Vec<(i64, String, String, i64, Option<String>, i64)> =
            sqlx::query_as(&pragma).fetch_all(&self.pool).await?;

        Ok(rows
            .into_iter()
            .map(|(_cid, name, data_type, notnull, default, pk)| {
                let key = if pk > 0 { "PRI" } else { "" };
                descriptor(name, data_type, notnull == 0, key, default, String::new())
            })
            .collect())
    }

    pub async fn foreign_keys(&self, table: &str) -> Result<Vec<ForeignKey>, CatalogError> {
        let pragma = format!("PRAGMA foreign_key_list({})", quote_ident(table));
        let rows: Vec<(i64, i64, String, String, Option<String>, String, String, String)> =
            sqlx::query_as(&pragma).fetch_all(&self.pool).await?;

        let mut foreign_keys = Vec::with_capacity(rows.len());
        for (_id, _seq, referenced_table, column, to, _on_update, _on_delete, _match) in rows {
            // REFERENCES t without a column list targets t's primary key
            let referenced_column = match to {
                Some(to) => to,
                None => self
                    .table_schema(&referenced_table)
                    .await?
                    .into_iter()
                    .find(|c| c.is_primary_key())
                    .map(|c| c.column)
                    .unwrap_or_else(|| "rowid".to_string()),
            };
            foreign_keys.push(ForeignKey {
                column,
                referenced_table,
                referenced_column,
            });
        }
        Ok(foreign_keys)
    }

    pub async fn row_count(&self, table: &str) -> Result<i64, CatalogError> {
        let sql = format!("SELECT COUNT(*) FROM {}", quote_ident(table));
        let (count,): (i64,) = sqlx::query_as(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{Catalog, ConnectParams, DbKind};

    async fn fixture() -> (tempfile::TempDir, String) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("shop.db");
        let options = SqliteConnectOptions::new()
            .filename(&path)
            .create_if_missing(true);
        let pool = SqlitePool::connect_with(options).await.unwrap();
        for sql in [
            "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT NOT NULL, email TEXT)",
            "CREATE TABLE orders (id INTEGER PRIMARY KEY, user_id INTEGER REFERENCES users(id), total REAL DEFAULT 0)",
            "CREATE TABLE notes (id INTEGER PRIMARY KEY, order_id INTEGER REFERENCES orders)",
            "INSERT INTO users (name) VALUES ('ada'), ('grace')",
        ] {
            sqlx::query(sql).execute(&pool).await.unwrap();
        }
        pool.close().await;
        let path = path.to_string_lossy().into_owned();
        (dir, path)
    }

    fn params(path: &str) -> ConnectParams {
        ConnectParams {
            kind: DbKind::Sqlite,
            host: path.to_string(),
            port: None,
            user: String::new(),
            password: String::new(),
        }
    }

    #[tokio::test]
    async fn test_describe_sqlite() {
        let (_dir, path) = fixture().await;
        let catalog = Catalog::connect(&params(&path)).await.unwrap();

        assert_eq!(catalog.list_databases().await.unwrap(), vec!["main"]);
        assert_eq!(
            catalog.list_tables(None).await.unwrap(),
            vec!["users", "orders", "notes"]
        );

        let tables = vec!["orders".to_string(), "users".to_string()];
        let data = catalog.describe(None, &tables).await.unwrap();
        assert_eq!(data.keys().collect::<Vec<_>>(), vec!["orders", "users"]);

        let orders = &data["orders"];
        assert_eq!(orders.schema.len(), 3);
        assert_eq!(orders.schema[0].column, "id");
        assert!(orders.schema[0].is_primary_key());
        assert_eq!(orders.schema[2].default.as_deref(), Some("0"));
        assert_eq!(orders.foreign_keys.len(), 1);
        assert_eq!(orders.foreign_keys[0].referenced_table, "users");
        assert_eq!(orders.foreign_keys[0].referenced_column, "id");

        assert_eq!(data["users"].schema[1].null, "NO");
        catalog.close().await;
    }

    #[tokio::test]
    async fn test_implicit_reference_column() {
        let (_dir, path) = fixture().await;
        let catalog = SqliteCatalog::connect(&path).await.unwrap();
        let fks = catalog.foreign_keys("notes").await.unwrap();
        assert_eq!(fks[0].referenced_table, "orders");
        assert_eq!(fks[0].referenced_column, "id");
    }

    #[tokio::test]
    async fn test_statistics() {
        let (_dir, path) = fixture().await;
        let catalog = Catalog::connect(&params(&path)).await.unwrap();
        let stats = catalog
            .table_statistics(None, "users")
            .await
            .unwrap();
        assert_eq!(stats.row_count, 2);
        assert_eq!(stats.column_count, 3);
        assert_eq!(stats.size_mb, None);
    }

    #[tokio::test]
    async fn test_unknown_table_rejected() {
        let (_dir, path) = fixture().await;
        let catalog = Catalog::connect(&params(&path)).await.unwrap();
        let err = catalog
            .describe(None, &["users".to_string(), "ghost".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, CatalogError::UnknownTable(ref t) if t == "ghost"));
    }

    #[tokio::test]
    async fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("absent.db");
        let err = SqliteCatalog::connect(&path.to_string_lossy())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, CatalogError::Connect(_)));
        assert!(!path.exists());
    }
}
