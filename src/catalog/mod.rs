//! Schema catalogs for the supported database vendors.
//!
//! Each vendor module turns its own catalog queries into the normalized
//! [`TablesData`] the diagram engine consumes.

pub mod mysql;
pub mod postgres;
pub mod sqlite;

use std::fmt;

use serde::Serialize;
use tracing::instrument;

use crate::ir::{ColumnDescriptor, ForeignKey, TableInfo, TablesData};

pub use mysql::MySqlCatalog;
pub use postgres::PostgresCatalog;
pub use sqlite::SqliteCatalog;

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("unsupported database type: {0}")]
    UnsupportedDbType(String),
    #[error("{0} is required")]
    MissingParameter(&'static str),
    #[error("database connection failed: {0}")]
    Connect(#[source] sqlx::Error),
    #[error("catalog query failed: {0}")]
    Query(#[from] sqlx::Error),
    #[error("table '{0}' does not exist")]
    UnknownTable(String),
}

impl CatalogError {
    /// Errors caused by the request rather than the database.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::UnsupportedDbType(_) | Self::MissingParameter(_) | Self::UnknownTable(_)
        )
    }
}

/// Supported database vendors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbKind {
    MySql,
    Postgres,
    Sqlite,
}

impl DbKind {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "mysql" | "mariadb" => Some(Self::MySql),
            "postgresql" | "postgres" => Some(Self::Postgres),
            "sqlite" => Some(Self::Sqlite),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::MySql => "mysql",
            Self::Postgres => "postgresql",
            Self::Sqlite => "sqlite",
        }
    }

    pub fn default_port(&self) -> Option<u16> {
        match self {
            Self::MySql => Some(3306),
            Self::Postgres => Some(5432),
            Self::Sqlite => None,
        }
    }
}

impl fmt::Display for DbKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection parameters. For SQLite `host` is the database file path.
#[derive(Clone)]
pub struct ConnectParams {
    pub kind: DbKind,
    pub host: String,
    pub port: Option<u16>,
    pub user: String,
    pub password: String,
}

impl ConnectParams {
    pub fn port(&self) -> u16 {
        self.port
            .or_else(|| self.kind.default_port())
            .unwrap_or_default()
    }
}

impl fmt::Debug for ConnectParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConnectParams")
            .field("kind", &self.kind)
            .field("host", &self.host)
            .field("port", &self.port)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableStatistics {
    pub row_count: i64,
    pub column_count: usize,
    /// Data plus index size in megabytes, where the vendor reports it
    pub size_mb: Option<f64>,
}

pub(crate) fn bytes_to_mb(bytes: u64) -> f64 {
    (bytes as f64 / 1024.0 / 1024.0 * 100.0).round() / 100.0
}

pub(crate) fn descriptor(
    column: String,
    data_type: String,
    nullable: bool,
    key: &str,
    default: Option<String>,
    extra: String,
) -> ColumnDescriptor {
    ColumnDescriptor {
        column,
        data_type,
        null: if nullable { "YES" } else { "NO" }.to_string(),
        key: key.to_string(),
        default,
        extra,
    }
}

/// An open connection to one of the supported vendors.
pub enum Catalog {
    MySql(MySqlCatalog),
    Postgres(PostgresCatalog),
    Sqlite(SqliteCatalog),
}

impl Catalog {
    #[instrument(skip(params), fields(kind = %params.kind, host = %params.host))]
    pub async fn connect(params: &ConnectParams) -> Result<Self, CatalogError> {
        let catalog = match params.kind {
            DbKind::MySql => Self::MySql(MySqlCatalog::connect(params).await?),
            DbKind::Postgres => Self::Postgres(PostgresCatalog::connect(params).await?),
            DbKind::Sqlite => Self::Sqlite(SqliteCatalog::connect(&params.host).await?),
        };
        tracing::info!("connected");
        Ok(catalog)
    }

    pub fn kind(&self) -> DbKind {
        match self {
            Self::MySql(_) => DbKind::MySql,
            Self::Postgres(_) => DbKind::Postgres,
            Self::Sqlite(_) => DbKind::Sqlite,
        }
    }

    /// User databases, system databases excluded.
    pub async fn list_databases(&self) -> Result<Vec<String>, CatalogError> {
        match self {
            Self::MySql(c) => c.list_databases().await,
            Self::Postgres(c) => c.list_databases().await,
            Self::Sqlite(_) => Ok(vec!["main".to_string()]),
        }
    }

    #[instrument(skip(self), fields(kind = %self.kind()))]
    pub async fn list_tables(&self, database: Option<&str>) -> Result<Vec<String>, CatalogError> {
        match self {
            Self::MySql(c) => c.list_tables(require_database(database)?).await,
            Self::Postgres(c) => c.list_tables(database).await,
            Self::Sqlite(c) => c.list_tables().await,
        }
    }

    /// Columns of `table` in catalog order.
    pub async fn table_schema(
        &self,
        database: Option<&str>,
        table: &str,
    ) -> Result<Vec<ColumnDescriptor>, CatalogError> {
        match self {
            Self::MySql(c) => c.table_schema(require_database(database)?, table).await,
            Self::Postgres(c) => c.table_schema(database, table).await,
            Self::Sqlite(c) => c.table_schema(table).await,
        }
    }

    pub async fn foreign_keys(
        &self,
        database: Option<&str>,
        table: &str,
    ) -> Result<Vec<ForeignKey>, CatalogError> {
        match self {
            Self::MySql(c) => c.foreign_keys(require_database(database)?, table).await,
            Self::Postgres(c) => c.foreign_keys(database, table).await,
            Self::Sqlite(c) => c.foreign_keys(table).await,
        }
    }

    #[instrument(skip(self), fields(kind = %self.kind()))]
    pub async fn table_statistics(
        &self,
        database: Option<&str>,
        table: &str,
    ) -> Result<TableStatistics, CatalogError> {
        let column_count = self.table_schema(database, table).await?.len();
        let (row_count, size_mb) = match self {
            Self::MySql(c) => c.table_size(require_database(database)?, table).await?,
            Self::Postgres(c) => c.table_size(database, table).await?,
            Self::Sqlite(c) => (c.row_count(table).await?, None),
        };
        Ok(TableStatistics {
            row_count,
            column_count,
            size_mb,
        })
    }

    /// Describe the selected tables, in the order given.
    ///
    /// Every name must exist in `database`; an unknown table fails the
    /// whole call.
    #[instrument(skip(self, tables), fields(kind = %self.kind(), count = tables.len()))]
    pub async fn describe(
        &self,
        database: Option<&str>,
        tables: &[String],
    ) -> Result<TablesData, CatalogError> {
        self.check_tables(database, tables).await?;

        let mut data = TablesData::with_capacity(tables.len());
        for table in tables {
            let schema = self.table_schema(database, table).await?;
            let foreign_keys = self.foreign_keys(database, table).await?;
            tracing::debug!(
                table = %table,
                columns = schema.len(),
                foreign_keys = foreign_keys.len(),
                "described table"
            );
            data.insert(
                table.clone(),
                TableInfo {
                    schema,
                    foreign_keys,
                },
            );
        }
        Ok(data)
    }

    /// Statistics for the selected tables, in the order given.
    pub async fn statistics(
        &self,
        database: Option<&str>,
        tables: &[String],
    ) -> Result<indexmap::IndexMap<String, TableStatistics>, CatalogError> {
        self.check_tables(database, tables).await?;

        let mut stats = indexmap::IndexMap::with_capacity(tables.len());
        for table in tables {
            stats.insert(table.clone(), self.table_statistics(database, table).await?);
        }
        Ok(stats)
    }

    pub async fn close(&self) {
        match self {
            Self::MySql(c) => c.close().await,
            Self::Postgres(c) => c.close().await,
            Self::Sqlite(c) => c.close().await,
        }
    }

    async fn check_tables(
        &self,
        database: Option<&str>,
        tables: &[String],
    ) -> Result<(), CatalogError> {
        let known = self.list_tables(database).await?;
        match tables.iter().find(|t| !known.contains(t)) {
            Some(missing) => Err(CatalogError::UnknownTable(missing.clone())),
            None => Ok(()),
        }
    }
}

fn require_database(database: Option<&str>) -> Result<&str, CatalogError> {
    database
        .filter(|d| !d.is_empty())
        .ok_or(CatalogError::MissingParameter("database"))
}
