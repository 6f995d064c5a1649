//! Endpoint handlers. Each takes the raw request body and the shared state.

use std::sync::Arc;
use std::time::Instant;

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use hyper::{Response, body::Bytes};
use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::AppState;
use super::error::ApiError;
use super::response::success_response;
use crate::catalog::{Catalog, CatalogError, ConnectParams, DbKind, TableStatistics};
use crate::ir::{Relationship, TablesData, relationships_within};

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    #[serde(default)]
    pub db_type: Option<String>,
    #[serde(default)]
    pub host: Option<String>,
    #[serde(default)]
    pub port: Option<u16>,
    #[serde(default)]
    pub user: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub connection_id: String,
    pub databases: Vec<String>,
    pub db_type: String,
}

#[derive(Debug, Deserialize)]
pub struct TablesRequest {
    pub connection_id: String,
    #[serde(default)]
    pub database: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TablesResponse {
    pub tables: Vec<String>,
}

/// Body of `/generate_er_diagram` and `/get_statistics`.
#[derive(Debug, Deserialize)]
pub struct SelectionRequest {
    pub connection_id: String,
    #[serde(default)]
    pub database: Option<String>,
    #[serde(default)]
    pub tables: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DiagramResponse {
    pub diagram: String,
    pub tables_data: TablesData,
}

#[derive(Debug, Serialize)]
pub struct StatisticsResponse {
    pub statistics: IndexMap<String, TableStatistics>,
}

#[derive(Debug, Deserialize)]
pub struct RenderRequest {
    pub tables_data: TablesData,
    #[serde(default)]
    pub relationships: Option<Vec<Relationship>>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub connections: usize,
}

fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, ApiError> {
    serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(format!("Invalid JSON: {e}")))
}

fn connect_params(req: ConnectRequest) -> Result<ConnectParams, ApiError> {
    let db_type = req.db_type.unwrap_or_else(|| "mysql".to_string());
    let kind = DbKind::from_str(&db_type).ok_or(CatalogError::UnsupportedDbType(db_type))?;

    let host = req.host.filter(|h| !h.is_empty());
    let Some(host) = host else {
        return Err(ApiError::BadRequest(
            "Missing required connection parameters".to_string(),
        ));
    };

    let (user, password) = match kind {
        DbKind::Sqlite => (
            req.user.unwrap_or_default(),
            req.password.unwrap_or_default(),
        ),
        DbKind::MySql | DbKind::Postgres => match (req.user.filter(|u| !u.is_empty()), req.password) {
            (Some(user), Some(password)) => (user, password),
            _ => {
                return Err(ApiError::BadRequest(
                    "Missing required connection parameters".to_string(),
                ));
            }
        },
    };

    Ok(ConnectParams {
        kind,
        host,
        port: req.port,
        user,
        password,
    })
}

fn lookup_connection(state: &AppState, id: &str) -> Result<Arc<Catalog>, ApiError> {
    state
        .connections
        .lock()
        .get(id, Instant::now())
        .ok_or(ApiError::ConnectionNotFound)
}

/// Lay out and rasterize off the async runtime.
async fn render_diagram_png(
    state: &AppState,
    tables_data: TablesData,
    relationships: Vec<Relationship>,
) -> Result<(String, TablesData), ApiError> {
    let rasterizer = Arc::clone(&state.rasterizer);
    let config = Arc::clone(&state.config);

    tokio::task::spawn_blocking(move || -> Result<(String, TablesData), ApiError> {
        let png = crate::render_png(
            &tables_data,
            &relationships,
            &rasterizer,
            &config.render,
        )?;
        Ok((BASE64.encode(png), tables_data))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Render task failed: {e}")))?
}

pub async fn connect(body: Bytes, state: &AppState) -> Result<Response<Bytes>, ApiError> {
    let params = connect_params(parse_json(&body)?)?;
    tracing::info!(kind = %params.kind, host = %params.host, "connect requested");

    let catalog = Catalog::connect(&params).await?;
    let databases = match catalog.list_databases().await {
        Ok(databases) => databases,
        Err(e) => {
            catalog.close().await;
            return Err(e.into());
        }
    };

    let connection_id = uuid::Uuid::new_v4().to_string();
    state
        .connections
        .lock()
        .put(connection_id.clone(), Arc::new(catalog), Instant::now());

    success_response(ConnectResponse {
        connection_id,
        databases,
        db_type: params.kind.as_str().to_string(),
    })
}

pub async fn get_tables(body: Bytes, state: &AppState) -> Result<Response<Bytes>, ApiError> {
    let req: TablesRequest = parse_json(&body)?;
    let catalog = lookup_connection(state, &req.connection_id)?;
    let tables = catalog.list_tables(req.database.as_deref()).await?;
    success_response(TablesResponse { tables })
}

pub async fn generate_er_diagram(
    body: Bytes,
    state: &AppState,
) -> Result<Response<Bytes>, ApiError> {
    let req: SelectionRequest = parse_json(&body)?;
    let catalog = lookup_connection(state, &req.connection_id)?;

    let tables_data = catalog
        .describe(req.database.as_deref(), &req.tables)
        .await?;
    let relationships = relationships_within(&tables_data);
    tracing::info!(
        tables = tables_data.len(),
        relationships = relationships.len(),
        "generating diagram"
    );

    let (diagram, tables_data) = render_diagram_png(state, tables_data, relationships).await?;
    success_response(DiagramResponse {
        diagram,
        tables_data,
    })
}

pub async fn get_statistics(body: Bytes, state: &AppState) -> Result<Response<Bytes>, ApiError> {
    let req: SelectionRequest = parse_json(&body)?;
    let catalog = lookup_connection(state, &req.connection_id)?;
    let statistics = catalog
        .statistics(req.database.as_deref(), &req.tables)
        .await?;
    success_response(StatisticsResponse { statistics })
}

pub async fn render_diagram(body: Bytes, state: &AppState) -> Result<Response<Bytes>, ApiError> {
    let req: RenderRequest = parse_json(&body)?;
    let relationships = req
        .relationships
        .unwrap_or_else(|| relationships_within(&req.tables_data));

    let (diagram, tables_data) = render_diagram_png(state, req.tables_data, relationships).await?;
    success_response(DiagramResponse {
        diagram,
        tables_data,
    })
}

pub async fn health(state: &AppState) -> Result<Response<Bytes>, ApiError> {
    let connections = state.connections.lock().len();
    success_response(HealthResponse { connections })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(json: &str) -> ConnectRequest {
        serde_json::from_str(json).unwrap()
    }

    #[test]
    fn test_connect_params_defaults_to_mysql() {
        let params =
            connect_params(request(r#"{"host":"db","user":"root","password":""}"#)).unwrap();
        assert_eq!(params.kind, DbKind::MySql);
        assert_eq!(params.port(), 3306);
    }

    #[test]
    fn test_connect_params_requires_credentials_for_servers() {
        let err = connect_params(request(r#"{"db_type":"postgresql","host":"db"}"#)).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));

        let err = connect_params(request(r#"{"user":"root","password":"x"}"#)).unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[test]
    fn test_connect_params_sqlite_needs_only_path() {
        let params =
            connect_params(request(r#"{"db_type":"sqlite","host":"/tmp/x.db"}"#)).unwrap();
        assert_eq!(params.kind, DbKind::Sqlite);
        assert_eq!(params.host, "/tmp/x.db");
    }

    #[test]
    fn test_connect_params_unsupported_type() {
        let err = connect_params(request(r#"{"db_type":"oracle","host":"db"}"#)).unwrap_err();
        assert!(matches!(
            err,
            ApiError::Catalog(CatalogError::UnsupportedDbType(ref t)) if t == "oracle"
        ));
    }
}
