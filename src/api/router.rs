//! Matchit routing configuration.

use hyper::{Method, Request, Response, StatusCode, body::Bytes};
use matchit::Router as MatchitRouter;

use super::AppState;
use super::error::ApiError;
use super::handlers;
use super::response::{add_cors_headers, build_empty_response};

/// HTTP request router.
pub struct Router {
    inner: MatchitRouter<Route>,
    state: AppState,
}

impl Router {
    pub fn new(state: AppState) -> Self {
        let mut router = MatchitRouter::new();
        for (path, route) in [
            ("/connect", Route::Connect),
            ("/get_tables", Route::GetTables),
            ("/generate_er_diagram", Route::GenerateDiagram),
            ("/get_statistics", Route::GetStatistics),
            ("/render_diagram", Route::RenderDiagram),
            ("/health", Route::Health),
        ] {
            router
                .insert(path, route)
                .unwrap_or_else(|e| panic!("Failed to insert {path} route: {e}"));
        }

        Self {
            inner: router,
            state,
        }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Reads the body under the configured deadline, then dispatches.
    pub async fn route(&self, req: Request<hyper::body::Incoming>) -> Response<Bytes> {
        let method = req.method().clone();
        let path = req.uri().path().to_string();
        let timeout = self.state.config.request_timeout;

        match read_request_body_with_timeout(req, timeout).await {
            Ok(body) => self.dispatch(&method, &path, body).await,
            Err(err) => {
                let mut response = Response::from(err);
                add_cors_headers(&mut response);
                response
            }
        }
    }

    /// Routes an already-read request. Every response carries CORS headers.
    pub async fn dispatch(&self, method: &Method, path: &str, body: Bytes) -> Response<Bytes> {
        let started = std::time::Instant::now();

        let result = if method == Method::OPTIONS {
            build_empty_response(StatusCode::NO_CONTENT)
        } else {
            match self.inner.at(path) {
                Ok(matched) => matched.value.handle(method, body, &self.state).await,
                Err(_) => Err(ApiError::NotFound(format!("No route found for {path}"))),
            }
        };

        let mut response = result.unwrap_or_else(Response::from);
        add_cors_headers(&mut response);

        tracing::debug!(
            %method,
            path,
            status = response.status().as_u16(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "handled request"
        );
        response
    }
}

#[derive(Debug, Clone, Copy)]
enum Route {
    Connect,
    GetTables,
    GenerateDiagram,
    GetStatistics,
    RenderDiagram,
    Health,
}

impl Route {
    async fn handle(
        &self,
        method: &Method,
        body: Bytes,
        state: &AppState,
    ) -> Result<Response<Bytes>, ApiError> {
        match self {
            Route::Health if method == Method::GET => handlers::health(state).await,
            Route::Health => Err(ApiError::MethodNotAllowed),
            _ if method != Method::POST => Err(ApiError::MethodNotAllowed),
            Route::Connect => handlers::connect(body, state).await,
            Route::GetTables => handlers::get_tables(body, state).await,
            Route::GenerateDiagram => handlers::generate_er_diagram(body, state).await,
            Route::GetStatistics => handlers::get_statistics(body, state).await,
            Route::RenderDiagram => handlers::render_diagram(body, state).await,
        }
    }
}

async fn read_request_body_with_timeout(
    req: Request<hyper::body::Incoming>,
    timeout: std::time::Duration,
) -> Result<Bytes, ApiError> {
    use http_body_util::BodyExt;

    let body = tokio::time::timeout(timeout, req.collect())
        .await
        .map_err(|_| ApiError::Timeout)?
        .map_err(|e| ApiError::Internal(format!("Failed to read request body: {e}")))?;
    Ok(body.to_bytes())
}
