use hyper::StatusCode;
use hyper::{Response, body::Bytes};

use super::response::{ErrorResponse, build_response};
use crate::DiagramError;
use crate::catalog::CatalogError;
use crate::layout::LayoutError;
use crate::raster::RenderError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("Connection not found")]
    ConnectionNotFound,
    #[error("{0}")]
    NotFound(String),
    #[error("Method Not Allowed")]
    MethodNotAllowed,
    #[error("Request Timeout")]
    Timeout,
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Diagram(#[from] DiagramError),
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::ConnectionNotFound | Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::Timeout => StatusCode::REQUEST_TIMEOUT,
            Self::Catalog(CatalogError::UnknownTable(_)) => StatusCode::NOT_FOUND,
            Self::Catalog(CatalogError::Connect(_)) => StatusCode::BAD_REQUEST,
            Self::Catalog(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            Self::Diagram(DiagramError::Layout(LayoutError::UnknownTable { .. }))
            | Self::Diagram(DiagramError::Render(RenderError::TooLarge { .. })) => {
                StatusCode::BAD_REQUEST
            }
            Self::Catalog(_) | Self::Diagram(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<ApiError> for Response<Bytes> {
    fn from(err: ApiError) -> Self {
        let status = err.status();
        if status.is_server_error() {
            tracing::error!(error = %err, "request failed");
        } else {
            tracing::debug!(error = %err, status = status.as_u16(), "request rejected");
        }

        let body = serde_json::to_vec(&ErrorResponse::new(err.to_string())).unwrap_or_else(|_| {
            br#"{"success":false,"error":"Internal Server Error"}"#.to_vec()
        });

        build_response(status, body).unwrap_or_else(|_| {
            let mut response = Response::new(Bytes::from_static(b"Internal Server Error"));
            *response.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            response
        })
    }
}
