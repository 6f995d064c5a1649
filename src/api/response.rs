//! Response envelopes and builders.

use hyper::header::{self, HeaderValue};
use hyper::{Response, StatusCode, body::Bytes};
use serde::Serialize;

use super::error::ApiError;

/// `{"success": true, ...data}`
#[derive(Debug, Serialize)]
pub struct Success<T> {
    pub success: bool,
    #[serde(flatten)]
    pub data: T,
}

/// `{"success": false, "error": message}`
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: String) -> Self {
        Self {
            success: false,
            error,
        }
    }
}

pub fn build_response(status: StatusCode, json: Vec<u8>) -> Result<Response<Bytes>, ApiError> {
    Response::builder()
        .status(status)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Bytes::from(json))
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {e}")))
}

pub fn build_empty_response(status: StatusCode) -> Result<Response<Bytes>, ApiError> {
    Response::builder()
        .status(status)
        .body(Bytes::new())
        .map_err(|e| ApiError::Internal(format!("Failed to build response: {e}")))
}

/// Serialize `data` into a 200 success envelope.
pub fn success_response<T: Serialize>(data: T) -> Result<Response<Bytes>, ApiError> {
    let json = serde_json::to_vec(&Success {
        success: true,
        data,
    })
    .map_err(|e| ApiError::Internal(format!("Failed to serialize response: {e}")))?;
    build_response(StatusCode::OK, json)
}

pub fn add_cors_headers(response: &mut Response<Bytes>) {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static("GET, POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static("Content-Type"),
    );
}
