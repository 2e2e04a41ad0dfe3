//! Success and failure envelopes shared by all handlers.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::api::error::ErrorBody;

#[derive(Debug, Serialize)]
pub struct SuccessBody<T> {
    pub success: bool,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// `{ "success": true, "data", "message"? }` with the given status.
pub fn success<T: Serialize>(data: T, message: Option<&str>, status: StatusCode) -> Response {
    let body = SuccessBody {
        success: true,
        data,
        message: message.map(str::to_string),
    };
    (status, Json(body)).into_response()
}

/// Shorthand for a 200 without a message.
pub fn ok<T: Serialize>(data: T) -> Response {
    success(data, None, StatusCode::OK)
}

pub fn error_response(error: &str, status: StatusCode, code: &str) -> Response {
    (status, Json(ErrorBody::new(error, code, None))).into_response()
}
