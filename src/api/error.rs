//! HTTP error type and the failure envelope.
//!
//! Every failure leaves the API as
//! `{ "success": false, "error", "code", "details"?, "timestamp" }`.
//! Internal details are logged and replaced with a generic message.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::{json, Value};

use crate::core_state::CoreError;
use crate::db::DatabaseError;
use crate::llm::LlmError;
use crate::mail::MailError;

/// One failed rule, addressed by `body.field`, `query.field` or `params.field`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationIssue {
    pub path: String,
    pub message: String,
}

impl ValidationIssue {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
    pub code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    pub timestamp: String,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>, code: impl Into<String>, details: Option<Value>) -> Self {
        Self {
            success: false,
            error: error.into(),
            code: code.into(),
            details,
            timestamp: chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// An expected failure with its own status and code.
    #[error("{message}")]
    App {
        status: StatusCode,
        code: &'static str,
        message: String,
    },
    #[error("Validation failed")]
    Validation(Vec<ValidationIssue>),
    #[error("Database error: {0}")]
    Database(DatabaseError),
    #[error("AI service error: {0}")]
    Llm(LlmError),
    #[error("Email service error: {0}")]
    Mail(MailError),
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    pub fn app(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        ApiError::App {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::app(StatusCode::NOT_FOUND, "NOT_FOUND", message)
    }

    pub fn route_not_found() -> Self {
        Self::not_found("Route not found")
    }

    /// Issues are reported sorted by path.
    pub fn validation(mut issues: Vec<ValidationIssue>) -> Self {
        issues.sort_by(|a, b| a.path.cmp(&b.path));
        ApiError::Validation(issues)
    }

    fn parts(&self) -> (StatusCode, String, String, Option<Value>) {
        match self {
            ApiError::App {
                status,
                code,
                message,
            } => (*status, code.to_string(), message.clone(), None),
            ApiError::Validation(issues) => (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR".into(),
                "Validation failed".into(),
                Some(json!(issues)),
            ),
            ApiError::Database(err) => database_parts(err),
            ApiError::Llm(err) => {
                tracing::error!(error = %err, "AI service request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "AI_SERVICE_ERROR".into(),
                    "AI service request failed".into(),
                    None,
                )
            }
            ApiError::Mail(err) => {
                tracing::error!(error = %err, "Email service request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "EMAIL_SERVICE_ERROR".into(),
                    "Email service request failed".into(),
                    None,
                )
            }
            ApiError::Internal(detail) => {
                tracing::error!(detail, "API internal error");
                internal_parts()
            }
        }
    }
}

fn internal_parts() -> (StatusCode, String, String, Option<Value>) {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "INTERNAL_ERROR".into(),
        "An unexpected error occurred".into(),
        None,
    )
}

fn database_parts(err: &DatabaseError) -> (StatusCode, String, String, Option<Value>) {
    if err.is_unique_violation() {
        return (
            StatusCode::CONFLICT,
            "DUPLICATE_ERROR".into(),
            "A record with this value already exists".into(),
            Some(json!({ "target": err.unique_target() })),
        );
    }
    match err {
        DatabaseError::NotFound { .. } => (
            StatusCode::NOT_FOUND,
            "NOT_FOUND".into(),
            "Record not found".into(),
            None,
        ),
        DatabaseError::InvalidEnum { .. }
        | DatabaseError::Json(_)
        | DatabaseError::ConstraintViolation(_) => {
            tracing::warn!(error = %err, "Rejected invalid data");
            (
                StatusCode::BAD_REQUEST,
                "VALIDATION_ERROR".into(),
                "Invalid data provided".into(),
                None,
            )
        }
        DatabaseError::Sqlite(_) | DatabaseError::MigrationFailed { .. } | DatabaseError::Io(_) => {
            tracing::error!(error = %err, "Database failure");
            internal_parts()
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = self.parts();
        (status, Json(ErrorBody::new(message, code, details))).into_response()
    }
}

impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Database(e) => ApiError::Database(e),
            CoreError::Llm(e) => ApiError::Llm(e),
            CoreError::Mail(e) => ApiError::Mail(e),
            CoreError::NotFound { code, message } => {
                ApiError::app(StatusCode::NOT_FOUND, code, message)
            }
            CoreError::Rejected { code, message } => {
                ApiError::app(StatusCode::BAD_REQUEST, code, message)
            }
        }
    }
}

impl From<DatabaseError> for ApiError {
    fn from(err: DatabaseError) -> Self {
        ApiError::Database(err)
    }
}

impl From<rusqlite::Error> for ApiError {
    fn from(err: rusqlite::Error) -> Self {
        ApiError::Database(DatabaseError::Sqlite(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(response: Response) -> Value {
        let body = to_bytes(response.into_body(), 64 * 1024).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn app_error_keeps_status_and_code() {
        let response =
            ApiError::app(StatusCode::BAD_REQUEST, "RFP_CLOSED", "Cannot send a closed RFP")
                .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(json["code"], "RFP_CLOSED");
        assert_eq!(json["error"], "Cannot send a closed RFP");
        assert!(json.get("details").is_none());
        assert!(json["timestamp"].as_str().unwrap().ends_with('Z'));
    }

    #[tokio::test]
    async fn validation_lists_sorted_issues() {
        let response = ApiError::validation(vec![
            ValidationIssue::new("body.name", "Vendor name is required"),
            ValidationIssue::new("body.email", "Invalid email address"),
        ])
        .into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"], "Validation failed");
        assert_eq!(json["details"][0]["path"], "body.email");
        assert_eq!(json["details"][1]["message"], "Vendor name is required");
    }

    #[tokio::test]
    async fn unique_violation_maps_to_conflict_with_target() {
        let conn = crate::db::open_memory_database().unwrap();
        let vendor = crate::models::NewVendor {
            name: "Acme".into(),
            email: "sales@acme.test".into(),
            ..Default::default()
        };
        crate::db::insert_vendor(&conn, vendor.clone()).unwrap();
        let err = crate::db::insert_vendor(&conn, vendor).unwrap_err();

        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::CONFLICT);
        let json = body_json(response).await;
        assert_eq!(json["code"], "DUPLICATE_ERROR");
        assert_eq!(json["error"], "A record with this value already exists");
        assert_eq!(json["details"]["target"][0], "email");
    }

    #[tokio::test]
    async fn database_not_found_maps_to_404() {
        let response = ApiError::from(DatabaseError::not_found("vendor", "x")).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        let json = body_json(response).await;
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["error"], "Record not found");
    }

    #[tokio::test]
    async fn invalid_enum_maps_to_validation_error() {
        let err = DatabaseError::InvalidEnum {
            field: "RfpStatus".into(),
            value: "OPEN".into(),
        };
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = body_json(response).await;
        assert_eq!(json["code"], "VALIDATION_ERROR");
        assert_eq!(json["error"], "Invalid data provided");
    }

    #[tokio::test]
    async fn collaborator_failures_map_to_bad_gateway() {
        let response = ApiError::from(CoreError::Llm(LlmError::EmptyResponse)).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["code"], "AI_SERVICE_ERROR");

        let response =
            ApiError::from(CoreError::Mail(MailError::Smtp("relay refused".into()))).into_response();
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(body_json(response).await["code"], "EMAIL_SERVICE_ERROR");
    }

    #[tokio::test]
    async fn internal_hides_details() {
        let response = ApiError::Internal("disk on fire".into()).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(response).await;
        assert_eq!(json["code"], "INTERNAL_ERROR");
        assert_eq!(json["error"], "An unexpected error occurred");
    }

    #[tokio::test]
    async fn core_rejection_uses_its_code() {
        let err = CoreError::rejected("NO_PROPOSALS", "No proposals found for this RFP");
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["code"], "NO_PROPOSALS");

        let err = CoreError::not_found("VENDOR_NOT_FOUND", "Vendor(s) not found: x");
        let response = ApiError::from(err).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(response).await["code"], "VENDOR_NOT_FOUND");
    }
}
