//! Request validation extractors.
//!
//! `ValidatedJson` and `ValidatedQuery` deserialize first, then run the
//! `validator` rules of the target type. Every failure becomes
//! `ApiError::Validation` with issues addressed as `body.field`,
//! `query.field` or `params.field`.

use axum::async_trait;
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use axum::Json;
use serde::de::DeserializeOwned;
use serde_json::Value;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::api::error::{ApiError, ValidationIssue};

/// JSON body that passed its validation rules.
#[derive(Debug)]
pub struct ValidatedJson<T>(pub T);

/// Query string that passed its validation rules.
#[derive(Debug)]
pub struct ValidatedQuery<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rejection| {
                ApiError::validation(vec![ValidationIssue::new("body", rejection.body_text())])
            })?;
        value
            .validate()
            .map_err(|errors| ApiError::validation(collect_issues("body", &errors)))?;
        Ok(Self(value))
    }
}

#[async_trait]
impl<T, S> FromRequestParts<S> for ValidatedQuery<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rejection| {
                ApiError::validation(vec![ValidationIssue::new("query", rejection.body_text())])
            })?;
        value
            .validate()
            .map_err(|errors| ApiError::validation(collect_issues("query", &errors)))?;
        Ok(Self(value))
    }
}

/// Flatten field errors into issues under `prefix`.
///
/// An error carrying an `indexes` param is reported once per listed element,
/// as `prefix.field.<index>`.
pub fn collect_issues(prefix: &str, errors: &ValidationErrors) -> Vec<ValidationIssue> {
    let mut issues = Vec::new();
    for (field, field_errors) in errors.field_errors() {
        let path = format!("{prefix}.{}", camel_case(&field.to_string()));
        for error in field_errors.iter() {
            let message = error
                .message
                .as_ref()
                .map(|m| m.to_string())
                .unwrap_or_else(|| "Invalid".to_string());
            match error.params.get("indexes").and_then(Value::as_array) {
                Some(indexes) => issues.extend(indexes.iter().map(|index| {
                    ValidationIssue::new(format!("{path}.{index}"), message.clone())
                })),
                None => issues.push(ValidationIssue::new(path.clone(), message)),
            }
        }
    }
    issues.sort_by(|a, b| a.path.cmp(&b.path).then_with(|| a.message.cmp(&b.message)));
    issues
}

/// Join two validation steps, reporting the issues of both when both fail.
pub fn merge_validation<A, B>(
    first: Result<A, ApiError>,
    second: Result<B, ApiError>,
) -> Result<(A, B), ApiError> {
    match (first, second) {
        (Ok(a), Ok(b)) => Ok((a, b)),
        (Err(ApiError::Validation(mut issues)), Err(ApiError::Validation(more))) => {
            issues.extend(more);
            Err(ApiError::validation(issues))
        }
        (Err(e), _) | (_, Err(e)) => Err(e),
    }
}

/// Validate a path parameter as a UUID.
pub fn parse_id(raw: &str, field: &str, message: &str) -> Result<Uuid, ApiError> {
    Uuid::parse_str(raw.trim()).map_err(|_| {
        ApiError::validation(vec![ValidationIssue::new(format!("params.{field}"), message)])
    })
}

fn camel_case(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper = false;
    for c in field.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::response::IntoResponse;
    use serde::Deserialize;

    #[derive(Debug, Deserialize, Validate)]
    #[serde(rename_all = "camelCase")]
    struct Sample {
        #[validate(length(min = 3, message = "Too short"))]
        display_name: String,
        #[validate(email(message = "Invalid email address"))]
        email: Option<String>,
    }

    fn json_request(body: &str) -> Request {
        axum::http::Request::builder()
            .method("POST")
            .uri("/")
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn issues(err: ApiError) -> Vec<ValidationIssue> {
        match err {
            ApiError::Validation(issues) => issues,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn valid_body_passes() {
        let ValidatedJson(sample) = ValidatedJson::<Sample>::from_request(
            json_request(r#"{"displayName":"Acme","email":"a@b.co"}"#),
            &(),
        )
        .await
        .unwrap();
        assert_eq!(sample.display_name, "Acme");
    }

    #[tokio::test]
    async fn rule_failures_use_camel_case_paths() {
        let err = ValidatedJson::<Sample>::from_request(
            json_request(r#"{"displayName":"A","email":"nope"}"#),
            &(),
        )
        .await
        .unwrap_err();
        let issues = issues(err);
        assert_eq!(
            issues,
            vec![
                ValidationIssue::new("body.displayName", "Too short"),
                ValidationIssue::new("body.email", "Invalid email address"),
            ]
        );
    }

    #[tokio::test]
    async fn malformed_json_is_a_body_issue() {
        let err = ValidatedJson::<Sample>::from_request(json_request("{not json"), &())
            .await
            .unwrap_err();
        let issues = issues(err);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].path, "body");
    }

    #[tokio::test]
    async fn query_rules_use_query_prefix() {
        let req = axum::http::Request::builder()
            .uri("/?displayName=x")
            .body(Body::empty())
            .unwrap();
        let (mut parts, _) = req.into_parts();
        let err = ValidatedQuery::<Sample>::from_request_parts(&mut parts, &())
            .await
            .unwrap_err();
        assert_eq!(issues(err)[0].path, "query.displayName");
    }

    #[test]
    fn parse_id_reports_param_path() {
        let id = Uuid::new_v4();
        assert_eq!(parse_id(&id.to_string(), "id", "Invalid RFP ID").unwrap(), id);

        let err = parse_id("42", "rfpId", "Invalid RFP ID").unwrap_err();
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn parse_id_issue_carries_message() {
        let issues = issues(parse_id("nope", "id", "Invalid vendor ID").unwrap_err());
        assert_eq!(issues, vec![ValidationIssue::new("params.id", "Invalid vendor ID")]);
    }

    #[tokio::test]
    async fn merged_validation_reports_path_and_body() {
        let body = ValidatedJson::<Sample>::from_request(json_request(r#"{"displayName":"A"}"#), &())
            .await;
        let err = merge_validation(parse_id("nope", "id", "Invalid vendor ID"), body).unwrap_err();
        assert_eq!(
            issues(err),
            vec![
                ValidationIssue::new("body.displayName", "Too short"),
                ValidationIssue::new("params.id", "Invalid vendor ID"),
            ]
        );
    }

    #[test]
    fn merged_validation_passes_values_through() {
        let id = Uuid::new_v4();
        let (parsed, n) = merge_validation(parse_id(&id.to_string(), "id", "x"), Ok::<_, ApiError>(3))
            .unwrap();
        assert_eq!((parsed, n), (id, 3));

        let err = merge_validation(Ok::<_, ApiError>(1), Err::<(), _>(ApiError::route_not_found()))
            .unwrap_err();
        assert!(matches!(err, ApiError::App { .. }));
    }

    #[test]
    fn indexed_errors_address_each_element() {
        let mut error = validator::ValidationError::new("uuid");
        error.message = Some("Invalid uuid".into());
        error.add_param("indexes".into(), &vec![0, 2]);
        let mut errors = ValidationErrors::new();
        errors.add("vendor_ids", error);

        assert_eq!(
            collect_issues("body", &errors),
            vec![
                ValidationIssue::new("body.vendorIds.0", "Invalid uuid"),
                ValidationIssue::new("body.vendorIds.2", "Invalid uuid"),
            ]
        );
    }

    #[test]
    fn camel_case_converts_snake_names() {
        assert_eq!(camel_case("contact_person"), "contactPerson");
        assert_eq!(camel_case("vendorIds"), "vendorIds");
    }
}
