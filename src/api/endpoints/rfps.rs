//! RFP endpoints.
//!
//! - `POST /api/rfps`: draft from natural language
//! - `GET /api/rfps`: paginated list
//! - `GET /api/rfps/:id`: detail with proposals and recipients
//! - `POST /api/rfps/:id/send`: email to vendors

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;

use crate::api::error::ApiError;
use crate::api::response::{ok, success};
use crate::api::schemas::{CreateRfpRequest, ListRfpsQuery, SendRfpRequest, INVALID_RFP_ID};
use crate::api::validate::{merge_validation, parse_id, ValidatedJson, ValidatedQuery};
use crate::api::ApiContext;
use crate::db;
use crate::models::PaginatedResponse;
use crate::rfps;

pub async fn create(
    State(ctx): State<ApiContext>,
    ValidatedJson(req): ValidatedJson<CreateRfpRequest>,
) -> Result<Response, ApiError> {
    let rfp = rfps::create_rfp_from_text(&ctx.core, &req.natural_language_input).await?;
    Ok(success(rfp, Some("RFP created successfully"), StatusCode::CREATED))
}

pub async fn list(
    State(ctx): State<ApiContext>,
    ValidatedQuery(query): ValidatedQuery<ListRfpsQuery>,
) -> Result<Response, ApiError> {
    let filter = query.into_filter();
    let conn = ctx.core.open_db()?;
    let (data, total) = db::list_rfps(&conn, &filter)?;

    Ok(ok(PaginatedResponse {
        data,
        total,
        limit: filter.limit,
        offset: filter.offset,
    }))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "id", INVALID_RFP_ID)?;
    let conn = ctx.core.open_db()?;
    let rfp = db::get_rfp_with_relations(&conn, &id)?
        .ok_or_else(|| ApiError::not_found("RFP not found"))?;
    Ok(ok(rfp))
}

pub async fn send(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    body: Result<ValidatedJson<SendRfpRequest>, ApiError>,
) -> Result<Response, ApiError> {
    let (id, ValidatedJson(req)) = merge_validation(parse_id(&id, "id", INVALID_RFP_ID), body)?;
    let outcome = rfps::send_rfp(&ctx.core, &id, &req.vendor_uuids()).await?;
    let message = outcome.summary_message();
    Ok(success(outcome, Some(&message), StatusCode::OK))
}
