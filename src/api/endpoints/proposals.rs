//! Proposal endpoints: listing, detail, comparison and inbox checks.

use axum::extract::{Path, State};
use axum::response::Response;

use crate::api::error::ApiError;
use crate::api::response::{ok, success};
use crate::api::schemas::{INVALID_PROPOSAL_ID, INVALID_RFP_ID};
use crate::api::validate::parse_id;
use crate::api::ApiContext;
use crate::comparison;
use crate::db;
use crate::proposals;

/// `GET /api/proposals/rfp/:rfpId`
pub async fn list_for_rfp(
    State(ctx): State<ApiContext>,
    Path(rfp_id): Path<String>,
) -> Result<Response, ApiError> {
    let rfp_id = parse_id(&rfp_id, "rfpId", INVALID_RFP_ID)?;
    let conn = ctx.core.open_db()?;
    if db::get_rfp(&conn, &rfp_id)?.is_none() {
        return Err(ApiError::not_found("RFP not found"));
    }
    let proposals = db::list_proposals_for_rfp(&conn, &rfp_id)?;
    Ok(ok(proposals))
}

/// `GET /api/proposals/rfp/:rfpId/compare`
pub async fn compare(
    State(ctx): State<ApiContext>,
    Path(rfp_id): Path<String>,
) -> Result<Response, ApiError> {
    let rfp_id = parse_id(&rfp_id, "rfpId", INVALID_RFP_ID)?;
    let comparison = comparison::compare_proposals(&ctx.core, &rfp_id).await?;
    Ok(ok(comparison))
}

/// `GET /api/proposals/:id`
pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "id", INVALID_PROPOSAL_ID)?;
    let conn = ctx.core.open_db()?;
    let proposal = db::get_proposal_with_relations(&conn, &id)?
        .ok_or_else(|| ApiError::not_found("Proposal not found"))?;
    Ok(ok(proposal))
}

/// `POST /api/proposals/check-emails`: run one ingestion pass now.
pub async fn check_emails(State(ctx): State<ApiContext>) -> Result<Response, ApiError> {
    let summary = proposals::process_inbox(&ctx.core).await?;
    let message = format!(
        "Processed {} emails: {} proposals created",
        summary.fetched, summary.created
    );
    Ok(success(summary, Some(&message), axum::http::StatusCode::OK))
}
