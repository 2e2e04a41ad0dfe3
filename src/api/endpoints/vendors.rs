//! Vendor directory endpoints.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;

use crate::api::error::ApiError;
use crate::api::response::{ok, success};
use crate::api::schemas::{
    CreateVendorRequest, ListVendorsQuery, UpdateVendorRequest, INVALID_VENDOR_ID,
};
use crate::api::validate::{merge_validation, parse_id, ValidatedJson, ValidatedQuery};
use crate::api::ApiContext;
use crate::db;
use crate::models::{VendorChanges, VendorFilter};

/// `POST /api/vendors`: duplicate emails surface as 409 from the store.
pub async fn create(
    State(ctx): State<ApiContext>,
    ValidatedJson(req): ValidatedJson<CreateVendorRequest>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let vendor = db::insert_vendor(&conn, req.into())?;
    tracing::info!(vendor_id = %vendor.id, "Vendor created");
    Ok(success(vendor, Some("Vendor created successfully"), StatusCode::CREATED))
}

pub async fn list(
    State(ctx): State<ApiContext>,
    ValidatedQuery(query): ValidatedQuery<ListVendorsQuery>,
) -> Result<Response, ApiError> {
    let conn = ctx.core.open_db()?;
    let vendors = db::list_vendors(&conn, &VendorFilter::from(query))?;
    Ok(ok(vendors))
}

pub async fn detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "id", INVALID_VENDOR_ID)?;
    let conn = ctx.core.open_db()?;
    let vendor = db::get_vendor(&conn, &id)?
        .ok_or_else(|| ApiError::not_found("Vendor not found"))?;
    Ok(ok(vendor))
}

pub async fn update(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    body: Result<ValidatedJson<UpdateVendorRequest>, ApiError>,
) -> Result<Response, ApiError> {
    let (id, ValidatedJson(req)) =
        merge_validation(parse_id(&id, "id", INVALID_VENDOR_ID), body)?;
    let conn = ctx.core.open_db()?;
    let vendor = db::update_vendor(&conn, &id, VendorChanges::from(req))?;
    Ok(success(vendor, Some("Vendor updated successfully"), StatusCode::OK))
}

pub async fn remove(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = parse_id(&id, "id", INVALID_VENDOR_ID)?;
    let conn = ctx.core.open_db()?;
    db::delete_vendor(&conn, &id)?;
    tracing::info!(vendor_id = %id, "Vendor deleted");
    Ok(success(
        serde_json::Value::Null,
        Some("Vendor deleted successfully"),
        StatusCode::OK,
    ))
}
