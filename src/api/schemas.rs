//! Request shapes and their validation rules.
//!
//! Required fields default to empty so that a missing field reports the
//! rule's message rather than a deserialization error.

use std::borrow::Cow;

use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::models::enums::RfpStatus;
use crate::models::filters::{RfpFilter, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
use crate::models::{NewVendor, VendorChanges, VendorFilter};

pub const INVALID_RFP_ID: &str = "Invalid RFP ID";
pub const INVALID_VENDOR_ID: &str = "Invalid vendor ID";
pub const INVALID_PROPOSAL_ID: &str = "Invalid proposal ID";

fn invalid(code: &'static str, message: impl Into<Cow<'static, str>>) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    err
}

/// Bad elements are listed in the `indexes` param.
fn validate_uuid_list(ids: &[String]) -> Result<(), ValidationError> {
    let bad: Vec<usize> = ids
        .iter()
        .enumerate()
        .filter(|(_, id)| Uuid::parse_str(id).is_err())
        .map(|(index, _)| index)
        .collect();
    if bad.is_empty() {
        return Ok(());
    }
    let mut err = invalid("uuid", "Invalid uuid");
    err.add_param(Cow::Borrowed("indexes"), &bad);
    Err(err)
}

/// Digit string as a count, saturating at `u32::MAX`.
fn parse_count(raw: &str) -> Option<u32> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let value = raw.parse::<u64>().unwrap_or(u64::MAX);
    Some(u32::try_from(value).unwrap_or(u32::MAX))
}

fn validate_digits(value: &str) -> Result<(), ValidationError> {
    if !value.is_empty() && value.bytes().all(|b| b.is_ascii_digit()) {
        Ok(())
    } else {
        Err(invalid("regex", "Invalid"))
    }
}

fn validate_rfp_status(value: &str) -> Result<(), ValidationError> {
    value
        .parse::<RfpStatus>()
        .map(|_| ())
        .map_err(|_| {
            invalid(
                "enum",
                format!("Invalid enum value. Expected {}", RfpStatus::expected()),
            )
        })
}

// ═══════════════════════════════════════════
// RFPs
// ═══════════════════════════════════════════

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRfpRequest {
    #[serde(default)]
    #[validate(length(min = 10, message = "Input must be at least 10 characters"))]
    pub natural_language_input: String,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct SendRfpRequest {
    #[serde(default)]
    #[validate(
        length(min = 1, message = "At least one vendor must be selected"),
        custom(function = "validate_uuid_list")
    )]
    pub vendor_ids: Vec<String>,
}

impl SendRfpRequest {
    /// Ids in request order. Call after validation.
    pub fn vendor_uuids(&self) -> Vec<Uuid> {
        self.vendor_ids
            .iter()
            .filter_map(|id| Uuid::parse_str(id).ok())
            .collect()
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListRfpsQuery {
    #[validate(custom(function = "validate_rfp_status"))]
    pub status: Option<String>,
    #[validate(custom(function = "validate_digits"))]
    pub limit: Option<String>,
    #[validate(custom(function = "validate_digits"))]
    pub offset: Option<String>,
}

impl ListRfpsQuery {
    /// Page size is capped; zero or absent falls back to the default.
    pub fn into_filter(self) -> RfpFilter {
        let limit = self
            .limit
            .as_deref()
            .and_then(parse_count)
            .filter(|l| *l > 0)
            .map(|l| l.min(MAX_PAGE_LIMIT))
            .unwrap_or(DEFAULT_PAGE_LIMIT);
        let offset = self.offset.as_deref().and_then(parse_count).unwrap_or(0);
        RfpFilter {
            status: self.status.and_then(|s| s.parse().ok()),
            limit,
            offset,
        }
    }
}

// ═══════════════════════════════════════════
// Vendors
// ═══════════════════════════════════════════

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateVendorRequest {
    #[serde(default)]
    #[validate(length(min = 1, message = "Vendor name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(email(message = "Invalid email address"))]
    pub email: String,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category: Option<String>,
    pub notes: Option<String>,
}

impl From<CreateVendorRequest> for NewVendor {
    fn from(req: CreateVendorRequest) -> Self {
        NewVendor {
            name: req.name,
            email: req.email,
            contact_person: req.contact_person,
            phone: req.phone,
            address: req.address,
            category: req.category,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateVendorRequest {
    #[validate(length(min = 1, message = "Vendor name is required"))]
    pub name: Option<String>,
    #[validate(email(message = "Invalid email address"))]
    pub email: Option<String>,
    pub contact_person: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub category: Option<String>,
    pub notes: Option<String>,
}

impl From<UpdateVendorRequest> for VendorChanges {
    fn from(req: UpdateVendorRequest) -> Self {
        VendorChanges {
            name: req.name,
            email: req.email,
            contact_person: req.contact_person,
            phone: req.phone,
            address: req.address,
            category: req.category,
            notes: req.notes,
        }
    }
}

#[derive(Debug, Default, Deserialize, Validate)]
pub struct ListVendorsQuery {
    pub category: Option<String>,
    pub search: Option<String>,
}

impl From<ListVendorsQuery> for VendorFilter {
    fn from(query: ListVendorsQuery) -> Self {
        VendorFilter {
            category: query.category,
            search: query.search,
        }
    }
}
