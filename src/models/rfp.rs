use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::{EmailStatus, RfpStatus};
use super::proposal::Proposal;
use super::vendor::Vendor;

/// One line of an RFP: what is being bought and how many.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfpItem {
    pub name: String,
    pub quantity: u32,
    pub specifications: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Rfp {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub items: Vec<RfpItem>,
    pub budget: Option<f64>,
    pub delivery_deadline: Option<DateTime<Utc>>,
    pub payment_terms: Option<String>,
    pub warranty_requirements: Option<String>,
    pub other_requirements: Option<String>,
    pub status: RfpStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Delivery record of an RFP to a single vendor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfpVendor {
    pub id: Uuid,
    pub rfp_id: Uuid,
    pub vendor_id: Uuid,
    pub sent_at: Option<DateTime<Utc>>,
    pub email_status: EmailStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfpVendorWithVendor {
    #[serde(flatten)]
    pub rfp_vendor: RfpVendor,
    pub vendor: Vendor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalWithVendor {
    #[serde(flatten)]
    pub proposal: Proposal,
    pub vendor: Vendor,
}

/// An RFP together with its proposals and delivery records.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RfpWithRelations {
    #[serde(flatten)]
    pub rfp: Rfp,
    pub proposals: Vec<ProposalWithVendor>,
    pub rfp_vendors: Vec<RfpVendorWithVendor>,
}
