use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::enums::ProposalStatus;
use super::rfp::Rfp;
use super::vendor::Vendor;

/// Price quoted by a vendor for one RFP line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalItemPricing {
    pub item: String,
    pub unit_price: f64,
    pub quantity: f64,
    pub total: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proposal {
    pub id: Uuid,
    pub rfp_id: Uuid,
    pub vendor_id: Uuid,
    pub items_pricing: Option<Vec<ProposalItemPricing>>,
    pub total_price: Option<f64>,
    pub delivery_time: Option<String>,
    pub payment_terms: Option<String>,
    pub warranty: Option<String>,
    pub additional_notes: Option<String>,
    pub raw_email_content: Option<String>,
    pub parsed_at: Option<DateTime<Utc>>,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalWithRelations {
    #[serde(flatten)]
    pub proposal: Proposal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rfp: Option<Rfp>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vendor: Option<Vendor>,
}

/// Commercial terms extracted from a vendor reply.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProposalTerms {
    pub items_pricing: Option<Vec<ProposalItemPricing>>,
    pub total_price: Option<f64>,
    pub delivery_time: Option<String>,
    pub payment_terms: Option<String>,
    pub warranty: Option<String>,
    pub additional_notes: Option<String>,
}

/// Everything needed to store (or refresh) the proposal of one vendor for one RFP.
#[derive(Debug, Clone)]
pub struct ProposalUpsert {
    pub rfp_id: Uuid,
    pub vendor_id: Uuid,
    pub terms: ProposalTerms,
    pub raw_email_content: Option<String>,
    pub parsed_at: Option<DateTime<Utc>>,
    pub status: ProposalStatus,
}
