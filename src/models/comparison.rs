use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::proposal::ProposalWithRelations;

/// Scores (0..=100) and final rank of one proposal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalComparison {
    pub price_score: f64,
    pub delivery_score: f64,
    pub terms_score: f64,
    pub completeness_score: f64,
    pub total_score: f64,
    pub ranking: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProposalComparisonResult {
    pub proposal: ProposalWithRelations,
    pub comparison: ProposalComparison,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Recommendation {
    pub vendor_id: Uuid,
    pub vendor_name: String,
    pub reasoning: String,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResponse {
    pub proposals: Vec<ProposalComparisonResult>,
    pub recommendation: Recommendation,
    pub summary: String,
}
