//! Proposal comparison.
//!
//! The LLM scores every proposal of an RFP and recommends a vendor; this
//! module validates those scores and owns the final ranking.

use std::cmp::Ordering;
use std::collections::HashMap;

use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core_state::{CoreError, CoreState};
use crate::db;
use crate::llm::{self, LlmError};
use crate::models::{
    ComparisonResponse, ProposalComparison, ProposalComparisonResult, ProposalWithRelations,
    ProposalWithVendor, Recommendation,
};

const MAX_SCORE: f64 = 100.0;

/// Sub-scores for one proposal as returned by the LLM, already clamped.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ProposalScores {
    pub price: f64,
    pub delivery: f64,
    pub terms: f64,
    pub completeness: f64,
    pub total: f64,
}

impl ProposalScores {
    fn from_json(map: &Map<String, Value>) -> Self {
        let score = |key: &str| llm::number_field(map, key).map(clamp_score);
        let price = score("priceScore").unwrap_or(0.0);
        let delivery = score("deliveryScore").unwrap_or(0.0);
        let terms = score("termsScore").unwrap_or(0.0);
        let completeness = score("completenessScore").unwrap_or(0.0);
        let total = score("totalScore")
            .unwrap_or_else(|| (price + delivery + terms + completeness) / 4.0);
        Self {
            price,
            delivery,
            terms,
            completeness,
            total,
        }
    }
}

fn clamp_score(value: f64) -> f64 {
    value.clamp(0.0, MAX_SCORE)
}

/// The parts of the LLM comparison reply this service relies on.
#[derive(Debug, Clone, Default)]
pub struct ComparisonAnalysis {
    /// Keyed by proposal id.
    pub scores: HashMap<Uuid, ProposalScores>,
    pub recommended_vendor: Option<Uuid>,
    pub reasoning: Option<String>,
    pub strengths: Vec<String>,
    pub concerns: Vec<String>,
    pub summary: Option<String>,
}

/// Parse the comparison reply. Score entries may name a proposal by
/// `proposalId` or, failing that, by `vendorId`.
pub fn parse_comparison(
    response: &str,
    proposals: &[ProposalWithVendor],
) -> Result<ComparisonAnalysis, LlmError> {
    let map = llm::extract_json_object(response)?;

    let mut scores = HashMap::new();
    if let Some(Value::Array(entries)) = map.get("scores") {
        for entry in entries.iter().filter_map(Value::as_object) {
            let by_proposal = id_field(entry, "proposalId")
                .filter(|id| proposals.iter().any(|p| p.proposal.id == *id));
            let by_vendor = || {
                id_field(entry, "vendorId").and_then(|vendor_id| {
                    proposals
                        .iter()
                        .find(|p| p.vendor.id == vendor_id)
                        .map(|p| p.proposal.id)
                })
            };
            if let Some(proposal_id) = by_proposal.or_else(by_vendor) {
                scores.insert(proposal_id, ProposalScores::from_json(entry));
            }
        }
    }

    let recommendation = map.get("recommendation").and_then(Value::as_object);
    let rec_text = |key: &str| recommendation.and_then(|r| llm::text_field(r, key));
    let rec_list = |key: &str| -> Vec<String> {
        llm::parse_array_lenient::<String>(recommendation.and_then(|r| r.get(key)))
            .into_iter()
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    };

    Ok(ComparisonAnalysis {
        scores,
        recommended_vendor: recommendation.and_then(|r| id_field(r, "vendorId")),
        reasoning: rec_text("reasoning"),
        strengths: rec_list("strengths"),
        concerns: rec_list("concerns"),
        summary: llm::text_field(&map, "summary"),
    })
}

fn id_field(map: &Map<String, Value>, key: &str) -> Option<Uuid> {
    llm::text_field(map, key).and_then(|raw| Uuid::parse_str(&raw).ok())
}

/// Rank proposals by total score, highest first.
///
/// Ties go to the lower total price (unpriced proposals last), then to the
/// earlier proposal. A proposal without scores ranks with zeros.
pub fn rank_proposals(
    proposals: Vec<ProposalWithVendor>,
    scores: &HashMap<Uuid, ProposalScores>,
) -> Vec<ProposalComparisonResult> {
    let mut scored: Vec<(ProposalWithVendor, ProposalScores)> = proposals
        .into_iter()
        .map(|p| {
            let s = scores.get(&p.proposal.id).copied().unwrap_or_default();
            (p, s)
        })
        .collect();

    scored.sort_by(|(a, sa), (b, sb)| {
        sb.total
            .partial_cmp(&sa.total)
            .unwrap_or(Ordering::Equal)
            .then_with(|| cmp_price(a.proposal.total_price, b.proposal.total_price))
            .then_with(|| a.proposal.created_at.cmp(&b.proposal.created_at))
    });

    scored
        .into_iter()
        .enumerate()
        .map(|(index, (p, s))| ProposalComparisonResult {
            proposal: ProposalWithRelations {
                proposal: p.proposal,
                rfp: None,
                vendor: Some(p.vendor),
            },
            comparison: ProposalComparison {
                price_score: s.price,
                delivery_score: s.delivery,
                terms_score: s.terms,
                completeness_score: s.completeness,
                total_score: s.total,
                ranking: index as u32 + 1,
            },
        })
        .collect()
}

fn cmp_price(a: Option<f64>, b: Option<f64>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Recommendation for `analysis.recommended_vendor` when it names a vendor
/// with a proposal, else for the top-ranked proposal.
fn build_recommendation(
    ranked: &[ProposalComparisonResult],
    analysis: &ComparisonAnalysis,
) -> Option<Recommendation> {
    let vendor_of = |r: &ProposalComparisonResult| r.proposal.vendor.clone();

    let named = analysis.recommended_vendor.and_then(|id| {
        ranked
            .iter()
            .filter_map(vendor_of)
            .find(|v| v.id == id)
    });
    let fallback = named.is_none();
    let vendor = named.or_else(|| ranked.first().and_then(vendor_of))?;

    let reasoning = match (&analysis.reasoning, fallback) {
        (Some(text), false) => text.clone(),
        _ => format!("{} has the highest overall score.", vendor.name),
    };

    Some(Recommendation {
        vendor_id: vendor.id,
        vendor_name: vendor.name,
        reasoning,
        strengths: if fallback { Vec::new() } else { analysis.strengths.clone() },
        concerns: if fallback { Vec::new() } else { analysis.concerns.clone() },
    })
}

/// Score, rank and recommend the proposals received for an RFP.
pub async fn compare_proposals(
    state: &CoreState,
    rfp_id: &Uuid,
) -> Result<ComparisonResponse, CoreError> {
    let (rfp, proposals) = {
        let conn = state.open_db()?;
        let rfp = db::get_rfp(&conn, rfp_id)?
            .ok_or_else(|| CoreError::not_found("NOT_FOUND", "RFP not found"))?;
        let proposals = db::list_proposals_for_rfp(&conn, rfp_id)?;
        (rfp, proposals)
    };
    if proposals.is_empty() {
        return Err(CoreError::rejected(
            "NO_PROPOSALS",
            "No proposals found for this RFP",
        ));
    }

    let prompt = llm::build_comparison_prompt(&rfp, &proposals);
    let response = state
        .llm()
        .complete(llm::COMPARISON_SYSTEM_PROMPT, &prompt)
        .await?;
    let analysis = parse_comparison(&response, &proposals)?;

    let count = proposals.len();
    let ranked = rank_proposals(proposals, &analysis.scores);
    let recommendation = build_recommendation(&ranked, &analysis)
        .ok_or_else(|| LlmError::MalformedResponse("No vendor to recommend".into()))?;
    let summary = analysis
        .summary
        .clone()
        .unwrap_or_else(|| format!("Compared {count} proposals for \"{}\".", rfp.title));

    tracing::info!(
        rfp_id = %rfp.id,
        proposals = count,
        recommended = %recommendation.vendor_id,
        "Proposals compared"
    );

    Ok(ComparisonResponse {
        proposals: ranked,
        recommendation,
        summary,
    })
}
