use chrono::NaiveDate;

use crate::models::{ProposalWithVendor, Rfp};

pub const RFP_DRAFT_SYSTEM_PROMPT: &str = r#"
You are a procurement assistant. You turn a buyer's plain-language purchase
request into a structured Request for Proposal.

RULES:
1. Use only information present in the request; do not invent vendors or prices.
2. Every item needs a name, a whole-number quantity of at least 1 and its specifications.
3. Budget is a plain number in the buyer's currency, or null.
4. deliveryDeadline is an ISO date (YYYY-MM-DD) or null. Resolve relative dates
   ("in 30 days") against today's date given in the request.
5. Respond with a single JSON object and nothing else.
"#;

/// Build the drafting prompt for a buyer's request.
pub fn build_rfp_draft_prompt(input: &str, today: NaiveDate) -> String {
    format!(
        r#"Today is {today}.

<request>
{input}
</request>

Return JSON with exactly these keys:
{{
  "title": "short descriptive title",
  "description": "one paragraph summary or null",
  "items": [{{"name": "item", "quantity": 1, "specifications": "details"}}],
  "budget": 0,
  "deliveryDeadline": "YYYY-MM-DD or null",
  "paymentTerms": "e.g. net 30, or null",
  "warrantyRequirements": "e.g. 1 year, or null",
  "otherRequirements": "anything else, or null"
}}"#
    )
}

pub const PROPOSAL_EXTRACTION_SYSTEM_PROMPT: &str = r#"
You are a procurement assistant. You read a vendor's email reply to a Request
for Proposal and extract the commercial terms it states.

RULES:
1. Extract only what the email states. Use null for anything missing.
2. Prices are plain numbers without currency symbols or thousands separators.
3. Match quoted lines to the RFP item names where possible.
4. Respond with a single JSON object and nothing else.
"#;

/// Build the extraction prompt for one vendor reply.
pub fn build_proposal_extraction_prompt(rfp: &Rfp, subject: &str, body: &str) -> String {
    let items = rfp
        .items
        .iter()
        .map(|item| format!("- {} x{}: {}", item.name, item.quantity, item.specifications))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"RFP "{title}" requested:
{items}

<email subject="{subject}">
{body}
</email>

Return JSON with exactly these keys:
{{
  "itemsPricing": [{{"item": "name", "unitPrice": 0, "quantity": 0, "total": 0}}],
  "totalPrice": 0,
  "deliveryTime": "as stated, or null",
  "paymentTerms": "as stated, or null",
  "warranty": "as stated, or null",
  "additionalNotes": "other conditions, or null"
}}"#,
        title = rfp.title,
    )
}

pub const COMPARISON_SYSTEM_PROMPT: &str = r#"
You are a procurement analyst. You compare vendor proposals answering the same
Request for Proposal and recommend one vendor.

SCORING (each 0-100):
- priceScore: value for money against the budget and the other offers.
- deliveryScore: ability to meet the delivery deadline.
- termsScore: payment terms and warranty against what was requested.
- completenessScore: how fully the proposal answers every requested item.
- totalScore: overall weighted judgement.

Respond with a single JSON object and nothing else.
"#;

/// Build the comparison prompt for every proposal of an RFP.
pub fn build_comparison_prompt(rfp: &Rfp, proposals: &[ProposalWithVendor]) -> String {
    let requirements = serde_json::json!({
        "title": rfp.title,
        "items": rfp.items,
        "budget": rfp.budget,
        "deliveryDeadline": rfp.delivery_deadline,
        "paymentTerms": rfp.payment_terms,
        "warrantyRequirements": rfp.warranty_requirements,
        "otherRequirements": rfp.other_requirements,
    });

    let offers: Vec<serde_json::Value> = proposals
        .iter()
        .map(|p| {
            serde_json::json!({
                "proposalId": p.proposal.id,
                "vendorId": p.vendor.id,
                "vendorName": p.vendor.name,
                "itemsPricing": p.proposal.items_pricing,
                "totalPrice": p.proposal.total_price,
                "deliveryTime": p.proposal.delivery_time,
                "paymentTerms": p.proposal.payment_terms,
                "warranty": p.proposal.warranty,
                "additionalNotes": p.proposal.additional_notes,
            })
        })
        .collect();

    format!(
        r#"<rfp>
{requirements}
</rfp>

<proposals>
{offers}
</proposals>

Return JSON with exactly these keys:
{{
  "scores": [
    {{"proposalId": "id from above", "priceScore": 0, "deliveryScore": 0,
      "termsScore": 0, "completenessScore": 0, "totalScore": 0}}
  ],
  "recommendation": {{
    "vendorId": "id from above",
    "vendorName": "name",
    "reasoning": "why this vendor",
    "strengths": ["..."],
    "concerns": ["..."]
  }},
  "summary": "two or three sentences comparing the offers"
}}"#,
        offers = serde_json::Value::Array(offers),
    )
}
