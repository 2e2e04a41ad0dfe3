//! RFP drafting and distribution.
//!
//! Drafting asks the LLM to structure a buyer's free-text request; sending
//! emails the RFP to each selected vendor and records the delivery outcome
//! per vendor.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::sync::LazyLock;

use chrono::{DateTime, NaiveDate, Utc};
use regex::Regex;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core_state::{CoreError, CoreState};
use crate::db;
use crate::llm::{self, LlmError};
use crate::mail::OutgoingEmail;
use crate::models::enums::{EmailStatus, RfpStatus};
use crate::models::{Rfp, RfpItem, Vendor};

/// Fallback title length, in characters.
const TITLE_FALLBACK_CHARS: usize = 80;

static RFP_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[RFP-([0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12})\]")
        .unwrap()
});

// ═══════════════════════════════════════════
// Drafting
// ═══════════════════════════════════════════

/// RFP fields proposed by the LLM, before persistence.
#[derive(Debug, Clone, PartialEq)]
pub struct RfpDraft {
    pub title: String,
    pub description: Option<String>,
    pub items: Vec<RfpItem>,
    pub budget: Option<f64>,
    pub delivery_deadline: Option<DateTime<Utc>>,
    pub payment_terms: Option<String>,
    pub warranty_requirements: Option<String>,
    pub other_requirements: Option<String>,
}

/// Parse the LLM reply for a drafting request.
pub fn parse_rfp_draft(response: &str, input: &str) -> Result<RfpDraft, LlmError> {
    let map = llm::extract_json_object(response)?;

    let title = llm::text_field(&map, "title").unwrap_or_else(|| fallback_title(input));

    Ok(RfpDraft {
        title,
        description: llm::text_field(&map, "description"),
        items: parse_items(map.get("items")),
        budget: llm::number_field(&map, "budget").filter(|b| *b >= 0.0),
        delivery_deadline: llm::text_field(&map, "deliveryDeadline")
            .as_deref()
            .and_then(parse_deadline),
        payment_terms: llm::text_field(&map, "paymentTerms"),
        warranty_requirements: llm::text_field(&map, "warrantyRequirements"),
        other_requirements: llm::text_field(&map, "otherRequirements"),
    })
}

fn fallback_title(input: &str) -> String {
    input.trim().chars().take(TITLE_FALLBACK_CHARS).collect()
}

/// Items without a name or with a quantity below 1 are dropped.
fn parse_items(value: Option<&Value>) -> Vec<RfpItem> {
    let Some(Value::Array(items)) = value else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(Value::as_object)
        .filter_map(parse_item)
        .collect()
}

fn parse_item(item: &Map<String, Value>) -> Option<RfpItem> {
    let name = llm::text_field(item, "name")?;
    let quantity = llm::number_field(item, "quantity")?.round();
    if quantity < 1.0 || quantity > f64::from(u32::MAX) {
        return None;
    }
    Some(RfpItem {
        name,
        quantity: quantity as u32,
        specifications: llm::text_field(item, "specifications").unwrap_or_default(),
    })
}

/// `YYYY-MM-DD` (midnight UTC) or full RFC 3339.
fn parse_deadline(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|dt| dt.and_utc());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Draft an RFP from a natural-language request and store it as `DRAFT`.
pub async fn create_rfp_from_text(state: &CoreState, input: &str) -> Result<Rfp, CoreError> {
    let prompt = llm::build_rfp_draft_prompt(input, Utc::now().date_naive());
    let response = state
        .llm()
        .complete(llm::RFP_DRAFT_SYSTEM_PROMPT, &prompt)
        .await?;
    let draft = parse_rfp_draft(&response, input)?;

    let now = Utc::now();
    let rfp = Rfp {
        id: Uuid::new_v4(),
        title: draft.title,
        description: draft.description,
        items: draft.items,
        budget: draft.budget,
        delivery_deadline: draft.delivery_deadline,
        payment_terms: draft.payment_terms,
        warranty_requirements: draft.warranty_requirements,
        other_requirements: draft.other_requirements,
        status: RfpStatus::Draft,
        created_at: now,
        updated_at: now,
    };

    let conn = state.open_db()?;
    db::insert_rfp(&conn, &rfp)?;
    tracing::info!(rfp_id = %rfp.id, items = rfp.items.len(), "RFP drafted");
    Ok(rfp)
}

// ═══════════════════════════════════════════
// Sending
// ═══════════════════════════════════════════

/// Subject tag that lets replies be matched back to their RFP.
pub fn rfp_tag(id: &Uuid) -> String {
    format!("[RFP-{id}]")
}

/// RFP id carried by a subject line, if any.
pub fn find_rfp_tag(subject: &str) -> Option<Uuid> {
    RFP_TAG
        .captures(subject)
        .and_then(|caps| Uuid::parse_str(&caps[1]).ok())
}

/// Plain-text invitation email for one vendor.
pub fn compose_rfp_email(rfp: &Rfp, vendor: &Vendor) -> OutgoingEmail {
    let greeting = vendor.contact_person.as_deref().unwrap_or(&vendor.name);

    let mut body = format!("Dear {greeting},\n\nWe invite you to submit a proposal for the following request.\n\n");
    let _ = writeln!(body, "Title: {}", rfp.title);
    if let Some(description) = &rfp.description {
        let _ = writeln!(body, "Description: {description}");
    }

    body.push_str("\nItems:\n");
    for item in &rfp.items {
        let _ = write!(body, "- {} (quantity: {})", item.name, item.quantity);
        if !item.specifications.is_empty() {
            let _ = write!(body, ": {}", item.specifications);
        }
        body.push('\n');
    }
    body.push('\n');

    if let Some(budget) = rfp.budget {
        let _ = writeln!(body, "Budget: {budget:.2}");
    }
    if let Some(deadline) = rfp.delivery_deadline {
        let _ = writeln!(body, "Delivery deadline: {}", deadline.format("%Y-%m-%d"));
    }
    if let Some(terms) = &rfp.payment_terms {
        let _ = writeln!(body, "Payment terms: {terms}");
    }
    if let Some(warranty) = &rfp.warranty_requirements {
        let _ = writeln!(body, "Warranty: {warranty}");
    }
    if let Some(other) = &rfp.other_requirements {
        let _ = writeln!(body, "Other requirements: {other}");
    }

    let tag = rfp_tag(&rfp.id);
    let _ = write!(
        body,
        "\nPlease reply to this email with itemized pricing, total price, delivery time, \
         payment terms and warranty. Keep {tag} in the subject line so we can match your reply.\n\n\
         Best regards,\nProcurement Team\n"
    );

    OutgoingEmail {
        to: vendor.email.clone(),
        subject: format!("{tag} Request for Proposal: {}", rfp.title),
        body,
    }
}

/// Delivery outcome for one vendor.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorSendResult {
    pub vendor_id: Uuid,
    pub vendor_name: String,
    pub email_status: EmailStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendRfpOutcome {
    pub rfp: Rfp,
    pub results: Vec<VendorSendResult>,
}

impl SendRfpOutcome {
    pub fn sent_count(&self) -> usize {
        self.results
            .iter()
            .filter(|r| r.email_status == EmailStatus::Sent)
            .count()
    }

    pub fn summary_message(&self) -> String {
        format!(
            "RFP sent to {} of {} vendors",
            self.sent_count(),
            self.results.len()
        )
    }
}

/// Email an RFP to the selected vendors.
///
/// The RFP moves to `SENT` once at least one email is accepted by the relay.
/// Individual delivery failures are recorded as `FAILED` and reported back
/// without aborting the remaining sends.
pub async fn send_rfp(
    state: &CoreState,
    rfp_id: &Uuid,
    vendor_ids: &[Uuid],
) -> Result<SendRfpOutcome, CoreError> {
    let conn = state.open_db()?;

    let rfp = db::get_rfp(&conn, rfp_id)?
        .ok_or_else(|| CoreError::not_found("NOT_FOUND", "RFP not found"))?;
    if rfp.status == RfpStatus::Closed {
        return Err(CoreError::rejected("RFP_CLOSED", "Cannot send a closed RFP"));
    }

    let mut seen = HashSet::new();
    let requested: Vec<Uuid> = vendor_ids
        .iter()
        .copied()
        .filter(|id| seen.insert(*id))
        .collect();

    let vendors = db::get_vendors_by_ids(&conn, &requested)?;
    let missing: Vec<String> = requested
        .iter()
        .filter(|id| !vendors.iter().any(|v| v.id == **id))
        .map(Uuid::to_string)
        .collect();
    if !missing.is_empty() {
        return Err(CoreError::not_found(
            "VENDOR_NOT_FOUND",
            format!("Vendor(s) not found: {}", missing.join(", ")),
        ));
    }

    let mut results = Vec::with_capacity(requested.len());
    for id in &requested {
        let Some(vendor) = vendors.iter().find(|v| v.id == *id) else {
            continue;
        };
        let email = compose_rfp_email(&rfp, vendor);
        let (status, sent_at, error) = match state.mailer().send(&email).await {
            Ok(()) => (EmailStatus::Sent, Some(Utc::now()), None),
            Err(e) => {
                tracing::warn!(rfp_id = %rfp.id, vendor_id = %vendor.id, error = %e, "RFP email failed");
                (EmailStatus::Failed, None, Some(e.to_string()))
            }
        };
        db::upsert_rfp_vendor(&conn, &rfp.id, &vendor.id, status, sent_at)?;
        results.push(VendorSendResult {
            vendor_id: vendor.id,
            vendor_name: vendor.name.clone(),
            email_status: status,
            error,
        });
    }

    let any_sent = results.iter().any(|r| r.email_status == EmailStatus::Sent);
    if any_sent && rfp.status != RfpStatus::Sent {
        db::update_rfp_status(&conn, &rfp.id, RfpStatus::Sent)?;
    }
    let rfp = db::get_rfp(&conn, &rfp.id)?
        .ok_or_else(|| CoreError::not_found("NOT_FOUND", "RFP not found"))?;

    let outcome = SendRfpOutcome { rfp, results };
    tracing::info!(
        rfp_id = %outcome.rfp.id,
        sent = outcome.sent_count(),
        total = outcome.results.len(),
        "RFP distribution finished"
    );
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_state::testing::harness;
    use crate::llm::MockLlmClient;
    use crate::mail::{MockMailbox, MockMailer};
    use crate::models::NewVendor;

    const DRAFT_REPLY: &str = r#"```json
{
  "title": "Laptops and monitors",
  "description": "Equipment for new hires",
  "items": [
    {"name": "Laptop", "quantity": 20, "specifications": "16GB RAM"},
    {"name": "Monitor", "quantity": "15", "specifications": "27 inch"},
    {"name": "Docking station", "quantity": 0, "specifications": "USB-C"},
    {"quantity": 3},
    "garbage"
  ],
  "budget": "$50,000",
  "deliveryDeadline": "2024-06-30",
  "paymentTerms": "net 30",
  "warrantyRequirements": "1 year minimum",
  "otherRequirements": null
}
```"#;

    #[test]
    fn draft_parsing_is_lenient() {
        let draft = parse_rfp_draft(DRAFT_REPLY, "ignored").unwrap();
        assert_eq!(draft.title, "Laptops and monitors");
        assert_eq!(draft.items.len(), 2);
        assert_eq!(draft.items[1].quantity, 15);
        assert_eq!(draft.budget, Some(50_000.0));
        assert_eq!(
            draft.delivery_deadline.unwrap().to_rfc3339(),
            "2024-06-30T00:00:00+00:00"
        );
        assert_eq!(draft.payment_terms.as_deref(), Some("net 30"));
        assert!(draft.other_requirements.is_none());
    }

    #[test]
    fn missing_title_falls_back_to_input_prefix() {
        let input = "x".repeat(120);
        let draft = parse_rfp_draft(r#"{"title": "  ", "items": []}"#, &input).unwrap();
        assert_eq!(draft.title.chars().count(), 80);
        assert!(draft.items.is_empty());
    }

    #[test]
    fn deadline_accepts_rfc3339() {
        let draft =
            parse_rfp_draft(r#"{"deliveryDeadline": "2024-07-01T12:00:00+02:00"}"#, "input text")
                .unwrap();
        assert_eq!(
            draft.delivery_deadline.unwrap().to_rfc3339(),
            "2024-07-01T10:00:00+00:00"
        );
        let bad = parse_rfp_draft(r#"{"deliveryDeadline": "next month"}"#, "input text").unwrap();
        assert!(bad.delivery_deadline.is_none());
    }

    #[test]
    fn reply_without_json_is_malformed() {
        assert!(matches!(
            parse_rfp_draft("I cannot help with that.", "input text"),
            Err(LlmError::MalformedResponse(_))
        ));
    }

    #[test]
    fn tag_round_trips_through_subject() {
        let id = Uuid::new_v4();
        let subject = format!("Re: {} Request for Proposal: Chairs", rfp_tag(&id));
        assert_eq!(find_rfp_tag(&subject), Some(id));
        assert_eq!(find_rfp_tag("Re: quote for chairs"), None);
        assert_eq!(find_rfp_tag("[RFP-not-a-uuid]"), None);
    }

    #[tokio::test]
    async fn create_stores_draft() {
        let h = harness(
            MockLlmClient::new(DRAFT_REPLY),
            MockMailer::new(),
            MockMailbox::default(),
        );
        let rfp = create_rfp_from_text(&h.state, "We need 20 laptops and 15 monitors")
            .await
            .unwrap();
        assert_eq!(rfp.status, RfpStatus::Draft);

        let conn = h.state.open_db().unwrap();
        let stored = db::get_rfp(&conn, &rfp.id).unwrap().unwrap();
        assert_eq!(stored.items.len(), 2);

        let calls = h.llm.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1.contains("We need 20 laptops and 15 monitors"));
    }

    #[tokio::test]
    async fn create_propagates_llm_failure() {
        let h = harness(MockLlmClient::failing(), MockMailer::new(), MockMailbox::default());
        let err = create_rfp_from_text(&h.state, "We need 20 laptops").await.unwrap_err();
        assert!(matches!(err, CoreError::Llm(_)));
    }

    fn seed(h: &crate::core_state::testing::TestHarness, status: RfpStatus) -> (Rfp, Vendor, Vendor) {
        let conn = h.state.open_db().unwrap();
        let now = Utc::now();
        let rfp = Rfp {
            id: Uuid::new_v4(),
            title: "Chairs".into(),
            description: None,
            items: vec![RfpItem {
                name: "Chair".into(),
                quantity: 10,
                specifications: String::new(),
            }],
            budget: Some(2000.0),
            delivery_deadline: None,
            payment_terms: None,
            warranty_requirements: None,
            other_requirements: None,
            status,
            created_at: now,
            updated_at: now,
        };
        db::insert_rfp(&conn, &rfp).unwrap();
        let acme = db::insert_vendor(
            &conn,
            NewVendor {
                name: "Acme".into(),
                email: "sales@acme.test".into(),
                contact_person: Some("Wile".into()),
                ..Default::default()
            },
        )
        .unwrap();
        let beta = db::insert_vendor(
            &conn,
            NewVendor {
                name: "Beta".into(),
                email: "bids@beta.test".into(),
                ..Default::default()
            },
        )
        .unwrap();
        (rfp, acme, beta)
    }

    #[tokio::test]
    async fn send_records_partial_failure() {
        let h = harness(
            MockLlmClient::new("{}"),
            MockMailer::failing_for(&["bids@beta.test"]),
            MockMailbox::default(),
        );
        let (rfp, acme, beta) = seed(&h, RfpStatus::Draft);

        let outcome = send_rfp(&h.state, &rfp.id, &[acme.id, beta.id, acme.id])
            .await
            .unwrap();

        assert_eq!(outcome.results.len(), 2);
        assert_eq!(outcome.sent_count(), 1);
        assert_eq!(outcome.summary_message(), "RFP sent to 1 of 2 vendors");
        assert_eq!(outcome.rfp.status, RfpStatus::Sent);
        assert_eq!(outcome.results[1].email_status, EmailStatus::Failed);
        assert!(outcome.results[1].error.is_some());

        let sent = h.mailer.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].subject.starts_with(&rfp_tag(&rfp.id)));
        assert!(sent[0].body.starts_with("Dear Wile,"));

        let conn = h.state.open_db().unwrap();
        let records = db::list_rfp_vendors(&conn, &rfp.id).unwrap();
        assert_eq!(records.len(), 2);
        let failed = records.iter().find(|r| r.vendor.id == beta.id).unwrap();
        assert_eq!(failed.rfp_vendor.email_status, EmailStatus::Failed);
        assert!(failed.rfp_vendor.sent_at.is_none());
    }

    #[tokio::test]
    async fn send_keeps_draft_when_every_email_fails() {
        let h = harness(
            MockLlmClient::new("{}"),
            MockMailer::failing_for(&["sales@acme.test"]),
            MockMailbox::default(),
        );
        let (rfp, acme, _) = seed(&h, RfpStatus::Draft);
        let outcome = send_rfp(&h.state, &rfp.id, &[acme.id]).await.unwrap();
        assert_eq!(outcome.sent_count(), 0);
        assert_eq!(outcome.rfp.status, RfpStatus::Draft);
    }

    #[tokio::test]
    async fn send_rejects_closed_rfp() {
        let h = harness(MockLlmClient::new("{}"), MockMailer::new(), MockMailbox::default());
        let (rfp, acme, _) = seed(&h, RfpStatus::Closed);
        match send_rfp(&h.state, &rfp.id, &[acme.id]).await {
            Err(CoreError::Rejected { code, .. }) => assert_eq!(code, "RFP_CLOSED"),
            other => panic!("unexpected: {other:?}"),
        }
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn send_reports_unknown_vendors() {
        let h = harness(MockLlmClient::new("{}"), MockMailer::new(), MockMailbox::default());
        let (rfp, acme, _) = seed(&h, RfpStatus::Draft);
        let ghost = Uuid::new_v4();
        match send_rfp(&h.state, &rfp.id, &[acme.id, ghost]).await {
            Err(CoreError::NotFound { code, message }) => {
                assert_eq!(code, "VENDOR_NOT_FOUND");
                assert!(message.contains(&ghost.to_string()));
            }
            other => panic!("unexpected: {other:?}"),
        }
        assert!(h.mailer.sent().is_empty());
    }

    #[tokio::test]
    async fn send_unknown_rfp_is_not_found() {
        let h = harness(MockLlmClient::new("{}"), MockMailer::new(), MockMailbox::default());
        let result = send_rfp(&h.state, &Uuid::new_v4(), &[Uuid::new_v4()]).await;
        assert!(matches!(result, Err(CoreError::NotFound { code: "NOT_FOUND", .. })));
    }
}
