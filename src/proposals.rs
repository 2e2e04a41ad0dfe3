//! Vendor reply ingestion.
//!
//! Unread messages are pulled from the mailbox, matched to a vendor by sender
//! address and to an RFP by subject tag (falling back to the RFP most recently
//! sent to that vendor), then handed to the LLM for term extraction.

use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::core_state::{CoreError, CoreState};
use crate::db;
use crate::llm::{self, LlmError};
use crate::mail::{sender_address, InboundEmail};
use crate::models::enums::ProposalStatus;
use crate::models::{ProposalItemPricing, ProposalTerms, ProposalUpsert, Rfp};
use crate::rfps::find_rfp_tag;

/// Result of one inbox pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestionSummary {
    pub fetched: usize,
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Parse the LLM extraction reply into proposal terms.
///
/// Line totals default to `unitPrice * quantity`; a missing `totalPrice` is
/// the sum of line totals when any line exists.
pub fn parse_proposal_terms(response: &str) -> Result<ProposalTerms, LlmError> {
    let map = llm::extract_json_object(response)?;

    let lines: Vec<ProposalItemPricing> = match map.get("itemsPricing") {
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(Value::as_object)
            .filter_map(parse_pricing_line)
            .collect(),
        _ => Vec::new(),
    };

    let total_price = llm::number_field(&map, "totalPrice")
        .or_else(|| (!lines.is_empty()).then(|| lines.iter().map(|l| l.total).sum()));

    Ok(ProposalTerms {
        items_pricing: (!lines.is_empty()).then_some(lines),
        total_price,
        delivery_time: llm::text_field(&map, "deliveryTime"),
        payment_terms: llm::text_field(&map, "paymentTerms"),
        warranty: llm::text_field(&map, "warranty"),
        additional_notes: llm::text_field(&map, "additionalNotes"),
    })
}

fn parse_pricing_line(line: &Map<String, Value>) -> Option<ProposalItemPricing> {
    let item = llm::text_field(line, "item")?;
    let unit_price = llm::number_field(line, "unitPrice");
    let quantity = llm::number_field(line, "quantity");
    let total = llm::number_field(line, "total")
        .or_else(|| Some(unit_price? * quantity?))?;

    Some(ProposalItemPricing {
        item,
        unit_price: unit_price.unwrap_or_else(|| match quantity {
            Some(q) if q > 0.0 => total / q,
            _ => total,
        }),
        quantity: quantity.unwrap_or(1.0),
        total,
    })
}

enum Ingested {
    Created,
    Skipped,
    Failed,
}

/// Pull unread replies and store them as proposals.
///
/// A message that cannot be matched is skipped; a message the LLM cannot
/// parse is stored raw as `RECEIVED` and counted as failed. Neither aborts
/// the batch. Only messages that were stored or skipped are marked seen, so
/// one that hit a storage error is fetched again on the next pass.
pub async fn process_inbox(state: &CoreState) -> Result<IngestionSummary, CoreError> {
    let messages = state.mailbox().fetch_unseen().await?;
    let mut summary = IngestionSummary {
        fetched: messages.len(),
        ..Default::default()
    };
    let mut handled = Vec::with_capacity(messages.len());

    for message in &messages {
        match ingest_message(state, message).await {
            Ok(outcome) => {
                match outcome {
                    Ingested::Created => summary.created += 1,
                    Ingested::Skipped => summary.skipped += 1,
                    Ingested::Failed => summary.failed += 1,
                }
                handled.push(message.uid);
            }
            Err(e) => {
                tracing::error!(uid = message.uid, from = %message.from, error = %e, "Failed to ingest vendor reply");
                summary.failed += 1;
            }
        }
    }

    if !handled.is_empty() {
        // Unflagged messages are re-read next pass; storage is idempotent.
        if let Err(e) = state.mailbox().mark_seen(&handled).await {
            tracing::warn!(count = handled.len(), error = %e, "Failed to mark replies as seen");
        }
    }

    tracing::info!(
        fetched = summary.fetched,
        created = summary.created,
        skipped = summary.skipped,
        failed = summary.failed,
        "Inbox processed"
    );
    Ok(summary)
}

async fn ingest_message(state: &CoreState, message: &InboundEmail) -> Result<Ingested, CoreError> {
    let (rfp, vendor_id) = {
        let conn = state.open_db()?;
        let address = sender_address(&message.from);
        let Some(vendor) = db::find_vendor_by_email(&conn, &address)? else {
            tracing::debug!(from = %address, "Reply from unknown sender");
            return Ok(Ingested::Skipped);
        };
        let Some(rfp) = resolve_rfp(&conn, &message.subject, &vendor.id)? else {
            tracing::debug!(vendor_id = %vendor.id, "Reply matches no RFP");
            return Ok(Ingested::Skipped);
        };
        (rfp, vendor.id)
    };

    let prompt = llm::build_proposal_extraction_prompt(&rfp, &message.subject, &message.body);
    let extracted = match state
        .llm()
        .complete(llm::PROPOSAL_EXTRACTION_SYSTEM_PROMPT, &prompt)
        .await
    {
        Ok(reply) => parse_proposal_terms(&reply),
        Err(e) => Err(e),
    };

    let conn = state.open_db()?;
    let (proposal, outcome) = match extracted {
        Ok(terms) => {
            let upsert = ProposalUpsert {
                rfp_id: rfp.id,
                vendor_id,
                terms,
                raw_email_content: Some(message.body.clone()),
                parsed_at: Some(Utc::now()),
                status: ProposalStatus::Parsed,
            };
            (db::upsert_proposal(&conn, &upsert)?, Ingested::Created)
        }
        Err(e) => {
            tracing::warn!(rfp_id = %rfp.id, %vendor_id, error = %e, "Proposal extraction failed");
            let stored = db::store_unparsed_reply(&conn, &rfp.id, &vendor_id, &message.body)?;
            (stored, Ingested::Failed)
        }
    };
    tracing::info!(proposal_id = %proposal.id, rfp_id = %rfp.id, status = %proposal.status, "Proposal stored");
    Ok(outcome)
}

/// Tagged RFP if it exists, else the RFP most recently sent to the vendor.
fn resolve_rfp(
    conn: &rusqlite::Connection,
    subject: &str,
    vendor_id: &Uuid,
) -> Result<Option<Rfp>, CoreError> {
    if let Some(tagged) = find_rfp_tag(subject) {
        if let Some(rfp) = db::get_rfp(conn, &tagged)? {
            return Ok(Some(rfp));
        }
    }
    match db::latest_rfp_for_vendor(conn, vendor_id)? {
        Some(id) => Ok(db::get_rfp(conn, &id)?),
        None => Ok(None),
    }
}

/// Spawn the background inbox poller. Returns `None` when polling is disabled.
pub fn spawn_inbox_poller(
    state: std::sync::Arc<CoreState>,
) -> Option<tokio::task::JoinHandle<()>> {
    let secs = state.config().email.poll_interval_secs;
    if secs == 0 {
        return None;
    }
    tracing::info!(interval_secs = secs, "Inbox poller started");

    Some(tokio::spawn(async move {
        let mut ticker = tokio::time::interval(Duration::from_secs(secs));
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            if let Err(e) = process_inbox(&state).await {
                tracing::warn!(error = %e, "Inbox poll failed");
            }
        }
    }))
}
