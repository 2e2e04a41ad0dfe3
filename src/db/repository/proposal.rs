use std::str::FromStr;

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::rfp::{RfpRow, RFP_COLUMNS, RFP_COLUMN_COUNT};
use super::vendor::{VendorRow, VENDOR_COLUMNS};
use super::{format_timestamp, parse_optional_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;
use crate::models::enums::*;

const PROPOSAL_COLUMNS: &str = "p.id, p.rfp_id, p.vendor_id, p.items_pricing, p.total_price,
    p.delivery_time, p.payment_terms, p.warranty, p.additional_notes, p.raw_email_content,
    p.parsed_at, p.status, p.created_at, p.updated_at";

const PROPOSAL_COLUMN_COUNT: usize = 14;

struct ProposalRow {
    id: String,
    rfp_id: String,
    vendor_id: String,
    items_pricing: Option<String>,
    total_price: Option<f64>,
    delivery_time: Option<String>,
    payment_terms: Option<String>,
    warranty: Option<String>,
    additional_notes: Option<String>,
    raw_email_content: Option<String>,
    parsed_at: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

impl ProposalRow {
    fn read(row: &Row<'_>, base: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(base)?,
            rfp_id: row.get(base + 1)?,
            vendor_id: row.get(base + 2)?,
            items_pricing: row.get(base + 3)?,
            total_price: row.get(base + 4)?,
            delivery_time: row.get(base + 5)?,
            payment_terms: row.get(base + 6)?,
            warranty: row.get(base + 7)?,
            additional_notes: row.get(base + 8)?,
            raw_email_content: row.get(base + 9)?,
            parsed_at: row.get(base + 10)?,
            status: row.get(base + 11)?,
            created_at: row.get(base + 12)?,
            updated_at: row.get(base + 13)?,
        })
    }

    fn into_proposal(self) -> Result<Proposal, DatabaseError> {
        let items_pricing = match self.items_pricing.as_deref() {
            Some(raw) => Some(serde_json::from_str(raw)?),
            None => None,
        };
        Ok(Proposal {
            id: parse_uuid(&self.id)?,
            rfp_id: parse_uuid(&self.rfp_id)?,
            vendor_id: parse_uuid(&self.vendor_id)?,
            items_pricing,
            total_price: self.total_price,
            delivery_time: self.delivery_time,
            payment_terms: self.payment_terms,
            warranty: self.warranty,
            additional_notes: self.additional_notes,
            raw_email_content: self.raw_email_content,
            parsed_at: parse_optional_timestamp(self.parsed_at.as_deref())?,
            status: ProposalStatus::from_str(&self.status)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

/// Store the proposal of a vendor for an RFP.
///
/// A vendor has at most one proposal per RFP: a later reply replaces the
/// previously stored terms, raw content and status.
pub fn upsert_proposal(conn: &Connection, upsert: &ProposalUpsert) -> Result<Proposal, DatabaseError> {
    let now = format_timestamp(&Utc::now());
    let items_pricing = upsert
        .terms
        .items_pricing
        .as_ref()
        .map(serde_json::to_string)
        .transpose()?;

    conn.execute(
        "INSERT INTO proposals (id, rfp_id, vendor_id, items_pricing, total_price, delivery_time,
         payment_terms, warranty, additional_notes, raw_email_content, parsed_at, status,
         created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
         ON CONFLICT (rfp_id, vendor_id) DO UPDATE SET
             items_pricing = excluded.items_pricing,
             total_price = excluded.total_price,
             delivery_time = excluded.delivery_time,
             payment_terms = excluded.payment_terms,
             warranty = excluded.warranty,
             additional_notes = excluded.additional_notes,
             raw_email_content = excluded.raw_email_content,
             parsed_at = excluded.parsed_at,
             status = excluded.status,
             updated_at = excluded.updated_at",
        params![
            Uuid::new_v4().to_string(),
            upsert.rfp_id.to_string(),
            upsert.vendor_id.to_string(),
            items_pricing,
            upsert.terms.total_price,
            upsert.terms.delivery_time,
            upsert.terms.payment_terms,
            upsert.terms.warranty,
            upsert.terms.additional_notes,
            upsert.raw_email_content,
            upsert.parsed_at.as_ref().map(format_timestamp),
            upsert.status.as_str(),
            now,
        ],
    )?;

    find_for_vendor(conn, &upsert.rfp_id, &upsert.vendor_id)
}

/// Keep a reply the LLM could not read.
///
/// Inserts a `RECEIVED` proposal with only the raw content. An existing
/// `RECEIVED` proposal takes the new content; a parsed one is left untouched.
pub fn store_unparsed_reply(
    conn: &Connection,
    rfp_id: &Uuid,
    vendor_id: &Uuid,
    raw_email_content: &str,
) -> Result<Proposal, DatabaseError> {
    conn.execute(
        "INSERT INTO proposals (id, rfp_id, vendor_id, raw_email_content, status,
         created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?6)
         ON CONFLICT (rfp_id, vendor_id) DO UPDATE SET
             raw_email_content = excluded.raw_email_content,
             updated_at = excluded.updated_at
         WHERE proposals.status = ?5",
        params![
            Uuid::new_v4().to_string(),
            rfp_id.to_string(),
            vendor_id.to_string(),
            raw_email_content,
            ProposalStatus::Received.as_str(),
            format_timestamp(&Utc::now()),
        ],
    )?;
    find_for_vendor(conn, rfp_id, vendor_id)
}

fn find_for_vendor(
    conn: &Connection,
    rfp_id: &Uuid,
    vendor_id: &Uuid,
) -> Result<Proposal, DatabaseError> {
    let sql = format!(
        "SELECT {PROPOSAL_COLUMNS} FROM proposals p WHERE p.rfp_id = ?1 AND p.vendor_id = ?2"
    );
    let row = conn.query_row(
        &sql,
        params![rfp_id.to_string(), vendor_id.to_string()],
        |row| ProposalRow::read(row, 0),
    )?;
    row.into_proposal()
}

/// A proposal with the RFP it answers and the vendor that sent it.
pub fn get_proposal_with_relations(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<ProposalWithRelations>, DatabaseError> {
    let sql = format!(
        "SELECT {PROPOSAL_COLUMNS}, {RFP_COLUMNS}, {VENDOR_COLUMNS}
         FROM proposals p
         JOIN rfps r ON r.id = p.rfp_id
         JOIN vendors v ON v.id = p.vendor_id
         WHERE p.id = ?1"
    );
    let mut stmt = conn.prepare(&sql)?;

    let result = stmt.query_row(params![id.to_string()], |row| {
        Ok((
            ProposalRow::read(row, 0)?,
            RfpRow::read(row, PROPOSAL_COLUMN_COUNT)?,
            VendorRow::read(row, PROPOSAL_COLUMN_COUNT + RFP_COLUMN_COUNT)?,
        ))
    });

    match result {
        Ok((proposal, rfp, vendor)) => Ok(Some(ProposalWithRelations {
            proposal: proposal.into_proposal()?,
            rfp: Some(rfp.into_rfp()?),
            vendor: Some(vendor.into_vendor()?),
        })),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Proposals received for an RFP with their vendors, oldest first.
pub fn list_proposals_for_rfp(
    conn: &Connection,
    rfp_id: &Uuid,
) -> Result<Vec<ProposalWithVendor>, DatabaseError> {
    let sql = format!(
        "SELECT {PROPOSAL_COLUMNS}, {VENDOR_COLUMNS}
         FROM proposals p JOIN vendors v ON v.id = p.vendor_id
         WHERE p.rfp_id = ?1
         ORDER BY p.created_at ASC, v.name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![rfp_id.to_string()], |row| {
        Ok((
            ProposalRow::read(row, 0)?,
            VendorRow::read(row, PROPOSAL_COLUMN_COUNT)?,
        ))
    })?;

    let mut proposals = Vec::new();
    for row in rows {
        let (proposal, vendor) = row?;
        proposals.push(ProposalWithVendor {
            proposal: proposal.into_proposal()?,
            vendor: vendor.into_vendor()?,
        });
    }
    Ok(proposals)
}
