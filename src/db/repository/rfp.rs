use std::str::FromStr;

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use uuid::Uuid;

use super::{format_timestamp, parse_optional_timestamp, parse_timestamp, parse_uuid};
use super::proposal::list_proposals_for_rfp;
use super::rfp_vendor::list_rfp_vendors;
use crate::db::DatabaseError;
use crate::models::*;
use crate::models::enums::*;

/// Column list for `rfps` aliased as `r`, in `RfpRow::read` order.
pub(crate) const RFP_COLUMNS: &str = "r.id, r.title, r.description, r.items, r.budget,
    r.delivery_deadline, r.payment_terms, r.warranty_requirements, r.other_requirements,
    r.status, r.created_at, r.updated_at";

pub(crate) const RFP_COLUMN_COUNT: usize = 12;

// Internal row type for Rfp mapping
pub(crate) struct RfpRow {
    id: String,
    title: String,
    description: Option<String>,
    items: String,
    budget: Option<f64>,
    delivery_deadline: Option<String>,
    payment_terms: Option<String>,
    warranty_requirements: Option<String>,
    other_requirements: Option<String>,
    status: String,
    created_at: String,
    updated_at: String,
}

impl RfpRow {
    pub(crate) fn read(row: &Row<'_>, base: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(base)?,
            title: row.get(base + 1)?,
            description: row.get(base + 2)?,
            items: row.get(base + 3)?,
            budget: row.get(base + 4)?,
            delivery_deadline: row.get(base + 5)?,
            payment_terms: row.get(base + 6)?,
            warranty_requirements: row.get(base + 7)?,
            other_requirements: row.get(base + 8)?,
            status: row.get(base + 9)?,
            created_at: row.get(base + 10)?,
            updated_at: row.get(base + 11)?,
        })
    }

    pub(crate) fn into_rfp(self) -> Result<Rfp, DatabaseError> {
        Ok(Rfp {
            id: parse_uuid(&self.id)?,
            title: self.title,
            description: self.description,
            items: serde_json::from_str(&self.items)?,
            budget: self.budget,
            delivery_deadline: parse_optional_timestamp(self.delivery_deadline.as_deref())?,
            payment_terms: self.payment_terms,
            warranty_requirements: self.warranty_requirements,
            other_requirements: self.other_requirements,
            status: RfpStatus::from_str(&self.status)?,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

pub fn insert_rfp(conn: &Connection, rfp: &Rfp) -> Result<(), DatabaseError> {
    conn.execute(
        "INSERT INTO rfps (id, title, description, items, budget, delivery_deadline,
         payment_terms, warranty_requirements, other_requirements, status, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)",
        params![
            rfp.id.to_string(),
            rfp.title,
            rfp.description,
            serde_json::to_string(&rfp.items)?,
            rfp.budget,
            rfp.delivery_deadline.as_ref().map(format_timestamp),
            rfp.payment_terms,
            rfp.warranty_requirements,
            rfp.other_requirements,
            rfp.status.as_str(),
            format_timestamp(&rfp.created_at),
            format_timestamp(&rfp.updated_at),
        ],
    )?;
    Ok(())
}

pub fn get_rfp(conn: &Connection, id: &Uuid) -> Result<Option<Rfp>, DatabaseError> {
    let sql = format!("SELECT {RFP_COLUMNS} FROM rfps r WHERE r.id = ?1");
    let mut stmt = conn.prepare(&sql)?;

    let result = stmt.query_row(params![id.to_string()], |row| RfpRow::read(row, 0));

    match result {
        Ok(row) => Ok(Some(row.into_rfp()?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// One page of RFPs, newest first, plus the total matching the status filter.
pub fn list_rfps(conn: &Connection, filter: &RfpFilter) -> Result<(Vec<Rfp>, u64), DatabaseError> {
    let status = filter.status.map(|s| s.as_str());

    let total: i64 = conn.query_row(
        "SELECT COUNT(*) FROM rfps WHERE (?1 IS NULL OR status = ?1)",
        params![status],
        |row| row.get(0),
    )?;

    let sql = format!(
        "SELECT {RFP_COLUMNS} FROM rfps r
         WHERE (?1 IS NULL OR r.status = ?1)
         ORDER BY r.created_at DESC
         LIMIT ?2 OFFSET ?3"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![status, filter.limit, filter.offset], |row| {
        RfpRow::read(row, 0)
    })?;

    let mut rfps = Vec::new();
    for row in rows {
        rfps.push(row?.into_rfp()?);
    }
    Ok((rfps, total.max(0) as u64))
}

pub fn update_rfp_status(
    conn: &Connection,
    id: &Uuid,
    status: RfpStatus,
) -> Result<(), DatabaseError> {
    let changed = conn.execute(
        "UPDATE rfps SET status = ?2, updated_at = ?3 WHERE id = ?1",
        params![id.to_string(), status.as_str(), format_timestamp(&Utc::now())],
    )?;
    if changed == 0 {
        return Err(DatabaseError::not_found("rfp", id));
    }
    Ok(())
}

pub fn get_rfp_with_relations(
    conn: &Connection,
    id: &Uuid,
) -> Result<Option<RfpWithRelations>, DatabaseError> {
    let Some(rfp) = get_rfp(conn, id)? else {
        return Ok(None);
    };
    let proposals = list_proposals_for_rfp(conn, id)?;
    let rfp_vendors = list_rfp_vendors(conn, id)?;
    Ok(Some(RfpWithRelations {
        rfp,
        proposals,
        rfp_vendors,
    }))
}
