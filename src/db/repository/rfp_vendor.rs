use std::str::FromStr;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::vendor::{VendorRow, VENDOR_COLUMNS};
use super::{format_timestamp, parse_optional_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;
use crate::models::enums::*;

/// Record (or refresh) the delivery of an RFP to a vendor.
///
/// One row per RFP/vendor pair: sending again overwrites `sent_at` and
/// `email_status` and keeps the original id and `created_at`.
pub fn upsert_rfp_vendor(
    conn: &Connection,
    rfp_id: &Uuid,
    vendor_id: &Uuid,
    email_status: EmailStatus,
    sent_at: Option<DateTime<Utc>>,
) -> Result<RfpVendor, DatabaseError> {
    conn.execute(
        "INSERT INTO rfp_vendors (id, rfp_id, vendor_id, sent_at, email_status, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)
         ON CONFLICT (rfp_id, vendor_id) DO UPDATE SET
             sent_at = COALESCE(excluded.sent_at, rfp_vendors.sent_at),
             email_status = excluded.email_status",
        params![
            Uuid::new_v4().to_string(),
            rfp_id.to_string(),
            vendor_id.to_string(),
            sent_at.as_ref().map(format_timestamp),
            email_status.as_str(),
            format_timestamp(&Utc::now()),
        ],
    )?;

    let row = conn.query_row(
        "SELECT id, rfp_id, vendor_id, sent_at, email_status, created_at
         FROM rfp_vendors WHERE rfp_id = ?1 AND vendor_id = ?2",
        params![rfp_id.to_string(), vendor_id.to_string()],
        |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
                row.get::<_, String>(5)?,
            ))
        },
    )?;
    rfp_vendor_from_parts(row)
}

type RfpVendorParts = (String, String, String, Option<String>, String, String);

fn rfp_vendor_from_parts(parts: RfpVendorParts) -> Result<RfpVendor, DatabaseError> {
    let (id, rfp_id, vendor_id, sent_at, email_status, created_at) = parts;
    Ok(RfpVendor {
        id: parse_uuid(&id)?,
        rfp_id: parse_uuid(&rfp_id)?,
        vendor_id: parse_uuid(&vendor_id)?,
        sent_at: parse_optional_timestamp(sent_at.as_deref())?,
        email_status: EmailStatus::from_str(&email_status)?,
        created_at: parse_timestamp(&created_at)?,
    })
}

/// Delivery records of an RFP with their vendors, oldest first.
pub fn list_rfp_vendors(
    conn: &Connection,
    rfp_id: &Uuid,
) -> Result<Vec<RfpVendorWithVendor>, DatabaseError> {
    let sql = format!(
        "SELECT rv.id, rv.rfp_id, rv.vendor_id, rv.sent_at, rv.email_status, rv.created_at,
         {VENDOR_COLUMNS}
         FROM rfp_vendors rv JOIN vendors v ON v.id = rv.vendor_id
         WHERE rv.rfp_id = ?1
         ORDER BY rv.created_at ASC, v.name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![rfp_id.to_string()], |row| {
        let parts: RfpVendorParts = (
            row.get(0)?,
            row.get(1)?,
            row.get(2)?,
            row.get(3)?,
            row.get(4)?,
            row.get(5)?,
        );
        Ok((parts, VendorRow::read(row, 6)?))
    })?;

    let mut records = Vec::new();
    for row in rows {
        let (parts, vendor) = row?;
        records.push(RfpVendorWithVendor {
            rfp_vendor: rfp_vendor_from_parts(parts)?,
            vendor: vendor.into_vendor()?,
        });
    }
    Ok(records)
}

/// The RFP most recently emailed to a vendor, if any.
pub fn latest_rfp_for_vendor(
    conn: &Connection,
    vendor_id: &Uuid,
) -> Result<Option<Uuid>, DatabaseError> {
    let raw: Option<String> = conn
        .query_row(
            "SELECT rfp_id FROM rfp_vendors
             WHERE vendor_id = ?1 AND email_status = 'SENT' AND sent_at IS NOT NULL
             ORDER BY sent_at DESC LIMIT 1",
            params![vendor_id.to_string()],
            |row| row.get(0),
        )
        .optional()?;
    raw.as_deref().map(parse_uuid).transpose()
}
