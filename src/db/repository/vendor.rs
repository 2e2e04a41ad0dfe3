use chrono::Utc;
use rusqlite::{params, params_from_iter, Connection, Row};
use uuid::Uuid;

use super::{format_timestamp, parse_timestamp, parse_uuid};
use crate::db::DatabaseError;
use crate::models::*;

/// Column list for `vendors` aliased as `v`, in `VendorRow::read` order.
pub(crate) const VENDOR_COLUMNS: &str = "v.id, v.name, v.email, v.contact_person, v.phone,
    v.address, v.category, v.notes, v.created_at, v.updated_at";

pub(crate) struct VendorRow {
    id: String,
    name: String,
    email: String,
    contact_person: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    category: Option<String>,
    notes: Option<String>,
    created_at: String,
    updated_at: String,
}

impl VendorRow {
    pub(crate) fn read(row: &Row<'_>, base: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(base)?,
            name: row.get(base + 1)?,
            email: row.get(base + 2)?,
            contact_person: row.get(base + 3)?,
            phone: row.get(base + 4)?,
            address: row.get(base + 5)?,
            category: row.get(base + 6)?,
            notes: row.get(base + 7)?,
            created_at: row.get(base + 8)?,
            updated_at: row.get(base + 9)?,
        })
    }

    pub(crate) fn into_vendor(self) -> Result<Vendor, DatabaseError> {
        Ok(Vendor {
            id: parse_uuid(&self.id)?,
            name: self.name,
            email: self.email,
            contact_person: self.contact_person,
            phone: self.phone,
            address: self.address,
            category: self.category,
            notes: self.notes,
            created_at: parse_timestamp(&self.created_at)?,
            updated_at: parse_timestamp(&self.updated_at)?,
        })
    }
}

fn collect_vendors(
    rows: impl Iterator<Item = rusqlite::Result<VendorRow>>,
) -> Result<Vec<Vendor>, DatabaseError> {
    let mut vendors = Vec::new();
    for row in rows {
        vendors.push(row?.into_vendor()?);
    }
    Ok(vendors)
}

pub fn insert_vendor(conn: &Connection, new: NewVendor) -> Result<Vendor, DatabaseError> {
    let now = Utc::now();
    let vendor = Vendor {
        id: Uuid::new_v4(),
        name: new.name,
        email: new.email,
        contact_person: new.contact_person,
        phone: new.phone,
        address: new.address,
        category: new.category,
        notes: new.notes,
        created_at: now,
        updated_at: now,
    };

    conn.execute(
        "INSERT INTO vendors (id, name, email, contact_person, phone, address, category, notes,
         created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
        params![
            vendor.id.to_string(),
            vendor.name,
            vendor.email,
            vendor.contact_person,
            vendor.phone,
            vendor.address,
            vendor.category,
            vendor.notes,
            format_timestamp(&vendor.created_at),
            format_timestamp(&vendor.updated_at),
        ],
    )?;
    Ok(vendor)
}

pub fn get_vendor(conn: &Connection, id: &Uuid) -> Result<Option<Vendor>, DatabaseError> {
    let sql = format!("SELECT {VENDOR_COLUMNS} FROM vendors v WHERE v.id = ?1");
    let mut stmt = conn.prepare(&sql)?;

    match stmt.query_row(params![id.to_string()], |row| VendorRow::read(row, 0)) {
        Ok(row) => Ok(Some(row.into_vendor()?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Vendors among `ids` that exist. Order follows the store, not `ids`.
pub fn get_vendors_by_ids(conn: &Connection, ids: &[Uuid]) -> Result<Vec<Vendor>, DatabaseError> {
    if ids.is_empty() {
        return Ok(Vec::new());
    }
    let placeholders = (1..=ids.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "SELECT {VENDOR_COLUMNS} FROM vendors v WHERE v.id IN ({placeholders}) ORDER BY v.name"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params_from_iter(ids.iter().map(|id| id.to_string())), |row| {
        VendorRow::read(row, 0)
    })?;
    collect_vendors(rows)
}

/// Case-insensitive lookup by email address.
pub fn find_vendor_by_email(conn: &Connection, email: &str) -> Result<Option<Vendor>, DatabaseError> {
    let sql = format!("SELECT {VENDOR_COLUMNS} FROM vendors v WHERE v.email = ?1 COLLATE NOCASE");
    let mut stmt = conn.prepare(&sql)?;

    match stmt.query_row(params![email.trim()], |row| VendorRow::read(row, 0)) {
        Ok(row) => Ok(Some(row.into_vendor()?)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// `%term%` with the LIKE wildcards in `term` taken literally.
fn contains_pattern(term: &str) -> String {
    let mut pattern = String::with_capacity(term.len() + 2);
    pattern.push('%');
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

pub fn list_vendors(conn: &Connection, filter: &VendorFilter) -> Result<Vec<Vendor>, DatabaseError> {
    let category = filter
        .category
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty());
    let pattern = filter
        .search
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(contains_pattern);

    // LIKE is case-insensitive for ASCII; category must match exactly.
    let sql = format!(
        "SELECT {VENDOR_COLUMNS} FROM vendors v
         WHERE (?1 IS NULL OR v.category = ?1)
           AND (?2 IS NULL
                OR v.name LIKE ?2 ESCAPE '\\'
                OR v.email LIKE ?2 ESCAPE '\\'
                OR COALESCE(v.contact_person, '') LIKE ?2 ESCAPE '\\'
                OR COALESCE(v.category, '') LIKE ?2 ESCAPE '\\')
         ORDER BY v.name COLLATE NOCASE"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params![category, pattern], |row| VendorRow::read(row, 0))?;
    collect_vendors(rows)
}

pub fn update_vendor(
    conn: &Connection,
    id: &Uuid,
    changes: VendorChanges,
) -> Result<Vendor, DatabaseError> {
    let mut vendor = get_vendor(conn, id)?.ok_or_else(|| DatabaseError::not_found("vendor", id))?;
    if changes.is_empty() {
        return Ok(vendor);
    }

    changes.apply(&mut vendor);
    vendor.updated_at = Utc::now();

    conn.execute(
        "UPDATE vendors SET name = ?2, email = ?3, contact_person = ?4, phone = ?5,
         address = ?6, category = ?7, notes = ?8, updated_at = ?9
         WHERE id = ?1",
        params![
            vendor.id.to_string(),
            vendor.name,
            vendor.email,
            vendor.contact_person,
            vendor.phone,
            vendor.address,
            vendor.category,
            vendor.notes,
            format_timestamp(&vendor.updated_at),
        ],
    )?;
    Ok(vendor)
}

pub fn delete_vendor(conn: &Connection, id: &Uuid) -> Result<(), DatabaseError> {
    let deleted = conn.execute("DELETE FROM vendors WHERE id = ?1", params![id.to_string()])?;
    if deleted == 0 {
        return Err(DatabaseError::not_found("vendor", id));
    }
    Ok(())
}
