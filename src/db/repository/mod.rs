//! Repository layer: entity-scoped database operations.
//!
//! Free functions over a borrowed `rusqlite::Connection`; every public item of
//! the sub-modules is re-exported here.

mod proposal;
mod rfp;
mod rfp_vendor;
mod vendor;

use chrono::{DateTime, SecondsFormat, Utc};
use uuid::Uuid;

use super::DatabaseError;

pub use proposal::*;
pub use rfp::*;
pub use rfp_vendor::*;
pub use vendor::*;

/// Timestamps are stored as fixed-width RFC 3339 so text order is time order.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>, DatabaseError> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DatabaseError::ConstraintViolation(format!("bad timestamp {raw:?}: {e}")))
}

pub(crate) fn parse_optional_timestamp(
    raw: Option<&str>,
) -> Result<Option<DateTime<Utc>>, DatabaseError> {
    raw.map(parse_timestamp).transpose()
}

pub(crate) fn parse_uuid(raw: &str) -> Result<Uuid, DatabaseError> {
    Uuid::parse_str(raw).map_err(|e| DatabaseError::ConstraintViolation(e.to_string()))
}
