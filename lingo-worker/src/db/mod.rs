//! Per-table database accessors

pub mod items;
pub mod pack_status;
pub mod packs;
pub mod projects;
pub mod proposals;
pub mod translations;
pub mod versions;

use chrono::{DateTime, Utc};
use lingo_common::{Error, Result};

/// Parse a stored RFC 3339 timestamp
pub(crate) fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| Error::Internal(format!("invalid timestamp '{}': {}", s, e)))
}
