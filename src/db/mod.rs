pub mod connection;
pub mod schema;
pub mod scans;
pub mod stats;
pub mod targets;
pub mod vulnerabilities;

pub use connection::Database;

use chrono::{DateTime, Utc};

pub(crate) fn parse_ts(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|d| d.with_timezone(&Utc))
}
