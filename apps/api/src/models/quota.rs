use chrono::{DateTime, Datelike, Utc};

/// Calendar month key used by the ledger, e.g. `2025-10`.
pub fn month_key(now: DateTime<Utc>) -> String {
    format!("{:04}-{:02}", now.year(), now.month())
}
