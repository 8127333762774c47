//! Wall-clock helpers.

use chrono::{DateTime, Utc};

/// Current UTC timestamp used for `opened_at` / `closed_at` stamps.
#[must_use]
pub fn now_utc() -> DateTime<Utc> {
    Utc::now()
}

