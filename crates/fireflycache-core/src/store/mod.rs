//! Local store for offline access to the Firefly III data the entry
//! screen needs.
//!
//! The store keeps asset accounts, other (expense/revenue) accounts,
//! budgets, location hints and the remote settings in one JSON document.
//! Every mutation runs inside a write scope that commits atomically or not
//! at all. Rows older than 7 days are stale and get purged before the
//! next fetch of their category.

pub mod local;
pub mod notify;
pub mod record;
pub mod schema;

pub use local::{Store, WriteTxn};
pub use notify::{ChangeNotifier, ChangeSet, SubscriptionId};
pub use record::{Record, TableKind};
pub use schema::{Tables, SCHEMA_VERSION};

use chrono::{DateTime, Duration, Utc};

/// Rows not refreshed for this many days are evicted before a refresh.
pub const STALE_AFTER_DAYS: i64 = 7;

pub fn stale_cutoff(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::days(STALE_AFTER_DAYS)
}

pub fn is_stale(updated_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    updated_at < stale_cutoff(now)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stale_boundary() {
        let now = Utc::now();
        let week = Duration::days(STALE_AFTER_DAYS);
        assert!(!is_stale(now - week + Duration::seconds(1), now));
        assert!(!is_stale(now - week, now));
        assert!(is_stale(now - week - Duration::seconds(1), now));
        assert!(!is_stale(now, now));
    }
}
