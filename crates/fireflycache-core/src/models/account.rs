use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Account type filter for first-party accounts.
pub const ASSET: &str = "asset";
pub const EXPENSE: &str = "expense";
pub const REVENUE: &str = "revenue";

/// A first-party account (checking, savings, cash wallet).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Asset {
    pub id: i64,
    pub name: String,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
}

impl Asset {
    pub fn new(id: i64, name: impl Into<String>, updated_at: DateTime<Utc>) -> Self {
        Self {
            id,
            name: name.into(),
            updated_at,
        }
    }
}

/// A counterparty account: expense/revenue category or external payee.
///
/// `preferred_asset` and `preferred_budget` are weak references: the
/// referenced rows may have been evicted, in which case they resolve to
/// nothing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct OtherAccount {
    pub id: i64,
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: String,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub preferred_asset: Option<i64>,
    #[serde(default)]
    pub preferred_budget: Option<i64>,
}

impl OtherAccount {
    pub fn new(
        id: i64,
        name: impl Into<String>,
        account_type: impl Into<String>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            account_type: account_type.into(),
            updated_at,
            preferred_asset: None,
            preferred_budget: None,
        }
    }

    /// Take the listing fields from `remote` but keep what was learned
    /// locally (preferred asset and budget).
    pub fn refreshed_by(self, remote: OtherAccount) -> Self {
        Self {
            name: remote.name,
            account_type: remote.account_type,
            updated_at: remote.updated_at,
            ..self
        }
    }

    pub fn apply_hint(&mut self, hint: &OtherHint, now: DateTime<Utc>) {
        self.preferred_asset = hint.preferred_asset;
        self.preferred_budget = hint.preferred_budget;
        self.updated_at = now;
    }

    pub fn is_type(&self, account_type: &str) -> bool {
        self.account_type == account_type
    }
}

/// Preferred asset/budget to remember for a counterparty after a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct OtherHint {
    pub id: i64,
    pub preferred_asset: Option<i64>,
    pub preferred_budget: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_refresh_keeps_preferences() {
        let then = Utc::now() - Duration::days(3);
        let mut local = OtherAccount::new(9, "Bakry", EXPENSE, then);
        local.preferred_asset = Some(1);
        local.preferred_budget = Some(4);

        let now = Utc::now();
        let merged = local.refreshed_by(OtherAccount::new(9, "Bakery", EXPENSE, now));

        assert_eq!(merged.name, "Bakery");
        assert_eq!(merged.updated_at, now);
        assert_eq!(merged.preferred_asset, Some(1));
        assert_eq!(merged.preferred_budget, Some(4));
    }

    #[test]
    fn test_apply_hint_overwrites_with_none() {
        let mut other = OtherAccount::new(3, "Fuel", EXPENSE, Utc::now());
        other.preferred_budget = Some(8);
        let hint = OtherHint {
            id: 3,
            preferred_asset: Some(2),
            preferred_budget: None,
        };
        other.apply_hint(&hint, Utc::now());
        assert_eq!(other.preferred_asset, Some(2));
        assert_eq!(other.preferred_budget, None);
    }

    #[test]
    fn test_other_account_serializes_type_field() {
        let other = OtherAccount::new(55, "Bakery", EXPENSE, Utc::now());
        let json = serde_json::to_value(&other).unwrap();
        assert_eq!(json["type"], "expense");
    }
}
