//! Data models for the cached Firefly III entities.
//!
//! - `Asset`, `OtherAccount`: first-party and counterparty accounts
//! - `Budget`: budgets offered when booking a withdrawal
//! - `LocationHint`, `NearbyAccount`, `Suggestion`: geolocation pins
//! - `Settings`: the singleton remote credentials record
//! - `TransactionDraft`, `TransactionSubmission`, `OtherHint`: write-side types

pub mod account;
pub mod budget;
pub mod location;
pub mod settings;
pub mod transaction;

pub use account::{Asset, OtherAccount, OtherHint, ASSET, EXPENSE, REVENUE};
pub use budget::Budget;
pub use location::{LocationHint, NearbyAccount, Suggestion};
pub use settings::Settings;
pub use transaction::{TransactionDraft, TransactionKind, TransactionSubmission};

use crate::error::{Error, Result};

/// Normalize a remote id (the API serializes ids as strings) to the integer
/// key every local table is indexed by.
pub fn parse_remote_id(raw: &str) -> Result<i64> {
    raw.trim()
        .parse::<i64>()
        .map_err(|_| Error::invalid_response(format!("non-numeric id {:?}", raw)))
}
