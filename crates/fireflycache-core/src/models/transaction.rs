use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use super::OtherHint;
use crate::geo::Coordinates;
use crate::utils::{format_amount, format_api_date};

/// Description sent when the user left the field blank.
const EMPTY_DESCRIPTION: &str = "(empty description)";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub enum TransactionKind {
    Withdrawal,
    Deposit,
    Transfer,
}

impl TransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Withdrawal => "withdrawal",
            Self::Deposit => "deposit",
            Self::Transfer => "transfer",
        }
    }

    /// Account type of the counterparty for this kind of booking.
    pub fn counterparty_type(&self) -> &'static str {
        match self {
            Self::Withdrawal => super::EXPENSE,
            Self::Deposit => super::REVENUE,
            Self::Transfer => super::ASSET,
        }
    }
}

/// A single-split booking as entered on the keypad screen.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct TransactionDraft {
    pub kind: TransactionKind,
    /// Amount in minor units (cents)
    pub amount_minor: i64,
    pub description: String,
    #[cfg_attr(feature = "ts", ts(type = "string"))]
    pub date: NaiveDate,
    pub asset_id: i64,
    pub other_id: i64,
    pub budget_id: Option<i64>,
}

impl TransactionDraft {
    /// Body for `POST /transactions`.
    /// Money flows other -> asset for deposits and asset -> other otherwise.
    pub fn payload(&self) -> Value {
        let (source_id, destination_id) = match self.kind {
            TransactionKind::Deposit => (self.other_id, self.asset_id),
            _ => (self.asset_id, self.other_id),
        };
        let description = if self.description.trim().is_empty() {
            EMPTY_DESCRIPTION
        } else {
            self.description.as_str()
        };

        let mut split = json!({
            "description": description,
            "date": format_api_date(self.date),
            "type": self.kind.as_str(),
            "amount": format_amount(self.amount_minor),
            "source_id": source_id,
            "destination_id": destination_id,
        });
        if let Some(budget_id) = self.budget_id {
            split["budget_id"] = json!(budget_id);
        }

        json!({ "transactions": [split] })
    }

    /// Preference update for the counterparty; transfers have none.
    pub fn other_hint(&self) -> Option<OtherHint> {
        if self.kind == TransactionKind::Transfer {
            return None;
        }
        Some(OtherHint {
            id: self.other_id,
            preferred_asset: Some(self.asset_id),
            preferred_budget: self.budget_id,
        })
    }

    /// Bundle the draft with its optional receipt and location pin.
    pub fn into_submission(
        self,
        receipt: Option<String>,
        location: Option<Coordinates>,
    ) -> TransactionSubmission {
        TransactionSubmission {
            payload: self.payload(),
            receipt,
            other: self.other_hint(),
            location,
        }
    }
}

/// Everything `SyncEngine::save_transaction` needs for one booking.
#[derive(Debug, Clone, Default)]
pub struct TransactionSubmission {
    pub payload: Value,
    /// Base64-encoded receipt image
    pub receipt: Option<String>,
    pub other: Option<OtherHint>,
    /// Pin to remember for `other`; ignored without it
    pub location: Option<Coordinates>,
}

impl TransactionSubmission {
    pub fn has_receipt(&self) -> bool {
        self.receipt.as_deref().is_some_and(|r| !r.is_empty())
    }
}
