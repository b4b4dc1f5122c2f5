use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::utils::format_api_date;

/// One page of a JSON:API style listing.
#[derive(Debug, Clone, Deserialize)]
pub struct Page<A> {
    pub data: Vec<Resource<A>>,
    #[serde(default)]
    pub meta: PageMeta,
}

impl<A> Page<A> {
    pub fn total_pages(&self) -> u32 {
        self.meta.pagination.total_pages
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Resource<A> {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub attributes: A,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PageMeta {
    #[serde(default)]
    pub pagination: Pagination,
}

/// Only the page count drives syncing; other counters are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Pagination {
    #[serde(default)]
    pub total_pages: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccountAttributes {
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BudgetAttributes {
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AttachmentAttributes {
    pub filename: Option<String>,
    pub title: Option<String>,
    pub attachable_type: Option<String>,
}

/// `{"data": {...}}` envelope returned by create endpoints.
#[derive(Debug, Clone, Deserialize)]
pub struct Created<A> {
    pub data: Resource<A>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionGroupAttributes {
    pub transactions: Vec<TransactionSplit>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TransactionSplit {
    #[serde(deserialize_with = "string_or_number")]
    pub transaction_journal_id: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAccount {
    pub name: String,
    #[serde(rename = "type")]
    pub account_type: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct NewAttachment {
    pub filename: String,
    pub model: String,
    pub model_id: i64,
    pub title: String,
}

impl NewAttachment {
    /// Metadata for a photographed receipt attached to a journal.
    pub fn receipt(journal_id: i64) -> Self {
        Self {
            filename: "receipt.jpeg".to_string(),
            model: "TransactionJournal".to_string(),
            model_id: journal_id,
            title: "Receipt".to_string(),
        }
    }
}

/// Filters for `GET /accounts`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountQuery {
    pub page: u32,
    pub account_type: Option<String>,
    /// Report balances as of this day
    pub date: Option<NaiveDate>,
}

impl AccountQuery {
    pub fn page(page: u32, account_type: impl Into<String>) -> Self {
        Self {
            page,
            account_type: Some(account_type.into()),
            date: None,
        }
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", self.page.to_string())];
        if let Some(date) = self.date {
            params.push(("date", format_api_date(date)));
        }
        if let Some(ref account_type) = self.account_type {
            params.push(("type", account_type.clone()));
        }
        params
    }
}

/// Filters for `GET /budgets`. The spend window is only sent when both
/// ends are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BudgetQuery {
    pub page: u32,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl BudgetQuery {
    pub fn page(page: u32) -> Self {
        Self {
            page,
            ..Self::default()
        }
    }

    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("page", self.page.to_string())];
        if let (Some(start), Some(end)) = (self.start, self.end) {
            params.push(("start", format_api_date(start)));
            params.push(("end", format_api_date(end)));
        }
        params
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(i64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Number(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_account_page() {
        let json = r#"{
            "data": [
                {"type": "accounts", "id": "12", "attributes": {"name": "Checking", "type": "asset", "active": true}},
                {"type": "accounts", "id": 13, "attributes": {"name": "Savings", "type": "asset"}}
            ],
            "meta": {"pagination": {"total": 2, "count": 2, "per_page": 50, "current_page": 1, "total_pages": 1}}
        }"#;
        let page: Page<AccountAttributes> = serde_json::from_str(json).unwrap();
        assert_eq!(page.total_pages(), 1);
        assert_eq!(page.data[0].id, "12");
        assert_eq!(page.data[1].id, "13");
        assert_eq!(page.data[1].attributes.account_type, "asset");
    }

    #[test]
    fn test_page_without_meta_defaults_to_zero_pages() {
        let page: Page<BudgetAttributes> = serde_json::from_str(r#"{"data": []}"#).unwrap();
        assert_eq!(page.total_pages(), 0);
    }

    #[test]
    fn test_budget_query_needs_both_ends() {
        let mut query = BudgetQuery::page(1);
        query.start = NaiveDate::from_ymd_opt(2024, 1, 1);
        assert_eq!(query.params(), vec![("page", "1".to_string())]);

        query.end = NaiveDate::from_ymd_opt(2024, 1, 31);
        assert_eq!(
            query.params(),
            vec![
                ("page", "1".to_string()),
                ("start", "2024-01-01".to_string()),
                ("end", "2024-01-31".to_string()),
            ]
        );
    }

    #[test]
    fn test_account_query_params() {
        let query = AccountQuery::page(3, "expense");
        assert_eq!(
            query.params(),
            vec![("page", "3".to_string()), ("type", "expense".to_string())]
        );
    }

    #[test]
    fn test_receipt_attachment_body() {
        let body = serde_json::to_value(NewAttachment::receipt(981)).unwrap();
        assert_eq!(body["filename"], "receipt.jpeg");
        assert_eq!(body["model"], "TransactionJournal");
        assert_eq!(body["model_id"], 981);
        assert_eq!(body["title"], "Receipt");
    }
}
