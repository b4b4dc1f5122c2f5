//! REST client module for the Firefly III personal finance API.
//!
//! `FireflyClient` talks to `<url>/api/v1` with a personal access token.
//! The `RemoteApi` trait is the seam the sync engine depends on, so the
//! engine can be driven by a scripted remote in tests.
//!
//! GET and PUT fail on non-2xx statuses. POST hands back whatever JSON the
//! server produced, and callers pass it through `validate_post_response`.

pub mod client;
pub mod error;
pub mod types;

#[cfg(test)]
pub(crate) mod mock;

pub use client::FireflyClient;
pub use error::RequestError;
pub use types::{
    AccountAttributes, AccountQuery, AttachmentAttributes, BudgetAttributes, BudgetQuery,
    Created, NewAccount, NewAttachment, Page, Pagination, Resource, TransactionGroupAttributes,
};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::models::{parse_remote_id, Settings};

#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Swap the base url and token used by subsequent requests.
    fn configure(&self, settings: &Settings);

    async fn get_accounts(&self, query: &AccountQuery) -> Result<Page<AccountAttributes>>;

    async fn post_account(&self, body: &NewAccount) -> Result<Value>;

    async fn get_attachments(&self, page: u32) -> Result<Page<AttachmentAttributes>>;

    async fn post_attachment(&self, body: &NewAttachment) -> Result<Value>;

    /// Upload raw attachment bytes. Resolves with the HTTP status of any
    /// response; only a failure to talk to the server is an error.
    async fn upload_attachment(&self, attachment_id: i64, bytes: Vec<u8>) -> Result<u16>;

    async fn get_budgets(&self, query: &BudgetQuery) -> Result<Page<BudgetAttributes>>;

    async fn post_transaction(&self, body: &Value) -> Result<Value>;
}

/// Turn a POST payload carrying an `errors` member into
/// `Error::RemoteValidation`; pass anything else through.
pub fn validate_post_response(response: Value) -> Result<Value> {
    match response.get("errors") {
        None | Some(Value::Null) | Some(Value::Bool(false)) => Ok(response),
        Some(errors) => {
            let message = response
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or("validation failed")
                .to_string();
            Err(Error::RemoteValidation {
                message,
                errors: errors.clone(),
            })
        }
    }
}

/// Id of the resource a create endpoint returned.
pub fn created_id(response: &Value) -> Result<i64> {
    let created: Created<Value> = serde_json::from_value(response.clone())
        .map_err(|e| Error::invalid_response(format!("create response: {}", e)))?;
    parse_remote_id(&created.data.id)
}

/// Journal id of the first split of a created transaction group.
pub fn transaction_journal_id(response: &Value) -> Result<i64> {
    let created: Created<TransactionGroupAttributes> = serde_json::from_value(response.clone())
        .map_err(|e| Error::invalid_response(format!("transaction response: {}", e)))?;
    let split = created
        .data
        .attributes
        .transactions
        .first()
        .ok_or_else(|| Error::invalid_response("transaction response has no splits"))?;
    parse_remote_id(&split.transaction_journal_id)
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn test_validate_passes_success_payload() {
        let ok = json!({"data": {"id": "1"}});
        assert_eq!(validate_post_response(ok.clone()).unwrap(), ok);
        assert!(validate_post_response(json!({"errors": null})).is_ok());
    }

    #[test]
    fn test_validate_rejects_errors_payload() {
        let rejected = json!({
            "message": "The given data was invalid.",
            "errors": {"transactions.0.amount": ["The amount field is required."]}
        });
        match validate_post_response(rejected) {
            Err(Error::RemoteValidation { message, errors }) => {
                assert_eq!(message, "The given data was invalid.");
                assert!(errors.get("transactions.0.amount").is_some());
            }
            other => panic!("unexpected {:?}", other),
        }

        let bare = validate_post_response(json!({"errors": []})).unwrap_err();
        assert!(matches!(bare, Error::RemoteValidation { ref message, .. } if message == "validation failed"));
    }

    #[test]
    fn test_created_id() {
        let response = json!({"data": {"id": "55", "attributes": {"name": "Bakery", "type": "expense"}}});
        assert_eq!(created_id(&response).unwrap(), 55);
        assert!(created_id(&json!({"message": "nope"})).is_err());
    }

    #[test]
    fn test_transaction_journal_id() {
        let response = json!({"data": {"id": "7", "attributes": {"transactions": [{"transaction_journal_id": "981"}]}}});
        assert_eq!(transaction_journal_id(&response).unwrap(), 981);

        let numeric = json!({"data": {"id": 7, "attributes": {"transactions": [{"transaction_journal_id": 12}]}}});
        assert_eq!(transaction_journal_id(&numeric).unwrap(), 12);

        let empty = json!({"data": {"id": "7", "attributes": {"transactions": []}}});
        assert!(transaction_journal_id(&empty).is_err());
    }
}
