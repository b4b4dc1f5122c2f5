//! Scripted `RemoteApi` for sync engine tests.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};

use super::types::{
    AccountAttributes, AccountQuery, AttachmentAttributes, BudgetAttributes, BudgetQuery,
    NewAccount, NewAttachment, Page, PageMeta, Pagination, Resource,
};
use super::{RemoteApi, RequestError};
use crate::error::{Error, Result};
use crate::models::Settings;

/// Listing key for budgets in the scripted page tables.
pub(crate) const BUDGETS: &str = "budgets";

pub(crate) fn account_page(total_pages: u32, rows: &[(&str, &str, &str)]) -> Page<AccountAttributes> {
    Page {
        data: rows
            .iter()
            .map(|(id, name, account_type)| Resource {
                id: id.to_string(),
                attributes: AccountAttributes {
                    name: name.to_string(),
                    account_type: account_type.to_string(),
                },
            })
            .collect(),
        meta: meta(total_pages),
    }
}

pub(crate) fn budget_page(total_pages: u32, rows: &[(&str, &str)]) -> Page<BudgetAttributes> {
    Page {
        data: rows
            .iter()
            .map(|(id, name)| Resource {
                id: id.to_string(),
                attributes: BudgetAttributes {
                    name: name.to_string(),
                },
            })
            .collect(),
        meta: meta(total_pages),
    }
}

fn meta(total_pages: u32) -> PageMeta {
    PageMeta {
        pagination: Pagination { total_pages },
    }
}

pub(crate) fn created_transaction(journal_id: &str) -> Value {
    json!({
        "data": {
            "type": "transactions",
            "id": "501",
            "attributes": {"transactions": [{"transaction_journal_id": journal_id}]}
        }
    })
}

#[derive(Default)]
pub(crate) struct MockRemote {
    account_pages: Mutex<HashMap<String, Vec<Page<AccountAttributes>>>>,
    budget_pages: Mutex<Vec<Page<BudgetAttributes>>>,
    failing: Mutex<HashSet<(String, u32)>>,
    post_responses: Mutex<HashMap<&'static str, Value>>,
    upload_status: Mutex<Option<u16>>,
    delay: Mutex<Duration>,
    calls: Mutex<Vec<String>>,
    configured: Mutex<Vec<Settings>>,
    uploads: Mutex<Vec<(i64, Vec<u8>)>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_account_pages(self, account_type: &str, pages: Vec<Page<AccountAttributes>>) -> Self {
        self.account_pages
            .lock()
            .unwrap()
            .insert(account_type.to_string(), pages);
        self
    }

    pub fn with_budget_pages(self, pages: Vec<Page<BudgetAttributes>>) -> Self {
        *self.budget_pages.lock().unwrap() = pages;
        self
    }

    /// Make `page` of the `listing` (account type or `BUDGETS`) fail with a 500.
    pub fn failing(self, listing: &str, page: u32) -> Self {
        self.failing
            .lock()
            .unwrap()
            .insert((listing.to_string(), page));
        self
    }

    /// Response for POST `endpoint` ("accounts", "attachments", "transactions").
    pub fn with_post(self, endpoint: &'static str, response: Value) -> Self {
        self.post_responses.lock().unwrap().insert(endpoint, response);
        self
    }

    pub fn with_upload_status(self, status: Option<u16>) -> Self {
        *self.upload_status.lock().unwrap() = status;
        self
    }

    pub fn with_delay(self, delay: Duration) -> Self {
        *self.delay.lock().unwrap() = delay;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    pub fn count_calls(&self, prefix: &str) -> usize {
        self.calls().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn configured(&self) -> Vec<Settings> {
        self.configured.lock().unwrap().clone()
    }

    pub fn uploads(&self) -> Vec<(i64, Vec<u8>)> {
        self.uploads.lock().unwrap().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    async fn pause(&self) {
        let delay = *self.delay.lock().unwrap();
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
    }

    fn check_failing(&self, listing: &str, page: u32) -> Result<()> {
        if self.failing.lock().unwrap().contains(&(listing.to_string(), page)) {
            return Err(RequestError {
                status: 500,
                message: "Internal Server Error".to_string(),
            }
            .into());
        }
        Ok(())
    }

    fn scripted_post(&self, endpoint: &'static str) -> Result<Value> {
        self.post_responses
            .lock()
            .unwrap()
            .get(endpoint)
            .cloned()
            .ok_or_else(|| Error::invalid_response(format!("no scripted POST /{}", endpoint)))
    }
}

fn pick<A: Clone>(pages: &[Page<A>], page: u32) -> Result<Page<A>> {
    pages
        .get(page.saturating_sub(1) as usize)
        .cloned()
        .ok_or_else(|| {
            RequestError {
                status: 404,
                message: format!("no page {}", page),
            }
            .into()
        })
}

#[async_trait]
impl RemoteApi for MockRemote {
    fn configure(&self, settings: &Settings) {
        self.configured.lock().unwrap().push(settings.clone());
    }

    async fn get_accounts(&self, query: &AccountQuery) -> Result<Page<AccountAttributes>> {
        let account_type = query.account_type.clone().unwrap_or_default();
        self.record(format!("GET accounts {} page={}", account_type, query.page));
        self.pause().await;
        self.check_failing(&account_type, query.page)?;
        let pages = self
            .account_pages
            .lock()
            .unwrap()
            .get(&account_type)
            .cloned()
            .unwrap_or_default();
        pick(&pages, query.page)
    }

    async fn post_account(&self, body: &NewAccount) -> Result<Value> {
        self.record(format!("POST accounts {} {}", body.name, body.account_type));
        self.scripted_post("accounts")
    }

    async fn get_attachments(&self, page: u32) -> Result<Page<AttachmentAttributes>> {
        self.record(format!("GET attachments page={}", page));
        Ok(Page {
            data: Vec::new(),
            meta: meta(0),
        })
    }

    async fn post_attachment(&self, body: &NewAttachment) -> Result<Value> {
        self.record(format!("POST attachments model_id={}", body.model_id));
        self.scripted_post("attachments")
    }

    async fn upload_attachment(&self, attachment_id: i64, bytes: Vec<u8>) -> Result<u16> {
        self.record(format!("UPLOAD {}", attachment_id));
        self.uploads.lock().unwrap().push((attachment_id, bytes));
        match *self.upload_status.lock().unwrap() {
            Some(status) => Ok(status),
            None => Err(Error::invalid_response("connection reset")),
        }
    }

    async fn get_budgets(&self, query: &BudgetQuery) -> Result<Page<BudgetAttributes>> {
        self.record(format!("GET budgets page={}", query.page));
        self.pause().await;
        self.check_failing(BUDGETS, query.page)?;
        let pages = self.budget_pages.lock().unwrap().clone();
        pick(&pages, query.page)
    }

    async fn post_transaction(&self, _body: &Value) -> Result<Value> {
        self.record("POST transactions".to_string());
        self.scripted_post("transactions")
    }
}
