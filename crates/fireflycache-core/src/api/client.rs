//! API client for a Firefly III instance.
//!
//! Provides `FireflyClient`, the reqwest-backed `RemoteApi`
//! implementation. Every request carries `Authorization: Bearer <token>`.

use std::sync::RwLock;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::debug;

use super::types::{
    AccountAttributes, AccountQuery, AttachmentAttributes, BudgetAttributes, BudgetQuery,
    NewAccount, NewAttachment, Page,
};
use super::{RemoteApi, RequestError};
use crate::error::{Error, Result};
use crate::models::Settings;
use crate::utils::{locks, pack_query};

/// Path prefix of the versioned REST API
const API_PREFIX: &str = "/api/v1";

/// Default HTTP request timeout in seconds.
const REQUEST_TIMEOUT_SECS: u64 = 30;

/// Firefly III client.
/// reqwest::Client is an Arc internally; credentials can be swapped in place
/// when the user saves new settings.
pub struct FireflyClient {
    client: Client,
    settings: RwLock<Settings>,
}

impl FireflyClient {
    pub fn new(settings: Settings) -> Result<Self> {
        Self::with_timeout(settings, Duration::from_secs(REQUEST_TIMEOUT_SECS))
    }

    pub fn with_timeout(settings: Settings, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            settings: RwLock::new(settings),
        })
    }

    fn current_settings(&self) -> Settings {
        locks::read(&self.settings).clone()
    }

    fn endpoint(&self, path: &str) -> String {
        let settings = self.current_settings();
        format!("{}{}{}", settings.url.trim_end_matches('/'), API_PREFIX, path)
    }

    fn auth_headers(&self, accept: &'static str) -> Result<header::HeaderMap> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, header::HeaderValue::from_static(accept));
        let token = self.current_settings().token;
        let value = header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| Error::InvalidSettings(format!("token is not a valid header value: {}", e)))?;
        headers.insert(header::AUTHORIZATION, value);
        Ok(headers)
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(RequestError::from_status(status, &body).into())
        }
    }

    pub async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        debug!(url = url, "GET");
        let response = self
            .client
            .get(url)
            .headers(self.auth_headers("application/json")?)
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        Ok(response.json().await?)
    }

    /// POST without a status check: server-side error payloads come back
    /// as the parsed body.
    pub async fn post<B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<Value> {
        debug!(url = url, "POST");
        let response = self
            .client
            .post(url)
            .headers(self.auth_headers("application/json")?)
            .json(body)
            .send()
            .await?;
        Ok(response.json().await?)
    }

    pub async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        url: &str,
        body: &B,
    ) -> Result<T> {
        debug!(url = url, "PUT");
        let response = self
            .client
            .put(url)
            .headers(self.auth_headers("application/json")?)
            .json(body)
            .send()
            .await?;
        let response = Self::check_response(response).await?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl RemoteApi for FireflyClient {
    fn configure(&self, settings: &Settings) {
        *locks::write(&self.settings) = settings.clone();
    }

    async fn get_accounts(&self, query: &AccountQuery) -> Result<Page<AccountAttributes>> {
        let url = format!("{}?{}", self.endpoint("/accounts"), pack_query(&query.params()));
        self.get(&url).await
    }

    async fn post_account(&self, body: &NewAccount) -> Result<Value> {
        self.post(&self.endpoint("/accounts"), body).await
    }

    async fn get_attachments(&self, page: u32) -> Result<Page<AttachmentAttributes>> {
        let query = pack_query(&[("page", page.to_string())]);
        let url = format!("{}?{}", self.endpoint("/attachments"), query);
        self.get(&url).await
    }

    async fn post_attachment(&self, body: &NewAttachment) -> Result<Value> {
        self.post(&self.endpoint("/attachments"), body).await
    }

    async fn upload_attachment(&self, attachment_id: i64, bytes: Vec<u8>) -> Result<u16> {
        let url = self.endpoint(&format!("/attachments/{}/upload", attachment_id));
        debug!(url = %url, bytes = bytes.len(), "Uploading attachment");
        let response = self
            .client
            .post(&url)
            .headers(self.auth_headers("*/*")?)
            .header(header::CONTENT_TYPE, "application/octet-stream")
            .body(bytes)
            .send()
            .await?;
        Ok(response.status().as_u16())
    }

    async fn get_budgets(&self, query: &BudgetQuery) -> Result<Page<BudgetAttributes>> {
        let url = format!("{}?{}", self.endpoint("/budgets"), pack_query(&query.params()));
        self.get(&url).await
    }

    async fn post_transaction(&self, body: &Value) -> Result<Value> {
        self.post(&self.endpoint("/transactions"), body).await
    }
}
