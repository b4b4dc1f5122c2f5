use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use base64::prelude::{Engine as _, BASE64_STANDARD};
use chrono::Utc;
use futures::future::{join_all, BoxFuture, Shared};
use futures::FutureExt;
use serde_json::Value;
use tracing::{debug, info, warn};

use super::{AccountList, AppState, Category, SyncReport};
use crate::api::{
    self, AccountAttributes, AccountQuery, BudgetQuery, Created, NewAccount, NewAttachment,
    RemoteApi,
};
use crate::error::{Error, Result};
use crate::geo::Coordinates;
use crate::models::{
    parse_remote_id, Asset, Budget, LocationHint, NearbyAccount, OtherAccount, OtherHint,
    Settings, Suggestion, TransactionSubmission, EXPENSE, REVENUE,
};
use crate::store::{ChangeSet, Store, SubscriptionId};
use crate::utils::locks;

type SharedSync = Shared<BoxFuture<'static, SyncReport>>;

/// A listing page reduced to what the cache keeps.
struct RemotePage {
    total_pages: u32,
    rows: Vec<RemoteRow>,
}

struct RemoteRow {
    id: String,
    name: String,
    account_type: Option<String>,
}

/// Orchestrates refresh-on-read and the multi-step writes.
/// Clone is cheap; clones share the store, the remote and in-flight syncs.
#[derive(Clone)]
pub struct SyncEngine {
    inner: Arc<Inner>,
}

struct Inner {
    store: Arc<Store>,
    remote: Arc<dyn RemoteApi>,
    in_flight: Mutex<HashMap<Category, SharedSync>>,
    app_state: Mutex<AppState>,
}

impl SyncEngine {
    /// Build an engine over an open store, pointing `remote` at the saved
    /// settings.
    pub fn new(store: Arc<Store>, remote: Arc<dyn RemoteApi>) -> Self {
        remote.configure(&store.settings());
        Self {
            inner: Arc::new(Inner {
                store,
                remote,
                in_flight: Mutex::new(HashMap::new()),
                app_state: Mutex::new(AppState::default()),
            }),
        }
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.inner.store
    }

    // ===== Settings =====

    pub fn settings(&self) -> Settings {
        self.inner.store.settings()
    }

    pub fn save_settings(&self, url: &str, token: &str) -> Result<()> {
        let settings = Settings::new(url, token);
        self.inner.store.save_settings(settings.clone())?;
        self.inner.remote.configure(&settings);
        info!(url = url, "Saved remote settings");
        Ok(())
    }

    // ===== Change notification =====

    pub fn subscribe<F>(&self, callback: F) -> SubscriptionId
    where
        F: Fn(&ChangeSet) + Send + Sync + 'static,
    {
        self.inner.store.subscribe(callback)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.inner.store.unsubscribe(id)
    }

    // ===== Category reads =====

    /// Cached asset accounts. Starts a background refresh.
    pub fn assets(&self) -> Result<Vec<Asset>> {
        self.purge_stale(&Category::Assets)?;
        self.spawn_refresh(Category::Assets);
        Ok(self.inner.store.all())
    }

    /// Cached accounts of `account_type`, read from the asset table for
    /// "asset" and from the other table for everything else. Starts a
    /// background refresh.
    pub fn accounts(&self, account_type: &str) -> Result<AccountList> {
        match Category::for_account_type(account_type) {
            Category::Others(_) => Ok(AccountList::Others(self.others(account_type)?)),
            _ => Ok(AccountList::Assets(self.assets()?)),
        }
    }

    /// Cached other accounts of `account_type`. Starts a background refresh.
    pub fn others(&self, account_type: &str) -> Result<Vec<OtherAccount>> {
        let category = Category::for_account_type(account_type);
        if category == Category::Assets {
            return Err(Error::Storage(format!(
                "{} accounts are kept in the asset table",
                account_type
            )));
        }
        self.purge_stale(&category)?;
        self.spawn_refresh(category);
        Ok(self
            .inner
            .store
            .query(|other: &OtherAccount| other.is_type(account_type)))
    }

    /// Cached budgets. Starts a background refresh.
    pub fn budgets(&self) -> Result<Vec<Budget>> {
        self.purge_stale(&Category::Budgets)?;
        self.spawn_refresh(Category::Budgets);
        Ok(self.inner.store.all())
    }

    /// Accounts remembered near `at`, closest first.
    pub fn nearby(&self, at: Coordinates) -> Vec<NearbyAccount> {
        self.inner.store.nearby(at)
    }

    /// Closest remembered counterparty of `account_type`, with its
    /// preferred asset and budget resolved.
    pub fn suggest(&self, at: Coordinates, account_type: &str) -> Option<Suggestion> {
        let closest = self
            .nearby(at)
            .into_iter()
            .find(|n| n.account.is_type(account_type))?;
        let store = &self.inner.store;
        Some(Suggestion {
            preferred_asset: closest.account.preferred_asset.and_then(|id| store.get(id)),
            preferred_budget: closest.account.preferred_budget.and_then(|id| store.get(id)),
            distance_meters: closest.distance_meters,
            other: closest.account,
        })
    }

    fn purge_stale(&self, category: &Category) -> Result<usize> {
        let now = Utc::now();
        let store = &self.inner.store;
        match category {
            Category::Assets => store.purge_stale::<Asset, _>(now, |_| true),
            Category::Budgets => store.purge_stale::<Budget, _>(now, |_| true),
            Category::Others(account_type) => {
                store.purge_stale::<OtherAccount, _>(now, |o| o.is_type(account_type))
            }
        }
    }

    // ===== Refresh =====

    /// Sync `category` from the remote. Concurrent calls for the same
    /// category share one outstanding sync.
    pub fn refresh(&self, category: Category) -> SharedSync {
        let mut in_flight = locks::lock(&self.inner.in_flight);
        if let Some(existing) = in_flight.get(&category) {
            debug!(category = %category, "Joining in-flight sync");
            return existing.clone();
        }

        let engine = self.clone();
        let key = category.clone();
        let sync = async move {
            let report = engine.run_sync(&key).await;
            locks::lock(&engine.inner.in_flight).remove(&key);
            report
        }
        .boxed()
        .shared();

        in_flight.insert(category, sync.clone());
        sync
    }

    /// Wait for every sync currently in flight.
    pub async fn settle(&self) -> Vec<SyncReport> {
        let pending: Vec<SharedSync> = locks::lock(&self.inner.in_flight)
            .values()
            .cloned()
            .collect();
        join_all(pending).await
    }

    /// End the session: let in-flight syncs commit, then close the store
    /// if this was the last handle to it.
    pub async fn shutdown(self) {
        self.settle().await;
        let store = Arc::clone(&self.inner.store);
        drop(self);
        match Arc::try_unwrap(store) {
            Ok(store) => store.close(),
            Err(_) => debug!("Store still shared, leaving it open"),
        }
    }

    /// Purge stale rows and resync every category the entry screen shows.
    pub async fn refresh_all(&self) -> Vec<SyncReport> {
        let categories = [
            Category::Assets,
            Category::Others(EXPENSE.to_string()),
            Category::Others(REVENUE.to_string()),
            Category::Budgets,
        ];
        for category in &categories {
            if let Err(e) = self.purge_stale(category) {
                warn!(category = %category, error = %e, "Failed to purge stale rows");
            }
        }
        join_all(categories.into_iter().map(|c| self.refresh(c))).await
    }

    /// Record a foreground transition; returns true if it started a resync.
    pub fn app_state_changed(&self, next: AppState) -> bool {
        let previous = std::mem::replace(&mut *locks::lock(&self.inner.app_state), next);
        if !AppState::is_resume(previous, next) {
            return false;
        }
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let engine = self.clone();
                handle.spawn(async move { engine.refresh_all().await });
                true
            }
            Err(_) => {
                warn!("No async runtime, skipping resume resync");
                false
            }
        }
    }

    fn spawn_refresh(&self, category: Category) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let sync = self.refresh(category);
                handle.spawn(sync);
            }
            Err(_) => warn!(category = %category, "No async runtime, skipping background refresh"),
        }
    }

    async fn run_sync(&self, category: &Category) -> SyncReport {
        let mut report = SyncReport::new(category.clone());

        let first = match self.fetch_page(category, 1).await {
            Ok(page) => page,
            Err(e) => {
                warn!(category = %category, error = %e, "Failed to fetch first page");
                report.pages_failed += 1;
                return report;
            }
        };
        report.total_pages = first.total_pages.max(1);
        let outcome = self.commit_page(category, first.rows);
        report.record(1, outcome);

        let rest = (2..=report.total_pages).map(|page| async move {
            let outcome = match self.fetch_page(category, page).await {
                Ok(fetched) => self.commit_page(category, fetched.rows),
                Err(e) => Err(e),
            };
            (page, outcome)
        });
        for (page, outcome) in join_all(rest).await {
            report.record(page, outcome);
        }

        info!(
            category = %category,
            pages = report.total_pages,
            committed = report.pages_committed,
            failed = report.pages_failed,
            records = report.records_written,
            "Sync finished"
        );
        report
    }

    async fn fetch_page(&self, category: &Category, page: u32) -> Result<RemotePage> {
        let remote = &self.inner.remote;
        match category {
            Category::Budgets => {
                let listing = remote.get_budgets(&BudgetQuery::page(page)).await?;
                Ok(RemotePage {
                    total_pages: listing.total_pages(),
                    rows: listing
                        .data
                        .into_iter()
                        .map(|r| RemoteRow {
                            id: r.id,
                            name: r.attributes.name,
                            account_type: None,
                        })
                        .collect(),
                })
            }
            Category::Assets | Category::Others(_) => {
                let account_type = category.account_type().unwrap_or_default();
                let listing = remote
                    .get_accounts(&AccountQuery::page(page, account_type))
                    .await?;
                Ok(RemotePage {
                    total_pages: listing.total_pages(),
                    rows: listing
                        .data
                        .into_iter()
                        .map(|r| RemoteRow {
                            id: r.id,
                            name: r.attributes.name,
                            account_type: Some(r.attributes.account_type),
                        })
                        .collect(),
                })
            }
        }
    }

    /// Upsert one page in a single write. Other accounts keep their
    /// preferences and hints.
    fn commit_page(&self, category: &Category, rows: Vec<RemoteRow>) -> Result<usize> {
        let now = Utc::now();
        let written = self.inner.store.write(|txn| {
            let count = rows.len();
            for row in rows {
                let id = parse_remote_id(&row.id)?;
                match category {
                    Category::Assets => txn.upsert(Asset::new(id, row.name, now)),
                    Category::Budgets => txn.upsert(Budget::new(id, row.name, now)),
                    Category::Others(requested) => {
                        let account_type = row.account_type.unwrap_or_else(|| requested.clone());
                        let fresh = OtherAccount::new(id, row.name, account_type, now);
                        let merged = match txn.get::<OtherAccount>(id) {
                            Some(existing) => existing.clone().refreshed_by(fresh),
                            None => fresh,
                        };
                        txn.upsert(merged);
                    }
                }
            }
            Ok(count)
        })?;
        debug!(category = %category, records = written, "Committed page");
        Ok(written)
    }

    // ===== Writes =====

    /// Book a transaction, then remember the counterparty's preferences and
    /// location, then attach the receipt.
    ///
    /// Resolves with the server's response. A failure in a later step does
    /// not undo earlier ones: the booking stays on the server and the hint
    /// stays in the store.
    pub async fn save_transaction(&self, submission: TransactionSubmission) -> Result<Value> {
        let has_receipt = submission.has_receipt();
        let TransactionSubmission {
            payload,
            receipt,
            other,
            location,
        } = submission;

        let response = self.inner.remote.post_transaction(&payload).await?;
        let response = api::validate_post_response(response)?;

        let Some(hint) = other else {
            return Ok(response);
        };
        self.remember(&hint, location)?;

        let receipt = match receipt {
            Some(receipt) if has_receipt => receipt,
            _ => return Ok(response),
        };
        let journal_id = api::transaction_journal_id(&response)?;
        self.attach_receipt(journal_id, &receipt).await?;

        Ok(response)
    }

    fn remember(&self, hint: &OtherHint, location: Option<Coordinates>) -> Result<()> {
        let now = Utc::now();
        self.inner.store.write(|txn| {
            let mut other = txn.get::<OtherAccount>(hint.id).cloned().ok_or_else(|| {
                Error::Storage(format!("other account {} is not cached", hint.id))
            })?;
            other.apply_hint(hint, now);
            txn.upsert(other);
            if let Some(at) = location {
                txn.insert_location(LocationHint::new(hint.id, at));
            }
            Ok(())
        })?;
        debug!(other = hint.id, pinned = location.is_some(), "Remembered counterparty");
        Ok(())
    }

    async fn attach_receipt(&self, journal_id: i64, receipt: &str) -> Result<()> {
        let bytes = BASE64_STANDARD.decode(receipt.trim())?;

        let attachment = self
            .inner
            .remote
            .post_attachment(&NewAttachment::receipt(journal_id))
            .await?;
        let attachment_id = api::created_id(&api::validate_post_response(attachment)?)?;

        match self
            .inner
            .remote
            .upload_attachment(attachment_id, bytes)
            .await
        {
            Ok(status) if (200..300).contains(&status) => {
                debug!(attachment = attachment_id, "Uploaded receipt");
            }
            Ok(status) => warn!(attachment = attachment_id, status = status, "Receipt upload not accepted"),
            Err(e) => warn!(attachment = attachment_id, error = %e, "Receipt upload failed"),
        }
        Ok(())
    }

    /// Create a counterparty account remotely and cache it.
    pub async fn save_other(&self, name: &str, account_type: &str) -> Result<OtherAccount> {
        let body = NewAccount {
            name: name.to_string(),
            account_type: account_type.to_string(),
        };
        let response = self.inner.remote.post_account(&body).await?;
        let response = api::validate_post_response(response)?;

        let created: Created<AccountAttributes> = serde_json::from_value(response)
            .map_err(|e| Error::invalid_response(format!("account response: {}", e)))?;
        let id = parse_remote_id(&created.data.id)?;
        let fresh = OtherAccount::new(
            id,
            created.data.attributes.name,
            created.data.attributes.account_type,
            Utc::now(),
        );

        let stored = self.inner.store.write(|txn| {
            let merged = match txn.get::<OtherAccount>(id) {
                Some(existing) => existing.clone().refreshed_by(fresh),
                None => fresh,
            };
            txn.upsert(merged.clone());
            Ok(merged)
        })?;
        info!(id = stored.id, account_type = %stored.account_type, "Created account");
        Ok(stored)
    }
}
