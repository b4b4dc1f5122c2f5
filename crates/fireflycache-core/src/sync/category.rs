use std::fmt;

use tracing::warn;

use crate::error::Result;
use crate::models::{Asset, OtherAccount, ASSET};

/// Independently refreshed slice of the cache.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Category {
    Assets,
    /// Other accounts of one account type (expense, revenue, ...)
    Others(String),
    Budgets,
}

impl Category {
    /// Category holding accounts of `account_type`.
    pub fn for_account_type(account_type: &str) -> Self {
        if account_type == ASSET {
            Self::Assets
        } else {
            Self::Others(account_type.to_string())
        }
    }

    /// Value of the `type` filter sent to `GET /accounts`, if any.
    pub fn account_type(&self) -> Option<&str> {
        match self {
            Self::Assets => Some(ASSET),
            Self::Others(account_type) => Some(account_type),
            Self::Budgets => None,
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Assets => f.write_str("accounts/asset"),
            Self::Others(account_type) => write!(f, "accounts/{}", account_type),
            Self::Budgets => f.write_str("budgets"),
        }
    }
}

/// Cached rows for one account type. Asset and other accounts live in
/// separate tables.
#[derive(Debug, Clone, PartialEq)]
pub enum AccountList {
    Assets(Vec<Asset>),
    Others(Vec<OtherAccount>),
}

impl AccountList {
    pub fn len(&self) -> usize {
        match self {
            Self::Assets(rows) => rows.len(),
            Self::Others(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Outcome of one category sync. Page failures are counted, not raised.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncReport {
    pub category: Category,
    pub total_pages: u32,
    pub pages_committed: u32,
    pub pages_failed: u32,
    pub records_written: usize,
}

impl SyncReport {
    pub fn new(category: Category) -> Self {
        Self {
            category,
            total_pages: 0,
            pages_committed: 0,
            pages_failed: 0,
            records_written: 0,
        }
    }

    /// Tally one page. Failures are logged and dropped.
    pub(crate) fn record(&mut self, page: u32, outcome: Result<usize>) {
        match outcome {
            Ok(written) => {
                self.pages_committed += 1;
                self.records_written += written;
            }
            Err(e) => {
                warn!(category = %self.category, page = page, error = %e, "Dropping failed page");
                self.pages_failed += 1;
            }
        }
    }

    /// Every page was fetched and committed.
    pub fn is_complete(&self) -> bool {
        self.total_pages > 0 && self.pages_failed == 0 && self.pages_committed == self.total_pages
    }
}
