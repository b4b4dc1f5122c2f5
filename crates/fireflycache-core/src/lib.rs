//! Local cache and sync layer for a Firefly III expense client.
//!
//! The store keeps accounts, budgets and learned location hints so entry
//! screens render offline. The sync engine refreshes them from the server
//! in the background and performs the multi-step transaction save.

pub mod api;
pub mod config;
pub mod error;
pub mod geo;
pub mod models;
pub mod store;
pub mod sync;
pub mod utils;

pub use api::{FireflyClient, RemoteApi, RequestError};
pub use config::Config;
pub use error::{Error, Result};
pub use geo::{current_location, distance, Coordinates, LocationProvider, Position};
pub use models::{
    Asset, Budget, LocationHint, NearbyAccount, OtherAccount, OtherHint, Settings, Suggestion,
    TransactionDraft, TransactionKind, TransactionSubmission,
};
pub use store::{ChangeSet, Store, SubscriptionId, TableKind};
pub use sync::{AccountList, AppState, Category, SyncEngine, SyncReport};
