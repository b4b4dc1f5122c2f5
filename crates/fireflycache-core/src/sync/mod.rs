//! Sync engine: keeps the local store in step with the remote API.
//!
//! Reads are stale-while-revalidate: a category query purges rows older
//! than a week, starts a background refresh and returns what the store
//! holds right now. Writes (bookings, new accounts, settings) go to the
//! remote first and are mirrored locally on success.

pub mod category;
pub mod engine;
pub mod lifecycle;

pub use category::{AccountList, Category, SyncReport};
pub use engine::SyncEngine;
pub use lifecycle::AppState;
