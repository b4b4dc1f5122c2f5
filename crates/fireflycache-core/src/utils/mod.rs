//! Utility functions for formatting API values and taking locks.

pub mod format;
pub mod locks;

pub use format::{format_amount, format_api_date, pack_query};
