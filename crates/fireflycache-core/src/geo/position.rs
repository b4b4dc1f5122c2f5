use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Coordinates;
use crate::error::{Error, Result};

/// Sample timeout before giving up on a fix
const POSITION_TIMEOUT: Duration = Duration::from_secs(15);

/// Age of a cached platform fix that is still acceptable
const POSITION_MAXIMUM_AGE: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    Granted,
    Denied,
    /// Denied and the platform will not ask again
    NeverAskAgain,
}

/// Text shown by the platform permission dialog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionRationale {
    pub title: String,
    pub message: String,
}

impl Default for PermissionRationale {
    fn default() -> Self {
        Self {
            title: "This app needs access to your location".to_string(),
            message: "Shops near you can only be found by accessing your location.".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    pub high_accuracy: bool,
    pub timeout: Duration,
    pub maximum_age: Duration,
}

impl Default for PositionOptions {
    fn default() -> Self {
        Self {
            high_accuracy: true,
            timeout: POSITION_TIMEOUT,
            maximum_age: POSITION_MAXIMUM_AGE,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub coords: Coordinates,
    pub accuracy_meters: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PositionError {
    #[error("position unavailable: {0}")]
    Unavailable(String),
    #[error("timed out")]
    Timeout,
}

/// Platform positioning capability (permission dialogs, GPS).
/// Implemented by the host application.
#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn check_permission(&self) -> Permission;

    async fn request_permission(&self, rationale: &PermissionRationale) -> Permission;

    async fn current_position(
        &self,
        options: &PositionOptions,
    ) -> std::result::Result<Position, PositionError>;
}

/// Get the device position once, asking for permission if needed.
///
/// Fails with `Error::LocationUnavailable` when permission is denied (no
/// position is sampled then), when the sample errors, or when it takes
/// longer than the timeout. There is no retry.
pub async fn current_location<P>(provider: &P) -> Result<Position>
where
    P: LocationProvider + ?Sized,
{
    let mut permission = provider.check_permission().await;
    if permission != Permission::Granted {
        permission = provider
            .request_permission(&PermissionRationale::default())
            .await;
    }
    if permission != Permission::Granted {
        debug!(?permission, "Location permission not granted");
        return Err(Error::location_unavailable("permission denied"));
    }

    let options = PositionOptions::default();
    match tokio::time::timeout(options.timeout, provider.current_position(&options)).await {
        Ok(Ok(position)) => Ok(position),
        Ok(Err(e)) => Err(Error::location_unavailable(e.to_string())),
        Err(_) => Err(Error::location_unavailable(PositionError::Timeout.to_string())),
    }
}
