use serde::{Deserialize, Serialize};

use super::{Asset, Budget, OtherAccount};
use crate::geo::Coordinates;

/// A remembered spot where a counterparty was booked.
/// Owned by its Other account: evicting the account drops its hints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct LocationHint {
    pub other_id: i64,
    pub latitude: f64,
    pub longitude: f64,
}

impl LocationHint {
    pub fn new(other_id: i64, at: Coordinates) -> Self {
        Self {
            other_id,
            latitude: at.latitude,
            longitude: at.longitude,
        }
    }

    pub fn coordinates(&self) -> Coordinates {
        Coordinates::new(self.latitude, self.longitude)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct NearbyAccount {
    pub account: OtherAccount,
    pub distance_meters: f64,
}

/// Pre-filled booking for the closest known counterparty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Suggestion {
    pub other: OtherAccount,
    pub preferred_asset: Option<Asset>,
    pub preferred_budget: Option<Budget>,
    pub distance_meters: f64,
}
