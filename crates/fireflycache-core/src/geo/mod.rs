//! Geolocation helpers.
//!
//! `distance` is the haversine great-circle distance used to rank nearby
//! counterparties. `current_location` negotiates permission with the
//! platform's `LocationProvider` and takes a single position sample.

pub mod position;

pub use position::{
    current_location, LocationProvider, Permission, PermissionRationale, Position,
    PositionError, PositionOptions,
};

use serde::{Deserialize, Serialize};

/// Mean earth radius in meters
pub const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

fn deg2rad(deg: f64) -> f64 {
    deg * (std::f64::consts::PI / 180.0)
}

/// Great-circle distance between two points in meters.
pub fn distance(a: Coordinates, b: Coordinates) -> f64 {
    let phi1 = deg2rad(a.latitude);
    let phi2 = deg2rad(b.latitude);
    let delta_phi = deg2rad(b.latitude - a.latitude);
    let delta_lambda = deg2rad(b.longitude - a.longitude);

    let h = (delta_phi / 2.0).sin() * (delta_phi / 2.0).sin()
        + phi1.cos() * phi2.cos() * (delta_lambda / 2.0).sin() * (delta_lambda / 2.0).sin();
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_METERS * c
}
