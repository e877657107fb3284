//! Shared primitive IDs and the coordinate pair.

use serde::{Deserialize, Serialize};

/// Store-assigned marker identifier.
pub type MarkerId = String;
/// Map-provider overlay identifier.
pub type OverlayId = u64;
/// Milliseconds since the Unix epoch.
pub type TimestampMs = u64;

/// Geographic coordinate pair in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lng: f64,
}

impl LatLng {
    /// Builds a coordinate pair.
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// True when both coordinates are finite and within WGS84 bounds.
    pub fn is_well_formed(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}
