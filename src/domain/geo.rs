//! Great-circle distance on a spherical Earth

use crate::domain::types::LatLng;

/// Mean Earth radius used for all distances
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in kilometers between two lat/lng pairs (degrees)
///
/// `a` is clamped to [0, 1] so near-antipodal inputs cannot push `asin`
/// out of its domain through rounding.
pub fn haversine_km(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let lat1_rad = lat1.to_radians();
    let lat2_rad = lat2.to_radians();
    let delta_lat = (lat2 - lat1).to_radians();
    let delta_lon = (lon2 - lon1).to_radians();

    let a = (delta_lat / 2.0).sin().powi(2)
        + lat1_rad.cos() * lat2_rad.cos() * (delta_lon / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * a.clamp(0.0, 1.0).sqrt().asin()
}

/// Haversine distance between two positions
#[inline]
pub fn distance_km(a: LatLng, b: LatLng) -> f64 {
    haversine_km(a.lat, a.lng, b.lat, b.lng)
}
