//! Spherical Web Mercator normalised to the unit square.
//!
//! x grows eastward from 0 at -180 degrees to 1 at +180 degrees; y grows
//! southward from 0 at the northern Mercator limit to 1 at the southern one.

use std::f64::consts::PI;

pub fn lng_x(lng: f64) -> f64 {
    lng / 360.0 + 0.5
}

pub fn lat_y(lat: f64) -> f64 {
    let sin = (lat * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    y.clamp(0.0, 1.0)
}

pub fn x_lng(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

pub fn y_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}

/// Merge radius in unit-square distance at a zoom level.
pub fn radius_at_zoom(radius_px: f64, extent: f64, zoom: u8) -> f64 {
    radius_px / (extent * 2f64.powi(i32::from(zoom)))
}
