//! Validation for coordinates and viewports.

use crate::error::{Result, StoremapError};
use storemap_types::bbox::BoundingBox;

/// Validates that a coordinate pair is usable for indexing.
///
/// Only finiteness is required; out-of-range latitudes are clamped by the
/// projection rather than rejected.
///
/// # Examples
///
/// ```
/// use storemap::compute::validation::validate_coordinates;
///
/// assert!(validate_coordinates(35.68, 139.77).is_ok());
/// assert!(validate_coordinates(f64::NAN, 139.77).is_err());
/// ```
pub fn validate_coordinates(lat: f64, lon: f64) -> Result<()> {
    if !lat.is_finite() {
        return Err(StoremapError::InvalidInput(format!(
            "Latitude must be finite, got: {}",
            lat
        )));
    }

    if !lon.is_finite() {
        return Err(StoremapError::InvalidInput(format!(
            "Longitude must be finite, got: {}",
            lon
        )));
    }

    Ok(())
}

/// Validates a viewport query.
pub fn validate_viewport(bbox: &BoundingBox, zoom: f64) -> Result<()> {
    if !bbox.is_finite() {
        return Err(StoremapError::InvalidInput(format!(
            "Bounding box must be finite, got: {:?}",
            bbox
        )));
    }

    if bbox.south > bbox.north {
        return Err(StoremapError::InvalidInput(format!(
            "Bounding box south ({}) is above north ({})",
            bbox.south, bbox.north
        )));
    }

    if !zoom.is_finite() {
        return Err(StoremapError::InvalidInput(format!(
            "Zoom must be finite, got: {}",
            zoom
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_viewport() {
        let bbox = BoundingBox::new(139.0, 35.0, 140.0, 36.0);
        assert!(validate_viewport(&bbox, 10.5).is_ok());
    }

    #[test]
    fn test_antimeridian_viewport_is_valid() {
        let bbox = BoundingBox::new(170.0, -10.0, -170.0, 10.0);
        assert!(validate_viewport(&bbox, 3.0).is_ok());
    }

    #[test]
    fn test_invalid_viewports() {
        let bbox = BoundingBox::new(139.0, 36.0, 140.0, 35.0);
        assert!(validate_viewport(&bbox, 10.0).is_err());

        let bbox = BoundingBox::new(f64::NAN, 35.0, 140.0, 36.0);
        assert!(validate_viewport(&bbox, 10.0).is_err());

        let bbox = BoundingBox::new(139.0, 35.0, 140.0, 36.0);
        assert!(validate_viewport(&bbox, f64::INFINITY).is_err());
    }

    #[test]
    fn test_coordinates() {
        assert!(validate_coordinates(95.0, 0.0).is_ok());
        assert!(validate_coordinates(0.0, f64::NEG_INFINITY).is_err());
    }
}
