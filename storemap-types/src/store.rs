use geo::Point;
use serde::{Deserialize, Serialize};

/// Number of five-year age bins recorded per gender.
pub const AGE_BINS: usize = 16;

/// Resident population counts around a store.
///
/// Every count defaults to zero when the source column is missing or unparsable.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Demographics {
    /// Total population (`T_TL`)
    pub total: f64,
    /// Male total (`M_TL`)
    pub male: f64,
    /// Female total (`F_TL`)
    pub female: f64,
    /// Male counts per age bin, youngest first
    pub male_by_age: [f64; AGE_BINS],
    /// Female counts per age bin, youngest first
    pub female_by_age: [f64; AGE_BINS],
}

impl Demographics {
    /// Combined male and female count for one age bin.
    pub fn age_bin_total(&self, bin: usize) -> f64 {
        match (self.male_by_age.get(bin), self.female_by_age.get(bin)) {
            (Some(m), Some(f)) => m + f,
            _ => 0.0,
        }
    }

    /// Inclusive lower bound, in years, of an age bin.
    pub fn age_bin_start(bin: usize) -> u32 {
        (bin as u32) * 5
    }
}

/// A single store in the catalog.
///
/// `lat` and `lon` are always finite for records produced by the ingestion
/// parser; rows without usable coordinates never become records.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StoreRecord {
    pub id: String,
    pub lat: f64,
    pub lon: f64,
    pub name: String,
    pub category: String,
    pub address: String,
    pub phone: String,
    pub rating: f64,
    pub location_type: String,
    pub parking: String,
    pub store_size: String,
    pub expenditure_band: String,
    pub demographics: Demographics,
}

impl StoreRecord {
    /// Create a record with identity and position only; every other field is empty.
    ///
    /// # Examples
    ///
    /// ```
    /// use storemap_types::store::StoreRecord;
    ///
    /// let store = StoreRecord::new("s-42", 34.70, 135.50);
    /// assert_eq!(store.id, "s-42");
    /// assert!(store.name.is_empty());
    /// ```
    pub fn new(id: impl Into<String>, lat: f64, lon: f64) -> Self {
        Self {
            id: id.into(),
            lat,
            lon,
            ..Default::default()
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_category(mut self, category: impl Into<String>) -> Self {
        self.category = category.into();
        self
    }

    /// Position as a `geo::Point` (x = longitude, y = latitude).
    pub fn point(&self) -> Point<f64> {
        Point::new(self.lon, self.lat)
    }

    /// True when both coordinates are finite.
    pub fn has_position(&self) -> bool {
        self.lat.is_finite() && self.lon.is_finite()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_point_axis_order() {
        let store = StoreRecord::new("a", 35.0, 139.0);
        let p = store.point();
        assert_eq!(p.x(), 139.0);
        assert_eq!(p.y(), 35.0);
    }

    #[test]
    fn test_age_bin_total() {
        let mut demo = Demographics::default();
        demo.male_by_age[3] = 10.0;
        demo.female_by_age[3] = 12.0;
        assert_eq!(demo.age_bin_total(3), 22.0);
        assert_eq!(demo.age_bin_total(AGE_BINS), 0.0);
        assert_eq!(Demographics::age_bin_start(15), 75);
    }

    #[test]
    fn test_has_position() {
        assert!(StoreRecord::new("a", 1.0, 2.0).has_position());
        assert!(!StoreRecord::new("a", f64::NAN, 2.0).has_position());
    }
}
