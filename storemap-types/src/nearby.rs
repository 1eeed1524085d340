//! Wire types returned by the external nearby-data service.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A store near the focused store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyStore {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    pub lat: f64,
    pub lon: f64,
}

/// Response of the nearby-stores lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearbyStores {
    #[serde(default)]
    pub stores: Vec<NearbyStore>,
    #[serde(default)]
    pub count: u64,
}

/// A point of interest near the focused store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NearbyPlace {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub top_category: String,
    pub lat: f64,
    pub lon: f64,
}

/// Response of the nearby-places lookup.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NearbyPlaces {
    #[serde(default)]
    pub places: Vec<NearbyPlace>,
    /// Number of places per top-level category name
    #[serde(default)]
    pub category_counts: BTreeMap<String, u64>,
}

impl NearbyPlaces {
    /// Count for a category, zero when the service did not report it.
    pub fn count_for(&self, category: &str) -> u64 {
        self.category_counts.get(category).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_places_defaults_from_json() {
        let places: NearbyPlaces = serde_json::from_str(r#"{"places": []}"#).unwrap();
        assert!(places.category_counts.is_empty());
        assert_eq!(places.count_for("Grocery Stores"), 0);
    }

    #[test]
    fn test_stores_from_json() {
        let json = r#"{
            "stores": [{"id": "b", "name": "Store B", "lat": 35.0, "lon": 139.0}],
            "count": 1
        }"#;
        let stores: NearbyStores = serde_json::from_str(json).unwrap();
        assert_eq!(stores.count, 1);
        assert_eq!(stores.stores[0].address, "");
    }
}
