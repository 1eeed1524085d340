//! GeoJSON output of a marker set.

use super::marker::{MarkerKind, MarkerSpec};
use geojson::{Feature, FeatureCollection, Geometry, JsonObject, Value, feature::Id};
use serde_json::json;

/// Convert one marker into a point feature.
///
/// Clusters carry `point_count` and `expansion_zoom`; stores carry their id,
/// name and category.
pub fn to_feature(marker: &MarkerSpec) -> Feature {
    let mut properties = JsonObject::new();
    match &marker.kind {
        MarkerKind::Cluster {
            point_count,
            expansion_zoom,
            ..
        } => {
            properties.insert("kind".into(), json!("cluster"));
            properties.insert("point_count".into(), json!(point_count));
            properties.insert("expansion_zoom".into(), json!(expansion_zoom));
        }
        MarkerKind::Store(record) | MarkerKind::Focused(record) => {
            let kind = if matches!(marker.kind, MarkerKind::Focused(_)) {
                "focused"
            } else {
                "store"
            };
            properties.insert("kind".into(), json!(kind));
            properties.insert("store_id".into(), json!(record.id));
            properties.insert("name".into(), json!(record.name));
            properties.insert("category".into(), json!(record.category));
        }
    }

    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![marker.lon, marker.lat]))),
        id: Some(Id::String(marker.key.to_string())),
        properties: Some(properties),
        foreign_members: None,
    }
}

pub fn to_feature_collection<'a, I>(markers: I) -> FeatureCollection
where
    I: IntoIterator<Item = &'a MarkerSpec>,
{
    FeatureCollection {
        bbox: None,
        features: markers.into_iter().map(to_feature).collect(),
        foreign_members: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::marker::MarkerKey;
    use std::sync::Arc;
    use storemap_types::store::StoreRecord;

    #[test]
    fn test_store_feature() {
        let record = Arc::new(StoreRecord::new("s1", 35.5, 139.5).with_name("Alpha"));
        let marker = MarkerSpec {
            key: MarkerKey::Store("s1".into()),
            lat: 35.5,
            lon: 139.5,
            kind: MarkerKind::Store(record),
        };

        let feature = to_feature(&marker);
        assert_eq!(feature.id, Some(Id::String("store:s1".into())));
        assert_eq!(feature.property("name"), Some(&json!("Alpha")));
        match feature.geometry.unwrap().value {
            Value::Point(coords) => assert_eq!(coords, vec![139.5, 35.5]),
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn test_collection_serializes() {
        let collection = to_feature_collection(std::iter::empty());
        let text = serde_json::to_string(&collection).unwrap();
        assert!(text.contains("FeatureCollection"));
    }
}
