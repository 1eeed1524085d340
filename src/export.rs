//! Per-store nearby place counts for a set of stores.
//!
//! Each unique store id is looked up once per export; up to
//! `export_concurrency` lookups are in flight at a time.

use crate::config::NearbyOptions;
use crate::error::{Result, StoremapError};
use crate::ingest::quote_field;
use crate::selection::NearbyService;
use futures::stream::{self, StreamExt};
use rustc_hash::{FxHashMap, FxHashSet};
use std::io::Write;
use std::sync::Arc;
use storemap_types::nearby::NearbyPlaces;
use storemap_types::store::StoreRecord;
use tokio_util::sync::CancellationToken;

/// Place categories reported as export columns, in column order.
pub const POI_CATEGORIES: &[&str] = &[
    "Restaurants and Other Eating Places",
    "Drinking Places (Alcoholic Beverages)",
    "Grocery Stores",
    "Gasoline Stations",
    "Health and Personal Care Stores",
    "Clothing Stores",
    "General Merchandise Stores, including Warehouse Clubs and Supercenters",
    "Offices of Physicians",
    "Offices of Dentists",
    "Personal Care Services",
    "Child Day Care Services",
    "Elementary and Secondary Schools",
    "Colleges, Universities, and Professional Schools",
    "Religious Organizations",
    "Depository Credit Intermediation",
    "Automotive Repair and Maintenance",
    "Traveler Accommodation",
    "Fitness and Recreational Sports Centers",
    "Museums, Historical Sites, and Similar Institutions",
    "Postal Service",
];

/// One exported store.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub record: Arc<StoreRecord>,
    /// Counts aligned with [`POI_CATEGORIES`]
    pub poi_counts: Vec<u64>,
}

impl ExportRow {
    fn new(record: Arc<StoreRecord>, places: &NearbyPlaces) -> Self {
        let poi_counts = POI_CATEGORIES
            .iter()
            .map(|category| places.count_for(category))
            .collect();
        Self { record, poi_counts }
    }
}

/// Fetch place counts for every record, in record order.
///
/// Fails with the first lookup error, or with [`StoremapError::Cancelled`] as
/// soon as `token` is cancelled.
pub async fn export_poi_counts<S: NearbyService + ?Sized>(
    records: &[Arc<StoreRecord>],
    service: &S,
    options: &NearbyOptions,
    token: &CancellationToken,
) -> Result<Vec<ExportRow>> {
    options.validate().map_err(StoremapError::InvalidConfig)?;

    let mut seen = FxHashSet::default();
    let unique: Vec<&str> = records
        .iter()
        .map(|r| r.id.as_str())
        .filter(|id| seen.insert(*id))
        .collect();
    log::info!(
        "Exporting {} stores ({} unique) with concurrency {}",
        records.len(),
        unique.len(),
        options.export_concurrency
    );

    let radius_m = options.place_radius_m;
    let fetch = async {
        let mut cache: FxHashMap<&str, NearbyPlaces> = FxHashMap::default();
        let mut lookups = stream::iter(unique)
            .map(|id| async move { (id, service.nearby_places(id, radius_m).await) })
            .buffer_unordered(options.export_concurrency);
        while let Some((id, places)) = lookups.next().await {
            cache.insert(id, places?);
        }
        Ok::<_, StoremapError>(cache)
    };

    let cache = tokio::select! {
        biased;
        _ = token.cancelled() => {
            log::debug!("Export cancelled");
            return Err(StoremapError::Cancelled);
        }
        result = fetch => result?,
    };

    let empty = NearbyPlaces::default();
    Ok(records
        .iter()
        .map(|record| {
            let places = cache.get(record.id.as_str()).unwrap_or(&empty);
            ExportRow::new(Arc::clone(record), places)
        })
        .collect())
}

/// Write rows as delimited text with a header line.
pub fn write_export_csv<W: Write>(rows: &[ExportRow], mut out: W) -> Result<()> {
    let mut header: Vec<String> = ["id", "name", "category", "address", "google_lat", "google_lon"]
        .iter()
        .map(|h| h.to_string())
        .collect();
    header.extend(POI_CATEGORIES.iter().map(|c| quote_field(c)));
    writeln!(out, "{}", header.join(","))?;

    for row in rows {
        let record = &row.record;
        let mut fields = vec![
            quote_field(&record.id),
            quote_field(&record.name),
            quote_field(&record.category),
            quote_field(&record.address),
            record.lat.to_string(),
            record.lon.to_string(),
        ];
        fields.extend(row.poi_counts.iter().map(u64::to_string));
        writeln!(out, "{}", fields.join(","))?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::split_fields;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use storemap_types::nearby::NearbyStores;

    #[derive(Default)]
    struct CountingService {
        calls: AtomicUsize,
        fail_on: Option<&'static str>,
    }

    impl NearbyService for CountingService {
        async fn nearby_stores(&self, _store_id: &str, _radius_m: u32) -> Result<NearbyStores> {
            Ok(NearbyStores::default())
        }

        async fn nearby_places(&self, store_id: &str, _radius_m: u32) -> Result<NearbyPlaces> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_on == Some(store_id) {
                return Err(StoremapError::Lookup(format!("no data for {}", store_id)));
            }
            let mut places = NearbyPlaces::default();
            places
                .category_counts
                .insert(POI_CATEGORIES[0].to_string(), store_id.len() as u64);
            places.category_counts.insert("Unlisted".to_string(), 99);
            Ok(places)
        }
    }

    fn records(ids: &[&str]) -> Vec<Arc<StoreRecord>> {
        ids.iter()
            .map(|id| Arc::new(StoreRecord::new(*id, 35.0, 139.0).with_name("Shop, \"Main\"")))
            .collect()
    }

    #[tokio::test]
    async fn test_lookups_are_cached_per_id() {
        let service = CountingService::default();
        let rows = export_poi_counts(
            &records(&["a", "bb", "a", "bb", "ccc"]),
            &service,
            &NearbyOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(service.calls.load(Ordering::SeqCst), 3);
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[1].poi_counts[0], 2);
        assert_eq!(rows[4].poi_counts[0], 3);
        assert_eq!(rows[0].poi_counts.len(), POI_CATEGORIES.len());
        assert!(rows[0].poi_counts[1..].iter().all(|c| *c == 0));
    }

    #[tokio::test]
    async fn test_failure_aborts_export() {
        let service = CountingService {
            fail_on: Some("bb"),
            ..Default::default()
        };
        let err = export_poi_counts(
            &records(&["a", "bb"]),
            &service,
            &NearbyOptions::default(),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, StoremapError::Lookup(_)));
    }

    #[tokio::test]
    async fn test_cancelled_export() {
        let token = CancellationToken::new();
        token.cancel();
        let err = export_poi_counts(
            &records(&["a"]),
            &CountingService::default(),
            &NearbyOptions::default(),
            &token,
        )
        .await
        .unwrap_err();
        assert!(err.is_cancelled());
    }

    #[test]
    fn test_csv_output_reads_back() {
        let rows = vec![ExportRow {
            record: records(&["a"]).remove(0),
            poi_counts: vec![0; POI_CATEGORIES.len()],
        }];
        let mut out = Vec::new();
        write_export_csv(&rows, &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let mut lines = text.lines();

        let header = split_fields(lines.next().unwrap());
        assert_eq!(header.len(), 6 + POI_CATEGORIES.len());
        assert_eq!(header[12], POI_CATEGORIES[6]);

        let row = split_fields(lines.next().unwrap());
        assert_eq!(row[1], "Shop, \"Main\"");
        assert_eq!(row[4], "35");
    }
}
