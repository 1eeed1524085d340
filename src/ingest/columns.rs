//! Header-driven column lookup, resolved once per parse.

use once_cell::sync::Lazy;
use rustc_hash::FxHashMap;
use storemap_types::store::AGE_BINS;

pub const COL_ID: &str = "id";
pub const COL_LAT: &str = "google_lat";
pub const COL_LON: &str = "google_lon";
pub const COL_NAME: &str = "name";
pub const COL_CATEGORY: &str = "category";
pub const COL_ADDRESS: &str = "address";
pub const COL_PHONE: &str = "phone";
pub const COL_RATING: &str = "rating";
pub const COL_LOCATION_TYPE: &str = "location_type";
pub const COL_PARKING: &str = "parking";
pub const COL_STORE_SIZE: &str = "store_size";
pub const COL_EXPENDITURE_BAND: &str = "expenditure_band";
pub const COL_EXPENDITURE_FALLBACK: &str = "expenditure";
pub const COL_TOTAL_POPULATION: &str = "T_TL";
pub const COL_MALE_TOTAL: &str = "M_TL";
pub const COL_FEMALE_TOTAL: &str = "F_TL";

fn age_columns(prefix: char) -> Vec<String> {
    (0..AGE_BINS)
        .map(|bin| {
            let start = bin * 5;
            if bin + 1 == AGE_BINS {
                format!("{}_{:02}_OV", prefix, start)
            } else {
                format!("{}_{:02}_{:02}", prefix, start, start + 4)
            }
        })
        .collect()
}

/// `M_00_04` .. `M_70_74`, `M_75_OV`
pub static MALE_AGE_COLUMNS: Lazy<Vec<String>> = Lazy::new(|| age_columns('M'));

/// `F_00_04` .. `F_70_74`, `F_75_OV`
pub static FEMALE_AGE_COLUMNS: Lazy<Vec<String>> = Lazy::new(|| age_columns('F'));

/// Column name to position, built from the header line.
#[derive(Debug, Clone, Default)]
pub struct ColumnMap {
    positions: FxHashMap<String, usize>,
}

impl ColumnMap {
    /// Build from header fields. Names are trimmed; the first occurrence of a duplicate wins.
    pub fn from_header(fields: &[String]) -> Self {
        let mut positions = FxHashMap::default();
        for (idx, name) in fields.iter().enumerate() {
            positions.entry(name.trim().to_string()).or_insert(idx);
        }
        Self { positions }
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.positions.get(name).copied()
    }

    /// Position of the first name present in the header.
    pub fn position_any(&self, names: &[&str]) -> Option<usize> {
        names.iter().find_map(|name| self.position(name))
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }
}

/// Field positions for every record attribute.
///
/// Resolving names up front means each row is decoded by direct indexing
/// instead of searching the header per field.
#[derive(Debug, Clone)]
pub struct RecordLayout {
    pub id: Option<usize>,
    pub lat: Option<usize>,
    pub lon: Option<usize>,
    pub name: Option<usize>,
    pub category: Option<usize>,
    pub address: Option<usize>,
    pub phone: Option<usize>,
    pub rating: Option<usize>,
    pub location_type: Option<usize>,
    pub parking: Option<usize>,
    pub store_size: Option<usize>,
    pub expenditure_band: Option<usize>,
    pub total: Option<usize>,
    pub male: Option<usize>,
    pub female: Option<usize>,
    pub male_by_age: [Option<usize>; AGE_BINS],
    pub female_by_age: [Option<usize>; AGE_BINS],
}

impl RecordLayout {
    pub fn resolve(columns: &ColumnMap) -> Self {
        Self {
            id: columns.position(COL_ID),
            lat: columns.position(COL_LAT),
            lon: columns.position(COL_LON),
            name: columns.position(COL_NAME),
            category: columns.position(COL_CATEGORY),
            address: columns.position(COL_ADDRESS),
            phone: columns.position(COL_PHONE),
            rating: columns.position(COL_RATING),
            location_type: columns.position(COL_LOCATION_TYPE),
            parking: columns.position(COL_PARKING),
            store_size: columns.position(COL_STORE_SIZE),
            expenditure_band: columns
                .position_any(&[COL_EXPENDITURE_BAND, COL_EXPENDITURE_FALLBACK]),
            total: columns.position(COL_TOTAL_POPULATION),
            male: columns.position(COL_MALE_TOTAL),
            female: columns.position(COL_FEMALE_TOTAL),
            male_by_age: std::array::from_fn(|bin| columns.position(&MALE_AGE_COLUMNS[bin])),
            female_by_age: std::array::from_fn(|bin| columns.position(&FEMALE_AGE_COLUMNS[bin])),
        }
    }

    /// Names of the required columns missing from the header.
    pub fn missing_required(&self) -> Vec<&'static str> {
        [
            (COL_ID, self.id),
            (COL_LAT, self.lat),
            (COL_LON, self.lon),
            (COL_NAME, self.name),
            (COL_CATEGORY, self.category),
            (COL_ADDRESS, self.address),
        ]
        .into_iter()
        .filter(|(_, pos)| pos.is_none())
        .map(|(name, _)| name)
        .collect()
    }
}
