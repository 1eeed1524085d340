//! Delimited store catalog ingestion.
//!
//! The first non-empty line is the header; every other non-empty line is one
//! store. Fields are looked up by header name, so column order does not matter.
//! Rows without two finite coordinates are dropped silently, and every other
//! numeric field falls back to zero.
//!
//! Each physical line is one record: quoted fields spanning several lines are
//! not supported and split into broken rows.
//!
//! ```rust
//! use storemap::ingest::parse_stores;
//!
//! let text = "id,name,google_lat,google_lon,category,address\n\
//!             a,\"Shop, Ginza\",35.67,139.76,conv,Tokyo\n\
//!             b,Broken,,139.70,conv,Tokyo\n";
//! let stores = parse_stores(text);
//! assert_eq!(stores.len(), 1);
//! assert_eq!(stores[0].name, "Shop, Ginza");
//! ```

mod columns;
mod tokenizer;

pub use columns::{ColumnMap, FEMALE_AGE_COLUMNS, MALE_AGE_COLUMNS, RecordLayout};
pub use tokenizer::{quote_field, split_fields};

use crate::error::Result;
use std::path::Path;
use storemap_types::store::{AGE_BINS, Demographics, StoreRecord};

/// Parse catalog text into store records. Never fails; invalid rows are skipped.
pub fn parse_stores(text: &str) -> Vec<StoreRecord> {
    let mut lines = text
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line))
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty());

    let Some((_, header_line)) = lines.next() else {
        return Vec::new();
    };

    let columns = ColumnMap::from_header(&split_fields(header_line));
    let layout = RecordLayout::resolve(&columns);

    let missing = layout.missing_required();
    if !missing.is_empty() {
        log::warn!("Catalog header is missing columns: {}", missing.join(", "));
    }

    let mut stores = Vec::new();
    let mut dropped = 0usize;

    for (line_no, line) in lines {
        let fields = split_fields(line);
        match decode_row(&layout, &fields) {
            Some(store) => stores.push(store),
            None => {
                dropped += 1;
                log::trace!("Dropping line {}: no usable coordinates", line_no + 1);
            }
        }
    }

    log::debug!(
        "Parsed {} stores ({} rows dropped, {} columns)",
        stores.len(),
        dropped,
        columns.len()
    );

    stores
}

/// Read and parse a catalog file.
pub fn parse_stores_from_path(path: impl AsRef<Path>) -> Result<Vec<StoreRecord>> {
    let text = std::fs::read_to_string(path)?;
    Ok(parse_stores(&text))
}

/// Decode one row, or `None` when either coordinate is not a finite number.
pub fn decode_row(layout: &RecordLayout, fields: &[String]) -> Option<StoreRecord> {
    let lat = coordinate(fields, layout.lat);
    let lon = coordinate(fields, layout.lon);
    if !lat.is_finite() || !lon.is_finite() {
        return None;
    }

    let demographics = Demographics {
        total: number(fields, layout.total),
        male: number(fields, layout.male),
        female: number(fields, layout.female),
        male_by_age: bins(fields, &layout.male_by_age),
        female_by_age: bins(fields, &layout.female_by_age),
    };

    Some(StoreRecord {
        id: text(fields, layout.id),
        lat,
        lon,
        name: text(fields, layout.name),
        category: text(fields, layout.category),
        address: text(fields, layout.address),
        phone: text(fields, layout.phone),
        rating: number(fields, layout.rating),
        location_type: text(fields, layout.location_type),
        parking: text(fields, layout.parking),
        store_size: text(fields, layout.store_size),
        expenditure_band: text(fields, layout.expenditure_band),
        demographics,
    })
}

fn field(fields: &[String], position: Option<usize>) -> Option<&str> {
    position.and_then(|idx| fields.get(idx)).map(String::as_str)
}

fn text(fields: &[String], position: Option<usize>) -> String {
    field(fields, position).unwrap_or_default().to_string()
}

fn coordinate(fields: &[String], position: Option<usize>) -> f64 {
    field(fields, position)
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .unwrap_or(f64::NAN)
}

fn number(fields: &[String], position: Option<usize>) -> f64 {
    field(fields, position)
        .and_then(|raw| raw.trim().parse::<f64>().ok())
        .filter(|value| value.is_finite())
        .unwrap_or(0.0)
}

fn bins(fields: &[String], positions: &[Option<usize>; AGE_BINS]) -> [f64; AGE_BINS] {
    std::array::from_fn(|bin| number(fields, positions[bin]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const HEADER: &str = "id,name,category,address,google_lat,google_lon,phone,rating,T_TL";

    #[test]
    fn test_parse_basic_rows() {
        let text = format!(
            "{}\ns1,Alpha,conv,Tokyo,35.1,139.1,03-0000,4.5,1200\ns2,Beta,conv,Osaka,34.7,135.5,,,\n",
            HEADER
        );
        let stores = parse_stores(&text);
        assert_eq!(stores.len(), 2);
        assert_eq!(stores[0].id, "s1");
        assert_eq!(stores[0].rating, 4.5);
        assert_eq!(stores[0].demographics.total, 1200.0);
        assert_eq!(stores[1].rating, 0.0);
        assert_eq!(stores[1].phone, "");
    }

    #[test]
    fn test_drops_rows_without_coordinates() {
        let text = format!(
            "{}\nbad1,X,c,a,,139.0\nbad2,X,c,a,abc,139.0\nbad3,X,c,a,35.0,inf\nok,X,c,a,35.0,139.0\n",
            HEADER
        );
        let stores = parse_stores(&text);
        assert_eq!(stores.len(), 1);
        assert_eq!(stores[0].id, "ok");
        assert!(stores.iter().all(|s| s.lat.is_finite() && s.lon.is_finite()));
    }

    #[test]
    fn test_short_row_is_dropped_when_coordinates_missing() {
        let text = format!("{}\ns1,Alpha\n", HEADER);
        assert!(parse_stores(&text).is_empty());
    }

    #[test]
    fn test_column_order_is_irrelevant() {
        let text = "google_lon,google_lat,id\n139.5,35.5,x\n";
        let stores = parse_stores(text);
        assert_eq!(stores.len(), 1);
        assert_eq!(stores[0].lat, 35.5);
        assert_eq!(stores[0].lon, 139.5);
    }

    #[test]
    fn test_skips_leading_blank_lines_and_crlf() {
        let text = "\r\n\nid,google_lat,google_lon\r\n\r\na,1.5,2.5\r\n";
        let stores = parse_stores(text);
        assert_eq!(stores.len(), 1);
        assert_eq!(stores[0].id, "a");
        assert_eq!(stores[0].lon, 2.5);
    }

    #[test]
    fn test_quoted_field_with_escape() {
        let text = "id,name,google_lat,google_lon\n1,\"a,\"\"b\"\"\",1,2\n";
        let stores = parse_stores(text);
        assert_eq!(stores[0].name, "a,\"b\"");
    }

    #[test]
    fn test_demographic_bins() {
        let text = "id,google_lat,google_lon,M_00_04,F_75_OV,M_TL\n1,1,2,17,oops,40\n";
        let store = &parse_stores(text)[0];
        assert_eq!(store.demographics.male_by_age[0], 17.0);
        assert_eq!(store.demographics.female_by_age[15], 0.0);
        assert_eq!(store.demographics.male, 40.0);
        assert_eq!(store.demographics.female, 0.0);
    }

    #[test]
    fn test_expenditure_alias() {
        let text = "id,google_lat,google_lon,expenditure\n1,1,2,high\n";
        assert_eq!(parse_stores(text)[0].expenditure_band, "high");
    }

    #[test]
    fn test_empty_input() {
        assert!(parse_stores("").is_empty());
        assert!(parse_stores("\n\n").is_empty());
        assert!(parse_stores("id,google_lat,google_lon\n").is_empty());
    }

    #[test]
    fn test_embedded_newline_breaks_row() {
        // A quoted line break splits the physical line; neither half has both coordinates.
        let text = "id,name,google_lat,google_lon\n1,\"two\nlines\",35,139\n";
        let stores = parse_stores(text);
        assert!(stores.is_empty());
    }
}
