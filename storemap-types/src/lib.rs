//! # storemap-types
//!
//! Core data types for the storemap explorer.
//!
//! - **Store types**: `StoreRecord`, `Demographics`
//! - **Viewport types**: `BoundingBox`
//! - **Nearby lookup types**: `NearbyStores`, `NearbyPlaces`
//!
//! All types are serializable with Serde and interoperate with the `geo` crate's
//! geometric primitives.
//!
//! ## Examples
//!
//! ```rust
//! use storemap_types::bbox::BoundingBox;
//! use storemap_types::store::StoreRecord;
//!
//! let store = StoreRecord::new("s-1", 35.6812, 139.7671);
//! let tokyo = BoundingBox::new(139.5, 35.5, 140.0, 35.9);
//! assert!(tokyo.contains(store.lon, store.lat));
//! ```

pub mod bbox;
pub mod nearby;
pub mod store;
