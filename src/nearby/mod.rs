//! Clients for the external nearby-data service.
//!
//! The service exposes two endpoints per store:
//!
//! - `GET {base}/stores/{id}/nearby-stores?radius={m}`
//! - `GET {base}/stores/{id}/nearby-places?radius={m}`

#[cfg(feature = "http")]
mod http;

#[cfg(feature = "http")]
pub use http::HttpNearbyClient;

pub const NEARBY_STORES_PATH: &str = "nearby-stores";
pub const NEARBY_PLACES_PATH: &str = "nearby-places";

/// URL of one nearby endpoint for a store, without the query string.
pub fn endpoint_url(base_url: &str, store_id: &str, path: &str) -> String {
    format!(
        "{}/stores/{}/{}",
        base_url.trim_end_matches('/'),
        urlencoding::encode(store_id),
        path
    )
}
