use super::{NEARBY_PLACES_PATH, NEARBY_STORES_PATH, endpoint_url};
use crate::config::NearbyOptions;
use crate::error::{Result, StoremapError};
use crate::selection::NearbyService;
use serde::de::DeserializeOwned;
use storemap_types::nearby::{NearbyPlaces, NearbyStores};

/// [`NearbyService`] backed by the REST API.
#[derive(Debug, Clone)]
pub struct HttpNearbyClient {
    client: reqwest::Client,
    base_url: String,
}

impl HttpNearbyClient {
    pub fn new(options: &NearbyOptions) -> Result<Self> {
        options.validate().map_err(StoremapError::InvalidConfig)?;
        let client = reqwest::Client::builder()
            .timeout(options.request_timeout())
            .build()?;
        Ok(Self {
            client,
            base_url: options.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String, radius_m: u32) -> Result<T> {
        log::trace!("GET {} radius={}", url, radius_m);
        let response = self
            .client
            .get(&url)
            .query(&[("radius", radius_m)])
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<T>().await?)
    }
}

impl NearbyService for HttpNearbyClient {
    async fn nearby_stores(&self, store_id: &str, radius_m: u32) -> Result<NearbyStores> {
        let url = endpoint_url(&self.base_url, store_id, NEARBY_STORES_PATH);
        self.get_json(url, radius_m).await
    }

    async fn nearby_places(&self, store_id: &str, radius_m: u32) -> Result<NearbyPlaces> {
        let url = endpoint_url(&self.base_url, store_id, NEARBY_PLACES_PATH);
        self.get_json(url, radius_m).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_invalid_options() {
        let options = NearbyOptions::default().with_base_url("  ");
        assert!(matches!(
            HttpNearbyClient::new(&options),
            Err(StoremapError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_keeps_base_url() {
        let options = NearbyOptions::default().with_base_url("http://example.test/api");
        let client = HttpNearbyClient::new(&options).unwrap();
        assert_eq!(client.base_url(), "http://example.test/api");
    }
}
