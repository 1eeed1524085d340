//! Configuration for clustering, rendering and nearby lookups.
//!
//! Every section is serializable and can be loaded from JSON (or TOML with the
//! `toml` feature). Missing fields take their defaults.
//!
//! # Example
//!
//! ```rust
//! use storemap::Config;
//!
//! let json = r#"{
//!     "cluster": { "radius": 40.0 },
//!     "render": { "expand_threshold": 5 }
//! }"#;
//! let config = Config::from_json(json).unwrap();
//! assert_eq!(config.cluster.radius, 40.0);
//! assert_eq!(config.cluster.max_zoom, 16);
//! ```
use serde::de::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Highest zoom level the cluster hierarchy may be built for.
pub const MAX_SUPPORTED_ZOOM: u8 = 30;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub cluster: ClusterOptions,

    #[serde(default)]
    pub render: RenderOptions,

    #[serde(default)]
    pub nearby: NearbyOptions,
}

/// Parameters of the hierarchical point clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterOptions {
    /// Merge radius in pixels at the reference tile extent
    #[serde(default = "ClusterOptions::default_radius")]
    pub radius: f64,

    /// Tile extent the radius is measured against
    #[serde(default = "ClusterOptions::default_extent")]
    pub extent: f64,

    #[serde(default)]
    pub min_zoom: u8,

    /// Deepest zoom at which points are still clustered; above it every point is a leaf
    #[serde(default = "ClusterOptions::default_max_zoom")]
    pub max_zoom: u8,

    /// Minimum number of points needed to form a cluster
    #[serde(default = "ClusterOptions::default_min_points")]
    pub min_points: usize,
}

impl ClusterOptions {
    const fn default_radius() -> f64 {
        60.0
    }

    const fn default_extent() -> f64 {
        512.0
    }

    const fn default_max_zoom() -> u8 {
        16
    }

    const fn default_min_points() -> usize {
        2
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err("Cluster radius must be a positive finite number".to_string());
        }
        if !self.extent.is_finite() || self.extent <= 0.0 {
            return Err("Cluster extent must be a positive finite number".to_string());
        }
        if self.min_zoom > self.max_zoom {
            return Err(format!(
                "min_zoom ({}) must not exceed max_zoom ({})",
                self.min_zoom, self.max_zoom
            ));
        }
        if self.max_zoom > MAX_SUPPORTED_ZOOM {
            return Err(format!(
                "max_zoom must be at most {}, got {}",
                MAX_SUPPORTED_ZOOM, self.max_zoom
            ));
        }
        if self.min_points < 2 {
            return Err("min_points must be at least 2".to_string());
        }
        Ok(())
    }
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            radius: Self::default_radius(),
            extent: Self::default_extent(),
            min_zoom: 0,
            max_zoom: Self::default_max_zoom(),
            min_points: Self::default_min_points(),
        }
    }
}

/// Marker selection policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RenderOptions {
    /// Clusters with at most this many points are shown as individual store markers
    #[serde(default = "RenderOptions::default_expand_threshold")]
    pub expand_threshold: usize,
}

impl RenderOptions {
    const fn default_expand_threshold() -> usize {
        8
    }

    pub fn with_expand_threshold(mut self, threshold: usize) -> Self {
        self.expand_threshold = threshold;
        self
    }
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            expand_threshold: Self::default_expand_threshold(),
        }
    }
}

/// External nearby-data service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NearbyOptions {
    #[serde(default = "NearbyOptions::default_base_url")]
    pub base_url: String,

    /// Search radius for similar stores, in meters
    #[serde(default = "NearbyOptions::default_store_radius_m")]
    pub store_radius_m: u32,

    /// Search radius for nearby places, in meters
    #[serde(default = "NearbyOptions::default_place_radius_m")]
    pub place_radius_m: u32,

    #[serde(default = "NearbyOptions::default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Maximum in-flight place lookups during an export
    #[serde(default = "NearbyOptions::default_export_concurrency")]
    pub export_concurrency: usize,
}

impl NearbyOptions {
    fn default_base_url() -> String {
        "http://127.0.0.1:8000/api".to_string()
    }

    const fn default_store_radius_m() -> u32 {
        1000
    }

    const fn default_place_radius_m() -> u32 {
        500
    }

    const fn default_request_timeout_ms() -> u64 {
        10_000
    }

    const fn default_export_concurrency() -> usize {
        4
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.base_url.trim().is_empty() {
            return Err("Nearby service base_url must not be empty".to_string());
        }
        if self.store_radius_m == 0 || self.place_radius_m == 0 {
            return Err("Nearby search radii must be greater than zero".to_string());
        }
        if self.export_concurrency == 0 {
            return Err("export_concurrency must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for NearbyOptions {
    fn default() -> Self {
        Self {
            base_url: Self::default_base_url(),
            store_radius_m: Self::default_store_radius_m(),
            place_radius_m: Self::default_place_radius_m(),
            request_timeout_ms: Self::default_request_timeout_ms(),
            export_concurrency: Self::default_export_concurrency(),
        }
    }
}

impl Config {
    pub fn with_cluster(mut self, cluster: ClusterOptions) -> Self {
        self.cluster = cluster;
        self
    }

    pub fn with_render(mut self, render: RenderOptions) -> Self {
        self.render = render;
        self
    }

    pub fn with_nearby(mut self, nearby: NearbyOptions) -> Self {
        self.nearby = nearby;
        self
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        self.cluster.validate()?;
        self.nearby.validate()?;
        Ok(())
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        let config: Config = serde_json::from_str(json)?;
        if let Err(e) = config.validate() {
            return Err(Error::custom(e));
        }
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    #[cfg(feature = "toml")]
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        let config: Config = toml::from_str(toml_str)?;
        if let Err(e) = config.validate() {
            return Err(toml::de::Error::custom(e));
        }
        Ok(config)
    }

    #[cfg(feature = "toml")]
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Load a JSON config file (or TOML by extension when the `toml` feature is on).
    pub fn from_path(path: impl AsRef<std::path::Path>) -> crate::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;

        #[cfg(feature = "toml")]
        if path.extension().is_some_and(|ext| ext == "toml") {
            return Ok(Self::from_toml(&text)?);
        }

        Ok(Self::from_json(&text)?)
    }
}
