//! Error types for storemap.

use crate::compute::cluster::ClusterId;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoremapError {
    /// The id does not name a cluster in the index that was asked.
    #[error("Cluster not found: {0}")]
    ClusterNotFound(ClusterId),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// The nearby-data service failed for a reason other than cancellation.
    #[error("Nearby lookup failed: {0}")]
    Lookup(String),

    /// Work was superseded by a newer focus or an explicit cancel.
    #[error("Operation cancelled")]
    Cancelled,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[cfg(feature = "toml")]
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[cfg(feature = "http")]
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl StoremapError {
    /// True for the cancellation outcome, which callers must not surface as a failure.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, StoremapError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, StoremapError>;
