//! Clustering, viewport reconciliation and selection for an interactive store map.
//!
//! The pipeline runs from catalog text to marker instructions:
//!
//! - [`ingest`] parses the delimited catalog into [`StoreRecord`]s
//! - [`ClusterSetManager`] keeps a hierarchical cluster index over the full
//!   catalog and another over the filtered subset
//! - [`ViewportRenderer`] picks the markers for a viewport and reconciles them
//!   with a [`MarkerSurface`]
//! - [`SelectionController`] tracks the focused store and its cancellable
//!   nearby-data lookups
//!
//! ```rust
//! use storemap::render::{InMemorySurface, Viewport};
//! use storemap::{ClusterSetManager, ViewportRenderer, parse_stores};
//! use storemap_types::bbox::BoundingBox;
//!
//! let text = "id,google_lat,google_lon,name,category,address\n\
//!             a,35.680,139.760,Ginza,conv,Tokyo\n\
//!             b,35.681,139.761,Ginza 2,conv,Tokyo\n";
//!
//! let mut clusters = ClusterSetManager::default();
//! clusters.set_base(parse_stores(text))?;
//!
//! let mut surface = InMemorySurface::new();
//! let mut renderer = ViewportRenderer::default();
//! let viewport = Viewport::new(BoundingBox::new(139.0, 35.0, 140.0, 36.0), 10.0);
//! renderer.render(&mut surface, clusters.render_source(), Some(&viewport))?;
//!
//! // Two nearby stores form a small cluster, which is opened into store markers.
//! assert_eq!(surface.live_count(), 2);
//! # Ok::<(), storemap::StoremapError>(())
//! ```

pub mod cluster_set;
pub mod compute;
pub mod config;
pub mod error;
pub mod export;
pub mod filter;
pub mod ingest;
pub mod nearby;
pub mod render;
pub mod selection;
pub mod session;

pub use cluster_set::{ClusterSetManager, RenderSource, StoreIndex};
pub use compute::cluster::{ClusterId, IndexBuilder, IndexPoint, Node, SpatialIndex};
pub use config::{ClusterOptions, Config, NearbyOptions, RenderOptions};
pub use error::{Result, StoremapError};
pub use export::{ExportRow, POI_CATEGORIES, export_poi_counts, write_export_csv};
pub use filter::{RecordPredicate, StoreFilter, facet_counts};
pub use ingest::{parse_stores, parse_stores_from_path};
pub use render::{MarkerKey, MarkerSurface, RenderOutcome, Viewport, ViewportRenderer};
pub use selection::{NearbyLookup, NearbyService, NearbyState, SelectionController};
pub use session::ExplorerSession;

#[cfg(feature = "http")]
pub use nearby::HttpNearbyClient;

pub use geo::{Point, Rect};

pub use storemap_types::bbox::BoundingBox;
pub use storemap_types::store::StoreRecord;

pub use tokio_util::sync::CancellationToken;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{ClusterSetManager, ExplorerSession, Result, StoremapError, ViewportRenderer};

    pub use crate::{BoundingBox, StoreRecord};

    pub use crate::{Config, StoreFilter};

    pub use crate::render::{InMemorySurface, MarkerSurface, RenderOutcome, Viewport};

    pub use crate::{NearbyService, SelectionController};
}
