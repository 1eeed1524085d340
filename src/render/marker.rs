//! Logical markers and the surface that draws them.

use crate::compute::cluster::{ClusterId, NodePath};
use std::fmt;
use std::sync::Arc;
use storemap_types::store::StoreRecord;

/// Stable identity of a marker across render passes.
///
/// Cluster markers are keyed by the generation of the index that produced
/// them plus their node path, so re-rendering the same logical state yields
/// the same keys. Store markers are keyed by store id alone and survive index
/// rebuilds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MarkerKey {
    Cluster { generation: u64, path: NodePath },
    Store(String),
}

impl fmt::Display for MarkerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarkerKey::Cluster { generation, path } => {
                write!(f, "cluster:{}", generation)?;
                for (i, slot) in path.iter().enumerate() {
                    let sep = if i == 0 { '/' } else { '.' };
                    write!(f, "{}{}", sep, slot)?;
                }
                Ok(())
            }
            MarkerKey::Store(id) => write!(f, "store:{}", id),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum MarkerKind {
    /// Aggregate marker labelled with its point count
    Cluster {
        id: ClusterId,
        point_count: usize,
        expansion_zoom: u8,
    },
    Store(Arc<StoreRecord>),
    /// The single marker shown while a store is focused
    Focused(Arc<StoreRecord>),
}

/// Everything a surface needs to draw one marker.
#[derive(Debug, Clone, PartialEq)]
pub struct MarkerSpec {
    pub key: MarkerKey,
    pub lat: f64,
    pub lon: f64,
    pub kind: MarkerKind,
}

impl MarkerSpec {
    /// Count label for aggregate markers.
    pub fn label(&self) -> Option<String> {
        match &self.kind {
            MarkerKind::Cluster { point_count, .. } => Some(point_count.to_string()),
            _ => None,
        }
    }

    pub fn record(&self) -> Option<&Arc<StoreRecord>> {
        match &self.kind {
            MarkerKind::Store(record) | MarkerKind::Focused(record) => Some(record),
            MarkerKind::Cluster { .. } => None,
        }
    }
}

/// Opaque handle to a visual resource issued by a [`MarkerSurface`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MarkerHandle(pub u64);

/// The rendering surface markers are drawn on.
///
/// Every handle returned by `create_marker` is passed back to
/// `destroy_marker` exactly once.
pub trait MarkerSurface {
    fn create_marker(&mut self, spec: &MarkerSpec) -> MarkerHandle;
    fn destroy_marker(&mut self, handle: MarkerHandle);
}

impl<S: MarkerSurface + ?Sized> MarkerSurface for &mut S {
    fn create_marker(&mut self, spec: &MarkerSpec) -> MarkerHandle {
        (**self).create_marker(spec)
    }

    fn destroy_marker(&mut self, handle: MarkerHandle) {
        (**self).destroy_marker(handle)
    }
}

/// What a click on a marker asks the map to do.
#[derive(Debug, Clone, PartialEq)]
pub enum MarkerAction {
    /// Move the camera to reveal a cluster's children
    FlyTo { lat: f64, lon: f64, zoom: u8 },
    Focus(Arc<StoreRecord>),
}
