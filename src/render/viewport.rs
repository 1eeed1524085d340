//! Viewport-driven marker selection and reconciliation.

use super::marker::{MarkerAction, MarkerHandle, MarkerKey, MarkerKind, MarkerSpec, MarkerSurface};
use crate::cluster_set::{RenderSource, StoreIndex};
use crate::compute::cluster::{ClusterId, Node};
use crate::compute::validation::validate_viewport;
use crate::config::RenderOptions;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use storemap_types::bbox::BoundingBox;
use storemap_types::store::StoreRecord;

/// The visible map region.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub bounds: BoundingBox,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(bounds: BoundingBox, zoom: f64) -> Self {
        Self { bounds, zoom }
    }
}

/// Target marker set, keyed and ordered by marker identity.
pub type MarkerSet = BTreeMap<MarkerKey, MarkerSpec>;

#[derive(Debug, Clone, PartialEq)]
pub enum RenderMode {
    Clustered,
    Focused(Arc<StoreRecord>),
}

/// Markers created and destroyed by one reconciliation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RenderDiff {
    pub created: Vec<MarkerKey>,
    pub destroyed: Vec<MarkerKey>,
    pub retained: usize,
}

impl RenderDiff {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.destroyed.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderOutcome {
    /// No usable viewport or catalog yet; try again on the next event.
    NotReady,
    /// A store is focused; clustered rendering is paused.
    Suspended,
    Rendered(RenderDiff),
}

#[derive(Debug)]
struct RenderedMarker {
    handle: MarkerHandle,
    spec: MarkerSpec,
}

/// Decides which markers the map shows and keeps the surface in sync.
///
/// In clustered mode every viewport or index change recomputes the target set
/// and diffs it against what is on screen. In focused mode exactly one marker
/// is shown and recomputation is suspended until defocus.
#[derive(Debug)]
pub struct ViewportRenderer {
    options: RenderOptions,
    mode: RenderMode,
    rendered: BTreeMap<MarkerKey, RenderedMarker>,
}

impl ViewportRenderer {
    pub fn new(options: RenderOptions) -> Self {
        Self {
            options,
            mode: RenderMode::Clustered,
            rendered: BTreeMap::new(),
        }
    }

    pub fn mode(&self) -> &RenderMode {
        &self.mode
    }

    pub fn is_focused(&self) -> bool {
        matches!(self.mode, RenderMode::Focused(_))
    }

    pub fn marker_count(&self) -> usize {
        self.rendered.len()
    }

    pub fn marker_keys(&self) -> impl Iterator<Item = &MarkerKey> {
        self.rendered.keys()
    }

    pub fn markers(&self) -> impl Iterator<Item = &MarkerSpec> {
        self.rendered.values().map(|m| &m.spec)
    }

    pub fn handle(&self, key: &MarkerKey) -> Option<MarkerHandle> {
        self.rendered.get(key).map(|m| m.handle)
    }

    /// Compute the markers a clustered view of `index` should show.
    ///
    /// Clusters above the expand threshold become one aggregate marker; smaller
    /// ones are opened with an explicit stack down to their leaves, each leaf
    /// becoming a store marker.
    pub fn compute_markers(&self, index: &StoreIndex, viewport: &Viewport) -> Result<MarkerSet> {
        let mut targets = MarkerSet::new();
        let mut pending: Vec<ClusterId> = Vec::new();

        for node in index.get_clusters(&viewport.bounds, viewport.zoom) {
            match node {
                Node::Leaf(leaf) => insert_store(&mut targets, leaf.payload),
                Node::Cluster(cluster) if cluster.point_count > self.options.expand_threshold => {
                    let spec = MarkerSpec {
                        key: MarkerKey::Cluster {
                            generation: index.generation(),
                            path: index.cluster_path(cluster.id)?,
                        },
                        lat: cluster.lat,
                        lon: cluster.lon,
                        kind: MarkerKind::Cluster {
                            id: cluster.id,
                            point_count: cluster.point_count,
                            expansion_zoom: index.get_expansion_zoom(cluster.id)?,
                        },
                    };
                    targets.insert(spec.key.clone(), spec);
                }
                Node::Cluster(cluster) => {
                    pending.push(cluster.id);
                    while let Some(id) = pending.pop() {
                        for child in index.get_children(id)? {
                            match child {
                                Node::Leaf(leaf) => insert_store(&mut targets, leaf.payload),
                                Node::Cluster(inner) => pending.push(inner.id),
                            }
                        }
                    }
                }
            }
        }

        Ok(targets)
    }

    /// Run a clustered render pass and reconcile the surface.
    pub fn render<S: MarkerSurface>(
        &mut self,
        surface: &mut S,
        source: RenderSource<'_>,
        viewport: Option<&Viewport>,
    ) -> Result<RenderOutcome> {
        if self.is_focused() {
            return Ok(RenderOutcome::Suspended);
        }

        let Some(viewport) = viewport else {
            return Ok(RenderOutcome::NotReady);
        };
        if let Err(e) = validate_viewport(&viewport.bounds, viewport.zoom) {
            log::warn!("Skipping render pass: {}", e);
            return Ok(RenderOutcome::NotReady);
        }

        let targets = match source {
            RenderSource::Unloaded => return Ok(RenderOutcome::NotReady),
            RenderSource::Empty => MarkerSet::new(),
            RenderSource::Index(index) => self.compute_markers(index, viewport)?,
        };

        Ok(RenderOutcome::Rendered(self.reconcile(surface, targets)))
    }

    /// Show only `record`, destroying every other marker and pausing clustered updates.
    pub fn focus<S: MarkerSurface>(
        &mut self,
        surface: &mut S,
        record: Arc<StoreRecord>,
    ) -> RenderDiff {
        let mut diff = RenderDiff::default();
        self.destroy_all(surface, &mut diff);

        let spec = MarkerSpec {
            key: MarkerKey::Store(record.id.clone()),
            lat: record.lat,
            lon: record.lon,
            kind: MarkerKind::Focused(Arc::clone(&record)),
        };
        let handle = surface.create_marker(&spec);
        diff.created.push(spec.key.clone());
        self.rendered.insert(spec.key.clone(), RenderedMarker { handle, spec });

        log::debug!("Focused store {}", record.id);
        self.mode = RenderMode::Focused(record);
        diff
    }

    /// Leave focused mode and immediately re-render the clustered view.
    pub fn defocus<S: MarkerSurface>(
        &mut self,
        surface: &mut S,
        source: RenderSource<'_>,
        viewport: Option<&Viewport>,
    ) -> Result<RenderOutcome> {
        if let RenderMode::Focused(record) = std::mem::replace(&mut self.mode, RenderMode::Clustered)
        {
            log::debug!("Defocused store {}", record.id);
            let mut diff = RenderDiff::default();
            self.destroy_all(surface, &mut diff);
        }
        self.render(surface, source, viewport)
    }

    /// Destroy every marker and return to clustered mode, e.g. when the map is torn down.
    pub fn clear<S: MarkerSurface>(&mut self, surface: &mut S) -> RenderDiff {
        self.mode = RenderMode::Clustered;
        let mut diff = RenderDiff::default();
        self.destroy_all(surface, &mut diff);
        diff
    }

    /// Action for a click on a rendered marker.
    pub fn on_marker_click(&self, key: &MarkerKey) -> Option<MarkerAction> {
        let spec = &self.rendered.get(key)?.spec;
        match &spec.kind {
            MarkerKind::Cluster { expansion_zoom, .. } => Some(MarkerAction::FlyTo {
                lat: spec.lat,
                lon: spec.lon,
                zoom: *expansion_zoom,
            }),
            MarkerKind::Store(record) | MarkerKind::Focused(record) => {
                Some(MarkerAction::Focus(Arc::clone(record)))
            }
        }
    }

    fn reconcile<S: MarkerSurface>(&mut self, surface: &mut S, mut targets: MarkerSet) -> RenderDiff {
        let mut diff = RenderDiff::default();

        // Markers whose key left the target set, or whose key stayed but now
        // describes a different position or record.
        let stale: Vec<MarkerKey> = self
            .rendered
            .iter()
            .filter(|(key, marker)| targets.get(*key) != Some(&marker.spec))
            .map(|(key, _)| key.clone())
            .collect();
        for key in stale {
            if let Some(marker) = self.rendered.remove(&key) {
                surface.destroy_marker(marker.handle);
                diff.destroyed.push(key);
            }
        }

        diff.retained = self.rendered.len();
        targets.retain(|key, _| !self.rendered.contains_key(key));

        for (key, spec) in targets {
            let handle = surface.create_marker(&spec);
            diff.created.push(key.clone());
            self.rendered.insert(key, RenderedMarker { handle, spec });
        }

        if !diff.is_empty() {
            log::trace!(
                "Reconciled markers: +{} -{} ={}",
                diff.created.len(),
                diff.destroyed.len(),
                diff.retained
            );
        }

        diff
    }

    fn destroy_all<S: MarkerSurface>(&mut self, surface: &mut S, diff: &mut RenderDiff) {
        for (key, marker) in std::mem::take(&mut self.rendered) {
            surface.destroy_marker(marker.handle);
            diff.destroyed.push(key);
        }
    }
}

impl Default for ViewportRenderer {
    fn default() -> Self {
        Self::new(RenderOptions::default())
    }
}

fn insert_store(targets: &mut MarkerSet, record: &Arc<StoreRecord>) {
    let key = MarkerKey::Store(record.id.clone());
    targets.entry(key.clone()).or_insert_with(|| MarkerSpec {
        key,
        lat: record.lat,
        lon: record.lon,
        kind: MarkerKind::Store(Arc::clone(record)),
    });
}
