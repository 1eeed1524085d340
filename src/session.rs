//! One map session: catalog, indices, renderer, viewport and focus.
//!
//! Event handlers get everything through the session rather than through
//! shared "latest value" cells, so the viewport, filter and focus they observe
//! are always the ones the session currently holds.
//!
//! ```rust
//! use storemap::render::{InMemorySurface, RenderOutcome, Viewport};
//! use storemap::{Config, ExplorerSession};
//! use storemap_types::bbox::BoundingBox;
//!
//! let mut session = ExplorerSession::new(Config::default(), InMemorySurface::new())?;
//! let text = "id,google_lat,google_lon,name,category,address\n\
//!             a,35.68,139.76,Ginza,conv,Tokyo\n";
//!
//! // Nothing can render before the map reports a viewport.
//! assert_eq!(session.load_text(text)?, RenderOutcome::NotReady);
//!
//! let viewport = Viewport::new(BoundingBox::new(139.0, 35.0, 140.0, 36.0), 12.0);
//! session.viewport_changed(viewport)?;
//! assert_eq!(session.surface().live_count(), 1);
//! # Ok::<(), storemap::StoremapError>(())
//! ```

use crate::cluster_set::ClusterSetManager;
use crate::config::Config;
use crate::error::{Result, StoremapError};
use crate::filter::RecordPredicate;
use crate::ingest::parse_stores;
use crate::render::{
    MarkerAction, MarkerKey, MarkerSurface, RenderOutcome, Viewport, ViewportRenderer,
};
use crate::selection::{LookupOutcome, NearbyLookup, NearbyState, SelectionController};
use std::sync::Arc;
use storemap_types::store::StoreRecord;

/// Result of a focus change.
#[derive(Debug)]
pub struct FocusChange {
    pub render: RenderOutcome,
    /// Lookups to run for the new focus; `None` when focus was cleared.
    pub lookup: Option<NearbyLookup>,
}

/// Result of a marker click.
#[derive(Debug)]
pub enum ClickOutcome {
    /// The caller should move the camera; the next viewport change re-renders.
    FlyTo { lat: f64, lon: f64, zoom: u8 },
    Focused(FocusChange),
}

pub struct ExplorerSession<S: MarkerSurface> {
    config: Config,
    surface: S,
    clusters: ClusterSetManager,
    renderer: ViewportRenderer,
    selection: SelectionController,
    viewport: Option<Viewport>,
}

impl<S: MarkerSurface> ExplorerSession<S> {
    pub fn new(config: Config, surface: S) -> Result<Self> {
        config.validate().map_err(StoremapError::InvalidConfig)?;
        Ok(Self {
            clusters: ClusterSetManager::new(config.cluster.clone()),
            renderer: ViewportRenderer::new(config.render.clone()),
            selection: SelectionController::new(&config.nearby),
            viewport: None,
            surface,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    pub fn clusters(&self) -> &ClusterSetManager {
        &self.clusters
    }

    pub fn renderer(&self) -> &ViewportRenderer {
        &self.renderer
    }

    pub fn selection(&self) -> &SelectionController {
        &self.selection
    }

    pub fn nearby(&self) -> &NearbyState {
        self.selection.state()
    }

    pub fn viewport(&self) -> Option<&Viewport> {
        self.viewport.as_ref()
    }

    /// Parse catalog text, rebuild the indices and re-render.
    pub fn load_text(&mut self, text: &str) -> Result<RenderOutcome> {
        self.load_records(parse_stores(text))
    }

    pub fn load_records(&mut self, records: Vec<StoreRecord>) -> Result<RenderOutcome> {
        self.clusters.set_base(records)?;
        self.render()
    }

    pub fn set_filter<P>(&mut self, predicate: P) -> Result<RenderOutcome>
    where
        P: RecordPredicate + 'static,
    {
        self.clusters.set_filter(predicate)?;
        self.render()
    }

    pub fn clear_filter(&mut self) -> Result<RenderOutcome> {
        self.clusters.clear_filter();
        self.render()
    }

    /// Record the new viewport and re-render against it.
    pub fn viewport_changed(&mut self, viewport: Viewport) -> Result<RenderOutcome> {
        self.viewport = Some(viewport);
        self.render()
    }

    /// Re-run the clustered pass for the current state.
    pub fn render(&mut self) -> Result<RenderOutcome> {
        self.renderer.render(
            &mut self.surface,
            self.clusters.render_source(),
            self.viewport.as_ref(),
        )
    }

    /// Focus a store, or clear focus with `None`.
    pub fn set_focus(&mut self, record: Option<Arc<StoreRecord>>) -> Result<FocusChange> {
        let render = match &record {
            Some(record) => {
                RenderOutcome::Rendered(self.renderer.focus(&mut self.surface, Arc::clone(record)))
            }
            None => self.renderer.defocus(
                &mut self.surface,
                self.clusters.render_source(),
                self.viewport.as_ref(),
            )?,
        };
        let lookup = self.selection.set_focus(record);
        Ok(FocusChange { render, lookup })
    }

    /// Focus the catalog store with the given id.
    pub fn focus_id(&mut self, id: &str) -> Result<FocusChange> {
        let record = self
            .clusters
            .record(id)
            .cloned()
            .ok_or_else(|| StoremapError::InvalidInput(format!("Unknown store id: {}", id)))?;
        self.set_focus(Some(record))
    }

    /// Apply finished nearby lookups. Returns whether nearby state changed.
    pub fn apply_lookup(&mut self, outcome: LookupOutcome) -> bool {
        self.selection.apply(outcome)
    }

    /// Handle a click on a rendered marker.
    ///
    /// Returns `None` for unknown keys and for the marker of the store that is
    /// already focused.
    pub fn click(&mut self, key: &MarkerKey) -> Result<Option<ClickOutcome>> {
        match self.renderer.on_marker_click(key) {
            None => Ok(None),
            Some(MarkerAction::FlyTo { lat, lon, zoom }) => {
                Ok(Some(ClickOutcome::FlyTo { lat, lon, zoom }))
            }
            Some(MarkerAction::Focus(record)) => {
                if self.selection.focus().is_some_and(|f| f.id == record.id) {
                    return Ok(None);
                }
                Ok(Some(ClickOutcome::Focused(self.set_focus(Some(record))?)))
            }
        }
    }

    /// Destroy every marker and drop focus, e.g. when the map goes away.
    pub fn teardown(&mut self) {
        self.selection.set_focus(None);
        self.renderer.clear(&mut self.surface);
    }
}
