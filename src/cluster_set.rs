//! Full and filtered cluster indices over the store catalog.
//!
//! Both indices are rebuilt wholesale whenever their input set changes. A
//! filter that matches nothing tears the filtered index down; the active index
//! then falls back to the full one while rendering shows nothing.

use crate::compute::cluster::{IndexBuilder, IndexPoint, SpatialIndex};
use crate::config::ClusterOptions;
use crate::error::Result;
use crate::filter::RecordPredicate;
use geo::{BoundingRect, MultiPoint};
use std::sync::Arc;
use storemap_types::bbox::BoundingBox;
use storemap_types::store::StoreRecord;

/// Cluster index over shared store records.
pub type StoreIndex = SpatialIndex<Arc<StoreRecord>>;

/// What a render pass should draw from.
#[derive(Debug, Clone, Copy)]
pub enum RenderSource<'a> {
    /// No catalog has been loaded yet.
    Unloaded,
    /// A filter is active and matched no records.
    Empty,
    Index(&'a StoreIndex),
}

/// Owns the full-catalog index and the filtered index.
pub struct ClusterSetManager {
    options: ClusterOptions,
    records: Vec<Arc<StoreRecord>>,
    base: Option<StoreIndex>,
    filtered: Option<StoreIndex>,
    filter: Option<Box<dyn RecordPredicate>>,
    /// Ids matched by the current filter, in catalog order
    matched_ids: Option<Vec<String>>,
    next_generation: u64,
}

impl ClusterSetManager {
    pub fn new(options: ClusterOptions) -> Self {
        Self {
            options,
            records: Vec::new(),
            base: None,
            filtered: None,
            filter: None,
            matched_ids: None,
            next_generation: 1,
        }
    }

    pub fn options(&self) -> &ClusterOptions {
        &self.options
    }

    /// Replace the catalog and rebuild the full index, re-applying any filter.
    pub fn set_base(&mut self, records: Vec<StoreRecord>) -> Result<()> {
        let records: Vec<Arc<StoreRecord>> = records.into_iter().map(Arc::new).collect();
        let base = self.build_index(&records)?;

        log::info!(
            "Full index rebuilt: {} stores, {} clusters (generation {})",
            base.len(),
            base.cluster_count(),
            base.generation()
        );

        self.records = records;
        self.base = Some(base);
        self.apply_filter(true)?;
        Ok(())
    }

    /// Install a filter. Returns whether the filtered index was rebuilt.
    ///
    /// The filtered index is only rebuilt when the matched set differs from the
    /// previous one, so equivalent filters keep cluster identities stable.
    pub fn set_filter<P>(&mut self, predicate: P) -> Result<bool>
    where
        P: RecordPredicate + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self.apply_filter(false)
    }

    /// Remove the filter; the full index becomes active again.
    pub fn clear_filter(&mut self) {
        self.filter = None;
        self.matched_ids = None;
        self.filtered = None;
    }

    pub fn has_filter(&self) -> bool {
        self.filter.is_some()
    }

    /// Filtered index when it exists, otherwise the full index.
    pub fn active_index(&self) -> Option<&StoreIndex> {
        self.filtered.as_ref().or(self.base.as_ref())
    }

    pub fn base_index(&self) -> Option<&StoreIndex> {
        self.base.as_ref()
    }

    pub fn filtered_index(&self) -> Option<&StoreIndex> {
        self.filtered.as_ref()
    }

    pub fn render_source(&self) -> RenderSource<'_> {
        if self.filter.is_some() && self.filtered.is_none() && self.base.is_some() {
            return RenderSource::Empty;
        }
        match self.active_index() {
            Some(index) => RenderSource::Index(index),
            None => RenderSource::Unloaded,
        }
    }

    /// Number of records matched by the current filter, if one is set.
    pub fn match_count(&self) -> Option<usize> {
        self.matched_ids.as_ref().map(Vec::len)
    }

    pub fn records(&self) -> &[Arc<StoreRecord>] {
        &self.records
    }

    /// Records in the active set: filter matches, or the whole catalog.
    pub fn active_records(&self) -> Vec<Arc<StoreRecord>> {
        match &self.filter {
            Some(filter) => self
                .records
                .iter()
                .filter(|r| filter.matches(r))
                .cloned()
                .collect(),
            None => self.records.clone(),
        }
    }

    pub fn record(&self, id: &str) -> Option<&Arc<StoreRecord>> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Bounding box of the loaded catalog, `None` when it is empty.
    pub fn bounds(&self) -> Option<BoundingBox> {
        catalog_bounds(self.records.iter().map(|r| r.as_ref()))
    }

    fn apply_filter(&mut self, force: bool) -> Result<bool> {
        let Some(filter) = &self.filter else {
            return Ok(false);
        };

        let matched: Vec<Arc<StoreRecord>> = self
            .records
            .iter()
            .filter(|r| filter.matches(r))
            .cloned()
            .collect();
        let ids: Vec<String> = matched.iter().map(|r| r.id.clone()).collect();

        if !force && self.matched_ids.as_ref() == Some(&ids) {
            log::debug!("Filter result unchanged ({} stores), keeping index", ids.len());
            return Ok(false);
        }

        self.filtered = if matched.is_empty() {
            log::info!("Filter matched no stores; filtered index torn down");
            None
        } else {
            let index = self.build_index(&matched)?;
            log::info!(
                "Filtered index rebuilt: {} of {} stores (generation {})",
                index.len(),
                self.records.len(),
                index.generation()
            );
            Some(index)
        };
        self.matched_ids = Some(ids);

        Ok(true)
    }

    fn build_index(&mut self, records: &[Arc<StoreRecord>]) -> Result<StoreIndex> {
        let points = records
            .iter()
            .map(|r| IndexPoint::new(r.id.clone(), r.lat, r.lon, Arc::clone(r)))
            .collect();
        let generation = self.next_generation;
        self.next_generation += 1;

        IndexBuilder::new()
            .options(self.options.clone())
            .generation(generation)
            .build(points)
    }
}

/// Bounding box of a set of records, `None` when there are none.
pub fn catalog_bounds<'a, I>(records: I) -> Option<BoundingBox>
where
    I: IntoIterator<Item = &'a StoreRecord>,
{
    let points: MultiPoint<f64> = records.into_iter().map(StoreRecord::point).collect();
    points.bounding_rect().map(BoundingBox::from)
}

impl Default for ClusterSetManager {
    fn default() -> Self {
        Self::new(ClusterOptions::default())
    }
}
