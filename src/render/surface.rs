use super::marker::{MarkerHandle, MarkerSpec, MarkerSurface};
use rustc_hash::FxHashMap;

/// A surface that keeps markers in memory.
///
/// Used by the CLI and tests; it also counts creations and destructions so
/// handle leaks are observable.
#[derive(Debug, Default)]
pub struct InMemorySurface {
    live: FxHashMap<MarkerHandle, MarkerSpec>,
    next_handle: u64,
    created: u64,
    destroyed: u64,
    /// Destroy calls for handles that were not live
    stale_destroys: u64,
}

impl InMemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn live_count(&self) -> usize {
        self.live.len()
    }

    pub fn created(&self) -> u64 {
        self.created
    }

    pub fn destroyed(&self) -> u64 {
        self.destroyed
    }

    pub fn stale_destroys(&self) -> u64 {
        self.stale_destroys
    }

    pub fn is_live(&self, handle: MarkerHandle) -> bool {
        self.live.contains_key(&handle)
    }

    /// Live markers ordered by key.
    pub fn markers(&self) -> Vec<&MarkerSpec> {
        let mut markers: Vec<&MarkerSpec> = self.live.values().collect();
        markers.sort_by(|a, b| a.key.cmp(&b.key));
        markers
    }
}

impl MarkerSurface for InMemorySurface {
    fn create_marker(&mut self, spec: &MarkerSpec) -> MarkerHandle {
        self.next_handle += 1;
        self.created += 1;
        let handle = MarkerHandle(self.next_handle);
        self.live.insert(handle, spec.clone());
        handle
    }

    fn destroy_marker(&mut self, handle: MarkerHandle) {
        if self.live.remove(&handle).is_some() {
            self.destroyed += 1;
        } else {
            log::warn!("Destroy requested for unknown marker handle {:?}", handle);
            self.stale_destroys += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::marker::{MarkerKey, MarkerKind};
    use std::sync::Arc;
    use storemap_types::store::StoreRecord;

    fn spec(id: &str) -> MarkerSpec {
        MarkerSpec {
            key: MarkerKey::Store(id.into()),
            lat: 0.0,
            lon: 0.0,
            kind: MarkerKind::Store(Arc::new(StoreRecord::new(id, 0.0, 0.0))),
        }
    }

    #[test]
    fn test_create_and_destroy() {
        let mut surface = InMemorySurface::new();
        let a = surface.create_marker(&spec("a"));
        let b = surface.create_marker(&spec("b"));
        assert_ne!(a, b);
        assert_eq!(surface.live_count(), 2);

        surface.destroy_marker(a);
        assert!(!surface.is_live(a));
        assert_eq!(surface.live_count(), 1);

        surface.destroy_marker(a);
        assert_eq!(surface.stale_destroys(), 1);
        assert_eq!(surface.destroyed(), 1);
    }
}
