//! Focus tracking and cancellable nearby-data lookups.
//!
//! Every focus change cancels the token handed to the previous focus's
//! lookups. A finished lookup is applied only if its token is still live and
//! its generation is the current one, so the last focus always wins.

use crate::config::NearbyOptions;
use crate::error::{Result, StoremapError};
use std::future::Future;
use std::sync::Arc;
use storemap_types::nearby::{NearbyPlaces, NearbyStores};
use storemap_types::store::StoreRecord;
use tokio_util::sync::CancellationToken;

/// The external service answering nearby-data queries.
pub trait NearbyService: Send + Sync {
    /// Similar stores within `radius_m` meters of `store_id`.
    fn nearby_stores(
        &self,
        store_id: &str,
        radius_m: u32,
    ) -> impl Future<Output = Result<NearbyStores>> + Send;

    /// Points of interest within `radius_m` meters of `store_id`.
    fn nearby_places(
        &self,
        store_id: &str,
        radius_m: u32,
    ) -> impl Future<Output = Result<NearbyPlaces>> + Send;
}

impl<S: NearbyService + ?Sized> NearbyService for Arc<S> {
    fn nearby_stores(
        &self,
        store_id: &str,
        radius_m: u32,
    ) -> impl Future<Output = Result<NearbyStores>> + Send {
        (**self).nearby_stores(store_id, radius_m)
    }

    fn nearby_places(
        &self,
        store_id: &str,
        radius_m: u32,
    ) -> impl Future<Output = Result<NearbyPlaces>> + Send {
        (**self).nearby_places(store_id, radius_m)
    }
}

/// Nearby data for the focused store.
#[derive(Debug, Clone, PartialEq)]
pub enum NearbyState {
    /// Nothing is focused.
    Idle,
    Loading,
    Loaded {
        stores: NearbyStores,
        places: NearbyPlaces,
    },
    /// One or both lookups failed; no partial results are kept.
    Failed(String),
}

/// Both lookup results for one focus.
#[derive(Debug, Clone, PartialEq)]
pub struct NearbyResults {
    pub stores: NearbyStores,
    pub places: NearbyPlaces,
}

/// The pair of lookups issued for one focus change.
///
/// Carries the token and generation of the focus that created it. Run it on
/// any executor and hand the outcome back to [`SelectionController::apply`].
#[derive(Debug, Clone)]
pub struct NearbyLookup {
    store_id: String,
    generation: u64,
    token: CancellationToken,
    store_radius_m: u32,
    place_radius_m: u32,
}

impl NearbyLookup {
    pub fn store_id(&self) -> &str {
        &self.store_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// Fire both lookups concurrently and wait for both, or for cancellation.
    pub async fn run<S: NearbyService + ?Sized>(self, service: &S) -> LookupOutcome {
        let token = self.token.clone();
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => Err(StoremapError::Cancelled),
            (stores, places) = async {
                tokio::join!(
                    service.nearby_stores(&self.store_id, self.store_radius_m),
                    service.nearby_places(&self.store_id, self.place_radius_m),
                )
            } => match (stores, places) {
                (Ok(stores), Ok(places)) => Ok(NearbyResults { stores, places }),
                (Err(e), _) | (_, Err(e)) => Err(e),
            },
        };

        LookupOutcome {
            store_id: self.store_id,
            generation: self.generation,
            token: self.token,
            result,
        }
    }
}

/// A finished [`NearbyLookup`].
#[derive(Debug)]
pub struct LookupOutcome {
    pub store_id: String,
    pub generation: u64,
    token: CancellationToken,
    pub result: Result<NearbyResults>,
}

impl LookupOutcome {
    /// True when a later focus change superseded this lookup.
    pub fn is_superseded(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// Tracks at most one focused store and the nearby data loaded for it.
#[derive(Debug)]
pub struct SelectionController {
    store_radius_m: u32,
    place_radius_m: u32,
    focus: Option<Arc<StoreRecord>>,
    token: Option<CancellationToken>,
    generation: u64,
    state: NearbyState,
}

impl SelectionController {
    pub fn new(options: &NearbyOptions) -> Self {
        Self {
            store_radius_m: options.store_radius_m,
            place_radius_m: options.place_radius_m,
            focus: None,
            token: None,
            generation: 0,
            state: NearbyState::Idle,
        }
    }

    pub fn focus(&self) -> Option<&Arc<StoreRecord>> {
        self.focus.as_ref()
    }

    pub fn state(&self) -> &NearbyState {
        &self.state
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Change the focus, cancelling lookups issued for the previous one.
    ///
    /// Returns the lookups to run for the new focus, or `None` when focus was
    /// cleared.
    pub fn set_focus(&mut self, record: Option<Arc<StoreRecord>>) -> Option<NearbyLookup> {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
        self.generation += 1;

        let Some(record) = record else {
            if let Some(previous) = self.focus.take() {
                log::debug!("Cleared focus on store {}", previous.id);
            }
            self.state = NearbyState::Idle;
            return None;
        };

        log::debug!(
            "Focus set on store {} (generation {})",
            record.id,
            self.generation
        );
        let token = CancellationToken::new();
        self.token = Some(token.clone());
        self.state = NearbyState::Loading;
        let lookup = NearbyLookup {
            store_id: record.id.clone(),
            generation: self.generation,
            token,
            store_radius_m: self.store_radius_m,
            place_radius_m: self.place_radius_m,
        };
        self.focus = Some(record);
        Some(lookup)
    }

    /// Apply a finished lookup. Returns whether the state changed.
    ///
    /// Superseded and cancelled lookups are dropped quietly. Any other failure
    /// clears both result sets and records a single failure message.
    pub fn apply(&mut self, outcome: LookupOutcome) -> bool {
        if outcome.is_superseded() || outcome.generation != self.generation {
            log::debug!(
                "Discarding nearby results for store {} (generation {}, current {})",
                outcome.store_id,
                outcome.generation,
                self.generation
            );
            return false;
        }

        match outcome.result {
            Ok(NearbyResults { stores, places }) => {
                log::debug!(
                    "Loaded {} nearby stores and {} places for {}",
                    stores.stores.len(),
                    places.places.len(),
                    outcome.store_id
                );
                self.state = NearbyState::Loaded { stores, places };
                true
            }
            Err(e) if e.is_cancelled() => false,
            Err(e) => {
                log::warn!("Nearby lookup for store {} failed: {}", outcome.store_id, e);
                self.state = NearbyState::Failed(format!("Failed to load nearby data: {}", e));
                true
            }
        }
    }
}

impl Drop for SelectionController {
    fn drop(&mut self) {
        if let Some(token) = self.token.take() {
            token.cancel();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storemap_types::nearby::{NearbyPlace, NearbyStore};

    struct FixedService {
        fail_places: bool,
    }

    impl NearbyService for FixedService {
        async fn nearby_stores(&self, store_id: &str, _radius_m: u32) -> Result<NearbyStores> {
            Ok(NearbyStores {
                stores: vec![NearbyStore {
                    id: format!("{}-near", store_id),
                    name: "Neighbour".into(),
                    address: String::new(),
                    lat: 1.0,
                    lon: 2.0,
                }],
                count: 1,
            })
        }

        async fn nearby_places(&self, store_id: &str, _radius_m: u32) -> Result<NearbyPlaces> {
            if self.fail_places {
                return Err(StoremapError::Lookup("upstream returned 502".into()));
            }
            let mut places = NearbyPlaces::default();
            places.places.push(NearbyPlace {
                id: format!("{}-poi", store_id),
                name: "Cafe".into(),
                address: String::new(),
                top_category: "Restaurants and Other Eating Places".into(),
                lat: 1.0,
                lon: 2.0,
            });
            places
                .category_counts
                .insert("Restaurants and Other Eating Places".into(), 1);
            Ok(places)
        }
    }

    fn store(id: &str) -> Arc<StoreRecord> {
        Arc::new(StoreRecord::new(id, 35.0, 139.0))
    }

    #[tokio::test]
    async fn test_focus_loads_both_results() {
        let mut selection = SelectionController::new(&NearbyOptions::default());
        let lookup = selection.set_focus(Some(store("a"))).unwrap();
        assert_eq!(selection.state(), &NearbyState::Loading);
        assert_eq!(lookup.store_id(), "a");

        let outcome = lookup.run(&FixedService { fail_places: false }).await;
        assert!(selection.apply(outcome));
        match selection.state() {
            NearbyState::Loaded { stores, places } => {
                assert_eq!(stores.count, 1);
                assert_eq!(places.count_for("Restaurants and Other Eating Places"), 1);
            }
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_partial_failure_clears_everything() {
        let mut selection = SelectionController::new(&NearbyOptions::default());
        let lookup = selection.set_focus(Some(store("a"))).unwrap();
        let outcome = lookup.run(&FixedService { fail_places: true }).await;

        assert!(selection.apply(outcome));
        match selection.state() {
            NearbyState::Failed(message) => assert!(message.contains("502")),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_cancelled_lookup_is_not_a_failure() {
        let mut selection = SelectionController::new(&NearbyOptions::default());
        let lookup = selection.set_focus(Some(store("a"))).unwrap();
        lookup.token().cancel();

        let outcome = lookup.run(&FixedService { fail_places: false }).await;
        assert!(outcome.result.as_ref().unwrap_err().is_cancelled());
        assert!(!selection.apply(outcome));
        assert_eq!(selection.state(), &NearbyState::Loading);
    }

    #[tokio::test]
    async fn test_stale_results_are_dropped() {
        let mut selection = SelectionController::new(&NearbyOptions::default());
        let first = selection.set_focus(Some(store("a"))).unwrap();
        let first_token = first.token().clone();
        let second = selection.set_focus(Some(store("b"))).unwrap();
        assert!(first_token.is_cancelled());
        assert!(!second.token().is_cancelled());

        let service = FixedService { fail_places: false };
        let stale = first.run(&service).await;
        assert!(!selection.apply(stale));

        let fresh = second.run(&service).await;
        assert!(selection.apply(fresh));
        match selection.state() {
            NearbyState::Loaded { stores, .. } => assert_eq!(stores.stores[0].id, "b-near"),
            other => panic!("unexpected state {:?}", other),
        }
    }

    #[test]
    fn test_clearing_focus_cancels_and_idles() {
        let mut selection = SelectionController::new(&NearbyOptions::default());
        let lookup = selection.set_focus(Some(store("a"))).unwrap();
        assert!(selection.set_focus(None).is_none());
        assert!(lookup.token().is_cancelled());
        assert!(selection.focus().is_none());
        assert_eq!(selection.state(), &NearbyState::Idle);
        assert_eq!(selection.generation(), 2);
    }
}
