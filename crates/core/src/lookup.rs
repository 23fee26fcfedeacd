//! Cross-reference lookups for a reconciled selection.
//!
//! Once routes and stops are in the affected set the console needs three more
//! things from reference data: the stops of each route (for the per-route
//! checklist), the routes serving each stop, and each route's shape for the
//! map. The coordinator fetches each missing key exactly once per session.

use std::{
    collections::{BTreeMap, HashMap},
    fmt::Display,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
};

use futures_util::future::join_all;
use itertools::Itertools;
use ops_console_transit::{
    DirectionId, FetchFuture, ReferenceFetcher, RouteIdentifier, RouteRef, RouteShape, StopCode, StopRef,
    TransitError,
};
use strum::Display;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::affected::AffectedEntitySet;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "kebab-case")]
pub enum LookupBatch {
    StopsForRoute,
    RoutesForStop,
    RouteShape,
}

/// Keys that still have to be fetched
#[derive(Clone, Debug, Default, PartialEq)]
pub struct LookupPlan {
    pub stops_for_route: Vec<RouteIdentifier>,
    pub routes_for_stop: Vec<StopCode>,
    pub route_shapes: Vec<RouteIdentifier>,
}

impl LookupPlan {
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn len(&self) -> usize {
        self.stops_for_route.len() + self.routes_for_stop.len() + self.route_shapes.len()
    }
}

#[derive(Debug)]
pub struct LookupFailure {
    pub batch: LookupBatch,
    pub key: String,
    pub error: TransitError,
}

#[derive(Debug, Default)]
pub struct LookupOutcome {
    pub resolved: usize,
    pub failures: Vec<LookupFailure>,
}

impl LookupOutcome {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// Banner text when something failed
    pub fn error_message(&self) -> Option<String> {
        let first = self.failures.first()?;
        Some(match self.failures.len() {
            1 => format!("Could not load {} for {}: {}", first.batch, first.key, first.error),
            n => format!("Could not load {} items, first failure: {}", n, first.error),
        })
    }

    fn absorb(&mut self, (resolved, failures): (usize, Vec<LookupFailure>)) {
        self.resolved += resolved;
        self.failures.extend(failures);
    }
}

#[derive(Debug, Default)]
struct LookupCache {
    stops_for_route: HashMap<RouteIdentifier, Vec<StopRef>>,
    routes_for_stop: HashMap<StopCode, Vec<RouteRef>>,
    route_shapes: HashMap<RouteIdentifier, RouteShape>,
}

/// Running batches per kind
#[derive(Debug, Default)]
struct InFlightCounts {
    stops_for_route: AtomicUsize,
    routes_for_stop: AtomicUsize,
    route_shape: AtomicUsize,
}

impl InFlightCounts {
    fn counter(&self, batch: LookupBatch) -> &AtomicUsize {
        match batch {
            LookupBatch::StopsForRoute => &self.stops_for_route,
            LookupBatch::RoutesForStop => &self.routes_for_stop,
            LookupBatch::RouteShape => &self.route_shape,
        }
    }

    fn is_loading(&self, batch: LookupBatch) -> bool {
        self.counter(batch).load(Ordering::SeqCst) > 0
    }
}

/// Marks a batch as running until dropped, so a cancelled batch clears too
struct InFlightGuard<'a>(&'a AtomicUsize);

impl<'a> InFlightGuard<'a> {
    fn enter(counter: &'a AtomicUsize) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

pub struct RemoteLookupCoordinator {
    fetcher: Arc<dyn ReferenceFetcher>,
    state: RwLock<LookupCache>,
    in_flight: InFlightCounts,
}

impl RemoteLookupCoordinator {
    pub fn new(fetcher: Arc<dyn ReferenceFetcher>) -> Self {
        Self {
            fetcher,
            state: RwLock::new(LookupCache::default()),
            in_flight: InFlightCounts::default(),
        }
    }

    /// Works out what `set` still needs against the current cache.
    pub async fn plan(&self, set: &AffectedEntitySet) -> LookupPlan {
        let cache = self.state.read().await;

        let route_ids = set.route_ids();
        let stops_for_route = route_ids
            .iter()
            .filter(|id| !cache.stops_for_route.contains_key(**id))
            .map(|id| (*id).clone())
            .collect();

        // Records that already carry a shape (e.g. loaded with a saved
        // disruption) do not need one fetched
        let route_shapes = route_ids
            .iter()
            .filter(|id| !cache.route_shapes.contains_key(**id))
            .filter(|id| {
                !set.affected_routes
                    .iter()
                    .any(|a| a.route_id() == **id && a.route().has_geometry())
            })
            .map(|id| (*id).clone())
            .collect();

        let routes_for_stop = set
            .stop_codes()
            .into_iter()
            .filter(|code| !cache.routes_for_stop.contains_key(*code))
            .cloned()
            .collect();

        LookupPlan {
            stops_for_route,
            routes_for_stop,
            route_shapes,
        }
    }

    /// Plans and executes the lookups for `set`.
    pub async fn resolve(&self, set: &AffectedEntitySet) -> LookupOutcome {
        let plan = self.plan(set).await;
        self.execute(&plan).await
    }

    /// Runs the three batches of `plan` concurrently. Results of keys that
    /// succeed are cached even when other keys of the same batch fail.
    pub async fn execute(&self, plan: &LookupPlan) -> LookupOutcome {
        if plan.is_empty() {
            return LookupOutcome::default();
        }
        debug!(
            stops_for_route = plan.stops_for_route.len(),
            routes_for_stop = plan.routes_for_stop.len(),
            route_shapes = plan.route_shapes.len(),
            "Resolving reference lookups"
        );

        let fetcher = &self.fetcher;
        let (stops, routes, shapes) = tokio::join!(
            self.run_batch(
                LookupBatch::StopsForRoute,
                &plan.stops_for_route,
                |id| fetcher.fetch_stops_for_route(id),
                |cache, id, stops| {
                    cache.stops_for_route.insert(id.clone(), stops);
                },
            ),
            self.run_batch(
                LookupBatch::RoutesForStop,
                &plan.routes_for_stop,
                |code| fetcher.fetch_routes_for_stop(code),
                |cache, code, routes| {
                    cache.routes_for_stop.insert(code.clone(), routes);
                },
            ),
            self.run_batch(
                LookupBatch::RouteShape,
                &plan.route_shapes,
                |id| fetcher.fetch_route_shape(id),
                |cache, id, shape| {
                    cache.route_shapes.insert(id.clone(), shape);
                },
            ),
        );

        let mut outcome = LookupOutcome::default();
        outcome.absorb(stops);
        outcome.absorb(routes);
        outcome.absorb(shapes);
        outcome
    }

    async fn run_batch<'a, K, T>(
        &'a self,
        batch: LookupBatch,
        keys: &'a [K],
        fetch: impl Fn(&'a K) -> FetchFuture<'a, T>,
        store: impl Fn(&mut LookupCache, &K, T),
    ) -> (usize, Vec<LookupFailure>)
    where
        K: Display,
    {
        if keys.is_empty() {
            return (0, Vec::new());
        }

        let _loading = InFlightGuard::enter(self.in_flight.counter(batch));

        let results = join_all(keys.iter().map(fetch)).await;

        let mut cache = self.state.write().await;
        let mut resolved = 0;
        let mut failures = Vec::new();
        for (key, result) in keys.iter().zip(results) {
            match result {
                Ok(value) => {
                    store(&mut *cache, key, value);
                    resolved += 1;
                }
                Err(error) => {
                    warn!(%batch, %key, %error, "Reference lookup failed");
                    failures.push(LookupFailure {
                        batch,
                        key: key.to_string(),
                        error,
                    });
                }
            }
        }

        (resolved, failures)
    }

    pub async fn is_loading(&self, batch: LookupBatch) -> bool {
        self.in_flight.is_loading(batch)
    }

    /// Gates the wizard's "continue" action
    pub async fn is_any_loading(&self) -> bool {
        [LookupBatch::StopsForRoute, LookupBatch::RoutesForStop, LookupBatch::RouteShape]
            .into_iter()
            .any(|batch| self.in_flight.is_loading(batch))
    }

    pub async fn stops_for_route(&self, route_id: &RouteIdentifier) -> Option<Vec<StopRef>> {
        self.state.read().await.stops_for_route.get(route_id).cloned()
    }

    /// Cached stops of a route split by direction, for the per-route checklist
    pub async fn stops_by_direction(&self, route_id: &RouteIdentifier) -> BTreeMap<Option<DirectionId>, Vec<StopRef>> {
        self.stops_for_route(route_id)
            .await
            .unwrap_or_default()
            .into_iter()
            .into_group_map_by(|stop| stop.direction_id)
            .into_iter()
            .collect()
    }

    pub async fn routes_for_stop(&self, stop_code: &StopCode) -> Option<Vec<RouteRef>> {
        self.state.read().await.routes_for_stop.get(stop_code).cloned()
    }

    pub async fn route_shape(&self, route_id: &RouteIdentifier) -> Option<RouteShape> {
        self.state.read().await.route_shapes.get(route_id).cloned()
    }

    /// `set` with cached shapes and colours attached to its route records.
    pub async fn attach_geometry(&self, set: &AffectedEntitySet) -> AffectedEntitySet {
        let cache = self.state.read().await;
        let affected_routes = set
            .affected_routes
            .iter()
            .cloned()
            .map(|affectation| match cache.route_shapes.get(affectation.route_id()) {
                Some(shape) if !affectation.route().has_geometry() => {
                    affectation.map_route(|route| route.with_shape(shape))
                }
                _ => affectation,
            })
            .collect();
        set.with_routes(affected_routes)
    }
}
