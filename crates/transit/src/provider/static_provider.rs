//! In-memory reference provider backed by a snapshot.
//!
//! Stores every route, stop, route pattern and stop group in memory with a
//! spatial index over stops for map-drawing queries. It also answers the
//! async `ReferenceFetcher` contract with ready futures, which is what tests
//! and offline sessions use in place of the remote reference service.

use std::collections::HashMap;
use std::future;
use std::sync::Arc;

use geo::{BoundingRect, Contains, Polygon};
use rstar::{RTree, AABB};
use serde::{Deserialize, Serialize};

use crate::identifiers::*;
use crate::models::{records::*, traits::*, types::*};
use crate::network::traits::{FetchFuture, ReferenceFetcher};
use crate::spatial::index::StopNode;

// ============================================================================
// Snapshot format
// ============================================================================

/// Ordered stops a route serves in one direction
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoutePattern {
    pub route_id: RouteIdentifier,
    pub direction_id: DirectionId,
    pub stop_codes: Vec<StopCode>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopGroupDefinition {
    pub group_id: StopGroupIdentifier,
    pub group_name: Arc<str>,
    pub stop_codes: Vec<StopCode>,
}

/// Serialized reference data, as exported by the reference data service
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReferenceSnapshot {
    #[serde(default)]
    pub routes: Vec<RouteRef>,
    #[serde(default)]
    pub stops: Vec<StopRef>,
    #[serde(default)]
    pub patterns: Vec<RoutePattern>,
    #[serde(default)]
    pub stop_groups: Vec<StopGroupDefinition>,
}

// ============================================================================
// Static Provider
// ============================================================================

/// In-memory reference provider with spatial indexing
///
/// This type is cheap to clone since all data is stored in `Arc`s.
#[derive(Clone)]
pub struct StaticReferenceProvider {
    inner: Arc<Inner>,
}

struct Inner {
    route_map: HashMap<RouteIdentifier, RouteRef>,
    stop_map: HashMap<StopCode, StopRef>,
    group_map: HashMap<StopGroupIdentifier, StopGroupRef>,

    // Cross references
    route_stops: HashMap<RouteIdentifier, Vec<StopRef>>,
    stop_routes: HashMap<StopCode, Vec<RouteIdentifier>>,

    // Spatial index
    stop_tree: RTree<StopNode>,
}

impl StaticReferenceProvider {
    /// Create a new empty provider
    pub fn new() -> Self {
        Self::from_snapshot(ReferenceSnapshot::default())
    }

    /// Parse a JSON snapshot
    pub fn from_json(json: &str) -> Result<Self> {
        let snapshot: ReferenceSnapshot = serde_json::from_str(json)?;
        Ok(Self::from_snapshot(snapshot))
    }

    /// Build provider from raw data
    ///
    /// Pattern and group entries that name unknown stops are skipped.
    pub fn from_snapshot(snapshot: ReferenceSnapshot) -> Self {
        let stop_map: HashMap<_, _> = snapshot
            .stops
            .into_iter()
            .map(|s| (s.stop_code.clone(), s))
            .collect();

        let route_map: HashMap<_, _> = snapshot
            .routes
            .into_iter()
            .map(|r| (r.route_id.clone(), r))
            .collect();

        // Build cross references
        let mut route_stops: HashMap<RouteIdentifier, Vec<StopRef>> = HashMap::new();
        let mut stop_routes: HashMap<StopCode, Vec<RouteIdentifier>> = HashMap::new();
        for pattern in &snapshot.patterns {
            let served = route_stops.entry(pattern.route_id.clone()).or_default();
            for code in &pattern.stop_codes {
                let Some(stop) = stop_map.get(code) else {
                    continue;
                };
                served.push(stop.clone().with_direction(pattern.direction_id));

                let routes = stop_routes.entry(code.clone()).or_default();
                if !routes.contains(&pattern.route_id) {
                    routes.push(pattern.route_id.clone());
                }
            }
        }

        let group_map: HashMap<_, _> = snapshot
            .stop_groups
            .into_iter()
            .map(|g| {
                let stops = g
                    .stop_codes
                    .iter()
                    .filter_map(|code| stop_map.get(code).cloned())
                    .collect();
                let group = StopGroupRef {
                    group_id: g.group_id.clone(),
                    group_name: g.group_name,
                    stops,
                };
                (g.group_id, group)
            })
            .collect();

        // Build spatial index
        let stop_tree = RTree::bulk_load(
            stop_map
                .values()
                .map(|s| StopNode::new(s.location(), s.stop_code.clone()))
                .collect(),
        );

        Self {
            inner: Arc::new(Inner {
                route_map,
                stop_map,
                group_map,
                route_stops,
                stop_routes,
                stop_tree,
            }),
        }
    }

    pub fn route_count(&self) -> usize {
        self.inner.route_map.len()
    }

    pub fn stop_count(&self) -> usize {
        self.inner.stop_map.len()
    }
}

impl Default for StaticReferenceProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceDataProvider for StaticReferenceProvider {
    fn get_route(&self, id: &RouteIdentifier) -> Option<RouteRef> {
        self.inner.route_map.get(id).cloned()
    }

    fn get_stop(&self, code: &StopCode) -> Option<StopRef> {
        self.inner.stop_map.get(code).cloned()
    }

    fn get_stop_group(&self, id: &StopGroupIdentifier) -> Option<StopGroupRef> {
        self.inner.group_map.get(id).cloned()
    }

    fn route_by_short_name(&self, short_name: &str) -> Option<RouteRef> {
        self.inner
            .route_map
            .values()
            .find(|r| r.route_short_name.eq_ignore_ascii_case(short_name))
            .cloned()
    }

    fn stops_for_route(&self, id: &RouteIdentifier) -> Vec<StopRef> {
        self.inner.route_stops.get(id).cloned().unwrap_or_default()
    }

    fn routes_for_stop(&self, code: &StopCode) -> Vec<RouteRef> {
        self.inner
            .stop_routes
            .get(code)
            .map(|ids| ids.iter().filter_map(|id| self.get_route(id)).collect())
            .unwrap_or_default()
    }

    fn stops_within(&self, area: &Polygon) -> Vec<StopRef> {
        let Some(bounds) = area.bounding_rect() else {
            return Vec::new();
        };

        let envelope = AABB::from_corners(
            [bounds.min().x, bounds.min().y],
            [bounds.max().x, bounds.max().y],
        );

        let mut found: Vec<StopRef> = self
            .inner
            .stop_tree
            .locate_in_envelope(&envelope)
            .filter(|node| area.contains(&node.location))
            .filter_map(|node| self.get_stop(&node.stop_code))
            .collect();
        found.sort_by(|a, b| a.stop_code.cmp(&b.stop_code));
        found
    }
}

impl ReferenceFetcher for StaticReferenceProvider {
    fn fetch_stops_for_route<'a>(&'a self, route_id: &'a RouteIdentifier) -> FetchFuture<'a, Vec<StopRef>> {
        let result = if self.inner.route_map.contains_key(route_id) {
            Ok(self.stops_for_route(route_id))
        } else {
            Err(TransitError::RouteNotFound(route_id.clone()))
        };
        Box::pin(future::ready(result))
    }

    fn fetch_routes_for_stop<'a>(&'a self, stop_code: &'a StopCode) -> FetchFuture<'a, Vec<RouteRef>> {
        let result = if self.inner.stop_map.contains_key(stop_code) {
            Ok(self.routes_for_stop(stop_code))
        } else {
            Err(TransitError::StopNotFound(stop_code.clone()))
        };
        Box::pin(future::ready(result))
    }

    fn fetch_route_shape<'a>(&'a self, route_id: &'a RouteIdentifier) -> FetchFuture<'a, RouteShape> {
        let result = self
            .inner
            .route_map
            .get(route_id)
            .ok_or_else(|| TransitError::RouteNotFound(route_id.clone()))
            .and_then(|route| {
                let shape_wkt = route.shape_wkt.clone().ok_or_else(|| {
                    TransitError::InvalidData(format!("route {route_id} has no shape"))
                })?;
                Ok(RouteShape {
                    shape_wkt,
                    route_color: route.route_color.clone(),
                })
            });
        Box::pin(future::ready(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{coord, LineString};

    const SNAPSHOT: &str = r#"{
        "routes": [
            {"routeId": "INN-202", "routeShortName": "INN", "routeType": 3,
             "shapeWkt": "LINESTRING(174.76 -36.84, 174.77 -36.86)", "routeColor": "FF7F00"},
            {"routeId": "NX1-203", "routeShortName": "NX1", "routeType": 3}
        ],
        "stops": [
            {"stopId": "s-7036", "stopCode": "7036", "stopName": "Britomart", "stopLat": -36.8443, "stopLon": 174.7676},
            {"stopId": "s-7037", "stopCode": "7037", "stopName": "Queen St", "stopLat": -36.8480, "stopLon": 174.7650},
            {"stopId": "s-8500", "stopCode": "8500", "stopName": "Newmarket", "stopLat": -36.8699, "stopLon": 174.7768}
        ],
        "patterns": [
            {"routeId": "INN-202", "directionId": 0, "stopCodes": ["7036", "7037", "8500"]},
            {"routeId": "INN-202", "directionId": 1, "stopCodes": ["8500", "7036"]},
            {"routeId": "NX1-203", "directionId": 0, "stopCodes": ["7036", "9999"]}
        ],
        "stopGroups": [
            {"groupId": "1", "groupName": "City Centre", "stopCodes": ["7036", "7037"]}
        ]
    }"#;

    fn provider() -> StaticReferenceProvider {
        StaticReferenceProvider::from_json(SNAPSHOT).unwrap()
    }

    #[test]
    fn test_empty_provider() {
        let provider = StaticReferenceProvider::new();
        assert_eq!(provider.route_count(), 0);
        assert_eq!(provider.stop_count(), 0);
    }

    #[test]
    fn test_provider_lookups() {
        let provider = provider();

        assert!(provider.get_route(&RouteIdentifier::new("INN-202")).is_some());
        assert!(provider.get_stop(&StopCode::new("7037")).is_some());
        assert_eq!(
            provider.route_by_short_name("nx1").map(|r| r.route_id),
            Some(RouteIdentifier::new("NX1-203"))
        );

        let group = provider.get_stop_group(&StopGroupIdentifier::new("1")).unwrap();
        assert_eq!(group.stops.len(), 2);
    }

    #[test]
    fn test_cross_references() {
        let provider = provider();
        let inn = RouteIdentifier::new("INN-202");

        assert_eq!(provider.stops_for_route(&inn).len(), 5);
        let inbound = provider.stops_for_route_direction(&inn, DirectionId::Inbound);
        let codes: Vec<_> = inbound.iter().map(|s| s.stop_code.as_str()).collect();
        assert_eq!(codes, vec!["8500", "7036"]);

        // Unknown stop 9999 in the NX1 pattern is skipped
        assert_eq!(provider.stops_for_route(&RouteIdentifier::new("NX1-203")).len(), 1);

        let routes = provider.routes_for_stop(&StopCode::new("7036"));
        assert_eq!(routes.len(), 2);
    }

    #[test]
    fn test_stops_within_drawn_polygon() {
        let provider = provider();
        let city = Polygon::new(
            LineString::from(vec![
                coord! { x: 174.760, y: -36.840 },
                coord! { x: 174.770, y: -36.840 },
                coord! { x: 174.770, y: -36.850 },
                coord! { x: 174.760, y: -36.850 },
                coord! { x: 174.760, y: -36.840 },
            ]),
            vec![],
        );

        let found = provider.stops_within(&city);
        let codes: Vec<_> = found.iter().map(|s| s.stop_code.as_str()).collect();
        assert_eq!(codes, vec!["7036", "7037"]);
    }

    #[test]
    fn test_fetcher_contract() {
        let provider = provider();
        let inn = RouteIdentifier::new("INN-202");

        let shape = block_on_ready(provider.fetch_route_shape(&inn)).unwrap();
        assert_eq!(shape.route_color.as_deref(), Some("FF7F00"));

        let missing = RouteIdentifier::new("NX1-203");
        assert!(block_on_ready(provider.fetch_route_shape(&missing)).is_err());

        let unknown = StopCode::new("0000");
        assert!(matches!(
            block_on_ready(provider.fetch_routes_for_stop(&unknown)),
            Err(TransitError::StopNotFound(_))
        ));
    }

    // The provider's futures are always ready, so one poll resolves them
    fn block_on_ready<T>(fut: FetchFuture<'_, T>) -> Result<T> {
        use std::future::Future;
        use std::task::{Context, Poll, Waker};

        let mut fut = fut;
        let mut cx = Context::from_waker(Waker::noop());
        match fut.as_mut().poll(&mut cx) {
            Poll::Ready(result) => result,
            Poll::Pending => panic!("static provider futures are always ready"),
        }
    }
}
