//! Affected-entity sets: the routes and stops one disruption impacts.

pub mod reconcile;
pub mod wizard;

use std::collections::{BTreeMap, HashSet};

use itertools::Itertools;
use ops_console_transit::{DirectionId, RouteIdentifier, RouteRef, StopCode, StopGroupIdentifier, StopKey, StopRef};

pub use reconcile::*;
pub use wizard::{SelectionPhase, SelectionStep, SelectionWarning};

/// Stop groups selected for a disruption, keyed by group, members expanded.
pub type StopGroupSelection = BTreeMap<StopGroupIdentifier, Vec<StopRef>>;

/// How one route is affected.
///
/// A route is either affected as a whole (`Bare`) or at specific stops (one
/// `AtStop` per stop). The reconciler never keeps both kinds for one route.
#[derive(Clone, Debug, PartialEq)]
pub enum RouteAffectation {
    Bare(RouteRef),
    AtStop(RouteRef, StopRef),
}

/// Identity of a route affectation: the route, plus stop code and direction
/// for stop-qualified entries.
pub type AffectationKey = (RouteIdentifier, Option<(StopCode, Option<DirectionId>)>);

impl RouteAffectation {
    pub fn route(&self) -> &RouteRef {
        match self {
            Self::Bare(route) | Self::AtStop(route, _) => route,
        }
    }

    pub fn route_id(&self) -> &RouteIdentifier {
        &self.route().route_id
    }

    pub fn stop(&self) -> Option<&StopRef> {
        match self {
            Self::Bare(_) => None,
            Self::AtStop(_, stop) => Some(stop),
        }
    }

    pub fn is_bare(&self) -> bool {
        matches!(self, Self::Bare(_))
    }

    pub fn direction(&self) -> Option<DirectionId> {
        self.stop().and_then(|stop| stop.direction_id)
    }

    pub fn key(&self) -> AffectationKey {
        (
            self.route_id().clone(),
            self.stop().map(|stop| (stop.stop_code.clone(), stop.direction_id)),
        )
    }

    pub fn into_route(self) -> RouteRef {
        match self {
            Self::Bare(route) | Self::AtStop(route, _) => route,
        }
    }

    pub(crate) fn map_route(self, f: impl FnOnce(RouteRef) -> RouteRef) -> Self {
        match self {
            Self::Bare(route) => Self::Bare(f(route)),
            Self::AtStop(route, stop) => Self::AtStop(f(route), stop),
        }
    }
}

/// Something that can be removed from an affected set as a unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum EntityRef {
    /// Every affectation of the route
    Route(RouteIdentifier),
    /// One affected stop
    Stop(StopKey),
    /// All members of a stop group
    StopGroup(StopGroupIdentifier),
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct AffectedEntitySet {
    pub affected_routes: Vec<RouteAffectation>,
    pub affected_stops: Vec<StopRef>,
}

impl AffectedEntitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.affected_routes.is_empty() && self.affected_stops.is_empty()
    }

    /// Count used by the maximum-entity gate. Route-at-stop entries and group
    /// members each count once.
    pub fn total_entities(&self) -> usize {
        self.affected_routes.len() + self.affected_stops.len()
    }

    /// Distinct affected routes, in selection order
    pub fn route_ids(&self) -> Vec<&RouteIdentifier> {
        self.affected_routes.iter().map(RouteAffectation::route_id).unique().collect()
    }

    /// Distinct affected stop codes, in selection order
    pub fn stop_codes(&self) -> Vec<&StopCode> {
        self.affected_stops.iter().map(|stop| &stop.stop_code).unique().collect()
    }

    /// Stops picked one by one rather than through a group
    pub fn single_stops(&self) -> Vec<StopRef> {
        self.affected_stops
            .iter()
            .filter(|stop| stop.group_id.is_none())
            .cloned()
            .collect()
    }

    /// Group members regrouped by `group_id`
    pub fn stop_groups(&self) -> StopGroupSelection {
        self.affected_stops
            .iter()
            .filter_map(|stop| stop.group_id.clone().map(|id| (id, stop.clone())))
            .into_group_map()
            .into_iter()
            .collect()
    }

    /// Applies both stop channels of the picklist at once: single stops are
    /// merged with `merge_stops`, groups with `merge_stop_groups`.
    pub fn apply_stop_selection(&self, singles: &[StopRef], groups: &StopGroupSelection) -> Self {
        let mut affected_stops = merge_stops(&self.single_stops(), singles);
        affected_stops.extend(flatten_groups(&merge_stop_groups(&self.stop_groups(), groups)));
        Self {
            affected_routes: self.affected_routes.clone(),
            affected_stops,
        }
    }

    pub fn with_routes(&self, affected_routes: Vec<RouteAffectation>) -> Self {
        Self {
            affected_routes,
            affected_stops: self.affected_stops.clone(),
        }
    }

    pub fn with_stops(&self, affected_stops: Vec<StopRef>) -> Self {
        Self {
            affected_routes: self.affected_routes.clone(),
            affected_stops,
        }
    }

    /// Whether the identity invariants hold
    pub fn is_consistent(&self) -> bool {
        let mut route_keys = HashSet::new();
        let routes_unique = self.affected_routes.iter().all(|a| route_keys.insert(a.key()));

        let mut stop_keys = HashSet::new();
        let stops_unique = self.affected_stops.iter().all(|s| stop_keys.insert(s.key()));

        let no_mixed_routes = self
            .affected_routes
            .iter()
            .into_group_map_by(|a| a.route_id().clone())
            .values()
            .all(|entries| entries.len() == 1 || entries.iter().all(|a| !a.is_bare()));

        routes_unique && stops_unique && no_mixed_routes
    }
}
