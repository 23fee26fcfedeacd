//! Reconciliation of affected-entity selections.
//!
//! Every function here is pure: it takes the current selection plus what one
//! input channel (search picklist, map drawing, per-route checklist) now says,
//! and returns a replacement selection. None of them can fail.

use std::collections::HashSet;

use ops_console_transit::{DirectionId, RouteIdentifier, RouteRef, StopCode, StopRef};

use super::{AffectedEntitySet, EntityRef, RouteAffectation, StopGroupSelection};

/// Reconciles the single-stop selection with the picklist's complete new state.
///
/// Keeps every current stop whose code is still in `incoming`, in current
/// order, then appends incoming stops not yet present, in incoming order. The
/// result never repeats a stop code.
pub fn merge_stops(current: &[StopRef], incoming: &[StopRef]) -> Vec<StopRef> {
    let incoming_codes: HashSet<&StopCode> = incoming.iter().map(|stop| &stop.stop_code).collect();
    let mut seen: HashSet<StopCode> = HashSet::with_capacity(incoming.len());

    let mut merged: Vec<StopRef> = current
        .iter()
        .filter(|stop| incoming_codes.contains(&stop.stop_code))
        .filter(|stop| seen.insert(stop.stop_code.clone()))
        .cloned()
        .collect();

    for stop in incoming {
        if seen.insert(stop.stop_code.clone()) {
            merged.push(stop.clone());
        }
    }

    merged
}

/// Reconciles selected stop groups with the picklist's complete new state.
///
/// Groups are atomic: groups missing from `incoming` are dropped, new groups
/// are added, and groups present on both sides keep their current members
/// even if `incoming` lists different ones. Members of added groups are
/// tagged with their group key.
pub fn merge_stop_groups(current: &StopGroupSelection, incoming: &StopGroupSelection) -> StopGroupSelection {
    let mut merged: StopGroupSelection = current
        .iter()
        .filter(|(group_id, _)| incoming.contains_key(*group_id))
        .map(|(group_id, stops)| (group_id.clone(), stops.clone()))
        .collect();

    for (group_id, stops) in incoming {
        merged.entry(group_id.clone()).or_insert_with(|| {
            stops
                .iter()
                .map(|stop| StopRef {
                    group_id: Some(group_id.clone()),
                    ..stop.clone()
                })
                .collect()
        });
    }

    merged
}

/// Concatenates group members, in group order
pub fn flatten_groups(groups: &StopGroupSelection) -> Vec<StopRef> {
    groups.values().flatten().cloned().collect()
}

/// Reconciles the selected routes with the route picklist's new state.
///
/// Routes still selected keep all their affectations; newly selected routes
/// are added as bare entries.
pub fn merge_routes(current: &[RouteAffectation], incoming: &[RouteRef]) -> Vec<RouteAffectation> {
    let incoming_ids: HashSet<&RouteIdentifier> = incoming.iter().map(|route| &route.route_id).collect();

    let mut merged: Vec<RouteAffectation> = current
        .iter()
        .filter(|affectation| incoming_ids.contains(affectation.route_id()))
        .cloned()
        .collect();

    let mut present: HashSet<RouteIdentifier> = merged.iter().map(|a| a.route_id().clone()).collect();
    for route in incoming {
        if present.insert(route.route_id.clone()) {
            merged.push(RouteAffectation::Bare(route.clone()));
        }
    }

    merged
}

/// Adds the stops found inside a polygon drawn on the map.
///
/// Drawing only ever adds: stops already selected individually are skipped,
/// and drawn stops enter the selection without direction or group tags.
pub fn add_drawn_stops(current: &[StopRef], drawn: &[StopRef]) -> Vec<StopRef> {
    let mut selected: HashSet<StopCode> = current
        .iter()
        .filter(|stop| stop.group_id.is_none())
        .map(|stop| stop.stop_code.clone())
        .collect();

    let mut merged = current.to_vec();
    for stop in drawn {
        if selected.insert(stop.stop_code.clone()) {
            merged.push(StopRef {
                direction_id: None,
                group_id: None,
                group_name: None,
                ..stop.clone()
            });
        }
    }
    merged
}

fn matches_stop(affectation: &RouteAffectation, route_id: &RouteIdentifier, stop: &StopRef) -> bool {
    affectation.route_id() == route_id
        && affectation
            .stop()
            .is_some_and(|s| s.stop_code == stop.stop_code && s.direction_id == stop.direction_id)
}

/// Checks or unchecks one stop in a route's expandable checklist.
///
/// Checking replaces the route's bare entry, or appends a stop-qualified entry
/// when the route is already affected at other stops. Unchecking the last
/// stop-qualified entry of a route puts a bare entry back in its place, so the
/// route stays affected as a whole.
pub fn toggle_route_stop(
    affected_routes: &[RouteAffectation],
    route: &RouteRef,
    stop: &StopRef,
    checked: bool,
) -> Vec<RouteAffectation> {
    let mut routes = affected_routes.to_vec();
    let route_id = &route.route_id;

    if checked {
        // Prefer the record already in the selection; it may carry geometry
        let base = routes
            .iter()
            .find(|a| a.route_id() == route_id)
            .map(|a| a.route().clone())
            .unwrap_or_else(|| route.clone());
        let entry = RouteAffectation::AtStop(base, stop.clone());

        if let Some(bare) = routes.iter().position(|a| a.route_id() == route_id && a.is_bare()) {
            routes[bare] = entry;
            // A selection built elsewhere may hold more than one bare entry
            let mut index = 0;
            routes.retain(|a| {
                let keep = index == bare || !(a.route_id() == route_id && a.is_bare());
                index += 1;
                keep
            });
        } else if !routes.iter().any(|a| matches_stop(a, route_id, stop)) {
            routes.push(entry);
        }
    } else if let Some(position) = routes.iter().position(|a| matches_stop(a, route_id, stop)) {
        let removed = routes.remove(position);
        if !routes.iter().any(|a| a.route_id() == route_id) {
            routes.insert(position, RouteAffectation::Bare(removed.into_route()));
        }
    }

    routes
}

/// Checks or unchecks every stop of one direction of a route at once.
pub fn toggle_all_stops_for_direction(
    affected_routes: &[RouteAffectation],
    route: &RouteRef,
    direction: DirectionId,
    stops_in_direction: &[StopRef],
    checked: bool,
) -> Vec<RouteAffectation> {
    if checked {
        return stops_in_direction.iter().fold(affected_routes.to_vec(), |routes, stop| {
            let stop = stop.clone().with_direction(direction);
            toggle_route_stop(&routes, route, &stop, true)
        });
    }

    let route_id = &route.route_id;
    let in_direction = |a: &RouteAffectation| a.route_id() == route_id && a.direction() == Some(direction);

    let Some(first) = affected_routes.iter().position(in_direction) else {
        return affected_routes.to_vec();
    };

    let mut routes: Vec<RouteAffectation> = affected_routes.iter().filter(|a| !in_direction(*a)).cloned().collect();
    if !routes.iter().any(|a| a.route_id() == route_id) {
        let bare = RouteAffectation::Bare(affected_routes[first].route().clone());
        // Entries before `first` all survived the filter
        routes.insert(first, bare);
    }
    routes
}

/// Removes a route, a stop, or a whole stop group from a selection.
pub fn remove_entity(set: &AffectedEntitySet, entity: &EntityRef) -> AffectedEntitySet {
    match entity {
        EntityRef::Route(route_id) => set.with_routes(
            set.affected_routes
                .iter()
                .filter(|a| a.route_id() != route_id)
                .cloned()
                .collect(),
        ),
        EntityRef::Stop(key) => set.with_stops(
            set.affected_stops
                .iter()
                .filter(|stop| &stop.key() != key)
                .cloned()
                .collect(),
        ),
        EntityRef::StopGroup(group_id) => set.with_stops(
            set.affected_stops
                .iter()
                .filter(|stop| stop.group_id.as_ref() != Some(group_id))
                .cloned()
                .collect(),
        ),
    }
}
