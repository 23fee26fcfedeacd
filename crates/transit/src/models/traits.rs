//! Public interface for reference data.
//!
//! Implementations can be in-memory, database-backed, or remote.

use geo::Polygon;

use crate::identifiers::*;
use crate::models::records::*;
use crate::models::types::*;

/// Resolves route short names and stop codes to full records, and answers the
/// cross-reference questions the selection screens ask.
pub trait ReferenceDataProvider: Send + Sync {
    // ---- Lookups ----
    fn get_route(&self, id: &RouteIdentifier) -> Option<RouteRef>;
    fn get_stop(&self, code: &StopCode) -> Option<StopRef>;
    fn get_stop_group(&self, id: &StopGroupIdentifier) -> Option<StopGroupRef>;

    /// Search picklist lookup by exact short name (case-insensitive)
    fn route_by_short_name(&self, short_name: &str) -> Option<RouteRef>;

    // ---- Cross references ----

    /// Stops served by a route, tagged with the direction they are served in
    fn stops_for_route(&self, id: &RouteIdentifier) -> Vec<StopRef>;

    /// Stops served by a route in one direction, in stop-sequence order
    fn stops_for_route_direction(&self, id: &RouteIdentifier, direction: DirectionId) -> Vec<StopRef> {
        self.stops_for_route(id)
            .into_iter()
            .filter(|stop| stop.direction_id == Some(direction))
            .collect()
    }

    /// Routes serving a stop
    fn routes_for_stop(&self, code: &StopCode) -> Vec<RouteRef>;

    // ---- Spatial queries ----

    /// Stops inside a polygon drawn on the map
    fn stops_within(&self, area: &Polygon) -> Vec<StopRef>;
}
