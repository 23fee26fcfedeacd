//! Reference records for routes, stops and stop groups.
//!
//! These are the shapes the console passes around once a route short name or
//! stop code has been resolved against reference data.

use std::sync::Arc;

use geo::Point;
use serde::{Deserialize, Serialize};

use crate::identifiers::*;
use crate::models::types::*;

/// A route as resolved from reference data.
///
/// `shape_wkt` and `route_color` are attached lazily once geometry has been
/// looked up; every other field is fixed once fetched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteRef {
    pub route_id: RouteIdentifier,
    pub route_short_name: Arc<str>,
    pub route_type: RouteType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_wkt: Option<Arc<str>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub route_color: Option<Arc<str>>,
}

impl RouteRef {
    pub fn new(route_id: RouteIdentifier, short_name: impl Into<Arc<str>>, route_type: RouteType) -> Self {
        Self {
            route_id,
            route_short_name: short_name.into(),
            route_type,
            shape_wkt: None,
            route_color: None,
        }
    }

    pub fn has_geometry(&self) -> bool {
        self.shape_wkt.is_some()
    }

    pub fn with_shape(mut self, shape: &RouteShape) -> Self {
        self.shape_wkt = Some(Arc::clone(&shape.shape_wkt));
        if shape.route_color.is_some() {
            self.route_color = shape.route_color.clone();
        }
        self
    }
}

/// Geometry and colour looked up for a route after it has been selected.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteShape {
    pub shape_wkt: Arc<str>,
    #[serde(default)]
    pub route_color: Option<Arc<str>>,
}

/// A stop as resolved from reference data.
///
/// `direction_id` is only set when the stop was picked in the context of one
/// direction of a route. `group_id` is only set when the stop was contributed
/// by a stop group.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopRef {
    pub stop_id: StopIdentifier,
    pub stop_code: StopCode,
    pub stop_name: Arc<str>,
    #[serde(rename = "stopLat")]
    pub lat: f64,
    #[serde(rename = "stopLon")]
    pub lon: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub direction_id: Option<DirectionId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_id: Option<StopGroupIdentifier>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<Arc<str>>,
}

/// Key that distinguishes stops within an affected-stop list.
pub type StopKey = (StopCode, Option<DirectionId>, Option<StopGroupIdentifier>);

impl StopRef {
    pub fn new(
        stop_id: StopIdentifier,
        stop_code: StopCode,
        stop_name: impl Into<Arc<str>>,
        lat: f64,
        lon: f64,
    ) -> Self {
        Self {
            stop_id,
            stop_code,
            stop_name: stop_name.into(),
            lat,
            lon,
            direction_id: None,
            group_id: None,
            group_name: None,
        }
    }

    pub fn with_direction(mut self, direction: DirectionId) -> Self {
        self.direction_id = Some(direction);
        self
    }

    pub fn key(&self) -> StopKey {
        (self.stop_code.clone(), self.direction_id, self.group_id.clone())
    }

    /// Geographic position; x is longitude, y is latitude
    pub fn location(&self) -> Point {
        Point::new(self.lon, self.lat)
    }
}

/// A named, curated set of stops selectable as a single unit.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StopGroupRef {
    pub group_id: StopGroupIdentifier,
    pub group_name: Arc<str>,
    pub stops: Vec<StopRef>,
}

impl StopGroupRef {
    /// Member stops tagged with this group, ready to be flattened into an
    /// affected-stop list.
    pub fn expand(&self) -> Vec<StopRef> {
        self.stops
            .iter()
            .map(|stop| StopRef {
                group_id: Some(self.group_id.clone()),
                group_name: Some(Arc::clone(&self.group_name)),
                ..stop.clone()
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stop(code: &str) -> StopRef {
        StopRef::new(StopIdentifier::new(format!("{code}-id")), StopCode::new(code), "Stop", -36.85, 174.76)
    }

    #[test]
    fn test_group_expansion_tags_members() {
        let group = StopGroupRef {
            group_id: StopGroupIdentifier::new("9"),
            group_name: "Britomart".into(),
            stops: vec![stop("100"), stop("101")],
        };

        let expanded = group.expand();
        assert_eq!(expanded.len(), 2);
        assert!(expanded.iter().all(|s| s.group_id == Some(StopGroupIdentifier::new("9"))));
        assert_eq!(expanded[1].group_name.as_deref(), Some("Britomart"));
        // Source records are untouched
        assert!(group.stops.iter().all(|s| s.group_id.is_none()));
    }

    #[test]
    fn test_stop_key_includes_direction_and_group() {
        let plain = stop("200");
        let directed = stop("200").with_direction(DirectionId::Inbound);
        assert_ne!(plain.key(), directed.key());
    }

    #[test]
    fn test_records_use_camel_case() {
        let route = RouteRef::new(RouteIdentifier::new("WEST-201"), "WEST", RouteType::Rail);
        let json = serde_json::to_value(&route).unwrap();
        assert_eq!(json["routeId"], "WEST-201");
        assert_eq!(json["routeShortName"], "WEST");
        assert_eq!(json["routeType"], 2);
        assert!(json.get("shapeWkt").is_none());

        let parsed: StopRef = serde_json::from_str(
            r#"{"stopId":"s1","stopCode":"7036","stopName":"Queen St","stopLat":-36.8,"stopLon":174.7,"directionId":1}"#,
        )
        .unwrap();
        assert_eq!(parsed.direction_id, Some(DirectionId::Inbound));
        assert!(parsed.group_id.is_none());
    }
}
