//! R-tree nodes for spatial indexing.
//!
//! Wraps stops with their position for map-drawing queries. Polygon queries
//! first filter on the polygon's bounding box inside the R-tree, then on
//! containment.

use geo::Point;
use rstar::{RTreeObject, AABB};

use crate::identifiers::StopCode;

#[derive(Clone, Debug)]
pub struct StopNode {
    pub stop_code: StopCode,
    pub location: Point,
    point: [f64; 2],
}

impl StopNode {
    pub fn new(location: Point, stop_code: StopCode) -> Self {
        Self {
            stop_code,
            location,
            point: [location.x(), location.y()],
        }
    }
}

impl RTreeObject for StopNode {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.point)
    }
}
