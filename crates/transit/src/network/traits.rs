//! Pluggable networking traits.
//!
//! External crates implement these to provide reference-data fetching. The
//! console's lookup coordinator only ever talks to a `ReferenceFetcher`.

use std::future::Future;
use std::pin::Pin;

use crate::identifiers::*;
use crate::models::records::*;
use crate::models::types::Result;

pub type FetchFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T>> + Send + 'a>>;

/// Fetch cross-reference data for entities already in a selection
pub trait ReferenceFetcher: Send + Sync {
    /// Stops served by a route, each tagged with its direction
    fn fetch_stops_for_route<'a>(&'a self, route_id: &'a RouteIdentifier) -> FetchFuture<'a, Vec<StopRef>>;

    /// Routes serving a stop
    fn fetch_routes_for_stop<'a>(&'a self, stop_code: &'a StopCode) -> FetchFuture<'a, Vec<RouteRef>>;

    /// Shape geometry (WKT) and display colour of a route
    fn fetch_route_shape<'a>(&'a self, route_id: &'a RouteIdentifier) -> FetchFuture<'a, RouteShape>;
}
