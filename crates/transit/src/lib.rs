//! # ops-console-transit
//!
//! Reference data for the disruption console: typed identifiers, route and
//! stop records, stop groups, and the providers that resolve them.
//!
//! ## Features
//!
//! - **Distinct id spaces**: route ids, stop ids, stop codes and stop group ids
//!   cannot be confused with one another
//! - **Spatial queries**: R-tree backed "stops inside a drawn polygon"
//! - **Pluggable networking**: implement `ReferenceFetcher` for your backend
//!
//! ## Example
//!
//! ```
//! use ops_console_transit::prelude::*;
//!
//! let provider = StaticReferenceProvider::from_json(r#"{
//!     "routes": [{"routeId": "INN-202", "routeShortName": "INN", "routeType": 3}],
//!     "stops": [{"stopId": "s1", "stopCode": "7036", "stopName": "Britomart",
//!                "stopLat": -36.8443, "stopLon": 174.7676}],
//!     "patterns": [{"routeId": "INN-202", "directionId": 0, "stopCodes": ["7036"]}]
//! }"#).unwrap();
//!
//! let routes = provider.routes_for_stop(&StopCode::new("7036"));
//! assert_eq!(routes[0].route_short_name.as_ref(), "INN");
//! ```

pub mod identifiers;
pub mod models;
pub mod network;
pub mod provider;
pub mod spatial;

// Re-exports for convenience
pub mod prelude {
    pub use crate::identifiers::*;
    pub use crate::models::{records::*, traits::*, types::*};
    pub use crate::network::traits::*;
    pub use crate::provider::static_provider::{
        ReferenceSnapshot, RoutePattern, StaticReferenceProvider, StopGroupDefinition,
    };
}

pub use prelude::*;
