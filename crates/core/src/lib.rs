//! Core of the operations console: affected-entity reconciliation for
//! disruption drafting, reference lookups, incident payloads, the roadworks
//! overlay, and the REST plumbing around them.

pub mod affected;
pub mod client;
pub mod config;
pub mod error;
pub mod incident;
pub mod logging;
pub mod lookup;
pub mod polling;
pub mod roadworks;
pub mod store;

// Re-export transit from the transit crate
pub use ops_console_transit as transit;

pub use affected::{AffectedEntitySet, EntityRef, RouteAffectation, SelectionPhase, SelectionStep, SelectionWarning};
pub use client::ConsoleClient;
pub use config::ConsoleConfig;
pub use error::{ConsoleError, Result};
pub use incident::{DisruptionDraft, IncidentDraft, ValidationError};
pub use lookup::{LookupBatch, LookupOutcome, LookupPlan, RemoteLookupCoordinator};
pub use polling::{DisruptionFeed, DisruptionListState, DisruptionPoller};
pub use roadworks::{CarActivation, RoadworksService, RoadworksSource};
pub use store::Store;
