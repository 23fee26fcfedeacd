//! Reference data providers.

pub mod static_provider;

pub use static_provider::{
    ReferenceSnapshot, RoutePattern, StaticReferenceProvider, StopGroupDefinition,
};
