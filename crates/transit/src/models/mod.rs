//! Reference data models, types, and traits.

pub mod records;
pub mod traits;
pub mod types;

// Re-exports for convenience
pub use records::{RouteRef, RouteShape, StopGroupRef, StopKey, StopRef};
pub use traits::ReferenceDataProvider;
pub use types::{DirectionId, RouteType, TransitError, Result};
