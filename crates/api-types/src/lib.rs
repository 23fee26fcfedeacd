//! JSON wire types for the disruption management and roadworks endpoints.
//!
//! Keys are translated between the API's camelCase (PascalCase for the CARS
//! feature layer) and Rust field names by serde attributes.

pub mod incident;
pub mod roadworks;

pub use incident::*;
pub use roadworks::*;
