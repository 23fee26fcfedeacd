//! Spatial indexing for map-drawing queries.

pub mod index;
