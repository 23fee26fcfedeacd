//! Network and IO abstractions.

pub mod traits;

pub use traits::{FetchFuture, ReferenceFetcher};
