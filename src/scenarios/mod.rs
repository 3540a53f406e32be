//! Scenario fixtures: schema, loading, and definition checks.
//!
//! Fixture collections are data owned by the generator project; Rust only
//! validates their shape and hands typed definitions to the resolver.
mod load;
mod types;
mod validate;

#[cfg(test)]
pub use load::CollectionSource;
pub use load::{load_suite, read_collection_sources};
pub use types::*;
