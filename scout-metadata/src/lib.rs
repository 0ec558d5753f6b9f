#![warn(missing_docs, clippy::missing_docs_in_private_items)]

//! Metadata sources for Scout.
//!
//! Every source implements [`MetadataSource`](scout_suggest::MetadataSource).
//! Leaf sources produce metadata (from the autocomplete service, or from a
//! fixture in development). Combinators such as the memory cache and the
//! timeout wrap another source. [`make_source_tree`] assembles them from
//! configuration.

mod maker;
mod sources;

pub use maker::make_source_tree;
pub use sources::{
    fixed::FixedSource, http::HttpSource, memory::MemoryCacheSource, timeout::TimeoutSource,
};
