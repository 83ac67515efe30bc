//! App Store lookup client and the enrichment pass built on it.

pub mod client;
pub mod enrich;
pub mod error;
pub mod normalize;
pub(crate) mod retry;
pub mod types;

pub use client::LookupClient;
pub use enrich::{enrich_terms, Enrichment, EnrichmentReport, TermFailure};
pub use error::LookupError;
pub use normalize::normalize_app;
pub use types::{ItunesApp, SearchResponse};
