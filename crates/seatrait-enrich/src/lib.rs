//! # seatrait-enrich
//!
//! Consumers of the trait query engine:
//!
//! - [`enrich_occurrences`] attaches trait highlights to occurrence rows
//!   with one batch query per call
//! - [`TraitSummaries`] builds cached per-species summaries and text reports
//! - [`UpstreamCaches`] memoizes species searches and occurrence downloads
//!   from an upstream service with their own, shorter TTLs
//!
//! Every helper here degrades to an empty result when storage fails; the
//! failure is logged and never returned.

pub mod occurrences;
pub mod summary;
pub mod upstream;

pub use occurrences::{enrich_occurrences, Occurrence, TraitHighlights};
pub use summary::{
    format_trait_value, trait_summary_text, SpeciesTraitSummary, TraitEntry, TraitSummaries,
};
pub use upstream::{cache_stats, clear_all, UpstreamCaches, UpstreamSource};
