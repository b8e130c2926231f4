//! # seatrait-lookup
//!
//! Spreadsheet-backed trait overlay. Two sheets keyed by AphiaID, either
//! workbooks or delimited exports, are read lazily and kept in memory:
//!
//! - the phytoplankton biovolume list, with one row per size class
//! - the enriched marine species list, with one row per species
//!
//! The overlay is independent of the relational store and never writes.
//!
//! ```rust,ignore
//! use seatrait_lookup::{LookupPaths, TraitLookup};
//!
//! let lookup = TraitLookup::new(LookupPaths::with_base("data"));
//! if let Some(traits) = lookup.phytoplankton_traits(148984) {
//!     println!("{} size classes", traits.size_classes().len());
//! }
//! ```

pub mod enriched;
pub mod lookup;
pub mod phytoplankton;
pub mod sheet;

pub use enriched::SpeciesTraits;
pub use lookup::{
    AllTraits, LoadStatus, OverlaySource, OverlayStatistics, SearchHit, SourceStatistics,
    TraitLookup,
};
pub use phytoplankton::{
    GeographicAreas, PhytoplanktonRecord, PhytoplanktonTraits, SingleSizeClass, SizeClassSet,
};
pub use seatrait_core::LookupPaths;
pub use sheet::Sheet;
