//! # seatrait-core
//!
//! Core types, traits, and abstractions for the seatrait marine species
//! trait engine.
//!
//! This crate provides the foundational data structures, repository trait
//! definitions, error type, configuration, and the TTL cache that the
//! storage, overlay, and enrichment crates depend on.

pub mod cache;
pub mod config;
pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use cache::{CacheInfo, CacheKey, Memoized, TtlCache};
pub use config::{CacheConfig, EngineConfig, LookupPaths};
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
