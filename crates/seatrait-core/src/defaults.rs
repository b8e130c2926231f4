//! Centralized default constants for seatrait.
//!
//! **This module is the single source of truth** for shared default values.
//! Crates reference these constants instead of defining their own magic
//! numbers.

// =============================================================================
// STORAGE
// =============================================================================

/// Default database file, relative to the data directory.
pub const DATABASE_FILE: &str = "trait_ontology.db";

/// Default data directory.
pub const DATA_DIR: &str = "data";

/// Default number of pooled SQLite connections (one long-lived handle).
pub const DB_MAX_CONNECTIONS: u32 = 1;

/// Busy timeout applied to every SQLite connection, in seconds.
pub const DB_BUSY_TIMEOUT_SECS: u64 = 5;

// =============================================================================
// CACHES
// =============================================================================

/// TTL for trait lookups (1 hour).
pub const TRAIT_CACHE_TTL_SECS: u64 = 3600;

/// TTL for upstream species searches (10 minutes).
pub const SPECIES_CACHE_TTL_SECS: u64 = 600;

/// TTL for upstream occurrence data (5 minutes).
pub const OCCURRENCE_CACHE_TTL_SECS: u64 = 300;

// =============================================================================
// OVERLAY SOURCES
// =============================================================================

/// Phytoplankton biovolume export (morphological source).
pub const BVOL_FILE: &str = "bvol_nomp_version_2024.xlsx";

/// Enriched marine species export (ecological source).
pub const SPECIES_ENRICHED_FILE: &str = "species_enriched.xlsx";

/// Source label of the morphological dataset.
pub const BVOL_SOURCE: &str = "bvol_nomp_version_2024";

/// Source label of the enriched ecological dataset.
pub const SPECIES_ENRICHED_SOURCE: &str = "species_enriched";

// =============================================================================
// QUERIES
// =============================================================================

/// Default result limit for trait range queries.
pub const QUERY_LIMIT: usize = 100;

/// Label used for species whose data source is null in statistics.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// Category label for traits without a category in summaries.
pub const UNCATEGORIZED: &str = "other";
