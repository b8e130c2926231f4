//! Engine configuration.
//!
//! ## Environment variables
//!
//! - `SEATRAIT_DATA_DIR`: base directory for the database and overlay files (default: `data`)
//! - `SEATRAIT_DB_PATH`: database file (default: `<data dir>/trait_ontology.db`)
//! - `SEATRAIT_DB_MAX_CONNECTIONS`: pooled connections (default: 1)
//! - `SEATRAIT_BVOL_PATH`: morphological overlay source
//! - `SEATRAIT_SPECIES_ENRICHED_PATH`: ecological overlay source
//! - `SEATRAIT_TRAIT_CACHE_TTL`: trait cache TTL in seconds (default: 3600)
//! - `SEATRAIT_SPECIES_CACHE_TTL`: species search cache TTL in seconds (default: 600)
//! - `SEATRAIT_OCCURRENCE_CACHE_TTL`: occurrence cache TTL in seconds (default: 300)

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::defaults;

/// Parse a variable, logging and discarding a value that does not parse.
fn parse_var<T, F>(var: &F, name: &str) -> Option<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    let raw = var(name)?;
    match raw.trim().parse() {
        Ok(value) => Some(value),
        Err(_) => {
            warn!(
                subsystem = "config",
                variable = name,
                value = %raw,
                "Unparsable configuration value, using default"
            );
            None
        }
    }
}

/// TTLs of the per-workload caches.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheConfig {
    pub trait_ttl: Duration,
    pub species_ttl: Duration,
    pub occurrence_ttl: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            trait_ttl: Duration::from_secs(defaults::TRAIT_CACHE_TTL_SECS),
            species_ttl: Duration::from_secs(defaults::SPECIES_CACHE_TTL_SECS),
            occurrence_ttl: Duration::from_secs(defaults::OCCURRENCE_CACHE_TTL_SECS),
        }
    }
}

/// File paths of the two overlay sources.
#[derive(Debug, Clone, PartialEq)]
pub struct LookupPaths {
    pub bvol_path: PathBuf,
    pub species_enriched_path: PathBuf,
}

impl LookupPaths {
    /// Default file names resolved against a base directory.
    pub fn with_base(base: impl AsRef<Path>) -> Self {
        let base = base.as_ref();
        Self {
            bvol_path: base.join(defaults::BVOL_FILE),
            species_enriched_path: base.join(defaults::SPECIES_ENRICHED_FILE),
        }
    }
}

impl Default for LookupPaths {
    fn default() -> Self {
        Self::with_base(defaults::DATA_DIR)
    }
}

/// Top-level configuration for the storage engine and overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub database_path: PathBuf,
    pub max_connections: u32,
    pub cache: CacheConfig,
    pub lookup: LookupPaths,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::with_data_dir(defaults::DATA_DIR)
    }
}

impl EngineConfig {
    /// Defaults rooted at a data directory.
    pub fn with_data_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            database_path: dir.join(defaults::DATABASE_FILE),
            max_connections: defaults::DB_MAX_CONNECTIONS,
            cache: CacheConfig::default(),
            lookup: LookupPaths::with_base(dir),
        }
    }

    /// Build configuration from `SEATRAIT_*` environment variables.
    ///
    /// Unset values fall back to defaults; unparsable ones are logged and
    /// fall back as well.
    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let data_dir = var("SEATRAIT_DATA_DIR").unwrap_or_else(|| defaults::DATA_DIR.to_string());
        let mut config = Self::with_data_dir(&data_dir);

        if let Some(path) = var("SEATRAIT_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }
        if let Some(n) = parse_var(&var, "SEATRAIT_DB_MAX_CONNECTIONS") {
            config.max_connections = n;
        }
        if let Some(path) = var("SEATRAIT_BVOL_PATH") {
            config.lookup.bvol_path = PathBuf::from(path);
        }
        if let Some(path) = var("SEATRAIT_SPECIES_ENRICHED_PATH") {
            config.lookup.species_enriched_path = PathBuf::from(path);
        }

        let secs = |name: &str| parse_var::<u64, _>(&var, name);
        if let Some(s) = secs("SEATRAIT_TRAIT_CACHE_TTL") {
            config.cache.trait_ttl = Duration::from_secs(s);
        }
        if let Some(s) = secs("SEATRAIT_SPECIES_CACHE_TTL") {
            config.cache.species_ttl = Duration::from_secs(s);
        }
        if let Some(s) = secs("SEATRAIT_OCCURRENCE_CACHE_TTL") {
            config.cache.occurrence_ttl = Duration::from_secs(s);
        }

        config
    }

    /// Set the database file.
    pub fn database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.database_path = path.into();
        self
    }

    /// Set the maximum number of pooled connections.
    pub fn max_connections(mut self, n: u32) -> Self {
        self.max_connections = n;
        self
    }

    /// Set the overlay source paths.
    pub fn lookup(mut self, lookup: LookupPaths) -> Self {
        self.lookup = lookup;
        self
    }

    /// Set the cache TTLs.
    pub fn cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }
}
