//! # seatrait-db
//!
//! SQLite storage engine for the seatrait marine trait ontology.
//!
//! This crate provides:
//! - Connection pool management and idempotent schema creation
//! - The species registry and the seeded trait catalog
//! - Size-class, taxonomy and geographic distribution stores
//! - The polymorphic trait value store
//! - Single-species, batch and predicate queries plus statistics
//! - A TTL-cached decorator over the query engine
//!
//! ## Example
//!
//! ```rust,ignore
//! use seatrait_db::{CreateSpeciesRequest, CreateTraitValueRequest, Database};
//! use seatrait_db::{SpeciesRepository, TraitQueryRepository, TraitValueRepository};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let db = Database::open("data/trait_ontology.db").await?;
//!     db.seed().await?;
//!
//!     let id = db
//!         .species
//!         .add(CreateSpeciesRequest::new(148984).scientific_name("Fucus vesiculosus"))
//!         .await?;
//!     db.trait_values
//!         .add(CreateTraitValueRequest::new(id, "biovolume", 125.5))
//!         .await?;
//!
//!     let traits = db.queries.traits_for_species_batch(&[148984, 999999], None).await?;
//!     println!("{} species", traits.len());
//!     Ok(())
//! }
//! ```
pub mod cached;
pub mod catalog;
pub mod pool;
pub mod queries;
pub mod schema;
pub mod size_classes;
pub mod species;
pub mod taxonomy;
pub mod trait_values;

// Test fixtures for integration tests
// Note: Always compiled so integration tests (in tests/) and downstream crates can use them
pub mod test_fixtures;

use std::path::Path;

// Re-export core types
pub use seatrait_core::*;

// Re-export repository implementations
pub use cached::CachedTraitQueries;
pub use catalog::{build_category_tree, SqliteTraitCatalogRepository, CATEGORY_SEEDS, TRAIT_SEEDS};
pub use pool::{create_pool, create_pool_with_config, log_pool_metrics, PoolConfig};
pub use queries::SqliteTraitQueryRepository;
pub use schema::{ensure_schema, missing_tables};
pub use size_classes::{parse_size_range, SqliteSizeClassRepository};
pub use species::SqliteSpeciesRepository;
pub use taxonomy::SqliteTaxonomyRepository;
pub use trait_values::SqliteTraitValueRepository;

/// Combined database context with all repositories.
#[derive(Clone)]
pub struct Database {
    /// The underlying connection pool.
    pub pool: sqlx::Pool<sqlx::Sqlite>,
    /// Species registry keyed by AphiaID.
    pub species: SqliteSpeciesRepository,
    /// Trait categories, definitions and relationships.
    pub catalog: SqliteTraitCatalogRepository,
    /// Species-scoped size classes.
    pub size_classes: SqliteSizeClassRepository,
    /// Taxonomic hierarchy and geographic distribution.
    pub taxonomy: SqliteTaxonomyRepository,
    /// Polymorphic trait value store.
    pub trait_values: SqliteTraitValueRepository,
    /// Read-side query engine.
    pub queries: SqliteTraitQueryRepository,
}

impl Database {
    /// Create a new Database instance from a connection pool.
    ///
    /// The schema is assumed to exist; see [`Database::open`].
    pub fn new(pool: sqlx::Pool<sqlx::Sqlite>) -> Self {
        Self {
            species: SqliteSpeciesRepository::new(pool.clone()),
            catalog: SqliteTraitCatalogRepository::new(pool.clone()),
            size_classes: SqliteSizeClassRepository::new(pool.clone()),
            taxonomy: SqliteTaxonomyRepository::new(pool.clone()),
            trait_values: SqliteTraitValueRepository::new(pool.clone()),
            queries: SqliteTraitQueryRepository::new(pool.clone()),
            pool,
        }
    }

    /// Open (creating if absent) the database file and ensure the schema.
    ///
    /// An unwritable location is the one fatal error of the engine.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_config(path, PoolConfig::default()).await
    }

    /// Open with explicit pool settings.
    pub async fn open_with_config(path: impl AsRef<Path>, config: PoolConfig) -> Result<Self> {
        let pool = create_pool_with_config(path, config).await?;
        ensure_schema(&pool).await?;
        Ok(Self::new(pool))
    }

    /// Open the database named by an engine configuration.
    pub async fn from_config(config: &EngineConfig) -> Result<Self> {
        let pool_config = PoolConfig::new().max_connections(config.max_connections);
        Self::open_with_config(&config.database_path, pool_config).await
    }

    /// Seed the trait categories, then the trait definitions.
    pub async fn seed(&self) -> Result<()> {
        self.catalog.seed_categories().await?;
        self.catalog.seed_traits().await?;
        Ok(())
    }

    /// A cached view of the query engine using the trait TTL.
    pub fn cached_queries(&self, config: &CacheConfig) -> CachedTraitQueries<SqliteTraitQueryRepository> {
        CachedTraitQueries::from_config(self.queries.clone(), config)
    }

    /// Close all pooled connections.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}
