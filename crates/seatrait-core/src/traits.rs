//! Core traits for seatrait abstractions.
//!
//! These traits define the interfaces that the storage engine implements,
//! so that callers (enrichment, summaries, caches) can depend on the
//! contract rather than on SQLite.

use async_trait::async_trait;
use std::collections::HashMap;

use crate::error::Result;
use crate::models::*;

// =============================================================================
// SPECIES REGISTRY
// =============================================================================

/// Append-only registry issuing stable internal ids per AphiaID.
#[async_trait]
pub trait SpeciesRepository: Send + Sync {
    /// Register a species, or return the existing id for its AphiaID.
    ///
    /// Attributes supplied for an already registered key are ignored.
    async fn add(&self, req: CreateSpeciesRequest) -> Result<SpeciesId>;

    /// Look up a species by its external key.
    async fn get_by_aphia_id(&self, aphia_id: AphiaId) -> Result<Option<Species>>;
}

// =============================================================================
// TRAIT CATALOG
// =============================================================================

/// Fixed taxonomy of trait categories and definitions.
#[async_trait]
pub trait TraitCatalogRepository: Send + Sync {
    /// Insert the standard categories, skipping any that exist.
    /// Returns the number of newly inserted rows.
    async fn seed_categories(&self) -> Result<u64>;

    /// Insert the standard trait definitions, skipping any that exist.
    /// Returns the number of newly inserted rows.
    async fn seed_traits(&self) -> Result<u64>;

    /// Resolve a trait definition by name.
    async fn get_trait(&self, trait_name: &str) -> Result<Option<TraitDefinition>>;

    /// List trait definitions, optionally restricted to one category name.
    async fn list_traits(&self, category: Option<&str>) -> Result<Vec<TraitDefinition>>;

    /// List all categories ordered by id.
    async fn list_categories(&self) -> Result<Vec<TraitCategory>>;

    /// Rebuild the category hierarchy in memory.
    async fn category_tree(&self) -> Result<Vec<CategoryNode>>;

    /// Relate two traits. Unknown trait names are a logged no-op.
    async fn relate_traits(
        &self,
        trait_name: &str,
        related_trait_name: &str,
        relationship_type: &str,
        description: Option<&str>,
    ) -> Result<Option<i64>>;

    /// Relationships in which the named trait takes part, in either direction.
    async fn related_traits(&self, trait_name: &str) -> Result<Vec<TraitRelationship>>;
}

// =============================================================================
// SIZE CLASSES AND AUXILIARY STORES
// =============================================================================

/// Species-scoped morphological size classes.
#[async_trait]
pub trait SizeClassRepository: Send + Sync {
    async fn add(&self, req: CreateSizeClassRequest) -> Result<SizeClassId>;

    async fn list_for_species(&self, species_id: SpeciesId) -> Result<Vec<SizeClass>>;
}

/// Taxonomic hierarchy (one row per species) and geographic areas (many).
#[async_trait]
pub trait TaxonomyRepository: Send + Sync {
    /// Insert or replace the classification of a species.
    async fn upsert_taxonomy(&self, species_id: SpeciesId, taxonomy: Taxonomy) -> Result<()>;

    async fn get_taxonomy(&self, species_id: SpeciesId) -> Result<Option<Taxonomy>>;

    /// Record one more geographic area for a species.
    async fn add_distribution(
        &self,
        species_id: SpeciesId,
        area_type: &str,
        area_value: &str,
    ) -> Result<i64>;

    async fn list_distribution(&self, species_id: SpeciesId)
        -> Result<Vec<GeographicDistribution>>;
}

// =============================================================================
// TRAIT VALUES
// =============================================================================

/// The polymorphic fact table.
#[async_trait]
pub trait TraitValueRepository: Send + Sync {
    /// Store a trait assertion.
    ///
    /// Returns `Ok(None)` without inserting when the trait is unknown, the
    /// value is null/NaN, or the value cannot be coerced to the declared type.
    async fn add(&self, req: CreateTraitValueRequest) -> Result<Option<TraitValueId>>;
}

// =============================================================================
// QUERY ENGINE
// =============================================================================

/// Read surface over the trait value store.
///
/// Absent species, unknown traits, and empty key lists produce empty
/// results; only storage failures are errors.
#[async_trait]
pub trait TraitQueryRepository: Send + Sync {
    async fn species_by_aphia_id(&self, aphia_id: AphiaId) -> Result<Option<Species>>;

    /// Trait rows for one species, ordered by trait name then size class.
    async fn traits_for_species(
        &self,
        aphia_id: AphiaId,
        category: Option<&str>,
    ) -> Result<Vec<TraitRecord>>;

    /// Trait rows for many species in a single query.
    ///
    /// The map holds exactly one entry per distinct requested key.
    async fn traits_for_species_batch(
        &self,
        aphia_ids: &[AphiaId],
        category: Option<&str>,
    ) -> Result<HashMap<AphiaId, Vec<TraitRecord>>>;

    /// Species whose value for a trait satisfies the predicate.
    async fn species_by_trait(&self, predicate: &TraitPredicate)
        -> Result<Vec<SpeciesTraitMatch>>;

    async fn statistics(&self) -> Result<TraitStatistics>;
}
