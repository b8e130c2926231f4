//! Cached query decorator.
//!
//! [`CachedTraitQueries`] wraps any [`TraitQueryRepository`] and memoizes
//! its reads in the long-TTL trait caches. Batch requests are answered from
//! per-species entries, and only the missing keys reach the wrapped engine,
//! in a single batch call.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use seatrait_core::{
    AphiaId, CacheConfig, CacheInfo, CacheKey, Memoized, Result, Species, SpeciesTraitMatch,
    TraitPredicate, TraitQueryRepository, TraitRecord, TraitStatistics, TtlCache,
};

fn traits_key(aphia_id: AphiaId, category: Option<&str>) -> String {
    CacheKey::new("traits_for_species")
        .arg(aphia_id)
        .opt_kwarg("category", category)
        .to_string()
}

/// Memoizing wrapper around a trait query engine.
pub struct CachedTraitQueries<Q> {
    inner: Q,
    species: Memoized<Option<Species>>,
    traits: TtlCache<Vec<TraitRecord>>,
    matches: Memoized<Vec<SpeciesTraitMatch>>,
    statistics: Memoized<TraitStatistics>,
}

impl<Q: TraitQueryRepository> CachedTraitQueries<Q> {
    /// Wrap `inner`, expiring entries after `ttl`.
    pub fn new(inner: Q, ttl: Duration) -> Self {
        Self {
            inner,
            species: Memoized::new("species_by_aphia_id", ttl),
            traits: TtlCache::new("traits_for_species", ttl),
            matches: Memoized::new("species_by_trait", ttl),
            statistics: Memoized::new("statistics", ttl),
        }
    }

    /// Wrap `inner` with the configured trait TTL.
    pub fn from_config(inner: Q, config: &CacheConfig) -> Self {
        Self::new(inner, config.trait_ttl)
    }

    /// The wrapped engine, for uncached access.
    pub fn inner(&self) -> &Q {
        &self.inner
    }

    /// Drop every memoized result.
    pub async fn clear(&self) {
        self.species.cache_clear().await;
        self.traits.clear().await;
        self.matches.cache_clear().await;
        self.statistics.cache_clear().await;
    }

    /// Remove expired entries from every cache.
    pub async fn cleanup_expired(&self) -> usize {
        self.species.cache_cleanup().await
            + self.traits.cleanup_expired().await
            + self.matches.cache_cleanup().await
            + self.statistics.cache_cleanup().await
    }

    pub async fn cache_info(&self) -> Vec<CacheInfo> {
        vec![
            self.species.cache_info().await,
            self.traits.info().await,
            self.matches.cache_info().await,
            self.statistics.cache_info().await,
        ]
    }
}

#[async_trait]
impl<Q: TraitQueryRepository> TraitQueryRepository for CachedTraitQueries<Q> {
    async fn species_by_aphia_id(&self, aphia_id: AphiaId) -> Result<Option<Species>> {
        let key = self.species.key().arg(aphia_id);
        self.species
            .call(key, || self.inner.species_by_aphia_id(aphia_id))
            .await
    }

    async fn traits_for_species(
        &self,
        aphia_id: AphiaId,
        category: Option<&str>,
    ) -> Result<Vec<TraitRecord>> {
        self.traits
            .get_or_insert_with(traits_key(aphia_id, category), || {
                self.inner.traits_for_species(aphia_id, category)
            })
            .await
    }

    async fn traits_for_species_batch(
        &self,
        aphia_ids: &[AphiaId],
        category: Option<&str>,
    ) -> Result<HashMap<AphiaId, Vec<TraitRecord>>> {
        let mut results = HashMap::new();
        let mut seen = HashSet::new();
        let mut misses = Vec::new();

        for &aphia_id in aphia_ids {
            if !seen.insert(aphia_id) {
                continue;
            }
            match self.traits.get(&traits_key(aphia_id, category)).await {
                Some(records) => {
                    results.insert(aphia_id, records);
                }
                None => misses.push(aphia_id),
            }
        }

        debug!(
            subsystem = "cache",
            component = "queries",
            op = "batch",
            key_count = seen.len(),
            hits = results.len(),
            misses = misses.len(),
            "Batch cache lookup"
        );

        if misses.is_empty() {
            return Ok(results);
        }

        let mut fetched = self
            .inner
            .traits_for_species_batch(&misses, category)
            .await?;
        for aphia_id in misses {
            let records = fetched.remove(&aphia_id).unwrap_or_default();
            self.traits
                .set(traits_key(aphia_id, category), records.clone())
                .await;
            results.insert(aphia_id, records);
        }
        Ok(results)
    }

    async fn species_by_trait(
        &self,
        predicate: &TraitPredicate,
    ) -> Result<Vec<SpeciesTraitMatch>> {
        let key = self
            .matches
            .key()
            .arg(&predicate.trait_name)
            .opt_kwarg("min_value", predicate.min_value)
            .opt_kwarg("max_value", predicate.max_value)
            .opt_kwarg("categorical_value", predicate.categorical_value.as_deref());
        self.matches
            .call(key, || self.inner.species_by_trait(predicate))
            .await
    }

    async fn statistics(&self) -> Result<TraitStatistics> {
        let key = self.statistics.key();
        self.statistics
            .call(key, || self.inner.statistics())
            .await
    }
}
