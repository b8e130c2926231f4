//! Short-lived caches in front of upstream biodiversity services.
//!
//! Species searches and occurrence downloads change on the upstream side,
//! so they are cached for minutes rather than the hour trait data gets.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

use seatrait_core::{AphiaId, CacheConfig, CacheInfo, Memoized};

use crate::summary::TraitSummaries;

/// A remote species and occurrence provider.
///
/// Implementations wrap whichever service is in use; results are passed
/// through as JSON rows.
#[async_trait]
pub trait UpstreamSource: Send + Sync {
    async fn search_species(&self, name: &str, limit: usize) -> anyhow::Result<Vec<Value>>;

    async fn occurrences(&self, aphia_id: AphiaId, limit: usize) -> anyhow::Result<Vec<Value>>;
}

/// Memoized species-search and occurrence calls, each with its own TTL.
pub struct UpstreamCaches<S> {
    source: S,
    species: Memoized<Vec<Value>>,
    occurrences: Memoized<Vec<Value>>,
}

impl<S: UpstreamSource> UpstreamCaches<S> {
    pub fn new(source: S, config: &CacheConfig) -> Self {
        Self {
            source,
            species: Memoized::new("search_species", config.species_ttl),
            occurrences: Memoized::new("occurrences", config.occurrence_ttl),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Species search, cached per name and limit. Errors are not cached.
    pub async fn search_species(&self, name: &str, limit: usize) -> anyhow::Result<Vec<Value>> {
        let key = self.species.key().arg(name).kwarg("limit", limit);
        self.species
            .call(key, || self.source.search_species(name, limit))
            .await
    }

    /// Occurrences of a species, cached per key and limit. Errors are not cached.
    pub async fn occurrences(&self, aphia_id: AphiaId, limit: usize) -> anyhow::Result<Vec<Value>> {
        let key = self.occurrences.key().arg(aphia_id).kwarg("limit", limit);
        self.occurrences
            .call(key, || self.source.occurrences(aphia_id, limit))
            .await
    }

    pub async fn clear(&self) {
        self.species.cache_clear().await;
        self.occurrences.cache_clear().await;
    }

    pub async fn cleanup_expired(&self) -> usize {
        self.species.cache_cleanup().await + self.occurrences.cache_cleanup().await
    }

    pub async fn species_cache_info(&self) -> CacheInfo {
        self.species.cache_info().await
    }

    pub async fn occurrence_cache_info(&self) -> CacheInfo {
        self.occurrences.cache_info().await
    }
}

/// Size and TTL of every cache, keyed by workload class.
pub async fn cache_stats<Q, S>(
    summaries: &TraitSummaries<Q>,
    upstream: &UpstreamCaches<S>,
) -> BTreeMap<&'static str, CacheInfo>
where
    Q: seatrait_core::TraitQueryRepository + ?Sized,
    S: UpstreamSource,
{
    BTreeMap::from([
        ("trait_cache", summaries.cache_info().await),
        ("species_cache", upstream.species_cache_info().await),
        ("occurrence_cache", upstream.occurrence_cache_info().await),
    ])
}

/// Empty every cache.
pub async fn clear_all<Q, S>(summaries: &TraitSummaries<Q>, upstream: &UpstreamCaches<S>)
where
    Q: seatrait_core::TraitQueryRepository + ?Sized,
    S: UpstreamSource,
{
    summaries.clear_cache().await;
    upstream.clear().await;
    info!(subsystem = "cache", "All caches cleared");
}
