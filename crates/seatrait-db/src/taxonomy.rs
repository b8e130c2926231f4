//! Taxonomic hierarchy and geographic distribution stores.

use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};
use tracing::debug;

use seatrait_core::{
    Error, GeographicDistribution, Result, SpeciesId, Taxonomy, TaxonomyRepository,
};

/// SQLite implementation of TaxonomyRepository.
#[derive(Clone)]
pub struct SqliteTaxonomyRepository {
    pool: Pool<Sqlite>,
}

impl SqliteTaxonomyRepository {
    /// Create a new SqliteTaxonomyRepository with the given connection pool.
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaxonomyRepository for SqliteTaxonomyRepository {
    async fn upsert_taxonomy(&self, species_id: SpeciesId, taxonomy: Taxonomy) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO taxonomic_hierarchy
                (species_id, kingdom, phylum, division, class, order_name, family, genus, species, rank)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT (species_id) DO UPDATE SET
                kingdom = excluded.kingdom,
                phylum = excluded.phylum,
                division = excluded.division,
                class = excluded.class,
                order_name = excluded.order_name,
                family = excluded.family,
                genus = excluded.genus,
                species = excluded.species,
                rank = excluded.rank
            "#,
        )
        .bind(species_id)
        .bind(&taxonomy.kingdom)
        .bind(&taxonomy.phylum)
        .bind(&taxonomy.division)
        .bind(&taxonomy.class_name)
        .bind(&taxonomy.order_name)
        .bind(&taxonomy.family)
        .bind(&taxonomy.genus)
        .bind(&taxonomy.species)
        .bind(&taxonomy.rank)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "taxonomy",
            op = "upsert",
            species_id,
            "Taxonomy stored"
        );
        Ok(())
    }

    async fn get_taxonomy(&self, species_id: SpeciesId) -> Result<Option<Taxonomy>> {
        let row = sqlx::query(
            r#"
            SELECT kingdom, phylum, division, class, order_name, family, genus, species, rank
            FROM taxonomic_hierarchy
            WHERE species_id = ?
            "#,
        )
        .bind(species_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|row| Taxonomy {
            kingdom: row.get("kingdom"),
            phylum: row.get("phylum"),
            division: row.get("division"),
            class_name: row.get("class"),
            order_name: row.get("order_name"),
            family: row.get("family"),
            genus: row.get("genus"),
            species: row.get("species"),
            rank: row.get("rank"),
        }))
    }

    async fn add_distribution(
        &self,
        species_id: SpeciesId,
        area_type: &str,
        area_value: &str,
    ) -> Result<i64> {
        let result = sqlx::query(
            "INSERT INTO geographic_distribution (species_id, area_type, area_value) VALUES (?, ?, ?)",
        )
        .bind(species_id)
        .bind(area_type)
        .bind(area_value)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(result.last_insert_rowid())
    }

    async fn list_distribution(
        &self,
        species_id: SpeciesId,
    ) -> Result<Vec<GeographicDistribution>> {
        let rows = sqlx::query(
            r#"
            SELECT distribution_id, species_id, area_type, area_value
            FROM geographic_distribution
            WHERE species_id = ?
            ORDER BY distribution_id
            "#,
        )
        .bind(species_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .iter()
            .map(|row| GeographicDistribution {
                distribution_id: row.get("distribution_id"),
                species_id: row.get("species_id"),
                area_type: row.get("area_type"),
                area_value: row.get("area_value"),
            })
            .collect())
    }
}
