//! Trait catalog: category hierarchy, trait definitions and relationships.
//!
//! The catalog is a fixed vocabulary. Seeding inserts rows that are missing
//! by unique name and leaves existing rows untouched, so it can run on every
//! start.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};
use tracing::{debug, info, warn};

use seatrait_core::ValueType::{Categorical, Numeric, Text};
use seatrait_core::{
    CategoryId, CategoryNode, Error, Result, TraitCatalogRepository, TraitCategory,
    TraitDefinition, TraitId, TraitRelationship, ValueType,
};

/// A category row of the seed table.
#[derive(Debug, Clone, Copy)]
pub struct CategorySeed {
    pub name: &'static str,
    /// Position of the parent within [`CATEGORY_SEEDS`]. Parents precede
    /// their children.
    pub parent: Option<usize>,
    pub description: &'static str,
}

/// A trait definition row of the seed table.
#[derive(Debug, Clone, Copy)]
pub struct TraitSeed {
    pub name: &'static str,
    pub category: &'static str,
    pub data_type: ValueType,
    pub unit: Option<&'static str>,
    pub description: &'static str,
}

const fn category(
    name: &'static str,
    parent: Option<usize>,
    description: &'static str,
) -> CategorySeed {
    CategorySeed {
        name,
        parent,
        description,
    }
}

const fn definition(
    name: &'static str,
    category: &'static str,
    data_type: ValueType,
    unit: Option<&'static str>,
    description: &'static str,
) -> TraitSeed {
    TraitSeed {
        name,
        category,
        data_type,
        unit,
        description,
    }
}

const MORPHOLOGICAL: Option<usize> = Some(0);
const ECOLOGICAL: Option<usize> = Some(1);
const TROPHIC: Option<usize> = Some(2);

pub const CATEGORY_SEEDS: &[CategorySeed] = &[
    category("morphological", None, "Physical form and structure"),
    category("ecological", None, "Ecological characteristics and behaviors"),
    category("trophic", None, "Feeding and nutritional characteristics"),
    category("behavioral", None, "Behavioral traits and patterns"),
    category("geographic", None, "Geographic distribution and habitat"),
    category("taxonomic", None, "Taxonomic classification"),
    category("physiological", None, "Physiological characteristics"),
    category("size", MORPHOLOGICAL, "Size measurements"),
    category("shape", MORPHOLOGICAL, "Geometric shape and form"),
    category("biomass", MORPHOLOGICAL, "Biomass and carbon content"),
    category("abundance", ECOLOGICAL, "Population abundance"),
    category("mobility", ECOLOGICAL, "Movement and mobility patterns"),
    category("habitat", ECOLOGICAL, "Habitat preferences and position"),
    category("feeding_mode", TROPHIC, "Feeding method and strategy"),
    category("diet", TROPHIC, "Diet and food sources"),
];

const MICRON: Option<&str> = Some("μm");

pub const TRAIT_SEEDS: &[TraitSeed] = &[
    // size
    definition("length_l1", "size", Numeric, MICRON, "Primary length measurement"),
    definition("length_l2", "size", Numeric, MICRON, "Secondary length measurement"),
    definition("width", "size", Numeric, MICRON, "Width measurement"),
    definition("height", "size", Numeric, MICRON, "Height measurement"),
    definition("diameter_d1", "size", Numeric, MICRON, "Primary diameter"),
    definition("diameter_d2", "size", Numeric, MICRON, "Secondary diameter"),
    definition("filament_length", "size", Numeric, MICRON, "Filament length per cell"),
    // shape
    definition("geometric_shape", "shape", Categorical, None, "Geometric shape"),
    definition("growth_form", "shape", Categorical, None, "Growth form"),
    definition("body_flexibility", "morphological", Categorical, None, "Body flexibility"),
    // biomass
    definition("biovolume", "biomass", Numeric, Some("μm³"), "Calculated biovolume"),
    definition("carbon_content", "biomass", Numeric, Some("pg"), "Carbon content"),
    definition("cells_per_unit", "biomass", Numeric, Some("count"), "Number of cells per counting unit"),
    // trophic
    definition("trophic_type", "trophic", Categorical, None, "Trophic type (AU, HE, etc.)"),
    definition("feeding_method", "feeding_mode", Categorical, None, "Characteristic feeding method"),
    definition("diet_food_source", "diet", Text, None, "Diet and food sources"),
    definition("feeds_on", "diet", Text, None, "What species typically feeds on"),
    // ecological
    definition("typical_abundance", "abundance", Categorical, None, "Typical abundance"),
    definition("growth_rate", "ecological", Categorical, None, "Growth rate"),
    definition("mobility", "mobility", Categorical, None, "Mobility level"),
    definition("sociability", "behavioral", Categorical, None, "Social behavior"),
    definition("environmental_position", "habitat", Categorical, None, "Environmental position"),
    definition("dependency", "ecological", Categorical, None, "Dependency on other species"),
    definition("supports", "ecological", Text, None, "What species supports"),
    // size at maturity
    definition("male_size_range", "size", Text, None, "Male size range"),
    definition("female_size_range", "size", Text, None, "Female size range"),
    definition("male_size_at_maturity", "size", Text, None, "Male size at maturity"),
    definition("female_size_at_maturity", "size", Text, None, "Female size at maturity"),
    // other
    definition("is_harmful", "ecological", Categorical, None, "Is species harmful"),
];

const TRAIT_COLUMNS: &str = "t.trait_id, t.trait_name, t.category_id, tc.category_name, \
     t.data_type, t.unit, t.description";

fn category_from_row(row: &SqliteRow) -> TraitCategory {
    TraitCategory {
        category_id: row.get("category_id"),
        category_name: row.get("category_name"),
        parent_category_id: row.get("parent_category_id"),
        description: row.get("description"),
    }
}

fn definition_from_row(row: &SqliteRow) -> Result<TraitDefinition> {
    let data_type: String = row.get("data_type");
    Ok(TraitDefinition {
        trait_id: row.get("trait_id"),
        trait_name: row.get("trait_name"),
        category_id: row.get("category_id"),
        category_name: row.get("category_name"),
        data_type: data_type.parse().map_err(Error::Internal)?,
        unit: row.get("unit"),
        description: row.get("description"),
    })
}

/// Rebuild the category hierarchy from a flat list ordered by id.
///
/// Categories whose parent is not in the list are treated as roots.
pub fn build_category_tree(categories: Vec<TraitCategory>) -> Vec<CategoryNode> {
    let known: HashSet<CategoryId> = categories.iter().map(|c| c.category_id).collect();
    let mut children: HashMap<CategoryId, Vec<TraitCategory>> = HashMap::new();
    let mut roots = Vec::new();

    for category in categories {
        match category.parent_category_id.filter(|p| known.contains(p)) {
            Some(parent) => children.entry(parent).or_default().push(category),
            None => roots.push(category),
        }
    }

    roots
        .into_iter()
        .map(|root| attach_children(root, &mut children))
        .collect()
}

fn attach_children(
    category: TraitCategory,
    children: &mut HashMap<CategoryId, Vec<TraitCategory>>,
) -> CategoryNode {
    let direct = children.remove(&category.category_id).unwrap_or_default();
    CategoryNode {
        children: direct
            .into_iter()
            .map(|child| attach_children(child, children))
            .collect(),
        category,
    }
}

/// SQLite implementation of TraitCatalogRepository.
#[derive(Clone)]
pub struct SqliteTraitCatalogRepository {
    pool: Pool<Sqlite>,
}

impl SqliteTraitCatalogRepository {
    /// Create a new SqliteTraitCatalogRepository with the given connection pool.
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    async fn trait_id(&self, trait_name: &str) -> Result<Option<TraitId>> {
        sqlx::query_scalar("SELECT trait_id FROM traits WHERE trait_name = ?")
            .bind(trait_name)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)
    }
}

#[async_trait]
impl TraitCatalogRepository for SqliteTraitCatalogRepository {
    async fn seed_categories(&self) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;
        let mut ids: Vec<Option<CategoryId>> = Vec::with_capacity(CATEGORY_SEEDS.len());
        let mut inserted = 0u64;

        for seed in CATEGORY_SEEDS {
            let parent_id = match seed.parent {
                Some(position) => {
                    let parent = ids.get(position).copied().flatten();
                    if parent.is_none() {
                        warn!(
                            subsystem = "db",
                            component = "catalog",
                            op = "seed_categories",
                            category = seed.name,
                            parent_position = position,
                            "Parent not seeded before child, storing as top-level"
                        );
                    }
                    parent
                }
                None => None,
            };

            let result = sqlx::query(
                r#"
                INSERT INTO trait_categories (category_name, parent_category_id, description)
                VALUES (?, ?, ?)
                ON CONFLICT (category_name) DO NOTHING
                "#,
            )
            .bind(seed.name)
            .bind(parent_id)
            .bind(seed.description)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
            inserted += result.rows_affected();

            let id: CategoryId =
                sqlx::query_scalar("SELECT category_id FROM trait_categories WHERE category_name = ?")
                    .bind(seed.name)
                    .fetch_one(&mut *tx)
                    .await
                    .map_err(Error::Database)?;
            ids.push(Some(id));
        }

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "catalog",
            op = "seed_categories",
            inserted,
            total = CATEGORY_SEEDS.len(),
            "Trait categories seeded"
        );
        Ok(inserted)
    }

    async fn seed_traits(&self) -> Result<u64> {
        let mut tx = self.pool.begin().await.map_err(Error::Database)?;

        let rows = sqlx::query("SELECT category_id, category_name FROM trait_categories")
            .fetch_all(&mut *tx)
            .await
            .map_err(Error::Database)?;
        let categories: HashMap<String, CategoryId> = rows
            .iter()
            .map(|row| (row.get("category_name"), row.get("category_id")))
            .collect();

        let mut inserted = 0u64;
        for seed in TRAIT_SEEDS {
            let category_id = categories.get(seed.category).copied();
            if category_id.is_none() {
                warn!(
                    subsystem = "db",
                    component = "catalog",
                    op = "seed_traits",
                    trait_name = seed.name,
                    category = seed.category,
                    "Category not found, trait stored without category"
                );
            }

            let result = sqlx::query(
                r#"
                INSERT INTO traits (trait_name, category_id, data_type, unit, description)
                VALUES (?, ?, ?, ?, ?)
                ON CONFLICT (trait_name) DO NOTHING
                "#,
            )
            .bind(seed.name)
            .bind(category_id)
            .bind(seed.data_type.as_str())
            .bind(seed.unit)
            .bind(seed.description)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
            inserted += result.rows_affected();
        }

        tx.commit().await.map_err(Error::Database)?;

        info!(
            subsystem = "db",
            component = "catalog",
            op = "seed_traits",
            inserted,
            total = TRAIT_SEEDS.len(),
            "Trait definitions seeded"
        );
        Ok(inserted)
    }

    async fn get_trait(&self, trait_name: &str) -> Result<Option<TraitDefinition>> {
        let row = sqlx::query(&format!(
            r#"
            SELECT {TRAIT_COLUMNS}
            FROM traits t
            LEFT JOIN trait_categories tc ON t.category_id = tc.category_id
            WHERE t.trait_name = ?
            "#
        ))
        .bind(trait_name)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        row.as_ref().map(definition_from_row).transpose()
    }

    async fn list_traits(&self, category: Option<&str>) -> Result<Vec<TraitDefinition>> {
        let rows = match category {
            Some(category) => {
                sqlx::query(&format!(
                    r#"
                    SELECT {TRAIT_COLUMNS}
                    FROM traits t
                    JOIN trait_categories tc ON t.category_id = tc.category_id
                    WHERE tc.category_name = ?
                    ORDER BY t.trait_name
                    "#
                ))
                .bind(category)
                .fetch_all(&self.pool)
                .await
            }
            None => {
                sqlx::query(&format!(
                    r#"
                    SELECT {TRAIT_COLUMNS}
                    FROM traits t
                    LEFT JOIN trait_categories tc ON t.category_id = tc.category_id
                    ORDER BY t.trait_name
                    "#
                ))
                .fetch_all(&self.pool)
                .await
            }
        }
        .map_err(Error::Database)?;

        rows.iter().map(definition_from_row).collect()
    }

    async fn list_categories(&self) -> Result<Vec<TraitCategory>> {
        let rows = sqlx::query(
            r#"
            SELECT category_id, category_name, parent_category_id, description
            FROM trait_categories
            ORDER BY category_id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows.iter().map(category_from_row).collect())
    }

    async fn category_tree(&self) -> Result<Vec<CategoryNode>> {
        let categories = self.list_categories().await?;
        Ok(build_category_tree(categories))
    }

    async fn relate_traits(
        &self,
        trait_name: &str,
        related_trait_name: &str,
        relationship_type: &str,
        description: Option<&str>,
    ) -> Result<Option<i64>> {
        let (Some(first), Some(second)) = (
            self.trait_id(trait_name).await?,
            self.trait_id(related_trait_name).await?,
        ) else {
            warn!(
                subsystem = "db",
                component = "catalog",
                op = "relate_traits",
                trait_name,
                related_trait_name,
                "Unknown trait in relationship, skipping"
            );
            return Ok(None);
        };

        let result = sqlx::query(
            r#"
            INSERT INTO trait_relationships (trait_id_1, trait_id_2, relationship_type, description)
            VALUES (?, ?, ?, ?)
            ON CONFLICT (trait_id_1, trait_id_2, relationship_type) DO NOTHING
            "#,
        )
        .bind(first)
        .bind(second)
        .bind(relationship_type)
        .bind(description)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 1 {
            return Ok(Some(result.last_insert_rowid()));
        }

        let id: i64 = sqlx::query_scalar(
            r#"
            SELECT relationship_id FROM trait_relationships
            WHERE trait_id_1 = ? AND trait_id_2 = ? AND relationship_type = ?
            "#,
        )
        .bind(first)
        .bind(second)
        .bind(relationship_type)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            component = "catalog",
            op = "relate_traits",
            relationship_id = id,
            "Relationship already recorded"
        );
        Ok(Some(id))
    }

    async fn related_traits(&self, trait_name: &str) -> Result<Vec<TraitRelationship>> {
        let rows = sqlx::query(
            r#"
            SELECT r.relationship_id,
                   t1.trait_name AS trait_name,
                   t2.trait_name AS related_trait_name,
                   r.relationship_type,
                   r.description
            FROM trait_relationships r
            JOIN traits t1 ON r.trait_id_1 = t1.trait_id
            JOIN traits t2 ON r.trait_id_2 = t2.trait_id
            WHERE t1.trait_name = ? OR t2.trait_name = ?
            ORDER BY r.relationship_id
            "#,
        )
        .bind(trait_name)
        .bind(trait_name)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(rows
            .iter()
            .map(|row| TraitRelationship {
                relationship_id: row.get("relationship_id"),
                trait_name: row.get("trait_name"),
                related_trait_name: row.get("related_trait_name"),
                relationship_type: row.get("relationship_type"),
                description: row.get("description"),
            })
            .collect())
    }
}
