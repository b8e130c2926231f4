//! Schema manager.
//!
//! Every statement is `CREATE ... IF NOT EXISTS`, so [`ensure_schema`] may run
//! on every open. Nothing here drops or alters existing objects.

use sqlx::{Row, SqlitePool};
use tracing::{debug, info};

use seatrait_core::{Error, Result};

/// Tables owned by the trait ontology, in creation order.
pub const TABLES: &[&str] = &[
    "species",
    "trait_categories",
    "traits",
    "size_classes",
    "trait_values",
    "geographic_distribution",
    "taxonomic_hierarchy",
    "trait_relationships",
];

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS species (
        species_id INTEGER PRIMARY KEY AUTOINCREMENT,
        aphia_id INTEGER UNIQUE NOT NULL,
        scientific_name TEXT,
        genus TEXT,
        common_name TEXT,
        author TEXT,
        data_source TEXT,
        created_at_utc TEXT NOT NULL,
        updated_at_utc TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS trait_categories (
        category_id INTEGER PRIMARY KEY AUTOINCREMENT,
        category_name TEXT UNIQUE NOT NULL,
        parent_category_id INTEGER REFERENCES trait_categories(category_id),
        description TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS traits (
        trait_id INTEGER PRIMARY KEY AUTOINCREMENT,
        trait_name TEXT UNIQUE NOT NULL,
        category_id INTEGER REFERENCES trait_categories(category_id),
        data_type TEXT NOT NULL
            CHECK (data_type IN ('numeric', 'categorical', 'text', 'boolean')),
        unit TEXT,
        description TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS size_classes (
        size_class_id INTEGER PRIMARY KEY AUTOINCREMENT,
        species_id INTEGER NOT NULL REFERENCES species(species_id),
        size_class_no INTEGER NOT NULL,
        size_range TEXT,
        size_range_min REAL,
        size_range_max REAL,
        description TEXT,
        UNIQUE (species_id, size_class_no)
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS trait_values (
        value_id INTEGER PRIMARY KEY AUTOINCREMENT,
        species_id INTEGER NOT NULL REFERENCES species(species_id),
        trait_id INTEGER NOT NULL REFERENCES traits(trait_id),
        value_numeric REAL,
        value_text TEXT,
        value_categorical TEXT,
        value_boolean INTEGER,
        size_class_id INTEGER REFERENCES size_classes(size_class_id),
        confidence REAL CHECK (confidence IS NULL OR (confidence >= 0 AND confidence <= 1)),
        data_source TEXT,
        notes TEXT,
        created_at_utc TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS geographic_distribution (
        distribution_id INTEGER PRIMARY KEY AUTOINCREMENT,
        species_id INTEGER NOT NULL REFERENCES species(species_id),
        area_type TEXT NOT NULL,
        area_value TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS taxonomic_hierarchy (
        taxonomy_id INTEGER PRIMARY KEY AUTOINCREMENT,
        species_id INTEGER UNIQUE NOT NULL REFERENCES species(species_id),
        kingdom TEXT,
        phylum TEXT,
        division TEXT,
        class TEXT,
        order_name TEXT,
        family TEXT,
        genus TEXT,
        species TEXT,
        rank TEXT
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS trait_relationships (
        relationship_id INTEGER PRIMARY KEY AUTOINCREMENT,
        trait_id_1 INTEGER NOT NULL REFERENCES traits(trait_id),
        trait_id_2 INTEGER NOT NULL REFERENCES traits(trait_id),
        relationship_type TEXT NOT NULL DEFAULT '',
        description TEXT,
        UNIQUE (trait_id_1, trait_id_2, relationship_type)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_species_aphia_id ON species(aphia_id)",
    "CREATE INDEX IF NOT EXISTS idx_trait_values_species ON trait_values(species_id)",
    "CREATE INDEX IF NOT EXISTS idx_trait_values_trait ON trait_values(trait_id)",
    "CREATE INDEX IF NOT EXISTS idx_size_classes_species ON size_classes(species_id)",
    "CREATE INDEX IF NOT EXISTS idx_geographic_distribution_species ON geographic_distribution(species_id)",
];

/// Create all tables and indexes that do not exist yet.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    let mut tx = pool.begin().await.map_err(Error::Database)?;
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(&mut *tx)
            .await
            .map_err(Error::Database)?;
    }
    tx.commit().await.map_err(Error::Database)?;

    info!(
        subsystem = "db",
        component = "schema",
        op = "ensure",
        table_count = TABLES.len(),
        "Schema ready"
    );
    Ok(())
}

/// Names from [`TABLES`] that are absent from the database file.
pub async fn missing_tables(pool: &SqlitePool) -> Result<Vec<&'static str>> {
    let rows = sqlx::query("SELECT name FROM sqlite_master WHERE type = 'table'")
        .fetch_all(pool)
        .await
        .map_err(Error::Database)?;

    let present: Vec<String> = rows.iter().map(|row| row.get("name")).collect();
    let missing: Vec<&'static str> = TABLES
        .iter()
        .copied()
        .filter(|table| !present.iter().any(|name| name == table))
        .collect();

    debug!(
        subsystem = "db",
        component = "schema",
        op = "validate",
        missing_count = missing.len(),
        "Schema validated"
    );
    Ok(missing)
}
