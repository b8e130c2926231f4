//! Integration tests for the write side: species registry, trait value
//! store, size classes and the auxiliary stores.

use seatrait_db::test_fixtures::TestDatabase;
use seatrait_db::{
    CreateSizeClassRequest, CreateSpeciesRequest, CreateTraitValueRequest, RawValue,
    SizeClassRepository, SpeciesRepository, Taxonomy, TaxonomyRepository, TraitQueryRepository,
    TraitValueRepository,
};
use sqlx::Row;

async fn count_values(test_db: &TestDatabase) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM trait_values")
        .fetch_one(&test_db.db.pool)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_end_to_end_scenario() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let species_id = test_db.add_species(148984, "Fucus vesiculosus").await;
    let value_id = db
        .trait_values
        .add(CreateTraitValueRequest::new(species_id, "biovolume", 125.5))
        .await
        .unwrap();
    assert!(value_id.is_some());

    let rows = db.queries.traits_for_species(148984, None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].trait_name, "biovolume");
    assert_eq!(rows[0].value_numeric, Some(125.5));
    assert_eq!(rows[0].unit.as_deref(), Some("μm³"));
    assert_eq!(rows[0].category_name.as_deref(), Some("biomass"));

    let batch = db
        .queries
        .traits_for_species_batch(&[148984, 999999], None)
        .await
        .unwrap();
    assert_eq!(batch.len(), 2);
    assert_eq!(batch[&148984], rows);
    assert!(batch[&999999].is_empty());
}

#[tokio::test]
async fn test_add_species_is_idempotent() {
    let test_db = TestDatabase::new().await;
    let species = &test_db.db.species;

    let first = species
        .add(
            CreateSpeciesRequest::new(148984)
                .scientific_name("Fucus vesiculosus")
                .data_source("bvol_nomp_version_2024"),
        )
        .await
        .unwrap();
    let second = species
        .add(
            CreateSpeciesRequest::new(148984)
                .scientific_name("Something else")
                .genus("Other"),
        )
        .await
        .unwrap();

    assert_eq!(first, second);

    let stored = species.get_by_aphia_id(148984).await.unwrap().unwrap();
    assert_eq!(stored.species_id, first);
    assert_eq!(stored.scientific_name.as_deref(), Some("Fucus vesiculosus"));
    assert_eq!(stored.genus, None);
    assert_eq!(stored.data_source.as_deref(), Some("bvol_nomp_version_2024"));
}

#[tokio::test]
async fn test_distinct_keys_get_distinct_ids() {
    let test_db = TestDatabase::new().await;

    let a = test_db.add_species(1, "A").await;
    let b = test_db.add_species(2, "B").await;

    assert_ne!(a, b);
    assert!(test_db.db.species.get_by_aphia_id(3).await.unwrap().is_none());
}

#[tokio::test]
async fn test_value_stored_only_in_declared_column() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;
    let id = test_db.add_species(10, "Species").await;

    // (trait, raw value, expected populated column)
    let cases: Vec<(&str, RawValue, &str)> = vec![
        ("biovolume", RawValue::from("42.5"), "value_numeric"),
        ("trophic_type", RawValue::from(7.0), "value_categorical"),
        ("feeds_on", RawValue::from(true), "value_text"),
        ("geometric_shape", RawValue::from("sphere"), "value_categorical"),
    ];

    for (trait_name, raw, expected) in cases {
        let value_id = db
            .trait_values
            .add(CreateTraitValueRequest::new(id, trait_name, raw))
            .await
            .unwrap()
            .unwrap_or_else(|| panic!("{trait_name} not stored"));

        let row = sqlx::query(
            r#"
            SELECT value_numeric IS NOT NULL AS has_numeric,
                   value_text IS NOT NULL AS has_text,
                   value_categorical IS NOT NULL AS has_categorical,
                   value_boolean IS NOT NULL AS has_boolean
            FROM trait_values WHERE value_id = ?
            "#,
        )
        .bind(value_id)
        .fetch_one(&db.pool)
        .await
        .unwrap();

        let populated: Vec<&str> = ["numeric", "text", "categorical", "boolean"]
            .into_iter()
            .filter(|column| row.get::<bool, _>(format!("has_{column}").as_str()))
            .collect();
        assert_eq!(
            populated,
            vec![expected.trim_start_matches("value_")],
            "{trait_name}"
        );
    }
}

#[tokio::test]
async fn test_numeric_text_is_coerced() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;
    let id = test_db.add_species(11, "Species").await;

    db.trait_values
        .add(CreateTraitValueRequest::new(id, "width", " 12.5 "))
        .await
        .unwrap();

    let rows = db.queries.traits_for_species(11, None).await.unwrap();
    assert_eq!(rows[0].value_numeric, Some(12.5));
    assert_eq!(rows[0].value_text, None);
}

#[tokio::test]
async fn test_null_and_nan_are_not_stored() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;
    let id = test_db.add_species(12, "Species").await;

    let null = db
        .trait_values
        .add(CreateTraitValueRequest::new(id, "biovolume", RawValue::Null))
        .await
        .unwrap();
    let nan = db
        .trait_values
        .add(CreateTraitValueRequest::new(id, "biovolume", f64::NAN))
        .await
        .unwrap();
    let missing_option = db
        .trait_values
        .add(CreateTraitValueRequest::new(id, "feeds_on", None::<String>))
        .await
        .unwrap();

    assert_eq!(null, None);
    assert_eq!(nan, None);
    assert_eq!(missing_option, None);
    assert_eq!(count_values(&test_db).await, 0);
}

#[tokio::test]
async fn test_unknown_trait_is_a_no_op() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;
    let id = test_db.add_species(13, "Species").await;

    let result = db
        .trait_values
        .add(CreateTraitValueRequest::new(id, "wingspan", 3.0))
        .await
        .unwrap();

    assert_eq!(result, None);
    assert_eq!(count_values(&test_db).await, 0);

    // The next assertion of the same import still goes through.
    let stored = db
        .trait_values
        .add(CreateTraitValueRequest::new(id, "width", 3.0))
        .await
        .unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn test_unknown_species_or_size_class_is_a_no_op() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;
    let id = test_db.add_species(15, "Species").await;

    let result = db
        .trait_values
        .add(CreateTraitValueRequest::new(id + 1000, "width", 3.0))
        .await
        .unwrap();
    assert_eq!(result, None);

    let result = db
        .trait_values
        .add(CreateTraitValueRequest::new(id, "width", 3.0).size_class(9999))
        .await
        .unwrap();
    assert_eq!(result, None);
    assert_eq!(count_values(&test_db).await, 0);

    // The import carries on with the next valid assertion.
    let stored = db
        .trait_values
        .add(CreateTraitValueRequest::new(id, "width", 3.0))
        .await
        .unwrap();
    assert!(stored.is_some());
}

#[tokio::test]
async fn test_uncoercible_value_is_skipped() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;
    let id = test_db.add_species(14, "Species").await;

    let result = db
        .trait_values
        .add(CreateTraitValueRequest::new(id, "biovolume", "not a number"))
        .await
        .unwrap();

    assert_eq!(result, None);
    assert_eq!(count_values(&test_db).await, 0);
}

#[tokio::test]
async fn test_provenance_is_stored() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;
    let id = test_db.add_species(15, "Species").await;

    db.trait_values
        .add(
            CreateTraitValueRequest::new(id, "trophic_type", "AU")
                .confidence(0.8)
                .data_source("bvol_nomp_version_2024")
                .notes("from import"),
        )
        .await
        .unwrap();
    db.trait_values
        .add(CreateTraitValueRequest::new(id, "mobility", "high").confidence(1.5))
        .await
        .unwrap();

    let rows = db.queries.traits_for_species(15, None).await.unwrap();
    let mobility = rows.iter().find(|r| r.trait_name == "mobility").unwrap();
    let trophic = rows.iter().find(|r| r.trait_name == "trophic_type").unwrap();

    assert_eq!(trophic.confidence, Some(0.8));
    assert_eq!(trophic.data_source.as_deref(), Some("bvol_nomp_version_2024"));
    assert_eq!(mobility.confidence, None);
    assert_eq!(mobility.value_categorical.as_deref(), Some("high"));
}

#[tokio::test]
async fn test_size_classes_are_scoped_to_species() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;
    let a = test_db.add_species(20, "A").await;
    let b = test_db.add_species(21, "B").await;

    let a1 = db
        .size_classes
        .add(CreateSizeClassRequest::new(a, 1).size_range("5-10"))
        .await
        .unwrap();
    let b1 = db
        .size_classes
        .add(CreateSizeClassRequest::new(b, 1).size_range("20"))
        .await
        .unwrap();
    let a1_again = db
        .size_classes
        .add(CreateSizeClassRequest::new(a, 1).size_range("999"))
        .await
        .unwrap();

    assert_ne!(a1, b1);
    assert_eq!(a1, a1_again);

    let classes = db.size_classes.list_for_species(a).await.unwrap();
    assert_eq!(classes.len(), 1);
    assert_eq!(classes[0].size_range_min, Some(5.0));
    assert_eq!(classes[0].size_range_max, Some(10.0));

    let classes = db.size_classes.list_for_species(b).await.unwrap();
    assert_eq!(classes[0].size_range_min, Some(20.0));
    assert_eq!(classes[0].size_range_max, Some(20.0));
}

#[tokio::test]
async fn test_explicit_bounds_win_over_range_text() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;
    let id = test_db.add_species(22, "A").await;

    db.size_classes
        .add(
            CreateSizeClassRequest::new(id, 3)
                .size_range("approx. 5")
                .bounds(4.0, 6.0)
                .description("third bracket"),
        )
        .await
        .unwrap();
    db.size_classes
        .add(CreateSizeClassRequest::new(id, 4).size_range("huge"))
        .await
        .unwrap();

    let classes = db.size_classes.list_for_species(id).await.unwrap();
    assert_eq!(classes.len(), 2);
    assert_eq!(classes[0].size_class_no, 3);
    assert_eq!(classes[0].size_range_min, Some(4.0));
    assert_eq!(classes[0].description.as_deref(), Some("third bracket"));
    assert_eq!(classes[1].size_range_min, None);
    assert_eq!(classes[1].size_range_max, None);
}

#[tokio::test]
async fn test_taxonomy_upsert_replaces() {
    let test_db = TestDatabase::new().await;
    let taxonomy = &test_db.db.taxonomy;
    let id = test_db.add_species(30, "Fucus vesiculosus").await;

    assert!(taxonomy.get_taxonomy(id).await.unwrap().is_none());

    taxonomy
        .upsert_taxonomy(
            id,
            Taxonomy {
                kingdom: Some("Chromista".into()),
                class_name: Some("Phaeophyceae".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    taxonomy
        .upsert_taxonomy(
            id,
            Taxonomy {
                kingdom: Some("Chromista".into()),
                order_name: Some("Fucales".into()),
                genus: Some("Fucus".into()),
                rank: Some("Species".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let stored = taxonomy.get_taxonomy(id).await.unwrap().unwrap();
    assert_eq!(stored.order_name.as_deref(), Some("Fucales"));
    assert_eq!(stored.class_name, None);
    assert_eq!(stored.rank.as_deref(), Some("Species"));

    let rows: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM taxonomic_hierarchy")
        .fetch_one(&test_db.db.pool)
        .await
        .unwrap();
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn test_distribution_appends() {
    let test_db = TestDatabase::new().await;
    let taxonomy = &test_db.db.taxonomy;
    let id = test_db.add_species(31, "A").await;

    taxonomy.add_distribution(id, "HELCOM", "Bothnian Sea").await.unwrap();
    taxonomy.add_distribution(id, "OSPAR", "II").await.unwrap();
    taxonomy.add_distribution(id, "HELCOM", "Bothnian Sea").await.unwrap();

    let areas = taxonomy.list_distribution(id).await.unwrap();
    assert_eq!(areas.len(), 3);
    assert_eq!(areas[1].area_type, "OSPAR");
    assert_eq!(areas[1].area_value, "II");
}

#[tokio::test]
async fn test_reopen_keeps_data() {
    let test_db = TestDatabase::new().await;
    test_db.add_species(40, "A").await;

    let reopened = seatrait_db::Database::open(&test_db.path).await.unwrap();
    reopened.seed().await.unwrap();

    let species = reopened.species.get_by_aphia_id(40).await.unwrap();
    assert!(species.is_some());
}
