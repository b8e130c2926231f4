//! Integration tests for the query engine: single-species listings, the
//! batch path, predicate queries and statistics.

use seatrait_db::test_fixtures::TestDatabase;
use seatrait_db::{
    CreateSizeClassRequest, CreateSpeciesRequest, CreateTraitValueRequest, SizeClassRepository,
    SpeciesRepository, TraitPredicate, TraitQueryRepository, TraitValue, TraitValueRepository,
    CATEGORY_SEEDS, TRAIT_SEEDS,
};

async fn add_value(test_db: &TestDatabase, species_id: i64, trait_name: &str, value: f64) {
    test_db
        .db
        .trait_values
        .add(CreateTraitValueRequest::new(species_id, trait_name, value))
        .await
        .unwrap()
        .expect("value stored");
}

#[tokio::test]
async fn test_missing_species_yields_empty_list() {
    let test_db = TestDatabase::new().await;

    let rows = test_db.db.queries.traits_for_species(42, None).await.unwrap();
    assert!(rows.is_empty());
    assert!(test_db
        .db
        .queries
        .species_by_aphia_id(42)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn test_traits_ordered_by_name_then_size_class() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;
    let id = test_db.add_species(100, "Dinophysis acuminata").await;

    let sc2 = db
        .size_classes
        .add(CreateSizeClassRequest::new(id, 2).size_range("40-50"))
        .await
        .unwrap();
    let sc1 = db
        .size_classes
        .add(CreateSizeClassRequest::new(id, 1).size_range("30-40"))
        .await
        .unwrap();

    db.trait_values
        .add(CreateTraitValueRequest::new(id, "width", 20.0).size_class(sc2))
        .await
        .unwrap();
    db.trait_values
        .add(CreateTraitValueRequest::new(id, "width", 15.0).size_class(sc1))
        .await
        .unwrap();
    add_value(&test_db, id, "biovolume", 900.0).await;

    let rows = db.queries.traits_for_species(100, None).await.unwrap();
    let summary: Vec<(&str, Option<i64>)> = rows
        .iter()
        .map(|r| (r.trait_name.as_str(), r.size_class_no))
        .collect();

    assert_eq!(
        summary,
        vec![("biovolume", None), ("width", Some(1)), ("width", Some(2))]
    );
    assert_eq!(rows[1].size_range.as_deref(), Some("30-40"));
    assert_eq!(rows[1].value_numeric, Some(15.0));
}

#[tokio::test]
async fn test_category_filter() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;
    let id = test_db.add_species(101, "A").await;

    add_value(&test_db, id, "biovolume", 10.0).await;
    add_value(&test_db, id, "width", 2.0).await;

    let biomass = db
        .queries
        .traits_for_species(101, Some("biomass"))
        .await
        .unwrap();
    assert_eq!(biomass.len(), 1);
    assert_eq!(biomass[0].trait_name, "biovolume");

    let nothing = db
        .queries
        .traits_for_species(101, Some("no_such_category"))
        .await
        .unwrap();
    assert!(nothing.is_empty());
}

#[tokio::test]
async fn test_batch_has_entry_for_every_key() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let a = test_db.add_species(1, "A").await;
    let b = test_db.add_species(2, "B").await;
    add_value(&test_db, a, "biovolume", 1.0).await;
    add_value(&test_db, a, "width", 2.0).await;
    add_value(&test_db, b, "width", 3.0).await;

    let keys = [1, 2, 3, 4, 5];
    let batch = db.queries.traits_for_species_batch(&keys, None).await.unwrap();

    assert_eq!(batch.len(), keys.len());
    assert_eq!(batch[&1].len(), 2);
    assert_eq!(batch[&2].len(), 1);
    assert!(batch[&3].is_empty());
    assert!(batch[&5].is_empty());

    // Batch rows match the single-species path.
    for key in [1, 2] {
        let single = db.queries.traits_for_species(key, None).await.unwrap();
        assert_eq!(batch[&key], single);
    }
}

#[tokio::test]
async fn test_batch_deduplicates_and_filters_by_category() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let a = test_db.add_species(7, "A").await;
    add_value(&test_db, a, "biovolume", 1.0).await;
    add_value(&test_db, a, "width", 2.0).await;

    let batch = db
        .queries
        .traits_for_species_batch(&[7, 7, 8], Some("size"))
        .await
        .unwrap();

    assert_eq!(batch.len(), 2);
    assert_eq!(batch[&7].len(), 1);
    assert_eq!(batch[&7][0].trait_name, "width");
}

#[tokio::test]
async fn test_empty_batch_yields_empty_map() {
    let test_db = TestDatabase::new().await;

    let batch = test_db
        .db
        .queries
        .traits_for_species_batch(&[], None)
        .await
        .unwrap();
    assert!(batch.is_empty());
}

#[tokio::test]
async fn test_large_batch_in_one_query() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    for key in 0..50 {
        let id = test_db.add_species(key, "bulk").await;
        add_value(&test_db, id, "biovolume", key as f64).await;
    }

    let keys: Vec<i64> = (0..2000).collect();
    let batch = db.queries.traits_for_species_batch(&keys, None).await.unwrap();

    assert_eq!(batch.len(), 2000);
    assert_eq!(batch.values().filter(|rows| !rows.is_empty()).count(), 50);
    assert_eq!(batch[&49][0].value_numeric, Some(49.0));
}

#[tokio::test]
async fn test_range_bounds_are_inclusive() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    for (key, volume) in [(1, 0.999), (2, 1.0), (3, 5.0), (4, 10.0), (5, 10.001)] {
        let id = test_db.add_species(key, "sp").await;
        add_value(&test_db, id, "biovolume", volume).await;
    }

    let matches = db
        .queries
        .species_by_trait(&TraitPredicate::new("biovolume").min(1.0).max(10.0))
        .await
        .unwrap();
    let keys: Vec<i64> = matches.iter().map(|m| m.aphia_id).collect();

    assert_eq!(keys, vec![2, 3, 4]);
    assert_eq!(matches[0].trait_value, Some(TraitValue::Numeric(1.0)));
}

#[tokio::test]
async fn test_single_bound_and_unknown_trait() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    for (key, volume) in [(1, 1.0), (2, 100.0)] {
        let id = test_db.add_species(key, "sp").await;
        add_value(&test_db, id, "biovolume", volume).await;
    }

    let large = db
        .queries
        .species_by_trait(&TraitPredicate::new("biovolume").min(50.0))
        .await
        .unwrap();
    assert_eq!(large.len(), 1);
    assert_eq!(large[0].aphia_id, 2);

    let unknown = db
        .queries
        .species_by_trait(&TraitPredicate::new("wingspan").min(0.0))
        .await
        .unwrap();
    assert!(unknown.is_empty());
}

#[tokio::test]
async fn test_categorical_filter_is_exact() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    for (key, trophic) in [(1, "AU"), (2, "HE"), (3, "MX"), (4, "au")] {
        let id = test_db.add_species(key, "sp").await;
        db.trait_values
            .add(CreateTraitValueRequest::new(id, "trophic_type", trophic))
            .await
            .unwrap();
    }

    let matches = db
        .queries
        .species_by_trait(&TraitPredicate::new("trophic_type").categorical("AU"))
        .await
        .unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].aphia_id, 1);
    assert_eq!(
        matches[0].trait_value,
        Some(TraitValue::Categorical("AU".into()))
    );
}

#[tokio::test]
async fn test_bounds_ignored_for_non_numeric_trait() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let id = test_db.add_species(1, "sp").await;
    db.trait_values
        .add(CreateTraitValueRequest::new(id, "mobility", "high"))
        .await
        .unwrap();

    let matches = db
        .queries
        .species_by_trait(&TraitPredicate::new("mobility").min(1.0).max(2.0))
        .await
        .unwrap();
    assert_eq!(matches.len(), 1);
}

#[tokio::test]
async fn test_numeric_takes_precedence_over_categorical() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;
    let id = test_db.add_species(1, "sp").await;

    // Rows with two populated slots cannot come from the value store; write
    // one directly to pin the resolution order.
    sqlx::query(
        r#"
        INSERT INTO trait_values (species_id, trait_id, value_numeric, value_categorical, value_text, created_at_utc)
        SELECT ?, trait_id, 3.5, 'AU', 'note', '2026-01-01T00:00:00Z' FROM traits WHERE trait_name = 'trophic_type'
        "#,
    )
    .bind(id)
    .execute(&db.pool)
    .await
    .unwrap();

    let matches = db
        .queries
        .species_by_trait(&TraitPredicate::new("trophic_type"))
        .await
        .unwrap();

    assert_eq!(matches.len(), 1);
    assert_eq!(matches[0].trait_value, Some(TraitValue::Numeric(3.5)));
    assert_eq!(matches[0].value_categorical.as_deref(), Some("AU"));
}

#[tokio::test]
async fn test_boolean_trait_round_trips() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;
    let id = test_db.add_species(1, "sp").await;

    sqlx::query("INSERT INTO traits (trait_name, data_type) VALUES ('toxic', 'boolean')")
        .execute(&db.pool)
        .await
        .unwrap();

    db.trait_values
        .add(CreateTraitValueRequest::new(id, "toxic", "yes"))
        .await
        .unwrap()
        .expect("stored");
    let skipped = db
        .trait_values
        .add(CreateTraitValueRequest::new(id, "toxic", "perhaps"))
        .await
        .unwrap();
    assert_eq!(skipped, None);

    let rows = db.queries.traits_for_species(1, None).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].value_boolean, Some(true));
    assert_eq!(rows[0].category_name, None);
    assert_eq!(rows[0].value(), Some(TraitValue::Boolean(true)));

    // Uncategorised traits disappear under any category filter.
    let filtered = db
        .queries
        .traits_for_species(1, Some("ecological"))
        .await
        .unwrap();
    assert!(filtered.is_empty());
}

#[tokio::test]
async fn test_statistics() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;

    let a = db
        .species
        .add(CreateSpeciesRequest::new(1).data_source("bvol_nomp_version_2024"))
        .await
        .unwrap();
    db.species
        .add(CreateSpeciesRequest::new(2).data_source("bvol_nomp_version_2024"))
        .await
        .unwrap();
    db.species.add(CreateSpeciesRequest::new(3)).await.unwrap();
    add_value(&test_db, a, "biovolume", 1.0).await;
    add_value(&test_db, a, "width", 1.0).await;

    let stats = db.queries.statistics().await.unwrap();

    assert_eq!(stats.total_species, 3);
    assert_eq!(stats.total_traits, TRAIT_SEEDS.len() as i64);
    assert_eq!(stats.total_trait_values, 2);
    assert_eq!(stats.total_categories, CATEGORY_SEEDS.len() as i64);
    assert_eq!(stats.species_by_source["bvol_nomp_version_2024"], 2);
    assert_eq!(stats.species_by_source["unknown"], 1);

    let size_traits = TRAIT_SEEDS.iter().filter(|t| t.category == "size").count() as i64;
    assert_eq!(stats.traits_by_category["size"], size_traits);
    assert_eq!(stats.traits_by_category["physiological"], 0);
}

#[tokio::test]
async fn test_cached_queries_serve_repeat_reads() {
    let test_db = TestDatabase::new().await;
    let db = &test_db.db;
    let id = test_db.add_species(1, "sp").await;
    add_value(&test_db, id, "biovolume", 1.0).await;

    let cached = db.cached_queries(&Default::default());
    let first = cached.traits_for_species(1, None).await.unwrap();

    // A write after the first read is not visible until the entry expires.
    add_value(&test_db, id, "width", 2.0).await;
    let second = cached.traits_for_species(1, None).await.unwrap();
    assert_eq!(first, second);

    cached.clear().await;
    let fresh = cached.traits_for_species(1, None).await.unwrap();
    assert_eq!(fresh.len(), 2);
}
