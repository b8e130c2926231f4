//! Integration tests for the spreadsheet trait overlay.

use std::fs;
use std::path::{Path, PathBuf};

use seatrait_lookup::{LoadStatus, LookupPaths, OverlaySource, PhytoplanktonTraits, TraitLookup};
use tempfile::TempDir;

const BVOL: &str = "\
AphiaID,Division,Class,Species,Genus,Trophy,Geometric_shape,FORMULA,SizeClassNo,SizeRange,\
Length(l1)\u{b5}m,Width(w)\u{b5}m,Calculated_volume_\u{b5}m3/counting_unit,\
Calculated_Carbon_pg/counting_unit,No_of_cells/counting_unit,HELCOM area,OSPAR area,Comment
149002,Bacillariophyta,Mediophyceae,Skeletonema marinoi,Skeletonema,AU,cylinder,pi/4*d^2*h,1,2-5,3,2,9.4,1.1,1,HELCOM,OSPAR,
149002,Bacillariophyta,Mediophyceae,Skeletonema marinoi,Skeletonema,AU,cylinder,pi/4*d^2*h,2,5-8,6,4,75.4,7.5,1,HELCOM,OSPAR,
149002.0,Bacillariophyta,Mediophyceae,Skeletonema marinoi,Skeletonema,AU,cylinder,pi/4*d^2*h,3,8-12,10,6,282.7,24.9,1,HELCOM,OSPAR,large cells
109624,Dinoflagellata,Dinophyceae,Dinophysis acuminata,Dinophysis,MX,ellipsoid,pi/6*l*w*h,1,38-58,48,33,18000,2340.5,1,HELCOM,,
,Cyanobacteria,Cyanophyceae,Unidentified coccoid,,AU,sphere,pi/6*d^3,1,,1,,0.5,,1,,,
";

const ENRICHED: &str = "\
speciesID,aphiaID,taxonomyName,synonymCommonName,taxonomyAuthority,url,\
biology_growth_form,biology_mobility,biology_characteristic_feeding_method,\
biology_typically_feeds_on,biology_is_the_species_harmful
1,148984,Fucus vesiculosus,Bladder wrack,L.,https://www.marlin.ac.uk/species/detail/1330,Foliose,Permanent attachment,Autotroph,,No
2,109624,Dinophysis acuminata,,\"Claparède & Lachmann, 1859\",,,Swimmer,Mixotroph,Ciliates,Yes
";

struct Fixture {
    _dir: TempDir,
    paths: LookupPaths,
}

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

fn fixture() -> Fixture {
    let dir = tempfile::tempdir().unwrap();
    let paths = LookupPaths {
        bvol_path: write(dir.path(), "bvol.csv", BVOL),
        species_enriched_path: write(dir.path(), "species_enriched.csv", ENRICHED),
    };
    Fixture { _dir: dir, paths }
}

#[test]
fn test_sources_load_lazily() {
    let fx = fixture();
    let lookup = TraitLookup::new(fx.paths.clone());

    assert_eq!(lookup.load_status(OverlaySource::Phytoplankton), LoadStatus::NotLoaded);
    assert_eq!(lookup.load_status(OverlaySource::EnrichedSpecies), LoadStatus::NotLoaded);

    lookup.phytoplankton_traits(149002);
    assert_eq!(lookup.load_status(OverlaySource::Phytoplankton), LoadStatus::Loaded);
    assert_eq!(lookup.load_status(OverlaySource::EnrichedSpecies), LoadStatus::NotLoaded);
}

#[test]
fn test_multiple_size_classes() {
    let fx = fixture();
    let lookup = TraitLookup::new(fx.paths.clone());

    let traits = lookup.phytoplankton_traits(149002).unwrap();
    assert!(traits.multiple_size_classes());

    let PhytoplanktonTraits::Multiple(set) = &traits else {
        panic!("expected size-class list");
    };
    assert_eq!(set.aphia_id, 149002);
    assert_eq!(set.size_classes.len(), 3);

    let numbers: Vec<&str> = set
        .size_classes
        .iter()
        .filter_map(|r| r.size_class_no.as_deref())
        .collect();
    assert_eq!(numbers, vec!["1", "2", "3"]);
    assert_eq!(set.size_classes[2].calculated_volume_um3, Some(282.7));
    assert_eq!(set.size_classes[2].comment.as_deref(), Some("large cells"));
    assert_eq!(set.size_classes[0].comment, None);

    let json = serde_json::to_value(&traits).unwrap();
    assert_eq!(json["multiple_size_classes"], true);
    assert_eq!(json["size_classes"].as_array().unwrap().len(), 3);
}

#[test]
fn test_single_size_class_is_flat() {
    let fx = fixture();
    let lookup = TraitLookup::new(fx.paths.clone());

    let traits = lookup.phytoplankton_traits(109624).unwrap();
    assert!(!traits.multiple_size_classes());

    let PhytoplanktonTraits::Single(single) = &traits else {
        panic!("expected flat record");
    };
    let record = &single.record;
    assert_eq!(record.species.as_deref(), Some("Dinophysis acuminata"));
    assert_eq!(record.trophic_type.as_deref(), Some("MX"));
    assert_eq!(record.formula.as_deref(), Some("pi/6*l*w*h"));
    assert_eq!(record.size_range.as_deref(), Some("38-58"));
    assert_eq!(record.measurements_um.get("Length_l1um"), Some(&48.0));
    assert_eq!(record.measurements_um.get("Width_wum"), Some(&33.0));
    assert_eq!(record.calculated_carbon_pg, Some(2340.5));
    assert_eq!(record.geographic_areas.helcom.as_deref(), Some("HELCOM"));
    assert_eq!(record.geographic_areas.ospar, None);

    let json = serde_json::to_value(&traits).unwrap();
    assert_eq!(json["multiple_size_classes"], false);
    assert_eq!(json["species"], "Dinophysis acuminata");
    assert!(json.get("size_classes").is_none());
}

#[test]
fn test_measurement_headers_match_across_unit_encodings() {
    let dir = tempfile::tempdir().unwrap();
    let bvol = "AphiaID,Species,Length(l1)\u{3bc}m,Width(w)\u{c2}\u{b5}m,Height(h)um\n\
                1,Greek mu,5,4,3\n";
    let paths = LookupPaths {
        bvol_path: write(dir.path(), "bvol.csv", bvol),
        species_enriched_path: dir.path().join("absent.csv"),
    };
    let lookup = TraitLookup::new(paths);

    let traits = lookup.phytoplankton_traits(1).unwrap();
    let record = traits.size_classes()[0];
    assert_eq!(record.measurements_um.get("Length_l1um"), Some(&5.0));
    assert_eq!(record.measurements_um.get("Width_wum"), Some(&4.0));
    assert_eq!(record.measurements_um.get("Height_hum"), Some(&3.0));
}

#[test]
fn test_filament_length_matches_with_either_micro_sign() {
    for micro in ['\u{b5}', '\u{3bc}'] {
        let dir = tempfile::tempdir().unwrap();
        let bvol = format!(
            "AphiaID,Species,Length(l1){micro}m,Filament_length_of_cell({micro}m)\n\
             1,Aphanizomenon flosaquae,4.5,120\n"
        );
        let paths = LookupPaths {
            bvol_path: write(dir.path(), "bvol.csv", &bvol),
            species_enriched_path: dir.path().join("absent.csv"),
        };
        let lookup = TraitLookup::new(paths);

        let traits = lookup.phytoplankton_traits(1).unwrap();
        let record = traits.size_classes()[0];
        assert_eq!(record.measurements_um.get("Length_l1um"), Some(&4.5));
        assert_eq!(
            record.measurements_um.get("Filament_length_of_cell_um"),
            Some(&120.0),
            "micro sign {micro:?}"
        );
    }
}

#[test]
fn test_unknown_species_is_none() {
    let fx = fixture();
    let lookup = TraitLookup::new(fx.paths.clone());

    assert!(lookup.phytoplankton_traits(999999).is_none());
    assert!(lookup.species_traits(999999).is_none());
}

#[test]
fn test_species_traits_drop_nulls() {
    let fx = fixture();
    let lookup = TraitLookup::new(fx.paths.clone());

    let fucus = lookup.species_traits(148984).unwrap();
    assert_eq!(fucus.source, "species_enriched");
    assert_eq!(fucus.species_id.as_deref(), Some("1"));
    assert_eq!(fucus.common_name.as_deref(), Some("Bladder wrack"));
    assert_eq!(fucus.morphology.get("growth_form").map(String::as_str), Some("Foliose"));
    assert_eq!(fucus.trophic.len(), 1);
    assert_eq!(
        fucus.trophic.get("feeding_method").map(String::as_str),
        Some("Autotroph")
    );

    let dinophysis = lookup.species_traits(109624).unwrap();
    assert!(dinophysis.morphology.is_empty());
    assert_eq!(
        dinophysis.taxonomy_authority.as_deref(),
        Some("Claparède & Lachmann, 1859")
    );
    assert_eq!(
        dinophysis.trophic.get("typically_feeds_on").map(String::as_str),
        Some("Ciliates")
    );
    assert_eq!(dinophysis.is_harmful.as_deref(), Some("Yes"));
}

#[test]
fn test_all_traits_names_contributing_sources() {
    let fx = fixture();
    let lookup = TraitLookup::new(fx.paths.clone());

    let both = lookup.all_traits(109624);
    assert_eq!(
        both.data_sources,
        vec!["bvol_nomp_version_2024", "species_enriched"]
    );
    assert!(both.phytoplankton_traits.is_some());
    assert!(both.species_traits.is_some());

    let enriched_only = lookup.all_traits(148984);
    assert_eq!(enriched_only.data_sources, vec!["species_enriched"]);
    assert!(enriched_only.phytoplankton_traits.is_none());

    let none = lookup.all_traits(1);
    assert!(none.data_sources.is_empty());
    assert!(none.species_traits.is_none());
}

#[test]
fn test_search_spans_both_sources() {
    let fx = fixture();
    let lookup = TraitLookup::new(fx.paths.clone());

    let hits = lookup.search_by_species_name("DINOPHYSIS");
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].source, "bvol_nomp_version_2024");
    assert_eq!(hits[0].genus.as_deref(), Some("Dinophysis"));
    assert_eq!(hits[1].source, "species_enriched");
    assert_eq!(hits[1].aphia_id, 109624);
    assert_eq!(hits[1].common_name, None);

    // One hit per size-class row.
    assert_eq!(lookup.search_by_species_name("skeleton").len(), 3);

    // Rows without a key are never returned.
    assert!(lookup.search_by_species_name("coccoid").is_empty());
    assert!(lookup.search_by_species_name("kelp").is_empty());
}

#[test]
fn test_statistics() {
    let fx = fixture();
    let lookup = TraitLookup::new(fx.paths.clone());

    let stats = lookup.statistics();
    assert_eq!(stats.phytoplankton.total_records, 5);
    assert_eq!(stats.phytoplankton.unique_aphia_ids, 2);
    assert!(stats.phytoplankton.file_loaded);
    assert_eq!(stats.phytoplankton.file_path, fx.paths.bvol_path);
    assert_eq!(stats.enriched_species.total_records, 2);
    assert_eq!(stats.enriched_species.unique_aphia_ids, 2);
    assert_eq!(stats.enriched_species.status, LoadStatus::Loaded);
}

#[test]
fn test_missing_source_is_empty_and_not_retried() {
    let dir = tempfile::tempdir().unwrap();
    let paths = LookupPaths {
        bvol_path: dir.path().join("bvol.csv"),
        species_enriched_path: write(dir.path(), "species_enriched.csv", ENRICHED),
    };
    let lookup = TraitLookup::new(paths.clone());

    assert!(lookup.phytoplankton_traits(149002).is_none());
    assert_eq!(lookup.load_status(OverlaySource::Phytoplankton), LoadStatus::Missing);

    // The second source is unaffected.
    assert!(lookup.species_traits(148984).is_some());

    // Creating the file later does not change this overlay.
    write(dir.path(), "bvol.csv", BVOL);
    assert!(lookup.phytoplankton_traits(149002).is_none());

    let stats = lookup.statistics();
    assert_eq!(stats.phytoplankton.total_records, 0);
    assert!(!stats.phytoplankton.file_loaded);
    assert_eq!(stats.phytoplankton.status, LoadStatus::Missing);

    // A fresh overlay sees it.
    let fresh = TraitLookup::new(paths);
    assert!(fresh.phytoplankton_traits(149002).is_some());
}

#[test]
fn test_tab_separated_source() {
    let dir = tempfile::tempdir().unwrap();
    let tsv = "aphiaID\ttaxonomyName\tbiology_mobility\n148984\tFucus vesiculosus\tSessile\n";
    let paths = LookupPaths {
        bvol_path: dir.path().join("absent.csv"),
        species_enriched_path: write(dir.path(), "species_enriched.tsv", tsv),
    };
    let lookup = TraitLookup::new(paths);

    let traits = lookup.species_traits(148984).unwrap();
    assert_eq!(traits.taxonomy_name.as_deref(), Some("Fucus vesiculosus"));
    assert_eq!(traits.ecology.get("mobility").map(String::as_str), Some("Sessile"));
}

#[test]
fn test_source_without_key_column_fails() {
    let dir = tempfile::tempdir().unwrap();
    let paths = LookupPaths {
        bvol_path: write(dir.path(), "bvol.csv", "Species,Genus\nSkeletonema marinoi,Skeletonema\n"),
        species_enriched_path: write(dir.path(), "species_enriched.csv", ENRICHED),
    };
    let lookup = TraitLookup::new(paths);

    assert!(lookup.phytoplankton_traits(149002).is_none());
    assert_eq!(lookup.load_status(OverlaySource::Phytoplankton), LoadStatus::Failed);

    let stats = lookup.statistics();
    assert!(!stats.phytoplankton.file_loaded);
    assert_eq!(stats.phytoplankton.total_records, 0);
    assert_eq!(stats.enriched_species.status, LoadStatus::Loaded);
}

#[test]
fn test_corrupt_workbook_fails() {
    let dir = tempfile::tempdir().unwrap();
    let bvol_path = dir.path().join("bvol_nomp_version_2024.xlsx");
    fs::write(&bvol_path, b"PK\x03\x04[Content_Types].xml\nAphiaID,Species\n1,A\n").unwrap();
    let paths = LookupPaths {
        bvol_path,
        species_enriched_path: dir.path().join("species_enriched.xlsx"),
    };
    let lookup = TraitLookup::new(paths);

    assert!(lookup.phytoplankton_traits(1).is_none());
    assert!(lookup.species_traits(1).is_none());

    let stats = lookup.statistics();
    assert_eq!(stats.phytoplankton.status, LoadStatus::Failed);
    assert!(!stats.phytoplankton.file_loaded);
    assert_eq!(stats.phytoplankton.total_records, 0);
    assert_eq!(stats.enriched_species.status, LoadStatus::Missing);
}
