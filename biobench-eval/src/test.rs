use biobench_core::{
  oracle, set_benchmark_meta, AdvancedSummary, BenchmarkRecord, DatasetPaths, GenusSummaries,
  Library, PointOfInterest, SimpleSummary, POI,
};
use rand::{rngs::SmallRng, SeedableRng};
use rstest::rstest;
use tempfile::TempDir;

use crate::{
  util::{genus_families, Dataset},
  verified_engines, DuckDbEngine, Engine, EngineKind,
};

/// A non-integer longitude keeps every engine inferring float coordinate columns.
const ORIGIN: PointOfInterest = PointOfInterest {
  latitude: 0.0,
  longitude: 0.5,
  max_distance_degrees: 0.1,
};

fn write(dataset: &Dataset) -> (TempDir, DatasetPaths) {
  let dir = tempfile::tempdir().unwrap();
  let paths = dataset.write(dir.path()).unwrap();
  (dir, paths)
}

/// A few birds, two of them Anatidae, and a mammal.
fn with_backbone(dataset: &mut Dataset) -> &mut Dataset {
  dataset
    .push_taxon("Anas crecca", "Anas", "Anatidae", "Aves")
    .push_taxon("Cygnus olor", "Cygnus", "Anatidae", "Aves")
    .push_taxon("Ardea cinerea", "Ardea", "Ardeidae", "Aves")
    .push_taxon("Vulpes vulpes", "Vulpes", "Canidae", "Mammalia")
}

fn assert_close(actual: f64, expected: f64) {
  assert!(
    (actual - expected).abs() < 1e-12,
    "expected {expected}, got {actual}"
  );
}

#[rstest]
fn test_simple_three_rows(
  #[values(EngineKind::DuckDb, EngineKind::Polars, EngineKind::DataFusion, EngineKind::Arrow)]
  kind: EngineKind,
) {
  let mut dataset = Dataset::default();
  dataset
    .push_event("ev-0", 0.05, 0.5)
    .push_occurrence("ev-0", "A", Some(2))
    .push_occurrence("ev-0", "A", Some(3))
    .push_occurrence("ev-0", "B", Some(5));
  with_backbone(&mut dataset);
  let (_dir, paths) = write(&dataset);

  let counts = Engine::new(kind).unwrap().simple(&paths).unwrap();
  assert_eq!(counts.get("A"), Some(5));
  assert_eq!(counts.get("B"), Some(5));
  assert_eq!(
    counts.summary(),
    SimpleSummary {
      group_count: 2,
      total_individuals: 10
    }
  );
}

#[rstest]
fn test_simple_sorted_descending_with_missing_counts(
  #[values(EngineKind::DuckDb, EngineKind::Polars, EngineKind::DataFusion, EngineKind::Arrow)]
  kind: EngineKind,
) {
  let mut dataset = Dataset::default();
  dataset
    .push_event("ev-0", 0.05, 0.5)
    .push_occurrence("ev-0", "Anas crecca", Some(4))
    .push_occurrence("ev-0", "Cygnus olor", Some(40))
    .push_occurrence("ev-0", "Anas crecca", None)
    .push_occurrence("ev-0", "Ardea cinerea", Some(1))
    .push_occurrence("ev-0", "Cygnus olor", Some(2));
  with_backbone(&mut dataset);
  let (_dir, paths) = write(&dataset);

  let counts = Engine::new(kind).unwrap().simple(&paths).unwrap();
  assert!(counts.is_sorted_descending());
  assert_eq!(counts.0[0].scientific_name.as_deref(), Some("Cygnus olor"));
  assert_eq!(counts.get("Anas crecca"), Some(4));
  assert_eq!(counts.summary(), dataset.simple_summary());
}

#[rstest]
fn test_advanced_unmatched_occurrence(
  #[values(EngineKind::DuckDb, EngineKind::Polars, EngineKind::DataFusion, EngineKind::Arrow)]
  kind: EngineKind,
) {
  let mut dataset = Dataset::default();
  dataset
    .push_event("ev-0", 0.05, 0.5)
    .push_occurrence("ev-0", "Tadorna incognita", Some(1));
  with_backbone(&mut dataset);
  let (_dir, paths) = write(&dataset);

  let genera = Engine::new(kind).unwrap().advanced(&paths, &ORIGIN).unwrap();
  assert_eq!(genera.len(), 1);
  let unmatched = &genera.0[0];
  assert_eq!(unmatched.genus, None);
  assert!(!unmatched.is_anatidae);
  assert_close(unmatched.min_distance, 0.05);
}

#[rstest]
fn test_advanced_excludes_boundary(
  #[values(EngineKind::DuckDb, EngineKind::Polars, EngineKind::DataFusion, EngineKind::Arrow)]
  kind: EngineKind,
) {
  let mut dataset = Dataset::default();
  dataset
    .push_event("ev-near", 0.05, 0.5)
    .push_event("ev-edge", 0.1, 0.5)
    .push_event("ev-far", 0.3, 0.5)
    .push_occurrence("ev-near", "Anas crecca", Some(1))
    .push_occurrence("ev-edge", "Cygnus olor", Some(1))
    .push_occurrence("ev-far", "Ardea cinerea", Some(1));
  with_backbone(&mut dataset);
  assert_eq!(ORIGIN.distance(0.1, 0.5), ORIGIN.max_distance_degrees);
  let (_dir, paths) = write(&dataset);

  let genera = Engine::new(kind).unwrap().advanced(&paths, &ORIGIN).unwrap();
  assert_eq!(genera.len(), 1);
  assert_eq!(genera.0[0].genus.as_deref(), Some("anas"));
  assert!(genera.0[0].is_anatidae);
}

#[rstest]
fn test_advanced_folds_case_and_filters_class(
  #[values(EngineKind::DuckDb, EngineKind::Polars, EngineKind::DataFusion, EngineKind::Arrow)]
  kind: EngineKind,
) {
  let mut dataset = Dataset::default();
  dataset
    .push_event("ev-0", 0.02, 0.5)
    .push_event("ev-1", 0.0, 0.5)
    .push_occurrence("ev-0", "ANAS CRECCA", Some(3))
    .push_occurrence("ev-1", "Vulpes vulpes", Some(1))
    .push_occurrence("ev-missing", "Ardea cinerea", Some(1));
  with_backbone(&mut dataset);
  let (_dir, paths) = write(&dataset);

  let genera = Engine::new(kind).unwrap().advanced(&paths, &ORIGIN).unwrap();
  assert_eq!(genera.summary(), AdvancedSummary { anatidae: 1, other: 1 });
  assert!(genera.is_sorted_by_distance());

  // The mammal has no bird taxon, so it lands in the unmatched group.
  let unmatched = genera.get(None).unwrap();
  assert_close(unmatched.min_distance, 0.0);
  assert!(!unmatched.is_anatidae);
  let anas = genera.get(Some("anas")).unwrap();
  assert_close(anas.min_distance, 0.02);
  assert!(anas.is_anatidae);
}

#[rstest]
fn test_advanced_class_match_is_case_sensitive(
  #[values(EngineKind::DuckDb, EngineKind::Polars, EngineKind::DataFusion, EngineKind::Arrow)]
  kind: EngineKind,
  #[values("aves", "AVES")] class: &str,
) {
  let mut dataset = Dataset::default();
  dataset
    .push_event("ev-0", 0.03, 0.5)
    .push_occurrence("ev-0", "Anas crecca", Some(2))
    .push_taxon("Anas crecca", "Anas", "Anatidae", class)
    .push_taxon("Ardea cinerea", "Ardea", "Ardeidae", "Aves");
  let (_dir, paths) = write(&dataset);

  let genera = Engine::new(kind).unwrap().advanced(&paths, &ORIGIN).unwrap();
  assert_eq!(genera.len(), 1);
  assert!(genera.get(Some("anas")).is_none());
  let unmatched = genera.get(None).unwrap();
  assert!(!unmatched.is_anatidae);
  assert_close(unmatched.min_distance, 0.03);
}

#[rstest]
fn test_advanced_null_genus_group_skips_null_families(
  #[values(EngineKind::DuckDb, EngineKind::Polars, EngineKind::DataFusion, EngineKind::Arrow)]
  kind: EngineKind,
) {
  let mut dataset = Dataset::default();
  dataset
    .push_event("ev-0", 0.01, 0.5)
    .push_event("ev-1", 0.06, 0.5)
    .push_occurrence("ev-0", "Tadorna incognita", Some(1))
    .push_occurrence("ev-1", "Anser anser", Some(1))
    .push_taxon("Anser anser", "", "Anatidae", "Aves");
  with_backbone(&mut dataset);
  let (_dir, paths) = write(&dataset);

  // The bird without a genus shares the null group with the unmatched row; its family decides.
  let genera = Engine::new(kind).unwrap().advanced(&paths, &ORIGIN).unwrap();
  assert_eq!(genera.len(), 1);
  let group = genera.get(None).unwrap();
  assert!(group.is_anatidae);
  assert_close(group.min_distance, 0.01);
}

#[rstest]
#[case(50, 7)]
#[case(500, 11)]
fn test_engines_agree_on_random_data(#[case] size: usize, #[case] seed: u64) {
  let mut rng = SmallRng::seed_from_u64(seed);
  let dataset = Dataset::generate(size, &POI, &mut rng).unwrap();
  assert!(genus_families(&dataset.taxa).is_some());
  let (_dir, paths) = write(&dataset);

  let expected_simple = dataset.simple_summary();
  let expected_advanced = dataset.advanced_reference(&POI);
  assert!(!expected_advanced.is_empty());

  for kind in EngineKind::ALL {
    let engine = Engine::new(kind).unwrap();

    let counts = engine.simple(&paths).unwrap();
    assert_eq!(counts.summary(), expected_simple, "{kind:?}");
    assert!(counts.is_sorted_descending(), "{kind:?}");

    let genera = engine.advanced(&paths, &POI).unwrap();
    assert_eq!(genera.summary(), expected_advanced.summary(), "{kind:?}");
    assert!(genera.is_sorted_by_distance(), "{kind:?}");
    assert_same_genera(&genera, &expected_advanced);
  }
}

fn assert_same_genera(actual: &GenusSummaries, expected: &GenusSummaries) {
  assert_eq!(actual.len(), expected.len());
  for genus in &expected.0 {
    let found = actual
      .get(genus.genus.as_deref())
      .unwrap_or_else(|| panic!("missing genus {:?}", genus.genus));
    assert_eq!(found.is_anatidae, genus.is_anatidae, "{:?}", genus.genus);
    assert_close(found.min_distance, genus.min_distance);
  }
}

#[rstest]
fn test_repeated_runs_are_identical(
  #[values(EngineKind::DuckDb, EngineKind::Polars, EngineKind::DataFusion, EngineKind::Arrow)]
  kind: EngineKind,
) {
  let mut rng = SmallRng::seed_from_u64(3);
  let dataset = Dataset::generate(100, &POI, &mut rng).unwrap();
  let (_dir, paths) = write(&dataset);

  let engine = Engine::new(kind).unwrap();
  let first = engine.simple(&paths).unwrap();
  let second = engine.simple(&paths).unwrap();
  assert_eq!(first.summary(), second.summary());

  let first = engine.advanced(&paths, &POI).unwrap();
  let second = engine.advanced(&paths, &POI).unwrap();
  assert_eq!(first.summary(), second.summary());
  assert_same_genera(&second, &first);
}

#[rstest]
fn test_missing_dataset_is_an_error(
  #[values(EngineKind::DuckDb, EngineKind::Polars, EngineKind::DataFusion, EngineKind::Arrow)]
  kind: EngineKind,
) {
  let dir = tempfile::tempdir().unwrap();
  let paths = DatasetPaths::from_root(dir.path());
  let engine = Engine::new(kind).unwrap();
  assert!(engine.simple(&paths).is_err());
  assert!(engine.advanced(&paths, &POI).is_err());
}

#[test]
fn test_failing_engine_does_not_stop_the_others() {
  let mut dataset = Dataset::default();
  dataset
    .push_event("ev-0", 0.05, 0.5)
    .push_occurrence("ev-0", "Anas crecca", Some(2))
    .push_occurrence("ev-0", "Cygnus olor", Some(3));
  with_backbone(&mut dataset);
  let (_dir, paths) = write(&dataset);

  // DuckDB is checked first and fails; the other engines must still be checked and kept.
  let expected = dataset.simple_summary();
  let (engines, failed) = verified_engines(&EngineKind::ALL, |engine| {
    let actual = engine.simple(&paths)?.summary();
    let expected = match engine.kind() {
      EngineKind::DuckDb => SimpleSummary {
        group_count: expected.group_count + 1,
        ..expected
      },
      _ => expected,
    };
    oracle::check("Simple", &expected, &actual)
  });
  assert_eq!(failed, vec![EngineKind::DuckDb]);
  let kept: Vec<EngineKind> = engines.iter().map(Engine::kind).collect();
  assert_eq!(
    kept,
    vec![EngineKind::Polars, EngineKind::DataFusion, EngineKind::Arrow]
  );
}

#[test]
fn test_unreadable_dataset_fails_every_engine_separately() {
  let dir = tempfile::tempdir().unwrap();
  let paths = DatasetPaths::from_root(dir.path());
  let (engines, failed) = verified_engines(&EngineKind::ALL, |engine| {
    oracle::check_simple(&engine.simple(&paths)?.summary())
  });
  assert!(engines.is_empty());
  assert_eq!(failed, EngineKind::ALL.to_vec());
}

#[test]
fn test_tagging_with_duckdb() {
  let duckdb = DuckDbEngine::new().unwrap();
  let mut record = BenchmarkRecord::default();
  set_benchmark_meta(&mut record, "Simple", "DuckDB", &duckdb);
  assert_eq!(record.library_name(), "DuckDB");
  assert_eq!(record.library_version(), duckdb.version());
  assert_eq!(record.benchmark_name(), "Simple");
}

#[rstest]
fn test_every_engine_reports_a_version(
  #[values(EngineKind::DuckDb, EngineKind::Polars, EngineKind::DataFusion, EngineKind::Arrow)]
  kind: EngineKind,
) {
  let engine = Engine::new(kind).unwrap();
  assert_eq!(engine.kind(), kind);
  let version = engine.version();
  assert!(!version.is_empty());
  assert_ne!(version, "unknown");
}

#[rstest]
#[ignore = "requires the inbo-watervogels and gbif-backbone datasets"]
fn test_simple_on_real_datasets(
  #[values(EngineKind::DuckDb, EngineKind::Polars, EngineKind::DataFusion, EngineKind::Arrow)]
  kind: EngineKind,
) {
  let paths = DatasetPaths::resolve().unwrap();
  let counts = Engine::new(kind).unwrap().simple(&paths).unwrap();
  assert_eq!(counts.summary(), oracle::SIMPLE_EXPECTED);
  assert!(counts.is_sorted_descending());
}

#[rstest]
#[ignore = "requires the inbo-watervogels and gbif-backbone datasets"]
fn test_advanced_on_real_datasets(
  #[values(EngineKind::DuckDb, EngineKind::Polars, EngineKind::DataFusion, EngineKind::Arrow)]
  kind: EngineKind,
) {
  let paths = DatasetPaths::resolve().unwrap();
  let genera = Engine::new(kind).unwrap().advanced(&paths, &POI).unwrap();
  assert_eq!(genera.summary(), oracle::ADVANCED_EXPECTED);
  assert_eq!(genera.len(), 41);
  assert!(genera.is_sorted_by_distance());
}
