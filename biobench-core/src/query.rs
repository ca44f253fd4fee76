//! Parameters of the two benchmark queries and the normalized shapes their results are converted to.
//!
//! * Simple: per `scientificName`, the sum of `individualCount`, sorted by that sum descending.
//! * Advanced: events within a radius of a point of interest, joined to their occurrences, left
//!   joined to the bird (`class = 'Aves'`) taxa, grouped by genus. Per genus the minimum distance
//!   and whether the genus is a waterfowl (`family = 'anatidae'`), sorted by distance ascending.
//!
//! Every engine returns its native representation (row tuples, a `DataFrame`, record batches), so
//! each implementation converts into [`SpeciesCounts`] or [`GenusSummaries`] before the scalars the
//! oracle checks are derived.

use serde::Serialize;

/// Taxa outside this class are dropped before the join. Matched exactly.
pub const AVES_CLASS: &str = "Aves";

/// Family compared against after lower-casing.
pub const ANATIDAE_FAMILY: &str = "anatidae";

/// Center and radius of the spatial filter, in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PointOfInterest {
  pub latitude: f64,
  pub longitude: f64,
  /// Events are kept when their distance is strictly below this.
  pub max_distance_degrees: f64,
}

/// Leuven, 0.1 degrees around.
pub const POI: PointOfInterest = PointOfInterest {
  latitude: 50.87,
  longitude: 4.70,
  max_distance_degrees: 0.1,
};

impl PointOfInterest {
  /// Euclidean distance in degrees, computed the way every engine does it.
  pub fn distance(&self, latitude: f64, longitude: f64) -> f64 {
    ((latitude - self.latitude).powi(2) + (longitude - self.longitude).powi(2)).sqrt()
  }

  pub fn contains(&self, latitude: f64, longitude: f64) -> bool {
    self.distance(latitude, longitude) < self.max_distance_degrees
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpeciesCount {
  pub scientific_name: Option<String>,
  /// A group whose counts are all null sums to 0.
  pub individual_count: i64,
}

/// Result of the Simple query, ordered by descending count.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SpeciesCounts(pub Vec<SpeciesCount>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SimpleSummary {
  pub group_count: usize,
  pub total_individuals: i64,
}

impl SpeciesCounts {
  pub fn summary(&self) -> SimpleSummary {
    SimpleSummary {
      group_count: self.0.len(),
      total_individuals: self.0.iter().map(|species| species.individual_count).sum(),
    }
  }

  pub fn get(&self, scientific_name: &str) -> Option<i64> {
    self
      .0
      .iter()
      .find(|species| species.scientific_name.as_deref() == Some(scientific_name))
      .map(|species| species.individual_count)
  }

  pub fn is_sorted_descending(&self) -> bool {
    self
      .0
      .windows(2)
      .all(|pair| pair[0].individual_count >= pair[1].individual_count)
  }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GenusSummary {
  /// `None` collects the occurrences without a matching bird taxon.
  pub genus: Option<String>,
  pub min_distance: f64,
  /// A null family (no matching taxon) is not Anatidae.
  pub is_anatidae: bool,
}

/// Result of the Advanced query, ordered by ascending minimum distance.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenusSummaries(pub Vec<GenusSummary>);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AdvancedSummary {
  pub anatidae: usize,
  pub other: usize,
}

impl AdvancedSummary {
  pub fn group_count(&self) -> usize {
    self.anatidae + self.other
  }
}

impl GenusSummaries {
  pub fn summary(&self) -> AdvancedSummary {
    let anatidae = self.0.iter().filter(|genus| genus.is_anatidae).count();
    AdvancedSummary {
      anatidae,
      other: self.0.len() - anatidae,
    }
  }

  pub fn get(&self, genus: Option<&str>) -> Option<&GenusSummary> {
    self.0.iter().find(|summary| summary.genus.as_deref() == genus)
  }

  pub fn is_sorted_by_distance(&self) -> bool {
    self
      .0
      .windows(2)
      .all(|pair| pair[0].min_distance <= pair[1].min_distance)
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use rstest::rstest;

  use super::*;

  fn species(name: &str, count: i64) -> SpeciesCount {
    SpeciesCount {
      scientific_name: Some(name.to_string()),
      individual_count: count,
    }
  }

  fn genus(name: Option<&str>, min_distance: f64, is_anatidae: bool) -> GenusSummary {
    GenusSummary {
      genus: name.map(str::to_string),
      min_distance,
      is_anatidae,
    }
  }

  #[test]
  fn test_simple_summary() {
    let counts = SpeciesCounts(vec![species("A", 5), species("B", 5)]);
    assert_eq!(
      counts.summary(),
      SimpleSummary {
        group_count: 2,
        total_individuals: 10
      }
    );
    assert_eq!(counts.get("A"), Some(5));
    assert_eq!(counts.get("C"), None);
    assert!(counts.is_sorted_descending());
    assert!(!SpeciesCounts(vec![species("A", 1), species("B", 2)]).is_sorted_descending());
  }

  #[test]
  fn test_advanced_summary_counts_unmatched_as_other() {
    let genera = GenusSummaries(vec![
      genus(Some("anas"), 0.01, true),
      genus(Some("ardea"), 0.02, false),
      genus(None, 0.05, false),
    ]);
    let summary = genera.summary();
    assert_eq!(summary, AdvancedSummary { anatidae: 1, other: 2 });
    assert_eq!(summary.group_count(), 3);
    assert!(genera.get(None).is_some());
    assert!(genera.is_sorted_by_distance());
  }

  #[rstest]
  #[case(POI.latitude, POI.longitude, true)]
  #[case(POI.latitude + 0.05, POI.longitude, true)]
  #[case(POI.latitude + 0.2, POI.longitude, false)]
  #[case(POI.latitude + 0.08, POI.longitude + 0.08, false)]
  fn test_poi_contains(#[case] latitude: f64, #[case] longitude: f64, #[case] expected: bool) {
    assert_eq!(POI.contains(latitude, longitude), expected);
  }

  #[test]
  fn test_boundary_is_excluded() {
    let origin = PointOfInterest {
      latitude: 0.0,
      longitude: 0.0,
      max_distance_degrees: 0.1,
    };
    assert_eq!(origin.distance(0.1, 0.0), 0.1);
    assert!(!origin.contains(0.1, 0.0));
    assert!(origin.contains(0.0, 0.099));
  }
}
