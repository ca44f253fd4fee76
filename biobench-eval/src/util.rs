//! Synthetic datasets shaped like the real ones, written in the same layout so the engines can be
//! pointed at them through [`DatasetPaths`].

use std::{
  collections::{BTreeMap, HashMap},
  fs,
  io::{BufWriter, Write},
  path::Path,
};

use anyhow::{Context, Result};
use biobench_core::{
  query::{ANATIDAE_FAMILY, AVES_CLASS},
  DatasetPaths, GenusSummaries, GenusSummary, PointOfInterest, SimpleSummary,
};
use rand::{seq::SliceRandom, Rng};
use rand_distr::{Distribution, Normal};

#[derive(Debug, Clone, PartialEq)]
pub struct OccurrenceRow {
  pub id: String,
  pub event_id: String,
  pub scientific_name: String,
  pub individual_count: Option<i64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventRow {
  pub id: String,
  pub latitude: f64,
  pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TaxonRow {
  pub id: String,
  pub canonical_name: String,
  pub genus: String,
  pub family: String,
  pub class: String,
}

/// (canonical name, genus, family, class). Every genus maps to exactly one family.
const SPECIES: [(&str, &str, &str, &str); 9] = [
  ("Anas platyrhynchos", "Anas", "Anatidae", "Aves"),
  ("Anas crecca", "Anas", "Anatidae", "Aves"),
  ("Aythya fuligula", "Aythya", "Anatidae", "Aves"),
  ("Cygnus olor", "Cygnus", "Anatidae", "Aves"),
  ("Ardea cinerea", "Ardea", "Ardeidae", "Aves"),
  ("Fulica atra", "Fulica", "Rallidae", "Aves"),
  ("Larus argentatus", "Larus", "Laridae", "Aves"),
  ("Phalacrocorax carbo", "Phalacrocorax", "Phalacrocoracidae", "Aves"),
  ("Vulpes vulpes", "Vulpes", "Canidae", "Mammalia"),
];

/// Observed, but absent from the backbone.
const UNKNOWN_SPECIES: &str = "Tadorna incognita";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
  pub occurrences: Vec<OccurrenceRow>,
  pub events: Vec<EventRow>,
  pub taxa: Vec<TaxonRow>,
}

impl Dataset {
  pub fn push_event(&mut self, id: &str, latitude: f64, longitude: f64) -> &mut Self {
    self.events.push(EventRow {
      id: id.to_string(),
      latitude,
      longitude,
    });
    self
  }

  pub fn push_occurrence(
    &mut self,
    event_id: &str,
    scientific_name: &str,
    individual_count: Option<i64>,
  ) -> &mut Self {
    let id = format!("occ-{}", self.occurrences.len());
    self.occurrences.push(OccurrenceRow {
      id,
      event_id: event_id.to_string(),
      scientific_name: scientific_name.to_string(),
      individual_count,
    });
    self
  }

  pub fn push_taxon(
    &mut self,
    canonical_name: &str,
    genus: &str,
    family: &str,
    class: &str,
  ) -> &mut Self {
    let id = (self.taxa.len() + 1).to_string();
    self.taxa.push(TaxonRow {
      id,
      canonical_name: canonical_name.to_string(),
      genus: genus.to_string(),
      family: family.to_string(),
      class: class.to_string(),
    });
    self
  }

  /// `size` events normally scattered around `poi` (one radius of standard deviation), each with
  /// one to three occurrences. The backbone holds every known species, one of them twice, and a
  /// mammal; some occurrences are upper-cased or name a species missing from the backbone.
  pub fn generate(size: usize, poi: &PointOfInterest, rng: &mut impl Rng) -> Result<Self> {
    let mut dataset = Dataset::default();
    for (name, genus, family, class) in SPECIES {
      dataset.push_taxon(name, genus, family, class);
    }
    let (name, genus, family, class) = SPECIES[0];
    dataset.push_taxon(name, genus, family, class);

    let spread = poi.max_distance_degrees.max(f64::EPSILON);
    let latitude = Normal::new(poi.latitude, spread)?;
    let longitude = Normal::new(poi.longitude, spread)?;

    let names: Vec<&str> = SPECIES
      .iter()
      .map(|(name, ..)| *name)
      .chain(std::iter::once(UNKNOWN_SPECIES))
      .collect();

    for event in 0..size {
      let event_id = format!("ev-{event}");
      dataset.push_event(&event_id, latitude.sample(rng), longitude.sample(rng));
      for _ in 0..rng.gen_range(1..=3) {
        let name = names.choose(rng).copied().unwrap_or(UNKNOWN_SPECIES);
        let name = if rng.gen_bool(0.1) {
          name.to_uppercase()
        } else {
          name.to_string()
        };
        // The first row always carries a count so every engine infers an integer column.
        let count = if dataset.occurrences.is_empty() || rng.gen_bool(0.9) {
          Some(rng.gen_range(1..500))
        } else {
          None
        };
        dataset.push_occurrence(&event_id, &name, count);
      }
    }
    Ok(dataset)
  }

  /// Writes the three files under `root`, in the same layout as the real datasets.
  pub fn write(&self, root: impl AsRef<Path>) -> Result<DatasetPaths> {
    let paths = DatasetPaths::from_root(root);
    write_tsv(
      &paths.occurrence,
      &["id", "eventID", "scientificName", "individualCount"],
      self.occurrences.iter().map(|row| {
        vec![
          row.id.clone(),
          row.event_id.clone(),
          row.scientific_name.clone(),
          row.individual_count.map(|count| count.to_string()).unwrap_or_default(),
        ]
      }),
    )?;
    write_tsv(
      &paths.event,
      &["id", "decimalLatitude", "decimalLongitude"],
      self.events.iter().map(|row| {
        // `Display` for f64 prints the shortest text that parses back to the same value.
        vec![
          row.id.clone(),
          row.latitude.to_string(),
          row.longitude.to_string(),
        ]
      }),
    )?;
    write_tsv(
      &paths.taxon,
      &["taxonID", "canonicalName", "genus", "family", "class"],
      self.taxa.iter().map(|row| {
        vec![
          row.id.clone(),
          row.canonical_name.clone(),
          row.genus.clone(),
          row.family.clone(),
          row.class.clone(),
        ]
      }),
    )?;
    Ok(paths)
  }

  /// What the Simple query must yield on this dataset.
  pub fn simple_summary(&self) -> SimpleSummary {
    let mut totals: HashMap<&str, i64> = HashMap::new();
    for row in &self.occurrences {
      *totals.entry(row.scientific_name.as_str()).or_default() += row.individual_count.unwrap_or(0);
    }
    SimpleSummary {
      group_count: totals.len(),
      total_individuals: totals.values().sum(),
    }
  }

  /// What the Advanced query must yield on this dataset, computed directly from the rows.
  pub fn advanced_reference(&self, poi: &PointOfInterest) -> GenusSummaries {
    let distances: HashMap<&str, f64> = self
      .events
      .iter()
      .filter(|event| poi.contains(event.latitude, event.longitude))
      .map(|event| (event.id.as_str(), poi.distance(event.latitude, event.longitude)))
      .collect();

    let mut birds: HashMap<String, Vec<(String, String)>> = HashMap::new();
    for taxon in self.taxa.iter().filter(|taxon| taxon.class == AVES_CLASS) {
      birds
        .entry(taxon.canonical_name.to_lowercase())
        .or_default()
        .push((taxon.genus.to_lowercase(), taxon.family.to_lowercase()));
    }

    let mut groups: BTreeMap<Option<String>, (f64, bool)> = BTreeMap::new();
    for occurrence in &self.occurrences {
      let Some(&distance) = distances.get(occurrence.event_id.as_str()) else {
        continue;
      };
      let matches = birds
        .get(&occurrence.scientific_name.to_lowercase())
        .map(|matches| {
          matches
            .iter()
            .map(|(genus, family)| (Some(genus.clone()), family == ANATIDAE_FAMILY))
            .collect()
        })
        .unwrap_or_else(|| vec![(None, false)]);
      for (genus, is_anatidae) in matches {
        let group = groups.entry(genus).or_insert((distance, is_anatidae));
        group.0 = group.0.min(distance);
      }
    }

    let mut summaries: Vec<GenusSummary> = groups
      .into_iter()
      .map(|(genus, (min_distance, is_anatidae))| GenusSummary {
        genus,
        min_distance,
        is_anatidae,
      })
      .collect();
    summaries.sort_by(|left, right| left.min_distance.total_cmp(&right.min_distance));
    GenusSummaries(summaries)
  }
}

/// Genus to family over the bird taxa, `None` if some genus has two families.
pub fn genus_families(taxa: &[TaxonRow]) -> Option<HashMap<String, String>> {
  let mut families: HashMap<String, String> = HashMap::new();
  for taxon in taxa.iter().filter(|taxon| taxon.class == AVES_CLASS) {
    let family = families
      .entry(taxon.genus.to_lowercase())
      .or_insert_with(|| taxon.family.to_lowercase());
    if *family != taxon.family.to_lowercase() {
      return None;
    }
  }
  Some(families)
}

fn write_tsv(
  path: &Path,
  header: &[&str],
  rows: impl Iterator<Item = Vec<String>>,
) -> Result<()> {
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).with_context(|| format!("creating {}", parent.display()))?;
  }
  let file = fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
  let mut writer = BufWriter::new(file);
  writeln!(writer, "{}", header.join("\t"))?;
  for row in rows {
    writeln!(writer, "{}", row.join("\t"))?;
  }
  writer.flush()?;
  Ok(())
}
