//! arrow-rs on its own: the CSV reader plus compute kernels, no query engine on top.
//!
//! Filtering, casting, arithmetic, sorting and gathering run as arrow kernels. arrow-rs has no join
//! or hash aggregate operator, so:
//! - grouping sorts by the key and aggregates each run found by [`partition`]
//! - the event join looks up event ids in a hash map
//! - the taxon join binary searches the taxa, which are sorted by canonical name for that purpose

use std::{collections::HashMap, fs::File, io::Seek, path::Path, sync::Arc};

use anyhow::{Context, Result};
use arrow::{
  array::{Array, ArrayRef, AsArray, Float64Array, RecordBatch, StringArray, UInt32Array},
  compute::{
    self, cast_with_options,
    kernels::{cmp, partition::partition},
    CastOptions, SortOptions,
  },
  csv::{reader::Format, ReaderBuilder},
  datatypes::{DataType, Field, Float64Type, Int64Type, Schema},
};
use biobench_core::{
  query::{ANATIDAE_FAMILY, AVES_CLASS},
  DatasetPaths, GenusSummaries, GenusSummary, Library, PointOfInterest, SpeciesCount,
  SpeciesCounts,
};
use tracing::debug;

use super::NO_QUOTE;

#[derive(Debug, Clone, Copy, Default)]
pub struct ArrowEngine;

impl ArrowEngine {
  /// Individuals per scientific name, most observed first.
  pub fn simple(&self, occurrence: &Path) -> Result<SpeciesCounts> {
    let table = read_tsv(occurrence, &["scientificName", "individualCount"])?;
    let counts = cast_strict(table.column(1), &DataType::Int64)?;

    let order = compute::sort_to_indices(table.column(0), None, None)?;
    let sorted_names = compute::take(table.column(0), &order, None)?;
    let counts = compute::take(&counts, &order, None)?;

    let names = sorted_names.as_string::<i32>();
    let counts = counts.as_primitive::<Int64Type>();
    let mut species: Vec<SpeciesCount> = partition(&[sorted_names.clone()])?
      .ranges()
      .into_iter()
      .map(|range| {
        let group = counts.slice(range.start, range.len());
        SpeciesCount {
          scientific_name: names
            .is_valid(range.start)
            .then(|| names.value(range.start).to_string()),
          individual_count: compute::sum(&group).unwrap_or_default(),
        }
      })
      .collect();
    species.sort_by(|left, right| right.individual_count.cmp(&left.individual_count));
    Ok(SpeciesCounts(species))
  }

  /// Bird genera observed around `poi`, closest first.
  pub fn advanced(&self, paths: &DatasetPaths, poi: &PointOfInterest) -> Result<GenusSummaries> {
    // Step 1: events within the radius
    let events = read_tsv(&paths.event, &["id", "decimalLatitude", "decimalLongitude"])?;
    let latitude = cast_strict(events.column(1), &DataType::Float64)?;
    let longitude = cast_strict(events.column(2), &DataType::Float64)?;
    let distance: Float64Array = compute::binary(
      latitude.as_primitive::<Float64Type>(),
      longitude.as_primitive::<Float64Type>(),
      |lat, lon| ((lat - poi.latitude).powi(2) + (lon - poi.longitude).powi(2)).sqrt(),
    )?;
    let nearby = cmp::lt(&distance, &Float64Array::new_scalar(poi.max_distance_degrees))?;
    let event_ids = compute::filter(events.column(0), &nearby)?;
    let distance = compute::filter(&distance, &nearby)?;

    // Step 2: bird taxa, lower-cased and sorted by canonical name
    let taxa = read_tsv(&paths.taxon, &["canonicalName", "family", "genus", "class"])?;
    let birds = cmp::eq(taxa.column(3), &StringArray::new_scalar(AVES_CLASS))?;
    let canonical_names = lowercase(&compute::filter(taxa.column(0), &birds)?);
    let families = lowercase(&compute::filter(taxa.column(1), &birds)?);
    let genera = lowercase(&compute::filter(taxa.column(2), &birds)?);
    let order = compute::sort_to_indices(&canonical_names, None, None)?;
    let canonical_names = compute::take(&canonical_names, &order, None)?;
    let families = compute::take(&families, &order, None)?;
    let genera = compute::take(&genera, &order, None)?;

    // Step 3: occurrences
    let occurrences = read_tsv(&paths.occurrence, &["scientificName", "eventID"])?;
    let scientific_names = lowercase(occurrences.column(0));

    // Step 4: inner join events with occurrences, then left join taxa
    let (event_rows, occurrence_rows) =
      join_inner(event_ids.as_string::<i32>(), occurrences.column(1).as_string::<i32>());
    let distance = compute::take(&distance, &event_rows, None)?;
    let scientific_names = compute::take(&scientific_names, &occurrence_rows, None)?;

    let (left_rows, taxon_rows) = join_left_sorted(
      scientific_names.as_string::<i32>(),
      canonical_names.as_string::<i32>(),
    );
    let distance = compute::take(&distance, &left_rows, None)?;
    let families = compute::take(&families, &taxon_rows, None)?;
    let genera = compute::take(&genera, &taxon_rows, None)?;
    debug!(rows = genera.len(), "arrow joined");

    // Step 5: group by genus, nulls form their own group
    let order = compute::sort_to_indices(
      &genera,
      Some(SortOptions {
        descending: false,
        nulls_first: true,
      }),
      None,
    )?;
    let genera = compute::take(&genera, &order, None)?;
    let families = compute::take(&families, &order, None)?;
    let distance = compute::take(&distance, &order, None)?;

    let genus_names = genera.as_string::<i32>();
    let families = families.as_string::<i32>();
    let distance = distance.as_primitive::<Float64Type>();
    let mut summaries: Vec<GenusSummary> = partition(&[genera.clone()])?
      .ranges()
      .into_iter()
      .map(|range| {
        let group_distance = distance.slice(range.start, range.len());
        let group_families = families.slice(range.start, range.len());
        // Smallest family as the representative; all rows of a genus share it.
        let family = compute::min_string(&group_families);
        GenusSummary {
          genus: genus_names
            .is_valid(range.start)
            .then(|| genus_names.value(range.start).to_string()),
          min_distance: compute::min(&group_distance).unwrap_or(f64::NAN),
          is_anatidae: family == Some(ANATIDAE_FAMILY),
        }
      })
      .collect();

    // Step 6
    summaries.sort_by(|left, right| left.min_distance.total_cmp(&right.min_distance));
    Ok(GenusSummaries(summaries))
  }
}

impl Library for ArrowEngine {
  fn version(&self) -> String {
    env!("BIOBENCH_ARROW_VERSION").to_string()
  }
}

/// Reads `columns` of a TSV file as nullable strings; an empty field is null. Numbers are cast by
/// the caller, the way a reader with explicit column types would.
fn read_tsv(path: &Path, columns: &[&str]) -> Result<RecordBatch> {
  debug!(path = %path.display(), "arrow read");
  let mut file = File::open(path).with_context(|| format!("opening {}", path.display()))?;
  let format = Format::default()
    .with_header(true)
    .with_delimiter(b'\t')
    .with_quote(NO_QUOTE);
  let (header, _) = format.infer_schema(&mut file, Some(0))?;
  file.rewind()?;

  let projection = columns
    .iter()
    .map(|name| header.index_of(name))
    .collect::<Result<Vec<_>, _>>()
    .with_context(|| format!("reading the header of {}", path.display()))?;
  let schema = Arc::new(Schema::new(
    header
      .fields()
      .iter()
      .map(|field| Field::new(field.name(), DataType::Utf8, true))
      .collect::<Vec<_>>(),
  ));
  let projected = Arc::new(schema.project(&projection)?);

  let reader = ReaderBuilder::new(schema)
    .with_header(true)
    .with_delimiter(b'\t')
    .with_quote(NO_QUOTE)
    .with_projection(projection)
    .build(file)?;
  let batches = reader.collect::<Result<Vec<_>, _>>()?;
  Ok(compute::concat_batches(&projected, &batches)?)
}

/// Unparsable values are errors, not nulls.
fn cast_strict(array: &ArrayRef, to: &DataType) -> Result<ArrayRef> {
  let options = CastOptions {
    safe: false,
    ..Default::default()
  };
  Ok(cast_with_options(array, to, &options)?)
}

fn lowercase(array: &ArrayRef) -> ArrayRef {
  let lowered: StringArray = array
    .as_string::<i32>()
    .iter()
    .map(|value| value.map(str::to_lowercase))
    .collect();
  Arc::new(lowered)
}

/// Row index pairs of an equi-join. Builds on the (small) filtered event side.
fn join_inner(build: &StringArray, probe: &StringArray) -> (UInt32Array, UInt32Array) {
  let mut table: HashMap<&str, Vec<u32>> = HashMap::new();
  for (row, key) in build.iter().enumerate() {
    if let Some(key) = key {
      table.entry(key).or_default().push(row as u32);
    }
  }

  let mut build_rows = vec![];
  let mut probe_rows = vec![];
  for (row, key) in probe.iter().enumerate() {
    let Some(matches) = key.and_then(|key| table.get(key)) else {
      continue;
    };
    for &build_row in matches {
      build_rows.push(build_row);
      probe_rows.push(row as u32);
    }
  }
  (UInt32Array::from(build_rows), UInt32Array::from(probe_rows))
}

/// Row index pairs of a left outer equi-join against `sorted` (ascending, nulls first). An
/// unmatched left row pairs with a null index, which `take` turns into nulls.
fn join_left_sorted(left: &StringArray, sorted: &StringArray) -> (UInt32Array, UInt32Array) {
  let keys: Vec<Option<&str>> = sorted.iter().collect();

  let mut left_rows = vec![];
  let mut right_rows = vec![];
  for (row, key) in left.iter().enumerate() {
    let matches = match key {
      Some(key) => {
        let start = keys.partition_point(|candidate| *candidate < Some(key));
        let end = keys.partition_point(|candidate| *candidate <= Some(key));
        start..end
      }
      None => 0..0,
    };
    if matches.is_empty() {
      left_rows.push(row as u32);
      right_rows.push(None);
    }
    for right_row in matches {
      left_rows.push(row as u32);
      right_rows.push(Some(right_row as u32));
    }
  }
  (UInt32Array::from(left_rows), UInt32Array::from(right_rows))
}
