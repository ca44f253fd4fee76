//! DataFusion, through its `DataFrame` API rather than SQL.
//!
//! A query run builds a logical plan on the shared [`SessionContext`] and drains the resulting
//! stream of `RecordBatch`es. The context registers no tables, so nothing read by one run is
//! visible to the next.

use std::path::Path;

use anyhow::{anyhow, Context, Result};
use biobench_core::{
  query::{ANATIDAE_FAMILY, AVES_CLASS},
  DatasetPaths, GenusSummaries, GenusSummary, Library, PointOfInterest, SpeciesCount,
  SpeciesCounts,
};
use datafusion::{
  arrow::{
    array::{AsArray, RecordBatch},
    datatypes::{Float64Type, Int64Type},
  },
  prelude::*,
};
use futures::StreamExt;
use tracing::debug;

use super::NO_QUOTE;

pub struct DataFusionEngine {
  ctx: SessionContext,
}

impl Default for DataFusionEngine {
  fn default() -> Self {
    Self::new()
  }
}

impl DataFusionEngine {
  pub fn new() -> Self {
    Self {
      ctx: SessionContext::new(),
    }
  }

  /// Individuals per scientific name, most observed first.
  pub async fn simple(&self, occurrence: &Path) -> Result<SpeciesCounts> {
    debug!(path = %occurrence.display(), "datafusion simple");
    let df = self
      .read_tsv(occurrence)
      .await?
      .select_columns(&["scientificName", "individualCount"])?
      .aggregate(
        vec![col("scientificName")],
        vec![sum(col("individualCount")).alias("individualCount")],
      )?
      .sort(vec![col("individualCount").sort(false, false)])?;

    let mut species = vec![];
    for batch in drain(df).await? {
      let names = batch.column(0).as_string::<i32>();
      let counts = batch.column(1).as_primitive::<Int64Type>();
      species.extend(names.iter().zip(counts.iter()).map(|(name, count)| SpeciesCount {
        scientific_name: name.map(str::to_string),
        individual_count: count.unwrap_or_default(),
      }));
    }
    Ok(SpeciesCounts(species))
  }

  /// Bird genera observed around `poi`, closest first.
  pub async fn advanced(
    &self,
    paths: &DatasetPaths,
    poi: &PointOfInterest,
  ) -> Result<GenusSummaries> {
    debug!(
      occurrence = %paths.occurrence.display(),
      event = %paths.event.display(),
      taxon = %paths.taxon.display(),
      "datafusion advanced"
    );
    let distance = sqrt(
      power(col("decimalLatitude") - lit(poi.latitude), lit(2.0))
        + power(col("decimalLongitude") - lit(poi.longitude), lit(2.0)),
    );
    let events = self
      .read_tsv(&paths.event)
      .await?
      .select(vec![col("id").alias("event_id"), distance.alias("distance")])?
      .filter(col("distance").lt(lit(poi.max_distance_degrees)))?;

    let aves_taxa = self
      .read_tsv(&paths.taxon)
      .await?
      .filter(col("class").eq(lit(AVES_CLASS)))?
      .select(vec![
        lower(col("canonicalName")).alias("taxon_canonical_name"),
        lower(col("family")).alias("taxon_family"),
        lower(col("genus")).alias("taxon_genus"),
      ])?
      .sort(vec![col("taxon_canonical_name").sort(true, false)])?;

    let occurrences = self.read_tsv(&paths.occurrence).await?.select(vec![
      lower(col("scientificName")).alias("occurrence_scientific_name"),
      col("eventID").alias("occurrence_event_id"),
    ])?;

    // MIN picks the representative family; all rows of a genus share it.
    let df = events
      .join(
        occurrences,
        JoinType::Inner,
        &["event_id"],
        &["occurrence_event_id"],
        None,
      )?
      .join(
        aves_taxa,
        JoinType::Left,
        &["occurrence_scientific_name"],
        &["taxon_canonical_name"],
        None,
      )?
      .aggregate(
        vec![col("taxon_genus")],
        vec![
          min(col("distance")).alias("distance"),
          min(col("taxon_family")).alias("taxon_family"),
        ],
      )?
      .select(vec![
        col("taxon_genus"),
        col("distance"),
        col("taxon_family")
          .eq(lit(ANATIDAE_FAMILY))
          .alias("is_anatidae"),
      ])?
      .sort(vec![col("distance").sort(true, false)])?;

    let mut genera = vec![];
    for batch in drain(df).await? {
      let names = batch.column(0).as_string::<i32>();
      let distances = batch.column(1).as_primitive::<Float64Type>();
      let anatidae = batch.column(2).as_boolean();
      genera.extend(
        names
          .iter()
          .zip(distances.iter())
          .zip(anatidae.iter())
          .map(|((genus, distance), is_anatidae)| GenusSummary {
            genus: genus.map(str::to_string),
            min_distance: distance.unwrap_or(f64::NAN),
            is_anatidae: is_anatidae.unwrap_or_default(),
          }),
      );
    }
    Ok(GenusSummaries(genera))
  }

  async fn read_tsv(&self, path: &Path) -> Result<DataFrame> {
    let location = path
      .to_str()
      .ok_or_else(|| anyhow!("non UTF-8 path {}", path.display()))?;
    // Listing tables only pick up files with the configured extension.
    let extension = path
      .extension()
      .and_then(|extension| extension.to_str())
      .map(|extension| format!(".{extension}"))
      .unwrap_or_default();
    let options = CsvReadOptions::new()
      .has_header(true)
      .delimiter(b'\t')
      .quote(NO_QUOTE)
      .file_extension(&extension);
    self
      .ctx
      .read_csv(location, options)
      .await
      .with_context(|| format!("reading {}", path.display()))
  }
}

impl Library for DataFusionEngine {
  fn version(&self) -> String {
    datafusion::DATAFUSION_VERSION.to_string()
  }
}

async fn drain(df: DataFrame) -> Result<Vec<RecordBatch>> {
  let mut stream = df.execute_stream().await?;
  let mut batches = vec![];
  while let Some(next_batch) = stream.next().await {
    batches.push(next_batch?);
  }
  Ok(batches)
}

#[cfg(test)]
mod tests {
  use biobench_core::SimpleSummary;

  use super::*;
  use crate::util::Dataset;

  #[tokio::test]
  async fn test_simple_sums_per_name() {
    let mut dataset = Dataset::default();
    dataset
      .push_event("ev-0", 0.05, 0.5)
      .push_occurrence("ev-0", "Anas crecca", Some(3))
      .push_occurrence("ev-0", "Anas crecca", Some(4))
      .push_occurrence("ev-0", "Cygnus olor", Some(1))
      .push_taxon("Anas crecca", "Anas", "Anatidae", "Aves");
    let dir = tempfile::tempdir().unwrap();
    let paths = dataset.write(dir.path()).unwrap();

    let counts = DataFusionEngine::new().simple(&paths.occurrence).await.unwrap();
    assert_eq!(counts.0[0].scientific_name.as_deref(), Some("Anas crecca"));
    assert_eq!(
      counts.summary(),
      SimpleSummary {
        group_count: 2,
        total_individuals: 8
      }
    );
  }

  #[tokio::test]
  async fn test_reads_files_without_csv_extension() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("Taxon.tsv");
    std::fs::write(&path, "taxonID\tcanonicalName\n1\tAnas \"crecca\"\n").unwrap();

    let engine = DataFusionEngine::new();
    let batches = drain(engine.read_tsv(&path).await.unwrap()).await.unwrap();
    let names = batches[0].column(1).as_string::<i32>();
    assert_eq!(names.value(0), "Anas \"crecca\"");
  }
}
