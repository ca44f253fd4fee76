//! polars, through lazy CSV scans and the expression DSL. Every query run builds and collects a
//! fresh plan, so each run scans the files again.

use std::path::Path;

use anyhow::Result;
use biobench_core::{
  query::{ANATIDAE_FAMILY, AVES_CLASS},
  DatasetPaths, GenusSummaries, GenusSummary, Library, PointOfInterest, SpeciesCount,
  SpeciesCounts,
};
use polars::prelude::*;
use tracing::debug;

#[derive(Debug, Clone, Copy, Default)]
pub struct PolarsEngine;

impl PolarsEngine {
  /// Individuals per scientific name, most observed first.
  pub fn simple(&self, occurrence: &Path) -> Result<SpeciesCounts> {
    debug!(path = %occurrence.display(), "polars simple");
    let df = scan_tsv(occurrence)?
      .select([col("scientificName"), col("individualCount")])
      .group_by([col("scientificName")])
      .agg([col("individualCount").sum()])
      .sort(
        "individualCount",
        SortOptions {
          descending: true,
          nulls_last: true,
          ..Default::default()
        },
      )
      .collect()?;

    let names = df.column("scientificName")?.str()?;
    let counts = df.column("individualCount")?.cast(&DataType::Int64)?;
    let counts = counts.i64()?;
    let species = names
      .into_iter()
      .zip(counts)
      .map(|(name, count)| SpeciesCount {
        scientific_name: name.map(str::to_string),
        individual_count: count.unwrap_or_default(),
      })
      .collect();
    Ok(SpeciesCounts(species))
  }

  /// Bird genera observed around `poi`, closest first.
  pub fn advanced(&self, paths: &DatasetPaths, poi: &PointOfInterest) -> Result<GenusSummaries> {
    debug!(
      occurrence = %paths.occurrence.display(),
      event = %paths.event.display(),
      taxon = %paths.taxon.display(),
      "polars advanced"
    );
    let events = scan_tsv(&paths.event)?
      .with_column(
        ((col("decimalLatitude") - lit(poi.latitude)).pow(lit(2.0))
          + (col("decimalLongitude") - lit(poi.longitude)).pow(lit(2.0)))
        .sqrt()
        .alias("distance"),
      )
      .filter(col("distance").lt(lit(poi.max_distance_degrees)))
      .select([col("id").alias("event_id"), col("distance")]);

    let aves_taxa = scan_tsv(&paths.taxon)?
      .filter(col("class").eq(lit(AVES_CLASS)))
      .select([
        col("canonicalName")
          .str()
          .to_lowercase()
          .alias("taxon_canonical_name"),
        col("family").str().to_lowercase().alias("taxon_family"),
        col("genus").str().to_lowercase().alias("taxon_genus"),
      ])
      .sort("taxon_canonical_name", SortOptions::default());

    let occurrences = scan_tsv(&paths.occurrence)?.select([
      col("scientificName")
        .str()
        .to_lowercase()
        .alias("occurrence_scientific_name"),
      col("eventID").alias("occurrence_event_id"),
    ]);

    let df = events
      .inner_join(occurrences, col("event_id"), col("occurrence_event_id"))
      .left_join(
        aves_taxa,
        col("occurrence_scientific_name"),
        col("taxon_canonical_name"),
      )
      .group_by([col("taxon_genus")])
      .agg([
        col("distance").min().alias("distance"),
        // Skip nulls: the null genus group mixes unmatched rows with matched ones.
        col("taxon_family")
          .drop_nulls()
          .first()
          .eq(lit(ANATIDAE_FAMILY))
          .alias("is_anatidae"),
      ])
      .sort("distance", SortOptions::default())
      .collect()?;

    let genera = df.column("taxon_genus")?.str()?;
    let distances = df.column("distance")?.f64()?;
    let anatidae = df.column("is_anatidae")?.bool()?;
    let summaries = genera
      .into_iter()
      .zip(distances)
      .zip(anatidae)
      .map(|((genus, distance), is_anatidae)| GenusSummary {
        genus: genus.map(str::to_string),
        min_distance: distance.unwrap_or(f64::NAN),
        is_anatidae: is_anatidae.unwrap_or_default(),
      })
      .collect();
    Ok(GenusSummaries(summaries))
  }
}

impl Library for PolarsEngine {
  fn version(&self) -> String {
    env!("BIOBENCH_POLARS_VERSION").to_string()
  }
}

fn scan_tsv(path: &Path) -> PolarsResult<LazyFrame> {
  LazyCsvReader::new(path)
    .with_separator(b'\t')
    .with_quote_char(None)
    .has_header(true)
    .finish()
}
