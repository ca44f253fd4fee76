//! DuckDB, queried in SQL directly over the TSV files with `read_csv`.
//!
//! One in-memory connection is opened per engine and reused by every query run, so connection
//! setup stays outside the timed closures.

use std::path::Path;

use anyhow::{Context, Result};
use biobench_core::{
  DatasetPaths, GenusSummaries, GenusSummary, Library, PointOfInterest, SpeciesCount,
  SpeciesCounts,
};
use duckdb::{params, Connection};
use tracing::debug;

pub struct DuckDbEngine {
  conn: Connection,
  version: String,
}

impl DuckDbEngine {
  pub fn new() -> Result<Self> {
    let conn = Connection::open_in_memory().context("opening in-memory DuckDB")?;
    let version = conn.query_row(
      "SELECT library_version FROM pragma_version()",
      [],
      |row| row.get(0),
    )?;
    Ok(Self { conn, version })
  }

  /// Individuals per scientific name, most observed first.
  pub fn simple(&self, occurrence: &Path) -> Result<SpeciesCounts> {
    debug!(path = %occurrence.display(), "duckdb simple");
    let sql = format!(
      "SELECT scientificName, CAST(SUM(individualCount) AS BIGINT) AS birds_count
       FROM {}
       GROUP BY scientificName
       ORDER BY birds_count DESC",
      read_tsv(occurrence)
    );
    let mut stmt = self.conn.prepare(&sql)?;
    let rows = stmt.query_map([], |row| {
      Ok(SpeciesCount {
        scientific_name: row.get(0)?,
        individual_count: row.get::<_, Option<i64>>(1)?.unwrap_or_default(),
      })
    })?;
    let counts = rows.collect::<duckdb::Result<Vec<_>>>()?;
    Ok(SpeciesCounts(counts))
  }

  /// Bird genera observed around `poi`, closest first.
  pub fn advanced(&self, paths: &DatasetPaths, poi: &PointOfInterest) -> Result<GenusSummaries> {
    debug!(
      occurrence = %paths.occurrence.display(),
      event = %paths.event.display(),
      taxon = %paths.taxon.display(),
      "duckdb advanced"
    );
    let sql = format!(
      "WITH event_with_distance AS (
         SELECT id, sqrt(pow(decimalLatitude - ?, 2) + pow(decimalLongitude - ?, 2)) AS distance
         FROM {events}
       ),
       aves_taxon AS (
         SELECT lower(canonicalName) AS canonicalName, lower(family) AS family, lower(genus) AS genus
         FROM {taxa}
         WHERE class = 'Aves'
         ORDER BY canonicalName ASC
       ),
       occurrence AS (
         SELECT lower(scientificName) AS scientificName, eventID
         FROM {occurrences}
       )
       SELECT aves_taxon.genus,
              MIN(event_with_distance.distance) AS distance,
              ANY_VALUE(aves_taxon.family) = 'anatidae' AS is_anatidae
       FROM event_with_distance
       INNER JOIN occurrence ON event_with_distance.id = occurrence.eventID
       LEFT JOIN aves_taxon ON aves_taxon.canonicalName = occurrence.scientificName
       WHERE distance < ?
       GROUP BY aves_taxon.genus
       ORDER BY distance ASC",
      events = read_tsv(&paths.event),
      taxa = read_tsv(&paths.taxon),
      occurrences = read_tsv(&paths.occurrence),
    );
    let mut stmt = self.conn.prepare(&sql)?;
    let rows = stmt.query_map(
      params![poi.latitude, poi.longitude, poi.max_distance_degrees],
      |row| {
        Ok(GenusSummary {
          genus: row.get(0)?,
          min_distance: row.get(1)?,
          is_anatidae: row.get::<_, Option<bool>>(2)?.unwrap_or_default(),
        })
      },
    )?;
    let genera = rows.collect::<duckdb::Result<Vec<_>>>()?;
    Ok(GenusSummaries(genera))
  }
}

impl Library for DuckDbEngine {
  fn version(&self) -> String {
    self.version.clone()
  }
}

/// Table function reading one TSV file: header row, tab delimited, quoting disabled.
fn read_tsv(path: &Path) -> String {
  let path = path.display().to_string().replace('\'', "''");
  format!("read_csv('{path}', auto_detect = true, header = true, delim = '\t', quote = '')")
}
