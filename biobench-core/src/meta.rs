//! Run metadata: which library, which version, which benchmark.
//!
//! The timing driver only sees opaque closures; these annotations are what allow results to be
//! grouped per library and per benchmark afterwards.

use std::{collections::BTreeMap, fs::File, io::BufWriter, path::Path};

use anyhow::{Context, Result};
use serde::Serialize;

pub const LIBRARY_NAME: &str = "library_name";
pub const LIBRARY_VERSION: &str = "library_version";
pub const BENCHMARK_NAME: &str = "benchmark_name";

/// A benchmarked library that can report its own version.
pub trait Library {
  fn version(&self) -> String;
}

/// One benchmark run: the annotation bag plus whatever timings the driver chose to keep.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct BenchmarkRecord {
  pub extra_info: BTreeMap<String, String>,
  pub durations_ms: Vec<f64>,
}

impl BenchmarkRecord {
  pub fn library_name(&self) -> &str {
    self.annotation(LIBRARY_NAME)
  }

  pub fn library_version(&self) -> &str {
    self.annotation(LIBRARY_VERSION)
  }

  pub fn benchmark_name(&self) -> &str {
    self.annotation(BENCHMARK_NAME)
  }

  fn annotation(&self, key: &str) -> &str {
    self.extra_info.get(key).map(String::as_str).unwrap_or_default()
  }

  /// Keeps the last `sample_size` timings of a driver that calls the timed routine for warm-up
  /// before its measured samples.
  pub fn keep_measured_samples(&mut self, mut timings_ms: Vec<f64>, sample_size: usize) {
    let warm_up = timings_ms.len().saturating_sub(sample_size);
    self.durations_ms = timings_ms.split_off(warm_up);
  }

  pub fn mean_ms(&self) -> Option<f64> {
    if self.durations_ms.is_empty() {
      return None;
    }
    Some(self.durations_ms.iter().sum::<f64>() / self.durations_ms.len() as f64)
  }
}

/// Writes the three metadata keys. Calling it again with the same arguments changes nothing.
pub fn set_benchmark_meta(
  record: &mut BenchmarkRecord,
  benchmark_name: &str,
  library_name: &str,
  library: &impl Library,
) {
  let annotations = [
    (LIBRARY_NAME, library_name.to_string()),
    (LIBRARY_VERSION, library.version()),
    (BENCHMARK_NAME, benchmark_name.to_string()),
  ];
  for (key, value) in annotations {
    record.extra_info.insert(key.to_string(), value);
  }
}

/// Dumps the records as a JSON array.
pub fn write_records(path: impl AsRef<Path>, records: &[BenchmarkRecord]) -> Result<()> {
  let path = path.as_ref();
  if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
    std::fs::create_dir_all(parent)
      .with_context(|| format!("creating {}", parent.display()))?;
  }
  let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
  serde_json::to_writer_pretty(BufWriter::new(file), records)?;
  Ok(())
}
