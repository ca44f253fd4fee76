use std::{path::PathBuf, time::Instant};

use anyhow::{bail, Result};
use biobench_core::{
  meta::write_records, oracle, paths::project_root, set_benchmark_meta, BenchmarkRecord,
  DatasetPaths, POI,
};
use biobench_eval::{Engine, EngineKind};
use clap::{Parser, ValueEnum};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum QuerySelection {
  Simple,
  Advanced,
  All,
}

impl QuerySelection {
  fn queries(self) -> &'static [Query] {
    match self {
      QuerySelection::Simple => &[Query::Simple],
      QuerySelection::Advanced => &[Query::Advanced],
      QuerySelection::All => &[Query::Simple, Query::Advanced],
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Query {
  Simple,
  Advanced,
}

impl Query {
  fn benchmark_name(self) -> &'static str {
    match self {
      Query::Simple => "Simple",
      Query::Advanced => "Advanced",
    }
  }
}

/// Runs the benchmark queries once per engine and checks them against the known results.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// Project root holding `datasets/`; defaults to $BIOBENCH_ROOT, then the workspace root
  #[arg(long)]
  root: Option<PathBuf>,
  #[arg(long, value_enum, default_value_t = QuerySelection::All)]
  query: QuerySelection,
  /// Engines to run, all of them when omitted
  #[arg(long = "engine", value_enum)]
  engines: Vec<EngineKind>,
  #[arg(long, default_value_t = 1, value_parser = clap::value_parser!(u32).range(1..))]
  iterations: u32,
  /// Writes the tagged run records to this file as JSON
  #[arg(long)]
  json: Option<PathBuf>,
}

fn main() -> Result<()> {
  let _ = tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
    .try_init();

  let args = Args::parse();
  let root = match args.root {
    Some(root) => root,
    None => project_root()?,
  };
  let paths = DatasetPaths::from_root(&root);
  let missing = paths.missing();
  if !missing.is_empty() {
    let missing: Vec<String> = missing.iter().map(|path| path.display().to_string()).collect();
    bail!("missing dataset files: {}", missing.join(", "));
  }

  let engines = if args.engines.is_empty() {
    EngineKind::ALL.to_vec()
  } else {
    args.engines
  };

  let mut records = vec![];
  let mut failures = 0;
  for kind in engines {
    let engine = Engine::new(kind)?;
    for &query in args.query.queries() {
      match run(&engine, query, &paths, args.iterations) {
        Ok(record) => {
          info!(
            engine = record.library_name(),
            version = record.library_version(),
            query = record.benchmark_name(),
            mean_ms = record.mean_ms().unwrap_or_default(),
            "ok"
          );
          records.push(record);
        }
        Err(err) => {
          warn!(engine = kind.display_name(), query = query.benchmark_name(), "{err:#}");
          failures += 1;
        }
      }
    }
  }

  if let Some(json) = args.json {
    write_records(&json, &records)?;
    info!(path = %json.display(), records = records.len(), "wrote records");
  }
  if failures > 0 {
    bail!("{failures} engine/query runs failed");
  }
  Ok(())
}

/// Times `iterations` runs of `query`; every run has to match the oracle.
fn run(
  engine: &Engine,
  query: Query,
  paths: &DatasetPaths,
  iterations: u32,
) -> Result<BenchmarkRecord> {
  let mut record = BenchmarkRecord::default();
  set_benchmark_meta(
    &mut record,
    query.benchmark_name(),
    engine.kind().display_name(),
    engine,
  );
  for _ in 0..iterations {
    let start = Instant::now();
    match query {
      Query::Simple => {
        let counts = engine.simple(paths)?;
        record.durations_ms.push(start.elapsed().as_secs_f64() * 1000.0);
        oracle::check_simple(&counts.summary())?;
      }
      Query::Advanced => {
        let genera = engine.advanced(paths, &POI)?;
        record.durations_ms.push(start.elapsed().as_secs_f64() * 1000.0);
        oracle::check_advanced(&genera.summary())?;
      }
    }
  }
  Ok(record)
}
