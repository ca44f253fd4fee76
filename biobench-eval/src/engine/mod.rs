//! One module per benchmarked library. All of them read the same TSV files (header row, no
//! quoting) and return [`SpeciesCounts`] / [`GenusSummaries`].
//!
//! [`Engine`] only dispatches a query to the library chosen at runtime, for the command-line
//! runner and the tests. The queries themselves stay written out per library.

pub mod arrow;
pub mod datafusion;
pub mod duckdb;
pub mod polars;

use anyhow::Result;
use biobench_core::{DatasetPaths, GenusSummaries, Library, PointOfInterest, SpeciesCounts};
use clap::ValueEnum;
use tokio::runtime::Runtime;
use tracing::warn;

use self::{
  arrow::ArrowEngine, datafusion::DataFusionEngine, duckdb::DuckDbEngine, polars::PolarsEngine,
};

/// arrow-csv and DataFusion cannot switch quoting off; NUL never occurs in the datasets.
pub(crate) const NO_QUOTE: u8 = b'\0';

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum)]
pub enum EngineKind {
  #[value(name = "duckdb")]
  DuckDb,
  Polars,
  #[value(name = "datafusion")]
  DataFusion,
  Arrow,
}

impl EngineKind {
  pub const ALL: [EngineKind; 4] = [
    EngineKind::DuckDb,
    EngineKind::Polars,
    EngineKind::DataFusion,
    EngineKind::Arrow,
  ];

  /// Name used as `library_name` in the benchmark metadata.
  pub fn display_name(self) -> &'static str {
    match self {
      EngineKind::DuckDb => "DuckDB",
      EngineKind::Polars => "Polars",
      EngineKind::DataFusion => "DataFusion",
      EngineKind::Arrow => "Arrow",
    }
  }
}

pub enum Engine {
  DuckDb(DuckDbEngine),
  Polars(PolarsEngine),
  /// DataFusion is async; its queries are driven to completion on this runtime.
  DataFusion(DataFusionEngine, Runtime),
  Arrow(ArrowEngine),
}

impl Engine {
  pub fn new(kind: EngineKind) -> Result<Self> {
    Ok(match kind {
      EngineKind::DuckDb => Engine::DuckDb(DuckDbEngine::new()?),
      EngineKind::Polars => Engine::Polars(PolarsEngine),
      EngineKind::DataFusion => {
        let runtime = tokio::runtime::Builder::new_multi_thread()
          .enable_all()
          .build()?;
        Engine::DataFusion(DataFusionEngine::new(), runtime)
      }
      EngineKind::Arrow => Engine::Arrow(ArrowEngine),
    })
  }

  pub fn kind(&self) -> EngineKind {
    match self {
      Engine::DuckDb(_) => EngineKind::DuckDb,
      Engine::Polars(_) => EngineKind::Polars,
      Engine::DataFusion(..) => EngineKind::DataFusion,
      Engine::Arrow(_) => EngineKind::Arrow,
    }
  }

  pub fn simple(&self, paths: &DatasetPaths) -> Result<SpeciesCounts> {
    match self {
      Engine::DuckDb(engine) => engine.simple(&paths.occurrence),
      Engine::Polars(engine) => engine.simple(&paths.occurrence),
      Engine::DataFusion(engine, runtime) => runtime.block_on(engine.simple(&paths.occurrence)),
      Engine::Arrow(engine) => engine.simple(&paths.occurrence),
    }
  }

  pub fn advanced(&self, paths: &DatasetPaths, poi: &PointOfInterest) -> Result<GenusSummaries> {
    match self {
      Engine::DuckDb(engine) => engine.advanced(paths, poi),
      Engine::Polars(engine) => engine.advanced(paths, poi),
      Engine::DataFusion(engine, runtime) => runtime.block_on(engine.advanced(paths, poi)),
      Engine::Arrow(engine) => engine.advanced(paths, poi),
    }
  }
}

/// Builds an engine per kind and keeps those passing `check`. A failing engine is logged and
/// returned in the second list; the remaining kinds are still tried.
pub fn verified_engines(
  kinds: &[EngineKind],
  check: impl Fn(&Engine) -> Result<()>,
) -> (Vec<Engine>, Vec<EngineKind>) {
  let mut verified = vec![];
  let mut failed = vec![];
  for &kind in kinds {
    match Engine::new(kind).and_then(|engine| check(&engine).map(|()| engine)) {
      Ok(engine) => verified.push(engine),
      Err(err) => {
        warn!(engine = kind.display_name(), "{err:#}");
        failed.push(kind);
      }
    }
  }
  (verified, failed)
}

impl Library for Engine {
  fn version(&self) -> String {
    match self {
      Engine::DuckDb(engine) => engine.version(),
      Engine::Polars(engine) => engine.version(),
      Engine::DataFusion(engine, _) => engine.version(),
      Engine::Arrow(engine) => engine.version(),
    }
  }
}
