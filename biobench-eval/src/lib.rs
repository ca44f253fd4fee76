//! This crate implements the benchmark queries against every engine, including:
//! - DuckDB: SQL over `read_csv`
//! - polars: lazy frames and the expression DSL
//! - DataFusion: the `DataFrame` API on a `SessionContext`
//! - arrow: the arrow-rs CSV reader and compute kernels
//! - Fixture generation for the cross-engine tests
//!
//! Each engine spells the same two queries in its own idiom on purpose: the point is to time each
//! engine doing the work natively, so there is no shared query layer between them.

#[cfg(test)]
mod test;

pub mod engine;
pub mod util;

pub use engine::{
  arrow::ArrowEngine, datafusion::DataFusionEngine, duckdb::DuckDbEngine, polars::PolarsEngine,
  verified_engines, Engine, EngineKind,
};
