//! This crate holds the engine-independent half of the benchmark harness:
//! - where the datasets live ([`paths`])
//! - the query parameters and the normalized result shapes every engine converts into ([`query`])
//! - the golden values every engine is checked against ([`oracle`])
//! - the metadata attached to a benchmark run ([`meta`])
//!
//! Nothing in here executes a query. The engine-specific implementations live in `biobench-eval`.

pub mod meta;
pub mod oracle;
pub mod paths;
pub mod query;

pub use meta::{set_benchmark_meta, BenchmarkRecord, Library};
pub use paths::DatasetPaths;
pub use query::{
  AdvancedSummary, GenusSummaries, GenusSummary, PointOfInterest, SimpleSummary, SpeciesCount,
  SpeciesCounts, POI,
};
