//! Golden values for the inbo-watervogels occurrence/event snapshot and the GBIF backbone, computed
//! once with a trusted engine. Regenerating the datasets means recomputing these, not adjusting
//! them until the engines pass.

use std::fmt::Debug;

use anyhow::{ensure, Result};

use crate::query::{AdvancedSummary, SimpleSummary};

pub const SIMPLE_EXPECTED: SimpleSummary = SimpleSummary {
  group_count: 186,
  total_individuals: 40_920_379,
};

/// One of the 41 genera has no bird taxon to match and counts as non-Anatidae.
pub const ADVANCED_EXPECTED: AdvancedSummary = AdvancedSummary {
  anatidae: 15,
  other: 26,
};

pub fn check<S: PartialEq + Debug>(query: &str, expected: &S, actual: &S) -> Result<()> {
  ensure!(
    expected == actual,
    "{query} query mismatch: expected {expected:?}, got {actual:?}"
  );
  Ok(())
}

pub fn check_simple(actual: &SimpleSummary) -> Result<()> {
  check("Simple", &SIMPLE_EXPECTED, actual)
}

pub fn check_advanced(actual: &AdvancedSummary) -> Result<()> {
  check("Advanced", &ADVANCED_EXPECTED, actual)
}
