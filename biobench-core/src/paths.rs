//! Dataset layout, relative to the project root:
//!
//! ```text
//! datasets/
//! ├── inbo-watervogels/
//! │   ├── occurrence.txt        # one row per observation
//! │   └── event.txt             # one row per sampling event
//! └── gbif-backbone/backbone/
//!     └── Taxon.tsv             # GBIF taxonomic backbone
//! ```
//!
//! Resolution never touches the filesystem. A missing file surfaces later, as the reading engine's
//! own error.

use std::{
  ffi::OsString,
  path::{Path, PathBuf},
};

use anyhow::{anyhow, Result};

/// Overrides the project root the datasets are resolved against.
pub const ROOT_ENV_VAR: &str = "BIOBENCH_ROOT";

const WATERBIRDS_DIR: &str = "datasets/inbo-watervogels";
const BACKBONE_DIR: &str = "datasets/gbif-backbone/backbone";

/// The three input files every query implementation reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetPaths {
  pub occurrence: PathBuf,
  pub event: PathBuf,
  pub taxon: PathBuf,
}

impl DatasetPaths {
  pub fn from_root(root: impl AsRef<Path>) -> Self {
    let root = root.as_ref();
    let waterbirds = root.join(WATERBIRDS_DIR);
    let backbone = root.join(BACKBONE_DIR);
    Self {
      occurrence: waterbirds.join("occurrence.txt"),
      event: waterbirds.join("event.txt"),
      taxon: backbone.join("Taxon.tsv"),
    }
  }

  /// Paths under [`project_root`].
  pub fn resolve() -> Result<Self> {
    Ok(Self::from_root(project_root()?))
  }

  /// Files that do not exist at the moment of the call. Only used for early, readable failures in
  /// the command-line runner; the query implementations never check.
  pub fn missing(&self) -> Vec<&Path> {
    [&self.occurrence, &self.event, &self.taxon]
      .into_iter()
      .map(PathBuf::as_path)
      .filter(|path| !path.exists())
      .collect()
  }
}

/// `$BIOBENCH_ROOT` when set and non-empty, the workspace root otherwise.
pub fn project_root() -> Result<PathBuf> {
  project_root_from(std::env::var_os(ROOT_ENV_VAR))
}

fn project_root_from(overridden: Option<OsString>) -> Result<PathBuf> {
  match overridden {
    Some(root) if !root.is_empty() => Ok(PathBuf::from(root)),
    _ => Path::new(env!("CARGO_MANIFEST_DIR"))
      .parent()
      .map(Path::to_path_buf)
      .ok_or_else(|| anyhow!("cannot determine the workspace root")),
  }
}
