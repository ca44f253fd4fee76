//! Exposes the resolved versions of the libraries that do not report their own version at runtime
//! as `BIOBENCH_<NAME>_VERSION` environment variables.

use std::{env, fs, path::Path};

use serde::Deserialize;

const VERSIONED: [&str; 2] = ["polars", "arrow"];

#[derive(Deserialize)]
struct Lockfile {
  #[serde(default)]
  package: Vec<LockedPackage>,
}

#[derive(Deserialize)]
struct LockedPackage {
  name: String,
  version: String,
}

fn main() {
  let manifest_dir = env::var("CARGO_MANIFEST_DIR").unwrap_or_default();
  let lockfile = Path::new(&manifest_dir).join("../Cargo.lock");
  println!("cargo:rerun-if-changed={}", lockfile.display());

  let packages = fs::read_to_string(&lockfile)
    .ok()
    .and_then(|text| toml::from_str::<Lockfile>(&text).ok())
    .map(|lock| lock.package)
    .unwrap_or_default();

  for name in VERSIONED {
    // Several versions can be locked at once (transitive dependencies); report the newest.
    let version = packages
      .iter()
      .filter(|package| package.name == name)
      .max_by_key(|package| version_key(&package.version))
      .map(|package| package.version.as_str())
      .unwrap_or("unknown");
    println!(
      "cargo:rustc-env=BIOBENCH_{}_VERSION={version}",
      name.to_uppercase()
    );
  }
}

fn version_key(version: &str) -> Vec<u64> {
  version
    .split(['.', '-', '+'])
    .map(|part| part.parse().unwrap_or(0))
    .collect()
}
