//! Runtime settings, layered from defaults, an optional TOML file, and
//! `CHRONOATLAS_*` environment variables.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use chronoatlas_core::{hierarchy::DEFAULT_CHILD_PERCENT, reconstruct::DeletionPolicy};
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
  /// The atlas document to operate on.
  pub atlas_path:            PathBuf,
  /// Share of a region (in %) that must lie inside another to be its child.
  pub containment_threshold: f64,
  pub deletion_policy:       DeletionPolicy,
}

impl Settings {
  pub fn load(config_path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .set_default("atlas_path", "atlas.json")?
      .set_default("containment_threshold", DEFAULT_CHILD_PERCENT)?
      .set_default("deletion_policy", "terminal")?
      .add_source(config::File::from(config_path.to_path_buf()).required(false))
      .add_source(config::Environment::with_prefix("CHRONOATLAS"))
      .build()
      .context("failed to read configuration")?;

    settings
      .try_deserialize()
      .context("failed to deserialise settings")
  }
}
