//! Field-level diffing: two entity snapshots → the minimal [`Delta`].
//!
//! A delta names only what changed. Changed values are carried whole; a
//! nested object that differs in one key is replaced entirely, never merged.

use serde::{Deserialize, Serialize};

use crate::entity::{Entity, Fields, Geometry};

/// The changed parts of an entity. An empty delta means "nothing to record".
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Delta {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub geometry: Option<Geometry>,
  #[serde(default, skip_serializing_if = "Fields::is_empty")]
  pub fields:   Fields,
}

impl Delta {
  pub fn is_empty(&self) -> bool {
    self.geometry.is_none() && self.fields.is_empty()
  }

  /// Overwrite every field this delta names; leave the rest untouched.
  ///
  /// A replaced geometry invalidates the cached region area.
  pub fn apply_to(&self, entity: &mut Entity) {
    if let Some(geometry) = &self.geometry {
      entity.geometry = geometry.clone();
      entity.area = None;
    }
    for (name, value) in &self.fields {
      entity.fields.insert(name.clone(), value.clone());
    }
  }
}

/// Compute what changed between `old` and `new`.
///
/// Only fields present in `new` are inspected: a field missing from `new` is
/// never reported, so a partial `new` cannot accidentally revert anything.
/// Geometry is always present and is compared structurally.
///
/// Identity (`id`, `kind`, `creation_year`) and the cached area are not part
/// of the delta.
pub fn diff(old: &Entity, new: &Entity) -> Delta {
  let geometry =
    (old.geometry != new.geometry).then(|| new.geometry.clone());

  let fields = new
    .fields
    .iter()
    .filter(|(name, value)| old.fields.get(*name) != Some(*value))
    .map(|(name, value)| (name.clone(), value.clone()))
    .collect();

  Delta { geometry, fields }
}
