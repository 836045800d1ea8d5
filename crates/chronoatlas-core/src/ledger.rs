//! The change ledger: dated, per-entity diffs and their year-ordered index.
//!
//! [`ChangeRecord`]s are the only place history lives. [`build_change_map`]
//! projects the full record collection into a [`ChangeMap`] keyed by entity;
//! the map is rebuilt from scratch whenever the records change and is never
//! patched in place, so many reconstructions may share one map.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{diff::Delta, entity::EntityKind};

// ─── Records ─────────────────────────────────────────────────────────────────

/// What happened to an entity in a given year.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "delta", rename_all = "snake_case")]
pub enum Change {
  /// Only the named fields changed.
  Updated(Delta),
  /// The entity stops existing as of this year.
  Deleted,
}

impl Change {
  pub fn is_deleted(&self) -> bool { matches!(self, Self::Deleted) }
}

/// One dated change to one entity.
///
/// At most one record exists per `(year, element_id, element_type)`; writing
/// another one for the same tuple replaces it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecord {
  pub year:         i32,
  pub element_id:   Uuid,
  pub element_type: EntityKind,
  pub change:       Change,
  /// When the record was written. Decides which of two records for the same
  /// tuple survives. Missing timestamps load as the Unix epoch and so lose
  /// every tie.
  #[serde(default)]
  pub recorded_at:  DateTime<Utc>,
}

impl ChangeRecord {
  pub fn updated(
    element_type: EntityKind,
    element_id: Uuid,
    year: i32,
    delta: Delta,
  ) -> Self {
    Self {
      year,
      element_id,
      element_type,
      change: Change::Updated(delta),
      recorded_at: Utc::now(),
    }
  }

  pub fn deleted(element_type: EntityKind, element_id: Uuid, year: i32) -> Self {
    Self {
      year,
      element_id,
      element_type,
      change: Change::Deleted,
      recorded_at: Utc::now(),
    }
  }

  /// The upsert key of this record.
  pub fn key(&self) -> (i32, Uuid, EntityKind) {
    (self.year, self.element_id, self.element_type)
  }
}

// ─── Index ───────────────────────────────────────────────────────────────────

/// The surviving change for one `(entity, year)` slot.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
  pub change:      Change,
  pub recorded_at: DateTime<Utc>,
}

/// One entity's changes, ordered by year.
pub type EntityHistory = BTreeMap<i32, LedgerEntry>;

/// Read-only, year-ordered index of every entity's changes.
#[derive(Debug, Clone, Default)]
pub struct ChangeMap {
  histories: HashMap<(EntityKind, Uuid), EntityHistory>,
}

impl ChangeMap {
  /// The recorded history of one entity, if it has any.
  pub fn history(&self, kind: EntityKind, id: Uuid) -> Option<&EntityHistory> {
    self.histories.get(&(kind, id))
  }

  /// Years in which the entity has a recorded change, ascending.
  pub fn years_for(&self, kind: EntityKind, id: Uuid) -> Vec<i32> {
    self
      .history(kind, id)
      .map(|h| h.keys().copied().collect())
      .unwrap_or_default()
  }

  /// Number of entities with at least one change.
  pub fn len(&self) -> usize { self.histories.len() }

  pub fn is_empty(&self) -> bool { self.histories.is_empty() }

  /// Total number of `(entity, year)` slots.
  pub fn record_count(&self) -> usize {
    self.histories.values().map(BTreeMap::len).sum()
  }
}

/// Group `records` by entity into year-ordered histories.
///
/// Duplicate `(year, element_id, element_type)` tuples are resolved by
/// last-write-wins: the record with the later `recorded_at` survives, and on
/// equal timestamps the one appearing later in `records` does. Conflicts are
/// never an error.
pub fn build_change_map<'a>(
  records: impl IntoIterator<Item = &'a ChangeRecord>,
) -> ChangeMap {
  let mut histories: HashMap<(EntityKind, Uuid), EntityHistory> =
    HashMap::new();

  for record in records {
    let history = histories
      .entry((record.element_type, record.element_id))
      .or_default();

    if let Some(existing) = history.get(&record.year) {
      if existing.recorded_at > record.recorded_at {
        tracing::debug!(
          year = record.year,
          id = %record.element_id,
          kind = %record.element_type,
          "keeping newer change record over stale duplicate"
        );
        continue;
      }
      tracing::debug!(
        year = record.year,
        id = %record.element_id,
        kind = %record.element_type,
        "replacing change record for the same year"
      );
    }

    history.insert(record.year, LedgerEntry {
      change:      record.change.clone(),
      recorded_at: record.recorded_at,
    });
  }

  ChangeMap { histories }
}
