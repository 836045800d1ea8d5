//! [`Atlas`]: base entities plus their change ledger, queried by year.
//!
//! An atlas is a plain value: it is built from whatever the entity and
//! change stores returned and never talks to them again. Rebuild it when the
//! records change; callers own any caching.

use std::collections::HashMap;

use uuid::Uuid;

use crate::{
  Error, Result,
  containment::find_containing_regions,
  diff::diff,
  entity::{Entity, EntityKind},
  geometry::Point,
  hierarchy::{Hierarchy, build_hierarchy},
  ledger::{ChangeMap, ChangeRecord, build_change_map},
  reconstruct::{DeletionPolicy, Presence, presence_at_year},
};

// ─── Results ─────────────────────────────────────────────────────────────────

/// The outcome of looking an entity up in a given year.
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
  Found(Entity),
  NotYetCreated { creation_year: i32 },
  Deleted { year: i32 },
  /// No base entity has this id (a dangling reference).
  NotFound,
}

impl Lookup {
  pub fn found(self) -> Option<Entity> {
    match self {
      Self::Found(entity) => Some(entity),
      _ => None,
    }
  }
}

/// Every entity that exists in one year, in its state for that year.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MapSnapshot {
  pub year:      i32,
  /// Sorted by id.
  pub locations: Vec<Entity>,
  /// Sorted by id.
  pub regions:   Vec<Entity>,
}

impl MapSnapshot {
  pub fn get(&self, kind: EntityKind, id: Uuid) -> Option<&Entity> {
    let list = match kind {
      EntityKind::Location => &self.locations,
      EntityKind::Region => &self.regions,
    };
    list
      .binary_search_by(|e| e.id.cmp(&id))
      .ok()
      .map(|i| &list[i])
  }

  pub fn len(&self) -> usize { self.locations.len() + self.regions.len() }

  pub fn is_empty(&self) -> bool { self.len() == 0 }
}

// ─── Atlas ───────────────────────────────────────────────────────────────────

/// Base entities and the change ledger built from their records.
#[derive(Debug, Clone)]
pub struct Atlas {
  entities: HashMap<(EntityKind, Uuid), Entity>,
  changes:  ChangeMap,
  policy:   DeletionPolicy,
}

impl Atlas {
  pub fn new<'a>(
    entities: impl IntoIterator<Item = Entity>,
    records: impl IntoIterator<Item = &'a ChangeRecord>,
    policy: DeletionPolicy,
  ) -> Self {
    let entities: HashMap<_, _> = entities
      .into_iter()
      .map(|e| ((e.kind, e.id), e))
      .collect();
    let changes = build_change_map(records);
    tracing::debug!(
      entities = entities.len(),
      histories = changes.len(),
      "built atlas"
    );
    Self { entities, changes, policy }
  }

  pub fn policy(&self) -> DeletionPolicy { self.policy }

  pub fn changes(&self) -> &ChangeMap { &self.changes }

  /// The current (base) record of an entity.
  pub fn base(&self, kind: EntityKind, id: Uuid) -> Option<&Entity> {
    self.entities.get(&(kind, id))
  }

  /// The state of one entity in `year`.
  pub fn lookup(&self, kind: EntityKind, id: Uuid, year: i32) -> Lookup {
    let Some(base) = self.base(kind, id) else {
      return Lookup::NotFound;
    };
    match presence_at_year(base, year, &self.changes, self.policy) {
      Presence::Present(entity) => Lookup::Found(entity),
      Presence::NotYetCreated => Lookup::NotYetCreated {
        creation_year: base.creation_year,
      },
      Presence::Deleted { year } => Lookup::Deleted { year },
    }
  }

  /// Every entity that exists in `year`, reconstructed.
  pub fn snapshot(&self, year: i32) -> MapSnapshot {
    let mut snapshot = MapSnapshot { year, ..MapSnapshot::default() };
    for base in self.entities.values() {
      let Presence::Present(entity) =
        presence_at_year(base, year, &self.changes, self.policy)
      else {
        continue;
      };
      match entity.kind {
        EntityKind::Location => snapshot.locations.push(entity),
        EntityKind::Region => snapshot.regions.push(entity),
      }
    }
    snapshot.locations.sort_by_key(|e| e.id);
    snapshot.regions.sort_by_key(|e| e.id);

    tracing::debug!(
      year,
      locations = snapshot.locations.len(),
      regions = snapshot.regions.len(),
      "reconstructed snapshot"
    );
    snapshot
  }

  /// Regions containing `point` in `year`, innermost first.
  pub fn regions_at(&self, point: Point, year: i32) -> Vec<Entity> {
    let snapshot = self.snapshot(year);
    find_containing_regions(point, &snapshot.regions)
      .into_iter()
      .cloned()
      .collect()
  }

  /// The containment hierarchy of `year`.
  pub fn hierarchy_at(&self, year: i32, min_percent: f64) -> Hierarchy {
    let snapshot = self.snapshot(year);
    build_hierarchy(&snapshot.regions, &snapshot.locations, min_percent)
  }

  /// The record to store when a user saves `edited` while viewing `year`.
  ///
  /// The edit is diffed against the entity's state in `year - 1`, or against
  /// the base record when `year` is the creation year. Returns `Ok(None)`
  /// when nothing changed. Fields absent from `edited` are left alone.
  ///
  /// Fails with [`Error::Deleted`] if the entity is absent in `year - 1` or
  /// in `year` itself because of a deletion.
  pub fn plan_edit(
    &self,
    kind: EntityKind,
    id: Uuid,
    year: i32,
    edited: &Entity,
  ) -> Result<Option<ChangeRecord>> {
    if edited.kind != kind || edited.id != id {
      return Err(Error::IdentityMismatch {
        kind,
        id,
        found_kind: edited.kind,
        found_id: edited.id,
      });
    }
    let base = self
      .base(kind, id)
      .ok_or(Error::EntityNotFound { kind, id })?;

    if year < base.creation_year {
      return Err(Error::NotYetCreated {
        kind,
        id,
        year,
        creation_year: base.creation_year,
      });
    }

    let previous = if year == base.creation_year {
      base.clone()
    } else {
      match presence_at_year(base, year - 1, &self.changes, self.policy) {
        Presence::Present(entity) => entity,
        Presence::Deleted { year: deleted_in } => {
          return Err(Error::Deleted { kind, id, deleted_in });
        }
        Presence::NotYetCreated => {
          return Err(Error::NotYetCreated {
            kind,
            id,
            year,
            creation_year: base.creation_year,
          });
        }
      }
    };

    // Upserting an update over a same-year deletion would silently revive
    // the entity.
    if let Presence::Deleted { year: deleted_in } =
      presence_at_year(base, year, &self.changes, self.policy)
    {
      return Err(Error::Deleted { kind, id, deleted_in });
    }

    let delta = diff(&previous, edited);
    if delta.is_empty() {
      tracing::debug!(%kind, %id, year, "edit changed nothing");
      return Ok(None);
    }
    Ok(Some(ChangeRecord::updated(kind, id, year, delta)))
  }

  /// The record to store when a user deletes an entity as of `year`.
  pub fn plan_delete(
    &self,
    kind: EntityKind,
    id: Uuid,
    year: i32,
  ) -> Result<ChangeRecord> {
    let base = self
      .base(kind, id)
      .ok_or(Error::EntityNotFound { kind, id })?;
    if year < base.creation_year {
      return Err(Error::NotYetCreated {
        kind,
        id,
        year,
        creation_year: base.creation_year,
      });
    }
    Ok(ChangeRecord::deleted(kind, id, year))
  }
}
