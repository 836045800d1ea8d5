//! Temporal reconstruction: the state of an entity "as of" a given year.
//!
//! The base entity is the current state. Its state in year `Y` is the base
//! record with every recorded delta from the creation year up to and
//! including `Y` folded over it, in ascending year order.

use serde::{Deserialize, Serialize};

use crate::{
  entity::Entity,
  ledger::{Change, ChangeMap},
};

/// How a deletion interacts with changes recorded in later years.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletionPolicy {
  /// A deletion ends the entity for good. Once a deletion at or before the
  /// target year has been recorded, later updates are ignored.
  #[default]
  Terminal,
  /// The chronologically latest selected record decides. An update recorded
  /// after a deletion revives the entity, with every update in range folded
  /// over the base record.
  LatestWins,
}

/// Whether, and how, an entity exists in a given year.
#[derive(Debug, Clone, PartialEq)]
pub enum Presence {
  Present(Entity),
  /// The target year is before the creation year.
  NotYetCreated,
  /// A deletion recorded in `year` hides the entity.
  Deleted { year: i32 },
}

impl Presence {
  pub fn into_entity(self) -> Option<Entity> {
    match self {
      Self::Present(entity) => Some(entity),
      Self::NotYetCreated | Self::Deleted { .. } => None,
    }
  }

  pub fn is_present(&self) -> bool { matches!(self, Self::Present(_)) }
}

/// Reconstruct `base` as it was in `target_year` under the default
/// [`DeletionPolicy::Terminal`].
///
/// Returns `None` if the entity did not exist yet or had been deleted.
pub fn reconstruct_state_at_year(
  base: &Entity,
  target_year: i32,
  changes: &ChangeMap,
) -> Option<Entity> {
  presence_at_year(base, target_year, changes, DeletionPolicy::Terminal)
    .into_entity()
}

/// Reconstruct `base` as it was in `target_year`, reporting why it is absent
/// when it is.
///
/// Deterministic: changes are replayed strictly by ascending year, never in
/// map iteration order, and the inputs are not modified.
pub fn presence_at_year(
  base: &Entity,
  target_year: i32,
  changes: &ChangeMap,
  policy: DeletionPolicy,
) -> Presence {
  if target_year < base.creation_year {
    return Presence::NotYetCreated;
  }

  let Some(history) = changes.history(base.kind, base.id) else {
    return Presence::Present(base.clone());
  };

  // BTreeMap range iteration is ascending by year.
  let selected: Vec<(i32, &Change)> = history
    .range(base.creation_year..=target_year)
    .map(|(year, entry)| (*year, &entry.change))
    .collect();

  match policy {
    DeletionPolicy::Terminal => {
      if let Some((year, _)) =
        selected.iter().find(|(_, change)| change.is_deleted())
      {
        return Presence::Deleted { year: *year };
      }
    }
    DeletionPolicy::LatestWins => {
      if let Some((year, Change::Deleted)) = selected.last() {
        return Presence::Deleted { year: *year };
      }
    }
  }

  let mut state = base.clone();
  for (_, change) in &selected {
    match change {
      Change::Updated(delta) => delta.apply_to(&mut state),
      // Only reachable under `LatestWins`, for a deletion that a later
      // update has overridden.
      Change::Deleted => {}
    }
  }
  Presence::Present(state)
}

#[cfg(test)]
mod tests {
  use chrono::{TimeZone, Utc};
  use uuid::Uuid;

  use super::*;
  use crate::{
    diff::Delta,
    entity::{EntityKind, FieldValue, Geometry},
    geometry::Point,
    ledger::{ChangeRecord, build_change_map},
  };

  fn keep() -> Entity {
    Entity::location(Uuid::from_u128(9), 100, Point::new(0.0, 0.0))
      .with_field("name", "Greykeep")
      .with_field("ruler", "Queen Ysolde")
  }

  fn set(year: i32, name: &str, value: &str) -> ChangeRecord {
    let mut delta = Delta::default();
    delta.fields.insert(name.into(), FieldValue::from(value));
    ChangeRecord {
      recorded_at: Utc.timestamp_opt(0, 0).unwrap(),
      ..ChangeRecord::updated(EntityKind::Location, keep().id, year, delta)
    }
  }

  fn delete(year: i32) -> ChangeRecord {
    ChangeRecord {
      recorded_at: Utc.timestamp_opt(0, 0).unwrap(),
      ..ChangeRecord::deleted(EntityKind::Location, keep().id, year)
    }
  }

  fn ruler(entity: &Entity) -> &FieldValue { &entity.fields["ruler"] }

  #[test]
  fn before_creation_does_not_exist() {
    let map = build_change_map(&[set(100, "ruler", "x")]);
    assert_eq!(reconstruct_state_at_year(&keep(), 99, &map), None);
    assert_eq!(
      presence_at_year(&keep(), 99, &map, DeletionPolicy::Terminal),
      Presence::NotYetCreated
    );
  }

  #[test]
  fn no_history_yields_base_for_every_year() {
    let map = ChangeMap::default();
    for year in [100, 150, 10_000] {
      assert_eq!(reconstruct_state_at_year(&keep(), year, &map), Some(keep()));
    }
  }

  #[test]
  fn replays_in_year_order_up_to_target() {
    let map = build_change_map(&[
      set(300, "ruler", "Regent Amund"),
      set(100, "ruler", "King Osric"),
      set(200, "ruler", "Queen Maelis"),
    ]);
    let at = |year| reconstruct_state_at_year(&keep(), year, &map).unwrap();

    assert_eq!(ruler(&at(100)), &FieldValue::from("King Osric"));
    assert_eq!(ruler(&at(199)), &FieldValue::from("King Osric"));
    assert_eq!(ruler(&at(250)), &FieldValue::from("Queen Maelis"));
    assert_eq!(ruler(&at(900)), &FieldValue::from("Regent Amund"));
    // Untouched fields keep their base value throughout.
    assert_eq!(at(250).name(), Some("Greykeep"));
  }

  #[test]
  fn changes_before_creation_are_ignored() {
    let map = build_change_map(&[set(50, "ruler", "Nobody")]);
    let state = reconstruct_state_at_year(&keep(), 100, &map).unwrap();
    assert_eq!(ruler(&state), &FieldValue::from("Queen Ysolde"));
  }

  #[test]
  fn deletion_is_terminal_going_forward() {
    let map = build_change_map(&[set(120, "ruler", "Osric"), delete(150)]);
    assert!(reconstruct_state_at_year(&keep(), 149, &map).is_some());
    assert_eq!(reconstruct_state_at_year(&keep(), 150, &map), None);
    assert_eq!(
      presence_at_year(&keep(), 400, &map, DeletionPolicy::Terminal),
      Presence::Deleted { year: 150 }
    );
  }

  #[test]
  fn post_deletion_update_depends_on_policy() {
    let map = build_change_map(&[
      set(120, "ruler", "Osric"),
      delete(150),
      set(180, "ruler", "Restored"),
    ]);

    let terminal =
      presence_at_year(&keep(), 200, &map, DeletionPolicy::Terminal);
    assert_eq!(terminal, Presence::Deleted { year: 150 });

    let revived =
      presence_at_year(&keep(), 200, &map, DeletionPolicy::LatestWins)
        .into_entity()
        .unwrap();
    assert_eq!(ruler(&revived), &FieldValue::from("Restored"));

    // Between the deletion and the revival the entity is absent either way.
    assert!(
      !presence_at_year(&keep(), 160, &map, DeletionPolicy::LatestWins)
        .is_present()
    );
  }

  #[test]
  fn replayed_geometry_clears_cached_area() {
    let ring = vec![
      Point::new(0.0, 0.0),
      Point::new(0.0, 2.0),
      Point::new(2.0, 2.0),
      Point::new(2.0, 0.0),
    ];
    let mut region = Entity::region(Uuid::from_u128(3), 0, ring);
    region.refresh_area();

    let small = vec![
      Point::new(0.0, 0.0),
      Point::new(0.0, 1.0),
      Point::new(1.0, 1.0),
      Point::new(1.0, 0.0),
    ];
    let record = ChangeRecord::updated(EntityKind::Region, region.id, 5, Delta {
      geometry: Some(Geometry::Polygon(small)),
      ..Delta::default()
    });
    let map = build_change_map(&[record]);
    let then = reconstruct_state_at_year(&region, 5, &map).unwrap();
    assert_eq!(then.area, None);
    assert_eq!(then.area(), 1.0);
  }

  #[test]
  fn reconstruction_is_repeatable() {
    let map = build_change_map(&[set(110, "ruler", "a"), set(120, "name", "b")]);
    let first = reconstruct_state_at_year(&keep(), 130, &map);
    let second = reconstruct_state_at_year(&keep(), 130, &map);
    assert_eq!(first, second);
  }
}
