//! The `EntityStore` and `ChangeStore` traits.
//!
//! Implemented by whatever persists the map (a database, a JSON document).
//! The core never calls these itself: callers read from the stores, build an
//! [`Atlas`], and write back the records it plans.

use uuid::Uuid;

use crate::{
  atlas::Atlas,
  entity::{Entity, EntityKind},
  ledger::ChangeRecord,
  reconstruct::DeletionPolicy,
};

/// Source of base (current-state) entities.
pub trait EntityStore {
  type Error: std::error::Error + Send + Sync + 'static;

  /// All base entities of one kind.
  fn entities(&self, kind: EntityKind) -> Result<Vec<Entity>, Self::Error>;
}

/// The dated change records.
///
/// Writes are upserts keyed by `(year, element_id, element_type)`: storing a
/// record for an existing key replaces the old record.
pub trait ChangeStore {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Every stored record.
  fn changes(&self) -> Result<Vec<ChangeRecord>, Self::Error>;

  /// Insert `record`, replacing any record with the same key.
  fn upsert(&mut self, record: ChangeRecord) -> Result<(), Self::Error>;

  /// Remove every record of an entity that is being erased outright. Returns
  /// the number of records removed.
  fn purge(&mut self, kind: EntityKind, id: Uuid) -> Result<usize, Self::Error>;
}

/// Read both stores and build an [`Atlas`] from their contents.
pub fn load_atlas<S, E>(
  store: &S,
  policy: DeletionPolicy,
) -> Result<Atlas, E>
where
  S: EntityStore<Error = E> + ChangeStore<Error = E>,
  E: std::error::Error + Send + Sync + 'static,
{
  let mut entities = EntityStore::entities(store, EntityKind::Location)?;
  entities.extend(EntityStore::entities(store, EntityKind::Region)?);
  let records = store.changes()?;
  Ok(Atlas::new(entities, &records, policy))
}
