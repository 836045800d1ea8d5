//! The atlas document: a JSON file holding the base entities and every
//! change record, read and written as a whole.

use std::{
  fs,
  path::{Path, PathBuf},
};

use chronoatlas_core::{
  entity::{Entity, EntityKind, Fields, Geometry},
  ledger::ChangeRecord,
  store::{ChangeStore, EntityStore},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DocumentError {
  #[error("failed to read {path}: {source}")]
  Read {
    path:   PathBuf,
    source: std::io::Error,
  },

  #[error("failed to write {path}: {source}")]
  Write {
    path:   PathBuf,
    source: std::io::Error,
  },

  #[error("malformed atlas document: {0}")]
  Json(#[from] serde_json::Error),

  #[error("{kind} {id} already exists")]
  DuplicateEntity { kind: EntityKind, id: Uuid },

  #[error("a {kind} needs {expected} geometry")]
  GeometryMismatch {
    kind:     EntityKind,
    expected: &'static str,
  },
}

/// The user-supplied part of a new entity, read from a JSON file.
#[derive(Debug, Clone, Deserialize)]
pub struct EntityDraft {
  pub geometry: Geometry,
  #[serde(default)]
  pub fields:   Fields,
}

impl EntityDraft {
  /// Turn the draft into a base entity, checking that the geometry fits the
  /// kind. Regions get their area cached.
  pub fn into_entity(
    self,
    kind: EntityKind,
    id: Uuid,
    creation_year: i32,
  ) -> Result<Entity, DocumentError> {
    let expected = match (kind, &self.geometry) {
      (EntityKind::Location, Geometry::Point(_))
      | (EntityKind::Region, Geometry::Polygon(_)) => None,
      (EntityKind::Location, Geometry::Polygon(_)) => Some("point"),
      (EntityKind::Region, Geometry::Point(_)) => Some("polygon"),
    };
    if let Some(expected) = expected {
      return Err(DocumentError::GeometryMismatch { kind, expected });
    }

    let mut entity = Entity {
      id,
      kind,
      creation_year,
      geometry: self.geometry,
      area: None,
      fields: self.fields,
    };
    entity.refresh_area();
    Ok(entity)
  }
}

/// On-disk shape of an atlas.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AtlasDocument {
  #[serde(default)]
  pub entities: Vec<Entity>,
  #[serde(default)]
  pub changes:  Vec<ChangeRecord>,
}

impl AtlasDocument {
  /// Load a document; a missing file is an empty atlas.
  pub fn load(path: &Path) -> Result<Self, DocumentError> {
    if !path.exists() {
      tracing::info!(path = %path.display(), "atlas file not found, starting empty");
      return Ok(Self::default());
    }
    let raw = fs::read_to_string(path).map_err(|source| DocumentError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let doc: Self = serde_json::from_str(&raw)?;
    tracing::debug!(
      entities = doc.entities.len(),
      changes = doc.changes.len(),
      "loaded atlas document"
    );
    Ok(doc)
  }

  /// Write the document, replacing the file through a temporary sibling.
  pub fn save(&self, path: &Path) -> Result<(), DocumentError> {
    let json = serde_json::to_string_pretty(self)?;
    let tmp = path.with_extension("json.tmp");
    let write_err = |source| DocumentError::Write {
      path: path.to_path_buf(),
      source,
    };
    fs::write(&tmp, json).map_err(write_err)?;
    fs::rename(&tmp, path).map_err(write_err)?;
    Ok(())
  }

  /// Add a new base entity.
  pub fn insert_entity(&mut self, entity: Entity) -> Result<(), DocumentError> {
    if self
      .entities
      .iter()
      .any(|e| e.kind == entity.kind && e.id == entity.id)
    {
      return Err(DocumentError::DuplicateEntity {
        kind: entity.kind,
        id:   entity.id,
      });
    }
    self.entities.push(entity);
    Ok(())
  }

  /// Erase an entity and its whole history. Returns whether it existed.
  pub fn erase(&mut self, kind: EntityKind, id: Uuid) -> Result<bool, DocumentError> {
    let before = self.entities.len();
    self.entities.retain(|e| !(e.kind == kind && e.id == id));
    let purged = self.purge(kind, id)?;
    tracing::info!(%kind, %id, purged, "erased entity");
    Ok(self.entities.len() != before)
  }
}

impl EntityStore for AtlasDocument {
  type Error = DocumentError;

  fn entities(&self, kind: EntityKind) -> Result<Vec<Entity>, DocumentError> {
    Ok(
      self
        .entities
        .iter()
        .filter(|e| e.kind == kind)
        .cloned()
        .collect(),
    )
  }
}

impl ChangeStore for AtlasDocument {
  type Error = DocumentError;

  fn changes(&self) -> Result<Vec<ChangeRecord>, DocumentError> {
    Ok(self.changes.clone())
  }

  fn upsert(&mut self, record: ChangeRecord) -> Result<(), DocumentError> {
    match self.changes.iter_mut().find(|r| r.key() == record.key()) {
      Some(existing) => {
        tracing::debug!(year = record.year, id = %record.element_id, "replacing change record");
        *existing = record;
      }
      None => self.changes.push(record),
    }
    Ok(())
  }

  fn purge(&mut self, kind: EntityKind, id: Uuid) -> Result<usize, DocumentError> {
    let before = self.changes.len();
    self
      .changes
      .retain(|r| !(r.element_type == kind && r.element_id == id));
    Ok(before - self.changes.len())
  }
}

#[cfg(test)]
mod tests {
  use chronoatlas_core::{
    geometry::Point,
    reconstruct::DeletionPolicy,
    store::load_atlas,
  };

  use super::*;

  fn tower() -> Entity {
    Entity::location(Uuid::from_u128(3), 800, Point::new(2.0, 9.0))
      .with_field("name", "Sunspire")
  }

  #[test]
  fn missing_file_is_empty() {
    let dir = tempfile::tempdir().unwrap();
    let doc = AtlasDocument::load(&dir.path().join("none.json")).unwrap();
    assert!(doc.entities.is_empty());
    assert!(doc.changes.is_empty());
  }

  #[test]
  fn save_and_reload() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atlas.json");

    let mut doc = AtlasDocument::default();
    doc.insert_entity(tower()).unwrap();
    doc
      .upsert(ChangeRecord::deleted(EntityKind::Location, tower().id, 900))
      .unwrap();
    doc.save(&path).unwrap();

    let back = AtlasDocument::load(&path).unwrap();
    assert_eq!(back.entities, vec![tower()]);
    assert_eq!(back.changes.len(), 1);

    let atlas = load_atlas(&back, DeletionPolicy::Terminal).unwrap();
    assert!(atlas.lookup(EntityKind::Location, tower().id, 850).found().is_some());
    assert!(atlas.lookup(EntityKind::Location, tower().id, 950).found().is_none());
  }

  #[test]
  fn upsert_replaces_same_key() {
    let mut doc = AtlasDocument::default();
    let id = tower().id;
    doc.upsert(ChangeRecord::deleted(EntityKind::Location, id, 900)).unwrap();
    doc.upsert(ChangeRecord::deleted(EntityKind::Location, id, 900)).unwrap();
    doc.upsert(ChangeRecord::deleted(EntityKind::Location, id, 901)).unwrap();
    doc.upsert(ChangeRecord::deleted(EntityKind::Region, id, 900)).unwrap();
    assert_eq!(doc.changes.len(), 3);
  }

  #[test]
  fn erase_purges_history() {
    let mut doc = AtlasDocument::default();
    doc.insert_entity(tower()).unwrap();
    doc
      .upsert(ChangeRecord::deleted(EntityKind::Location, tower().id, 900))
      .unwrap();
    assert!(doc.erase(EntityKind::Location, tower().id).unwrap());
    assert!(doc.entities.is_empty());
    assert!(doc.changes.is_empty());
    assert!(!doc.erase(EntityKind::Location, tower().id).unwrap());
  }

  #[test]
  fn duplicate_entities_are_rejected() {
    let mut doc = AtlasDocument::default();
    doc.insert_entity(tower()).unwrap();
    assert!(matches!(
      doc.insert_entity(tower()),
      Err(DocumentError::DuplicateEntity { .. })
    ));
  }

  #[test]
  fn drafts_become_entities_of_the_matching_kind() {
    let draft: EntityDraft = serde_json::from_value(serde_json::json!({
      "geometry": {
        "type": "polygon",
        "coordinates": [[0.0, 0.0], [4.0, 0.0], [4.0, 4.0], [0.0, 4.0]],
      },
      "fields": { "name": "Fenmarch" },
    }))
    .unwrap();

    let region = draft
      .clone()
      .into_entity(EntityKind::Region, Uuid::from_u128(8), 650)
      .unwrap();
    assert_eq!(region.area, Some(16.0));
    assert_eq!(region.name(), Some("Fenmarch"));
    assert_eq!(region.creation_year, 650);

    assert!(matches!(
      draft.into_entity(EntityKind::Location, Uuid::from_u128(8), 650),
      Err(DocumentError::GeometryMismatch { expected: "point", .. })
    ));
  }

  #[test]
  fn malformed_json_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("atlas.json");
    fs::write(&path, "{ not json").unwrap();
    assert!(matches!(
      AtlasDocument::load(&path),
      Err(DocumentError::Json(_))
    ));
  }
}
