//! Error types for `chronoatlas-core`.
//!
//! Degenerate geometry and dangling references are not errors; they are
//! reported through return values. Only edit planning can fail.

use thiserror::Error;
use uuid::Uuid;

use crate::entity::EntityKind;

#[derive(Debug, Error)]
pub enum Error {
  #[error("{kind} not found: {id}")]
  EntityNotFound { kind: EntityKind, id: Uuid },

  #[error("{kind} {id} does not exist yet in year {year} (created in {creation_year})")]
  NotYetCreated {
    kind:          EntityKind,
    id:            Uuid,
    year:          i32,
    creation_year: i32,
  },

  #[error("{kind} {id} was deleted in year {deleted_in}")]
  Deleted {
    kind:       EntityKind,
    id:         Uuid,
    deleted_in: i32,
  },

  #[error("edited state belongs to {found_kind} {found_id}, expected {kind} {id}")]
  IdentityMismatch {
    kind:       EntityKind,
    id:         Uuid,
    found_kind: EntityKind,
    found_id:   Uuid,
  },
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
