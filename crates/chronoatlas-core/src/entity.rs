//! Entity types: the locations and regions placed on the map.
//!
//! An [`Entity`] is always stored in its current (latest) form. Historical
//! states are never stored as entities; they are derived by replaying the
//! change ledger (see [`crate::reconstruct`]).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

use crate::geometry::{self, Point};

// ─── Kind ────────────────────────────────────────────────────────────────────

/// Discriminates the two entity tables. Ids are only unique within a kind.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  PartialOrd,
  Ord,
  Serialize,
  Deserialize,
  Display,
  EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EntityKind {
  Location,
  Region,
}

// ─── Geometry ────────────────────────────────────────────────────────────────

/// Where an entity sits on the map.
///
/// Regions carry an ordered ring of vertices which may or may not repeat the
/// first vertex at the end. Rings with fewer than three points are tolerated
/// as transient, partially-drawn shapes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "coordinates", rename_all = "snake_case")]
pub enum Geometry {
  Point(Point),
  Polygon(Vec<Point>),
}

impl Geometry {
  /// The polygon ring, or `None` for a point geometry.
  pub fn ring(&self) -> Option<&[Point]> {
    match self {
      Self::Point(_) => None,
      Self::Polygon(ring) => Some(ring),
    }
  }

  /// Unsigned area; always 0 for points and degenerate rings.
  pub fn area(&self) -> f64 {
    self.ring().map_or(0.0, geometry::polygon_area)
  }
}

// ─── Payload ─────────────────────────────────────────────────────────────────

/// A single payload value. The set of kinds is closed so that structural
/// equality is well defined.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
  Null,
  Bool(bool),
  Number(f64),
  Text(String),
  List(Vec<FieldValue>),
  Object(BTreeMap<String, FieldValue>),
}

impl PartialEq for FieldValue {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Self::Null, Self::Null) => true,
      (Self::Bool(a), Self::Bool(b)) => a == b,
      // NaN is equal to itself here so that a snapshot always equals itself.
      (Self::Number(a), Self::Number(b)) => {
        a == b || (a.is_nan() && b.is_nan())
      }
      (Self::Text(a), Self::Text(b)) => a == b,
      (Self::List(a), Self::List(b)) => a == b,
      (Self::Object(a), Self::Object(b)) => a == b,
      _ => false,
    }
  }
}

impl From<&str> for FieldValue {
  fn from(value: &str) -> Self { Self::Text(value.to_owned()) }
}

impl From<String> for FieldValue {
  fn from(value: String) -> Self { Self::Text(value) }
}

impl From<f64> for FieldValue {
  fn from(value: f64) -> Self { Self::Number(value) }
}

impl From<bool> for FieldValue {
  fn from(value: bool) -> Self { Self::Bool(value) }
}

/// The open set of named payload attributes (name, color, icon, label,
/// description, display flags, ...). Ordered so output is deterministic.
pub type Fields = BTreeMap<String, FieldValue>;

// ─── Entity ──────────────────────────────────────────────────────────────────

/// A location or region in its current form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
  pub id:            Uuid,
  pub kind:          EntityKind,
  /// The first year the entity exists. Never changes after creation.
  pub creation_year: i32,
  pub geometry:      Geometry,
  /// Cached region area. May be stale or missing; see [`Entity::area`].
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub area:          Option<f64>,
  #[serde(default)]
  pub fields:        Fields,
}

impl Entity {
  /// A location at `point` with no payload.
  pub fn location(id: Uuid, creation_year: i32, point: Point) -> Self {
    Self {
      id,
      kind: EntityKind::Location,
      creation_year,
      geometry: Geometry::Point(point),
      area: None,
      fields: Fields::new(),
    }
  }

  /// A region bounded by `ring` with no payload.
  pub fn region(id: Uuid, creation_year: i32, ring: Vec<Point>) -> Self {
    Self {
      id,
      kind: EntityKind::Region,
      creation_year,
      geometry: Geometry::Polygon(ring),
      area: None,
      fields: Fields::new(),
    }
  }

  /// Builder-style payload setter.
  pub fn with_field(
    mut self,
    name: impl Into<String>,
    value: impl Into<FieldValue>,
  ) -> Self {
    self.fields.insert(name.into(), value.into());
    self
  }

  /// The cached area if present, otherwise recomputed from the geometry.
  pub fn area(&self) -> f64 {
    match self.area {
      Some(cached) if cached.is_finite() => cached,
      _ => self.geometry.area(),
    }
  }

  /// Recompute and store the cached area.
  pub fn refresh_area(&mut self) {
    self.area = match self.kind {
      EntityKind::Region => Some(self.geometry.area()),
      EntityKind::Location => None,
    };
  }

  /// Where a label for this entity goes: the point of a location or the
  /// centroid of a region. `None` for a degenerate region.
  pub fn anchor(&self) -> Option<Point> {
    match &self.geometry {
      Geometry::Point(p) => Some(*p),
      Geometry::Polygon(ring) => geometry::polygon_centroid(ring),
    }
  }

  /// The `name` payload field, if it is text.
  pub fn name(&self) -> Option<&str> {
    match self.fields.get("name") {
      Some(FieldValue::Text(name)) => Some(name),
      _ => None,
    }
  }
}
