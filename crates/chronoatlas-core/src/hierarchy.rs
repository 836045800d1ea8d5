//! Parent/child containment model for the regions and locations of one
//! reconstructed year.
//!
//! - A **region**'s parent is the smallest strictly larger region (by the
//!   area-then-id order of [`smallest_first`]) that holds at least
//!   `min_percent` % of it.
//! - A **location**'s parent is the innermost region containing its point.
//!
//! Requiring the parent to rank strictly after the child in that total order
//! rules out cycles, even for identical or mutually overlapping regions.

use std::{
  cmp::Ordering,
  collections::{BTreeMap, HashMap},
};

use uuid::Uuid;

use crate::{
  containment::{find_containing_regions, is_percent_contained, smallest_first},
  entity::{Entity, EntityKind, Geometry},
};

/// The share of a region that must lie inside another for it to count as a
/// child, unless the caller chooses otherwise.
pub const DEFAULT_CHILD_PERCENT: f64 = 90.0;

/// A node in the hierarchy: an entity reference scoped by kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Node {
  pub kind: EntityKind,
  pub id:   Uuid,
}

impl Node {
  pub fn of(entity: &Entity) -> Self {
    Self { kind: entity.kind, id: entity.id }
  }
}

/// Computed parent/child relationships. Parents are always regions.
#[derive(Debug, Clone, Default)]
pub struct Hierarchy {
  parents:  HashMap<Node, Uuid>,
  children: BTreeMap<Uuid, Vec<Node>>,
  regions:  Vec<Uuid>,
}

impl Hierarchy {
  /// The region directly containing `node`, if any.
  pub fn parent(&self, node: Node) -> Option<Uuid> {
    self.parents.get(&node).copied()
  }

  /// Direct children of a region, sorted by kind then id.
  pub fn children(&self, region: Uuid) -> &[Node] {
    self.children.get(&region).map_or(&[], Vec::as_slice)
  }

  /// Containing regions from the direct parent outwards.
  pub fn ancestors(&self, node: Node) -> Vec<Uuid> {
    let mut out = Vec::new();
    let mut current = node;
    while let Some(parent) = self.parent(current) {
      out.push(parent);
      current = Node { kind: EntityKind::Region, id: parent };
    }
    out
  }

  /// Regions without a parent, sorted by id.
  pub fn roots(&self) -> Vec<Uuid> {
    self
      .regions
      .iter()
      .copied()
      .filter(|id| {
        self.parent(Node { kind: EntityKind::Region, id: *id }).is_none()
      })
      .collect()
  }
}

/// Build the hierarchy for one year's regions and locations.
///
/// Entities whose geometry does not match their kind are skipped.
pub fn build_hierarchy(
  regions: &[Entity],
  locations: &[Entity],
  min_percent: f64,
) -> Hierarchy {
  let mut ranked: Vec<&Entity> = regions
    .iter()
    .filter(|r| matches!(r.geometry, Geometry::Polygon(_)))
    .collect();
  ranked.sort_by(|a, b| smallest_first(a, b));

  let mut hierarchy = Hierarchy {
    regions: {
      let mut ids: Vec<Uuid> = ranked.iter().map(|r| r.id).collect();
      ids.sort();
      ids
    },
    ..Hierarchy::default()
  };

  for (i, child) in ranked.iter().enumerate() {
    let Some(child_ring) = child.geometry.ring() else { continue };
    // Candidates are the regions ranked after this one, smallest first.
    let parent = ranked[i + 1..].iter().find(|candidate| {
      smallest_first(candidate, child) == Ordering::Greater
        && candidate
          .geometry
          .ring()
          .is_some_and(|outer| is_percent_contained(child_ring, outer, min_percent))
    });
    if let Some(parent) = parent {
      hierarchy.link(Node::of(child), parent.id);
    }
  }

  for location in locations {
    let Geometry::Point(point) = location.geometry else { continue };
    if let Some(parent) = find_containing_regions(point, ranked.iter().copied())
      .first()
    {
      hierarchy.link(Node::of(location), parent.id);
    }
  }

  for kids in hierarchy.children.values_mut() {
    kids.sort();
  }

  tracing::debug!(
    regions = regions.len(),
    locations = locations.len(),
    links = hierarchy.parents.len(),
    "built containment hierarchy"
  );
  hierarchy
}

impl Hierarchy {
  fn link(&mut self, child: Node, parent: Uuid) {
    self.parents.insert(child, parent);
    self.children.entry(parent).or_default().push(child);
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::geometry::Point;

  fn rect(id: u128, x0: f64, y0: f64, x1: f64, y1: f64) -> Entity {
    Entity::region(Uuid::from_u128(id), 0, vec![
      Point::new(x0, y0),
      Point::new(x1, y0),
      Point::new(x1, y1),
      Point::new(x0, y1),
    ])
  }

  fn region_node(id: u128) -> Node {
    Node { kind: EntityKind::Region, id: Uuid::from_u128(id) }
  }

  #[test]
  fn nested_regions_and_locations() {
    let continent = rect(1, 0.0, 0.0, 100.0, 100.0);
    let kingdom = rect(2, 10.0, 10.0, 50.0, 50.0);
    let county = rect(3, 20.0, 20.0, 30.0, 30.0);
    let town = Entity::location(Uuid::from_u128(10), 0, Point::new(25.0, 25.0));
    let port = Entity::location(Uuid::from_u128(11), 0, Point::new(90.0, 90.0));
    let lost = Entity::location(Uuid::from_u128(12), 0, Point::new(500.0, 0.0));

    let h = build_hierarchy(
      &[county.clone(), continent.clone(), kingdom.clone()],
      &[town.clone(), port.clone(), lost.clone()],
      DEFAULT_CHILD_PERCENT,
    );

    assert_eq!(h.parent(region_node(3)), Some(kingdom.id));
    assert_eq!(h.parent(region_node(2)), Some(continent.id));
    assert_eq!(h.parent(region_node(1)), None);
    assert_eq!(h.parent(Node::of(&town)), Some(county.id));
    assert_eq!(h.parent(Node::of(&port)), Some(continent.id));
    assert_eq!(h.parent(Node::of(&lost)), None);

    assert_eq!(h.ancestors(Node::of(&town)), vec![
      county.id,
      kingdom.id,
      continent.id
    ]);
    assert_eq!(h.roots(), vec![continent.id]);
    assert_eq!(h.children(continent.id), &[Node::of(&port), region_node(2)]);
  }

  #[test]
  fn partial_overlap_below_threshold_is_not_a_child() {
    let a = rect(1, 0.0, 0.0, 10.0, 10.0);
    let b = rect(2, 5.0, 0.0, 25.0, 10.0);
    let h = build_hierarchy(&[a, b], &[], DEFAULT_CHILD_PERCENT);
    assert_eq!(h.parent(region_node(1)), None);
    assert_eq!(h.roots().len(), 2);

    // The same pair at a lax threshold: half of `a` lies inside `b`.
    let a = rect(1, 0.0, 0.0, 10.0, 10.0);
    let b = rect(2, 5.0, 0.0, 25.0, 10.0);
    let h = build_hierarchy(&[a, b], &[], 40.0);
    assert_eq!(h.parent(region_node(1)), Some(Uuid::from_u128(2)));
  }

  #[test]
  fn border_sharing_subregions_attach_from_every_corner() {
    let realm = rect(9, 0.0, 0.0, 10.0, 10.0);
    let quarters = [
      rect(1, 0.0, 0.0, 5.0, 5.0),
      rect(2, 5.0, 0.0, 10.0, 5.0),
      rect(3, 5.0, 5.0, 10.0, 10.0),
      rect(4, 0.0, 5.0, 5.0, 10.0),
    ];
    let mut regions = quarters.to_vec();
    regions.push(realm.clone());

    let h = build_hierarchy(&regions, &[], DEFAULT_CHILD_PERCENT);
    for id in 1..=4 {
      assert_eq!(h.parent(region_node(id)), Some(realm.id), "quarter {id}");
    }
    assert_eq!(h.roots(), vec![realm.id]);
  }

  #[test]
  fn identical_regions_never_form_a_cycle() {
    let a = rect(1, 0.0, 0.0, 10.0, 10.0);
    let b = rect(2, 0.0, 0.0, 10.0, 10.0);
    let h = build_hierarchy(&[b, a], &[], DEFAULT_CHILD_PERCENT);
    assert_eq!(h.parent(region_node(1)), Some(Uuid::from_u128(2)));
    assert_eq!(h.parent(region_node(2)), None);
    assert_eq!(h.ancestors(region_node(1)), vec![Uuid::from_u128(2)]);
  }
}
