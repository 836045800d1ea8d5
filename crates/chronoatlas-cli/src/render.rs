//! Plain-text rendering of snapshots and hierarchies.

use std::fmt::Write as _;

use chronoatlas_core::{
  atlas::MapSnapshot,
  entity::{Entity, EntityKind},
  hierarchy::{Hierarchy, Node},
};
use uuid::Uuid;

/// One line per entity: kind, id, name, anchor.
pub fn entity_line(entity: &Entity) -> String {
  let anchor = entity
    .anchor()
    .map_or_else(|| "(degenerate)".to_owned(), |p| format!("({:.2}, {:.2})", p.x, p.y));
  let mut line = format!(
    "{:<8} {} {:<24} {anchor}",
    entity.kind,
    entity.id,
    entity.name().unwrap_or("<unnamed>"),
  );
  if entity.kind == EntityKind::Region {
    let _ = write!(line, " area={:.2}", entity.area());
  }
  line
}

pub fn snapshot(snapshot: &MapSnapshot, kind: Option<EntityKind>) -> String {
  let mut out = String::new();
  let lists = [&snapshot.regions, &snapshot.locations];
  for entity in lists.into_iter().flatten() {
    if kind.is_some_and(|k| k != entity.kind) {
      continue;
    }
    out.push_str(&entity_line(entity));
    out.push('\n');
  }
  out
}

/// Indented tree of regions and the locations they hold. Locations outside
/// every region are listed last.
pub fn hierarchy(snapshot: &MapSnapshot, hierarchy: &Hierarchy) -> String {
  let mut out = String::new();
  for root in hierarchy.roots() {
    write_node(
      &mut out,
      snapshot,
      hierarchy,
      Node { kind: EntityKind::Region, id: root },
      0,
    );
  }
  let orphans: Vec<&Entity> = snapshot
    .locations
    .iter()
    .filter(|l| hierarchy.parent(Node::of(l)).is_none())
    .collect();
  if !orphans.is_empty() {
    out.push_str("(outside every region)\n");
    for location in orphans {
      let _ = writeln!(out, "  {}", label(snapshot, Node::of(location)));
    }
  }
  out
}

fn write_node(
  out: &mut String,
  snapshot: &MapSnapshot,
  hierarchy: &Hierarchy,
  node: Node,
  depth: usize,
) {
  let _ = writeln!(out, "{}{}", "  ".repeat(depth), label(snapshot, node));
  if node.kind == EntityKind::Region {
    for child in hierarchy.children(node.id) {
      write_node(out, snapshot, hierarchy, *child, depth + 1);
    }
  }
}

fn label(snapshot: &MapSnapshot, node: Node) -> String {
  let name = snapshot
    .get(node.kind, node.id)
    .and_then(Entity::name)
    .unwrap_or("<unnamed>");
  format!("{name} [{} {}]", node.kind, short(node.id))
}

fn short(id: Uuid) -> String { id.simple().to_string()[..8].to_owned() }
