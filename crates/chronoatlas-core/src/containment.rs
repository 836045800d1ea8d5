//! Spatial containment: which regions hold a point, and how much of one
//! region lies inside another.
//!
//! Exact polygon overlap is comparatively expensive, so
//! [`is_percent_contained`] runs three cheap rejection stages before
//! computing it.

use std::cmp::Ordering;

use crate::{
  entity::Entity,
  geometry::{
    self, BoundingBox, Point, point_in_polygon, point_on_boundary, polygon_area,
  },
};

/// Maximum number of inner-ring vertices probed by the sampling stage.
const MAX_SAMPLES: usize = 10;

/// Relative tolerance used when splitting edges and detecting shared edges.
const REL_EPSILON: f64 = 1e-9;

// ─── Point containment ───────────────────────────────────────────────────────

/// Total order used to rank containers: smallest area first, then by id.
pub fn smallest_first(a: &Entity, b: &Entity) -> Ordering {
  a.geometry
    .area()
    .total_cmp(&b.geometry.area())
    .then_with(|| a.id.cmp(&b.id))
}

/// Every region whose polygon contains `point`, innermost (smallest) first.
///
/// The first element is the most specific container and is what a click on
/// overlapping regions resolves to. Equal areas are ordered by id, so the
/// result never depends on the input order. Non-polygon entities are
/// ignored.
pub fn find_containing_regions<'a>(
  point: Point,
  regions: impl IntoIterator<Item = &'a Entity>,
) -> Vec<&'a Entity> {
  let mut containing: Vec<&Entity> = regions
    .into_iter()
    .filter(|r| r.geometry.ring().is_some_and(|ring| point_in_polygon(point, ring)))
    .collect();
  containing.sort_by(|a, b| smallest_first(a, b));
  containing
}

// ─── Polygon containment ─────────────────────────────────────────────────────

/// Is at least `min_percent` % of `inner`'s area inside `outer`?
///
/// Stages, each a necessary condition for the next:
///
/// 1. the bounding boxes overlap;
/// 2. the bounding-box overlap could cover `min_percent` % of `inner`;
/// 3. at least `min_percent / 2` % of up to ten evenly spaced vertices of
///    `inner` lie inside or on the boundary of `outer`;
/// 4. the exact overlap area reaches `min_percent` %.
///
/// Vertices on the boundary of `outer` count as inside in stage 3, so a child
/// sharing any of its parent's borders is judged by the exact overlap alone.
/// Stage 3 still rejects shapes whose sampled vertices mostly lie strictly
/// outside `outer` even though most of their area is inside (long spikes
/// poking out of a container, for instance). Rings with fewer than three
/// vertices, or with zero area, are never contained.
pub fn is_percent_contained(
  inner: &[Point],
  outer: &[Point],
  min_percent: f64,
) -> bool {
  if inner.len() < 3 || outer.len() < 3 {
    return false;
  }
  let inner_area = polygon_area(inner);
  if inner_area <= 0.0 {
    return false;
  }

  let (Some(inner_bb), Some(outer_bb)) =
    (BoundingBox::of(inner), BoundingBox::of(outer))
  else {
    return false;
  };
  if !inner_bb.overlaps(&outer_bb) {
    return false;
  }

  if inner_bb.overlap_area(&outer_bb) / inner_area * 100.0 < min_percent {
    return false;
  }

  let tolerance = REL_EPSILON * (1.0 + extent(outer));
  if sampled_fraction_inside(inner, outer, tolerance) < min_percent * 0.5 / 100.0 {
    return false;
  }

  let overlap = intersection_area(inner, outer);
  if overlap <= 0.0 {
    return false;
  }
  overlap / inner_area * 100.0 >= min_percent
}

/// The exact percentage of `inner`'s area that lies inside `outer`, or `None`
/// when `inner` is degenerate.
pub fn containment_percent(inner: &[Point], outer: &[Point]) -> Option<f64> {
  let inner_area = polygon_area(inner);
  (inner_area > 0.0)
    .then(|| (intersection_area(inner, outer) / inner_area * 100.0).min(100.0))
}

/// Fraction of sampled `inner` vertices lying inside `outer` or on its
/// boundary.
fn sampled_fraction_inside(inner: &[Point], outer: &[Point], tolerance: f64) -> f64 {
  let stride = (inner.len() / MAX_SAMPLES).max(1);
  let (hits, total) = inner
    .iter()
    .step_by(stride)
    .take(MAX_SAMPLES)
    .fold((0_usize, 0_usize), |(hits, total), p| {
      let hit =
        point_on_boundary(*p, outer, tolerance) || point_in_polygon(*p, outer);
      (hits + usize::from(hit), total + 1)
    });
  if total == 0 { 0.0 } else { hits as f64 / total as f64 }
}

// ─── Exact overlap ───────────────────────────────────────────────────────────

/// Area of the intersection of two simple polygons (convex or not).
///
/// By Green's theorem the area of a region is the shoelace sum over its
/// boundary, and the boundary of `a ∩ b` is made of the pieces of `a`'s edges
/// inside `b` plus the pieces of `b`'s edges inside `a`. Every edge is split
/// at its crossings with the other ring and each piece is classified by its
/// midpoint. A piece lying on the other ring's boundary counts once when both
/// edges run the same way (shared border, interiors on the same side) and
/// not at all when they run opposite ways (the polygons only touch).
///
/// Returns 0 for degenerate input.
pub fn intersection_area(a: &[Point], b: &[Point]) -> f64 {
  let (Some(a), Some(b)) = (normalize(a), normalize(b)) else {
    return 0.0;
  };
  let tolerance = REL_EPSILON * (1.0 + extent(&a).max(extent(&b)));

  let area = boundary_inside(&a, &b, true, tolerance)
    + boundary_inside(&b, &a, false, tolerance);

  area.clamp(0.0, polygon_area(&a).min(polygon_area(&b)))
}

/// Drop repeated vertices (including a closing vertex) and orient the ring
/// counter-clockwise. `None` if nothing with positive area remains.
fn normalize(ring: &[Point]) -> Option<Vec<Point>> {
  let mut out: Vec<Point> = Vec::with_capacity(ring.len());
  for p in ring {
    if out.last() != Some(p) {
      out.push(*p);
    }
  }
  while out.len() > 1 && out.first() == out.last() {
    out.pop();
  }
  if out.len() < 3 {
    return None;
  }

  let signed = geometry::signed_area(&out);
  if signed == 0.0 || !signed.is_finite() {
    return None;
  }
  if signed < 0.0 {
    out.reverse();
  }
  Some(out)
}

fn extent(ring: &[Point]) -> f64 {
  ring
    .iter()
    .map(|p| p.x.abs().max(p.y.abs()))
    .fold(0.0, f64::max)
}

/// Shoelace contribution of the parts of `ring`'s boundary inside `other`.
///
/// `keep_shared` decides whether pieces running along an equally oriented
/// edge of `other` are counted; exactly one of the two passes keeps them.
fn boundary_inside(
  ring: &[Point],
  other: &[Point],
  keep_shared: bool,
  tolerance: f64,
) -> f64 {
  let mut sum = 0.0;

  for (p, q) in geometry::edges(ring) {
    let dir = q.sub(p);
    let len_sq = dir.dot(dir);
    if len_sq == 0.0 {
      continue;
    }

    let mut cuts = vec![0.0, 1.0];
    for (r, s) in geometry::edges(other) {
      split_params(p, dir, len_sq, r, s, tolerance, &mut cuts);
    }
    cuts.sort_by(f64::total_cmp);
    cuts.dedup_by(|x, y| (*x - *y).abs() <= REL_EPSILON);

    for w in cuts.windows(2) {
      let (t0, t1) = (w[0], w[1]);
      if t1 - t0 <= REL_EPSILON {
        continue;
      }
      let start = p.lerp(q, t0);
      let end = p.lerp(q, t1);
      let mid = p.lerp(q, (t0 + t1) / 2.0);

      let include = match shared_edge_direction(mid, dir, other, tolerance) {
        Some(same_way) => keep_shared && same_way,
        None => point_in_polygon(mid, other),
      };
      if include {
        sum += start.cross(end) / 2.0;
      }
    }
  }
  sum
}

/// Push the parameters along `p + t·dir` at which segment `r → s` touches
/// it: the proper crossing, or the projected endpoints of a collinear
/// overlap.
fn split_params(
  p: Point,
  dir: Point,
  len_sq: f64,
  r: Point,
  s: Point,
  tolerance: f64,
  cuts: &mut Vec<f64>,
) {
  let other_dir = s.sub(r);
  let denom = dir.cross(other_dir);
  let rp = r.sub(p);
  let len = len_sq.sqrt();

  if denom.abs() > tolerance * len {
    let t = rp.cross(other_dir) / denom;
    let u = rp.cross(dir) / denom;
    if (0.0..=1.0).contains(&t) && (-REL_EPSILON..=1.0 + REL_EPSILON).contains(&u) {
      cuts.push(t);
    }
    return;
  }

  // Parallel: only collinear segments can share a piece.
  if (rp.cross(dir) / len).abs() > tolerance {
    return;
  }
  for endpoint in [r, s] {
    let t = endpoint.sub(p).dot(dir) / len_sq;
    if (0.0..=1.0).contains(&t) {
      cuts.push(t);
    }
  }
}

/// If `point` lies on an edge of `ring` parallel to `dir`, whether that edge
/// runs the same way as `dir`.
fn shared_edge_direction(
  point: Point,
  dir: Point,
  ring: &[Point],
  tolerance: f64,
) -> Option<bool> {
  geometry::edges(ring).find_map(|(r, s)| {
    let edge = s.sub(r);
    let len_sq = edge.dot(edge);
    if len_sq == 0.0 {
      return None;
    }
    let len = len_sq.sqrt();
    let parallel = (edge.cross(dir)).abs() <= tolerance * len * dir.dot(dir).sqrt();
    let on_line = (point.sub(r).cross(edge) / len).abs() <= tolerance;
    let t = point.sub(r).dot(edge) / len_sq;
    (parallel && on_line && (0.0..=1.0).contains(&t))
      .then(|| edge.dot(dir) > 0.0)
  })
}
