//! Planar geometry kernel: points, rings, areas, centroids, bounding boxes.
//!
//! A ring is a slice of vertices describing a simple polygon. Rings may be
//! open or closed (first vertex repeated at the end) and may wind either way.
//! Every function accepts degenerate rings (fewer than three vertices) and
//! degrades gracefully instead of failing.

use serde::{Deserialize, Serialize};

/// A point on the map plane. Serialised as `[x, y]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f64; 2]", into = "[f64; 2]")]
pub struct Point {
  pub x: f64,
  pub y: f64,
}

impl Point {
  #[inline]
  pub const fn new(x: f64, y: f64) -> Self { Self { x, y } }

  #[inline]
  pub(crate) fn sub(self, other: Self) -> Self {
    Self::new(self.x - other.x, self.y - other.y)
  }

  /// z-component of the 2D cross product.
  #[inline]
  pub(crate) fn cross(self, other: Self) -> f64 {
    self.x * other.y - self.y * other.x
  }

  #[inline]
  pub(crate) fn dot(self, other: Self) -> f64 {
    self.x * other.x + self.y * other.y
  }

  /// The point at parameter `t` along the segment `self → to`.
  #[inline]
  pub(crate) fn lerp(self, to: Self, t: f64) -> Self {
    if t >= 1.0 {
      return to;
    }
    Self::new(self.x + (to.x - self.x) * t, self.y + (to.y - self.y) * t)
  }
}

impl From<[f64; 2]> for Point {
  fn from([x, y]: [f64; 2]) -> Self { Self::new(x, y) }
}

impl From<Point> for [f64; 2] {
  fn from(p: Point) -> Self { [p.x, p.y] }
}

/// Iterate the edges `(v[i], v[i + 1])` of a ring, including the closing
/// edge from the last vertex back to the first.
pub(crate) fn edges(ring: &[Point]) -> impl Iterator<Item = (Point, Point)> + '_ {
  let n = ring.len();
  (0..n).map(move |i| (ring[i], ring[(i + 1) % n]))
}

// ─── Point in polygon ────────────────────────────────────────────────────────

/// Even-odd ray casting: a horizontal ray is cast from `point` towards +x and
/// the number of edge crossings decides the answer.
///
/// Points exactly on the boundary get whichever answer the crossing count
/// yields; boundary inclusion is not guaranteed either way. Rings with fewer
/// than three vertices contain nothing.
pub fn point_in_polygon(point: Point, ring: &[Point]) -> bool {
  if ring.len() < 3 {
    return false;
  }

  let mut inside = false;
  for (a, b) in edges(ring) {
    // Only edges straddling the ray's y count; this also skips horizontal
    // edges, so the slope denominator below is never zero.
    if (a.y > point.y) != (b.y > point.y) {
      let dy = b.y - a.y;
      let dy = if dy.abs() < f64::EPSILON { f64::EPSILON.copysign(dy) } else { dy };
      let x_cross = a.x + (point.y - a.y) * (b.x - a.x) / dy;
      if point.x < x_cross {
        inside = !inside;
      }
    }
  }
  inside
}

/// True if `point` lies within `tolerance` of some edge of `ring`.
///
/// Complements [`point_in_polygon`], whose answer for boundary points depends
/// on which edge they sit on.
pub fn point_on_boundary(point: Point, ring: &[Point], tolerance: f64) -> bool {
  edges(ring).any(|(a, b)| {
    let edge = b.sub(a);
    let offset = point.sub(a);
    let len_sq = edge.dot(edge);
    if len_sq == 0.0 {
      return offset.dot(offset).sqrt() <= tolerance;
    }
    let t = offset.dot(edge) / len_sq;
    (0.0..=1.0).contains(&t) && (offset.cross(edge) / len_sq.sqrt()).abs() <= tolerance
  })
}

// ─── Area & centroid ─────────────────────────────────────────────────────────

/// Shoelace signed area: positive for counter-clockwise rings.
/// Returns 0 for rings with fewer than three vertices.
pub fn signed_area(ring: &[Point]) -> f64 {
  if ring.len() < 3 {
    return 0.0;
  }
  edges(ring).map(|(a, b)| a.cross(b)).sum::<f64>() / 2.0
}

/// Unsigned polygon area. Returns 0 for degenerate rings.
pub fn polygon_area(ring: &[Point]) -> f64 { signed_area(ring).abs() }

/// Area-weighted centroid of a ring.
///
/// Returns `None` when the signed area is zero (collinear vertices, fewer
/// than three vertices, or a self-intersecting ring whose lobes cancel out):
/// the centroid is undefined there and must not leak out as `NaN`.
pub fn polygon_centroid(ring: &[Point]) -> Option<Point> {
  let area = signed_area(ring);
  if area == 0.0 || !area.is_finite() {
    return None;
  }

  let (mut cx, mut cy) = (0.0, 0.0);
  for (a, b) in edges(ring) {
    let w = a.cross(b);
    cx += (a.x + b.x) * w;
    cy += (a.y + b.y) * w;
  }
  let factor = 1.0 / (6.0 * area);
  let centroid = Point::new(cx * factor, cy * factor);
  (centroid.x.is_finite() && centroid.y.is_finite()).then_some(centroid)
}

// ─── Bounding boxes ──────────────────────────────────────────────────────────

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
  pub min: Point,
  pub max: Point,
}

impl BoundingBox {
  /// The bounding box of a ring, or `None` if it has no vertices.
  pub fn of(ring: &[Point]) -> Option<Self> {
    let first = *ring.first()?;
    Some(ring.iter().skip(1).fold(
      Self { min: first, max: first },
      |bb, p| Self {
        min: Point::new(bb.min.x.min(p.x), bb.min.y.min(p.y)),
        max: Point::new(bb.max.x.max(p.x), bb.max.y.max(p.y)),
      },
    ))
  }

  /// True if the boxes share at least one point (touching counts).
  pub fn overlaps(&self, other: &Self) -> bool {
    self.min.x <= other.max.x
      && other.min.x <= self.max.x
      && self.min.y <= other.max.y
      && other.min.y <= self.max.y
  }

  /// Area of the intersection of the two boxes; 0 when disjoint.
  pub fn overlap_area(&self, other: &Self) -> f64 {
    let w = self.max.x.min(other.max.x) - self.min.x.max(other.min.x);
    let h = self.max.y.min(other.max.y) - self.min.y.max(other.min.y);
    if w <= 0.0 || h <= 0.0 { 0.0 } else { w * h }
  }

  pub fn width(&self) -> f64 { self.max.x - self.min.x }

  pub fn height(&self) -> f64 { self.max.y - self.min.y }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ring(points: &[[f64; 2]]) -> Vec<Point> {
    points.iter().copied().map(Point::from).collect()
  }

  fn unit_square() -> Vec<Point> {
    ring(&[[0.0, 0.0], [0.0, 1.0], [1.0, 1.0], [1.0, 0.0]])
  }

  #[test]
  fn unit_square_contains_its_middle() {
    let sq = unit_square();
    assert!(point_in_polygon(Point::new(0.5, 0.5), &sq));
    assert!(!point_in_polygon(Point::new(2.0, 2.0), &sq));
  }

  #[test]
  fn ray_along_horizontal_edge_does_not_divide_by_zero() {
    // The ray from (−1, 1) runs exactly along the top edge.
    let sq = unit_square();
    assert!(!point_in_polygon(Point::new(-1.0, 1.0), &sq));
    assert!(!point_in_polygon(Point::new(-1.0, 0.0), &sq));
  }

  #[test]
  fn boundary_points_are_detected_on_every_side() {
    let sq = unit_square();
    for p in [[0.0, 0.5], [1.0, 0.5], [0.5, 0.0], [0.5, 1.0], [1.0, 1.0]] {
      assert!(point_on_boundary(Point::from(p), &sq, 1e-9), "{p:?}");
    }
    assert!(!point_on_boundary(Point::new(0.5, 0.5), &sq, 1e-9));
    assert!(!point_on_boundary(Point::new(1.5, 1.0), &sq, 1e-9));
    assert!(!point_on_boundary(Point::new(0.0, 0.0), &[], 1e-9));
  }

  #[test]
  fn concave_ring() {
    // A "U" shape; the notch is outside.
    let u = ring(&[
      [0.0, 0.0],
      [3.0, 0.0],
      [3.0, 3.0],
      [2.0, 3.0],
      [2.0, 1.0],
      [1.0, 1.0],
      [1.0, 3.0],
      [0.0, 3.0],
    ]);
    assert!(point_in_polygon(Point::new(0.5, 2.0), &u));
    assert!(!point_in_polygon(Point::new(1.5, 2.0), &u));
    assert!(point_in_polygon(Point::new(1.5, 0.5), &u));
    assert_eq!(polygon_area(&u), 7.0);
  }

  #[test]
  fn degenerate_rings() {
    let line = ring(&[[0.0, 0.0], [1.0, 1.0]]);
    assert_eq!(polygon_area(&line), 0.0);
    assert!(!point_in_polygon(Point::new(0.5, 0.5), &line));
    assert_eq!(polygon_centroid(&line), None);
    assert_eq!(polygon_centroid(&[]), None);
  }

  #[test]
  fn area_ignores_winding_and_closure() {
    let mut cw = unit_square();
    assert_eq!(signed_area(&cw), -1.0);
    cw.reverse();
    assert_eq!(signed_area(&cw), 1.0);
    cw.push(cw[0]);
    assert_eq!(polygon_area(&cw), 1.0);
  }

  #[test]
  fn centroid_of_rectangle_is_its_middle() {
    let r = ring(&[[0.0, 0.0], [4.0, 0.0], [4.0, 2.0], [0.0, 2.0]]);
    assert_eq!(polygon_centroid(&r), Some(Point::new(2.0, 1.0)));
  }

  #[test]
  fn bow_tie_with_cancelling_lobes_has_no_centroid() {
    let bow = ring(&[[0.0, 0.0], [2.0, 2.0], [2.0, 0.0], [0.0, 2.0]]);
    assert_eq!(signed_area(&bow), 0.0);
    assert_eq!(polygon_centroid(&bow), None);
  }

  #[test]
  fn bounding_box_overlap() {
    let a = BoundingBox::of(&unit_square()).unwrap();
    let b = BoundingBox::of(&ring(&[[0.5, 0.5], [2.0, 0.5], [2.0, 2.0]]))
      .unwrap();
    let far = BoundingBox::of(&ring(&[[5.0, 5.0], [6.0, 6.0]])).unwrap();
    assert!(a.overlaps(&b));
    assert_eq!(a.overlap_area(&b), 0.25);
    assert!(!a.overlaps(&far));
    assert_eq!(a.overlap_area(&far), 0.0);
    assert!(BoundingBox::of(&[]).is_none());
  }
}
