//! Geometry primitives shared by the canvas, the store and the sync layer.
//!
//! All types here are space-agnostic: whether a `Point` is in image pixels or
//! screen pixels is decided by the caller. The only place that converts
//! between the two is [`crate::transform::Viewport`].

use serde::{Deserialize, Serialize};

/// Minimum number of vertices for a committed polygon.
pub const MIN_POLYGON_VERTICES: usize = 3;

// ============================================================================
// Points and sizes
// ============================================================================

/// A 2D point.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Component-wise difference `self - other`.
    pub fn delta(&self, other: &Point) -> Point {
        Point::new(self.x - other.x, self.y - other.y)
    }

    /// Translate by a delta.
    pub fn offset(&self, dx: f32, dy: f32) -> Point {
        Point::new(self.x + dx, self.y + dy)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }
}

/// Width and height pair (image dimensions, viewport dimensions).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// True when both dimensions are strictly positive and finite.
    pub fn is_positive(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

// ============================================================================
// Bounding boxes and resize handles
// ============================================================================

/// One of the eight resize handles of a box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Handle {
    TopLeft,
    Top,
    TopRight,
    Right,
    BottomRight,
    Bottom,
    BottomLeft,
    Left,
}

impl Handle {
    pub fn all() -> &'static [Handle] {
        &[
            Handle::TopLeft,
            Handle::Top,
            Handle::TopRight,
            Handle::Right,
            Handle::BottomRight,
            Handle::Bottom,
            Handle::BottomLeft,
            Handle::Left,
        ]
    }
}

/// An axis-aligned rectangle defined by its top-left corner and size.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Top-left corner X coordinate
    pub x: f32,
    /// Top-left corner Y coordinate
    pub y: f32,
    /// Width of the box, never negative
    pub width: f32,
    /// Height of the box, never negative
    pub height: f32,
}

impl BoundingBox {
    pub const fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Build a normalized box from two opposite corners, in any drag direction.
    pub fn from_corners(p1: Point, p2: Point) -> Self {
        Self {
            x: p1.x.min(p2.x),
            y: p1.y.min(p2.y),
            width: (p2.x - p1.x).abs(),
            height: (p2.y - p1.y).abs(),
        }
    }

    pub fn right(&self) -> f32 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub fn center(&self) -> Point {
        Point::new(self.x + self.width / 2.0, self.y + self.height / 2.0)
    }

    pub fn area(&self) -> f32 {
        self.width * self.height
    }

    /// Inclusive containment test.
    pub fn contains(&self, point: &Point) -> bool {
        point.x >= self.x && point.x <= self.right() && point.y >= self.y && point.y <= self.bottom()
    }

    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy, self.width, self.height)
    }

    /// Valid boxes have finite coordinates and non-negative dimensions.
    pub fn is_valid(&self) -> bool {
        [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
            && self.width >= 0.0
            && self.height >= 0.0
    }

    /// Position of each resize handle.
    pub fn handles(&self) -> Vec<(Handle, Point)> {
        let c = self.center();
        vec![
            (Handle::TopLeft, Point::new(self.x, self.y)),
            (Handle::Top, Point::new(c.x, self.y)),
            (Handle::TopRight, Point::new(self.right(), self.y)),
            (Handle::Right, Point::new(self.right(), c.y)),
            (Handle::BottomRight, Point::new(self.right(), self.bottom())),
            (Handle::Bottom, Point::new(c.x, self.bottom())),
            (Handle::BottomLeft, Point::new(self.x, self.bottom())),
            (Handle::Left, Point::new(self.x, c.y)),
        ]
    }

    /// Move the edges attached to `handle` to `to`.
    ///
    /// The edge opposite the handle stays fixed and the moving edge is
    /// clamped so the result is never thinner than `min_size`; dragging a
    /// handle past the opposite edge therefore does not flip the box.
    pub fn resize_from_handle(&self, handle: Handle, to: Point, min_size: f32) -> Self {
        let min_size = min_size.max(0.0);
        let (mut left, mut top, mut right, mut bottom) = (self.x, self.y, self.right(), self.bottom());

        let moves_left = matches!(handle, Handle::TopLeft | Handle::Left | Handle::BottomLeft);
        let moves_right = matches!(handle, Handle::TopRight | Handle::Right | Handle::BottomRight);
        let moves_top = matches!(handle, Handle::TopLeft | Handle::Top | Handle::TopRight);
        let moves_bottom = matches!(handle, Handle::BottomLeft | Handle::Bottom | Handle::BottomRight);

        if moves_left {
            left = to.x.min(right - min_size);
        }
        if moves_right {
            right = to.x.max(left + min_size);
        }
        if moves_top {
            top = to.y.min(bottom - min_size);
        }
        if moves_bottom {
            bottom = to.y.max(top + min_size);
        }

        Self::new(left, top, right - left, bottom - top)
    }
}

// ============================================================================
// Polygons
// ============================================================================

/// Axis-aligned bounds of a vertex list, `None` when empty.
pub fn polygon_bounds(vertices: &[Point]) -> Option<BoundingBox> {
    let first = vertices.first()?;
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &vertices[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    Some(BoundingBox::new(min_x, min_y, max_x - min_x, max_y - min_y))
}

/// Point-in-polygon test (ray casting). The polygon is implicitly closed.
pub fn polygon_contains(vertices: &[Point], point: &Point) -> bool {
    if vertices.len() < MIN_POLYGON_VERTICES {
        return false;
    }

    let mut inside = false;
    let mut j = vertices.len() - 1;
    for i in 0..vertices.len() {
        let vi = &vertices[i];
        let vj = &vertices[j];
        if ((vi.y > point.y) != (vj.y > point.y))
            && (point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Whether a click at `point` should close a draft whose first vertex is `first`.
///
/// Both points must be in the same space as `threshold`.
pub fn closes_polygon(first: &Point, point: &Point, threshold: f32) -> bool {
    first.distance_to(point) <= threshold
}

/// Drop vertices that sit within `epsilon` of their predecessor.
///
/// A double-click lands two pointer-downs on the same spot; this collapses
/// them before the vertex count is checked.
pub fn dedup_vertices(vertices: &[Point], epsilon: f32) -> Vec<Point> {
    let mut out: Vec<Point> = Vec::with_capacity(vertices.len());
    for p in vertices {
        match out.last() {
            Some(last) if last.distance_to(p) <= epsilon => {}
            _ => out.push(*p),
        }
    }
    out
}

/// Flatten `[(x, y), ...]` into `[x, y, ...]`.
pub fn flatten_points(vertices: &[Point]) -> Vec<f32> {
    vertices.iter().flat_map(|p| [p.x, p.y]).collect()
}

/// Pair a flat `[x, y, ...]` list into points; `None` on an odd count.
pub fn pair_points(flat: &[f32]) -> Option<Vec<Point>> {
    if flat.len() % 2 != 0 {
        return None;
    }
    Some(flat.chunks_exact(2).map(|c| Point::new(c[0], c[1])).collect())
}
