//! Annotation data model.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::geometry::{
    BoundingBox, MIN_POLYGON_VERTICES, Point, Size, polygon_bounds, polygon_contains,
};
use crate::model::LabelId;

// ============================================================================
// Identifiers
// ============================================================================

/// Identifier of an annotation, tagged with where it came from.
///
/// Locally created annotations get a session-unique sequence number until
/// the persistence service acknowledges them; server ids are opaque strings.
/// The two can never collide because the origin is part of the value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum AnnotationId {
    /// Created in this session, not yet persisted.
    Local(u64),
    /// Issued by the persistence service.
    Persisted(String),
}

impl AnnotationId {
    pub fn persisted(id: impl Into<String>) -> Self {
        AnnotationId::Persisted(id.into())
    }

    pub fn is_local(&self) -> bool {
        matches!(self, AnnotationId::Local(_))
    }

    /// The server id, if this annotation has one.
    pub fn as_persisted(&self) -> Option<&str> {
        match self {
            AnnotationId::Persisted(id) => Some(id),
            AnnotationId::Local(_) => None,
        }
    }

    /// The local sequence number, if this annotation is local.
    pub fn local_seq(&self) -> Option<u64> {
        match self {
            AnnotationId::Local(seq) => Some(*seq),
            AnnotationId::Persisted(_) => None,
        }
    }
}

impl fmt::Display for AnnotationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnnotationId::Local(seq) => write!(f, "local#{}", seq),
            AnnotationId::Persisted(id) => f.write_str(id),
        }
    }
}

// ============================================================================
// Shapes
// ============================================================================

/// Shape discriminant, used where only the kind matters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShapeKind {
    Box,
    Polygon,
}

/// Geometry of an annotation, in image pixels.
#[derive(Debug, Clone, PartialEq)]
pub enum Shape {
    /// Axis-aligned bounding box.
    Box(BoundingBox),
    /// Closed polygon, at least three vertices.
    Polygon(Vec<Point>),
}

impl Shape {
    pub fn kind(&self) -> ShapeKind {
        match self {
            Shape::Box(_) => ShapeKind::Box,
            Shape::Polygon(_) => ShapeKind::Polygon,
        }
    }

    pub fn as_box(&self) -> Option<&BoundingBox> {
        match self {
            Shape::Box(b) => Some(b),
            Shape::Polygon(_) => None,
        }
    }

    /// Axis-aligned bounds of the shape.
    pub fn bounds(&self) -> BoundingBox {
        match self {
            Shape::Box(b) => *b,
            Shape::Polygon(vertices) => polygon_bounds(vertices).unwrap_or_default(),
        }
    }

    /// Containment test in image space.
    pub fn contains(&self, point: &Point) -> bool {
        match self {
            Shape::Box(b) => b.contains(point),
            Shape::Polygon(vertices) => polygon_contains(vertices, point),
        }
    }

    /// Copy of this shape moved by `(dx, dy)`.
    pub fn translated(&self, dx: f32, dy: f32) -> Shape {
        match self {
            Shape::Box(b) => Shape::Box(b.translated(dx, dy)),
            Shape::Polygon(vertices) => {
                Shape::Polygon(vertices.iter().map(|p| p.offset(dx, dy)).collect())
            }
        }
    }

    /// Structural validity: non-negative finite box, or a polygon with enough finite vertices.
    pub fn is_valid(&self) -> bool {
        match self {
            Shape::Box(b) => b.is_valid(),
            Shape::Polygon(vertices) => {
                vertices.len() >= MIN_POLYGON_VERTICES && vertices.iter().all(Point::is_finite)
            }
        }
    }
}

/// Partial geometry update merged onto an existing shape.
#[derive(Debug, Clone, PartialEq)]
pub enum GeometryPatch {
    /// Overwrite any subset of the box fields. Ignored for polygons.
    Box {
        x: Option<f32>,
        y: Option<f32>,
        width: Option<f32>,
        height: Option<f32>,
    },
    /// Replace the vertex list. Ignored for boxes.
    Polygon { points: Vec<Point> },
    /// Move the whole shape, any kind.
    Translate { dx: f32, dy: f32 },
}

impl GeometryPatch {
    /// Full replacement patch for a shape of the same kind.
    pub fn replace_with(shape: &Shape) -> Self {
        match shape {
            Shape::Box(b) => GeometryPatch::Box {
                x: Some(b.x),
                y: Some(b.y),
                width: Some(b.width),
                height: Some(b.height),
            },
            Shape::Polygon(points) => GeometryPatch::Polygon {
                points: points.clone(),
            },
        }
    }

    /// Apply onto `shape`, returning the merged shape.
    ///
    /// Returns `None` when the patch targets the other shape kind or the
    /// merged result would be invalid (negative size, too few vertices).
    pub fn apply(&self, shape: &Shape) -> Option<Shape> {
        let merged = match (self, shape) {
            (
                GeometryPatch::Box {
                    x,
                    y,
                    width,
                    height,
                },
                Shape::Box(b),
            ) => Shape::Box(BoundingBox::new(
                x.unwrap_or(b.x),
                y.unwrap_or(b.y),
                width.unwrap_or(b.width),
                height.unwrap_or(b.height),
            )),
            (GeometryPatch::Polygon { points }, Shape::Polygon(_)) => {
                Shape::Polygon(points.clone())
            }
            (GeometryPatch::Translate { dx, dy }, shape) => shape.translated(*dx, *dy),
            _ => return None,
        };
        merged.is_valid().then_some(merged)
    }
}

// ============================================================================
// Annotation
// ============================================================================

/// A drawn shape with its label and provenance.
#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    /// Tagged identifier; decides create-vs-update on save.
    pub id: AnnotationId,
    /// Label this annotation belongs to.
    pub label_id: LabelId,
    /// Geometry in image pixels.
    pub shape: Shape,
    /// Model confidence for predictions.
    pub confidence: Option<f32>,
    /// Produced by a model rather than drawn by hand.
    pub is_prediction: bool,
    /// Server-side revision used for optimistic locking, `None` for local annotations.
    pub version: Option<u32>,
}

impl Annotation {
    /// A hand-drawn annotation.
    pub fn new(id: AnnotationId, label_id: LabelId, shape: Shape) -> Self {
        Self {
            id,
            label_id,
            shape,
            confidence: None,
            is_prediction: false,
            version: None,
        }
    }

    /// Mark as a model prediction with the given confidence.
    pub fn with_prediction(mut self, confidence: Option<f32>) -> Self {
        self.is_prediction = true;
        self.confidence = confidence;
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn is_local(&self) -> bool {
        self.id.is_local()
    }

    pub fn kind(&self) -> ShapeKind {
        self.shape.kind()
    }
}

// ============================================================================
// Images
// ============================================================================

/// Opaque image identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ImageId(pub String);

impl ImageId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// An image as resolved by the image resource service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub id: ImageId,
    /// Fetchable location of the pixels.
    #[serde(default)]
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl ImageInfo {
    pub fn new(id: impl Into<String>, width: u32, height: u32) -> Self {
        Self {
            id: ImageId::new(id),
            url: String::new(),
            width,
            height,
        }
    }

    pub fn size(&self) -> Size {
        Size::new(self.width as f32, self.height as f32)
    }
}
