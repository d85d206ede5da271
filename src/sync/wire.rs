//! Wire types exchanged with the annotation persistence service.
//!
//! Field names are snake_case. Geometry is distinguished structurally:
//! `{x, y, w, h}` is a box and `{points: [x0, y0, x1, y1, ...]}` is a
//! polygon; there is no type tag.

use serde::{Deserialize, Serialize};

use crate::geometry::{BoundingBox, MIN_POLYGON_VERTICES, flatten_points, pair_points};
use crate::model::{Annotation, AnnotationId, LabelId, Shape};
use crate::sync::SyncError;

/// Geometry payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WireGeometry {
    Box {
        x: f32,
        y: f32,
        #[serde(alias = "width")]
        w: f32,
        #[serde(alias = "height")]
        h: f32,
    },
    Polygon {
        points: Vec<f32>,
    },
}

impl WireGeometry {
    pub fn from_shape(shape: &Shape) -> Self {
        match shape {
            Shape::Box(b) => WireGeometry::Box {
                x: b.x,
                y: b.y,
                w: b.width,
                h: b.height,
            },
            Shape::Polygon(vertices) => WireGeometry::Polygon {
                points: flatten_points(vertices),
            },
        }
    }

    /// Convert to a local shape, rejecting malformed payloads.
    pub fn to_shape(&self) -> Result<Shape, SyncError> {
        match self {
            WireGeometry::Box { x, y, w, h } => {
                let b = BoundingBox::new(*x, *y, *w, *h);
                if !b.is_valid() {
                    return Err(SyncError::InvalidGeometry(format!(
                        "box {x},{y} {w}x{h} has a negative or non-finite value"
                    )));
                }
                Ok(Shape::Box(b))
            }
            WireGeometry::Polygon { points } => {
                let vertices = pair_points(points).ok_or_else(|| {
                    SyncError::InvalidGeometry(format!(
                        "polygon has an odd coordinate count ({})",
                        points.len()
                    ))
                })?;
                if vertices.len() < MIN_POLYGON_VERTICES {
                    return Err(SyncError::InvalidGeometry(format!(
                        "polygon has {} vertices, need at least {}",
                        vertices.len(),
                        MIN_POLYGON_VERTICES
                    )));
                }
                let shape = Shape::Polygon(vertices);
                if !shape.is_valid() {
                    return Err(SyncError::InvalidGeometry(
                        "polygon has non-finite coordinates".to_string(),
                    ));
                }
                Ok(shape)
            }
        }
    }
}

fn default_version() -> u32 {
    1
}

/// An annotation as stored by the service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteAnnotation {
    pub id: String,
    pub label_id: LabelId,
    pub geometry: WireGeometry,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub is_prediction: bool,
    #[serde(default = "default_version")]
    pub version: u32,
}

impl RemoteAnnotation {
    /// Translate into the local shape, tagged as persisted.
    pub fn to_annotation(&self) -> Result<Annotation, SyncError> {
        let shape = self.geometry.to_shape()?;
        Ok(Annotation {
            id: AnnotationId::persisted(self.id.clone()),
            label_id: self.label_id.clone(),
            shape,
            confidence: self.confidence,
            is_prediction: self.is_prediction,
            version: Some(self.version),
        })
    }
}

/// Translate a fetched list, skipping entries with malformed geometry.
pub fn into_local(remote: &[RemoteAnnotation]) -> Vec<Annotation> {
    remote
        .iter()
        .filter_map(|r| match r.to_annotation() {
            Ok(annotation) => Some(annotation),
            Err(err) => {
                log::warn!("Skipping remote annotation {}: {}", r.id, err);
                None
            }
        })
        .collect()
}

/// Decode a JSON array of annotations, skipping entries that do not parse.
pub fn decode_annotations(json: &str) -> Result<Vec<RemoteAnnotation>, SyncError> {
    let values: Vec<serde_json::Value> = serde_json::from_str(json)?;
    Ok(decode_values(values))
}

/// Decode already-parsed annotation objects, skipping the malformed ones.
pub fn decode_values(values: Vec<serde_json::Value>) -> Vec<RemoteAnnotation> {
    values
        .into_iter()
        .enumerate()
        .filter_map(
            |(i, value)| match serde_json::from_value::<RemoteAnnotation>(value) {
                Ok(annotation) => Some(annotation),
                Err(err) => {
                    log::warn!("Skipping malformed annotation at index {}: {}", i, err);
                    None
                }
            },
        )
        .collect()
}

/// Batch operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpAction {
    Create,
    Update,
    Delete,
}

/// One entry of a save batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnnotationOp {
    pub action: OpAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label_id: Option<LabelId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<WireGeometry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_prediction: Option<bool>,
    /// Expected server version (optimistic lock).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<u32>,
}

impl AnnotationOp {
    /// Create op for a local annotation, carrying its provenance.
    pub fn create(annotation: &Annotation) -> Self {
        Self {
            action: OpAction::Create,
            id: None,
            label_id: Some(annotation.label_id.clone()),
            geometry: Some(WireGeometry::from_shape(&annotation.shape)),
            confidence: annotation.confidence,
            is_prediction: Some(annotation.is_prediction),
            version: None,
        }
    }

    /// Full-state update op for a persisted annotation.
    pub fn update(server_id: &str, annotation: &Annotation) -> Self {
        Self {
            action: OpAction::Update,
            id: Some(server_id.to_string()),
            label_id: Some(annotation.label_id.clone()),
            geometry: Some(WireGeometry::from_shape(&annotation.shape)),
            confidence: None,
            is_prediction: None,
            version: annotation.version,
        }
    }

    pub fn delete(server_id: &str, version: Option<u32>) -> Self {
        Self {
            action: OpAction::Delete,
            id: Some(server_id.to_string()),
            label_id: None,
            geometry: None,
            confidence: None,
            is_prediction: None,
            version,
        }
    }
}

/// Request body of a save.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchRequest {
    #[serde(default)]
    pub ops: Vec<AnnotationOp>,
}

/// Response body of a save: the image's canonical annotation list.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BatchResponse {
    #[serde(default)]
    pub annotations: Vec<RemoteAnnotation>,
}
