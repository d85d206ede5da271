//! Persistence service boundary and an in-memory implementation.

use std::collections::BTreeMap;

use crate::model::{ImageId, ImageInfo, Label, LabelId, ProjectId};
use crate::sync::SyncError;
use crate::sync::wire::{AnnotationOp, OpAction, RemoteAnnotation};

/// Annotation persistence.
pub trait AnnotationService {
    /// Canonical annotation list of an image.
    fn fetch_annotations(&mut self, image: &ImageId) -> Result<Vec<RemoteAnnotation>, SyncError>;

    /// Apply a batch atomically and return the image's new canonical list.
    fn submit_ops(
        &mut self,
        image: &ImageId,
        ops: &[AnnotationOp],
    ) -> Result<Vec<RemoteAnnotation>, SyncError>;
}

/// Project label directory.
pub trait LabelService {
    fn fetch_labels(&mut self, project: &ProjectId) -> Result<Vec<Label>, SyncError>;

    fn create_label(
        &mut self,
        project: &ProjectId,
        name: &str,
        color: &str,
    ) -> Result<Label, SyncError>;

    fn update_label(
        &mut self,
        project: &ProjectId,
        id: &LabelId,
        name: Option<&str>,
        color: Option<&str>,
    ) -> Result<Label, SyncError>;

    fn delete_label(&mut self, project: &ProjectId, id: &LabelId) -> Result<(), SyncError>;
}

/// Image resource lookup.
pub trait ImageService {
    fn image_info(&mut self, image: &ImageId) -> Result<ImageInfo, SyncError>;
}

#[derive(Debug, Clone, Default)]
struct ImageRecord {
    info: Option<ImageInfo>,
    annotations: Vec<RemoteAnnotation>,
}

/// Service double that keeps everything in memory.
///
/// Batches are applied to a copy and committed only if every op succeeds.
/// Updates bump the version; a version mismatch on update or delete fails
/// the whole batch with [`SyncError::Conflict`].
#[derive(Debug, Clone, Default)]
pub struct InMemoryService {
    images: BTreeMap<ImageId, ImageRecord>,
    labels: BTreeMap<ProjectId, Vec<Label>>,
    next_annotation: u64,
    next_label: u64,
    fail_next: Option<SyncError>,
    batches: Vec<(ImageId, Vec<AnnotationOp>)>,
}

impl InMemoryService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_image(&mut self, info: ImageInfo) {
        let id = info.id.clone();
        self.images.entry(id).or_default().info = Some(info);
    }

    /// Seed an image with existing annotations.
    pub fn insert_annotations(&mut self, image: &ImageId, annotations: Vec<RemoteAnnotation>) {
        self.images
            .entry(image.clone())
            .or_default()
            .annotations
            .extend(annotations);
    }

    pub fn insert_labels(&mut self, project: &ProjectId, labels: Vec<Label>) {
        self.labels.entry(project.clone()).or_default().extend(labels);
    }

    pub fn annotations(&self, image: &ImageId) -> &[RemoteAnnotation] {
        self.images
            .get(image)
            .map_or(&[], |record| record.annotations.as_slice())
    }

    /// Every batch submitted so far, in order.
    pub fn batches(&self) -> &[(ImageId, Vec<AnnotationOp>)] {
        &self.batches
    }

    /// Make the next request fail with `error`.
    pub fn fail_next_request(&mut self, error: SyncError) {
        self.fail_next = Some(error);
    }

    fn take_failure(&mut self) -> Result<(), SyncError> {
        match self.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    fn fresh_annotation_id(&mut self) -> String {
        self.next_annotation += 1;
        format!("ann-{}", self.next_annotation)
    }

    fn apply_op(
        &mut self,
        annotations: &mut Vec<RemoteAnnotation>,
        op: &AnnotationOp,
    ) -> Result<(), SyncError> {
        match op.action {
            OpAction::Create => {
                let (Some(label_id), Some(geometry)) = (&op.label_id, &op.geometry) else {
                    return Err(SyncError::Rejected(
                        "missing label_id or geometry".to_string(),
                    ));
                };
                geometry.to_shape()?;
                let id = self.fresh_annotation_id();
                annotations.push(RemoteAnnotation {
                    id,
                    label_id: label_id.clone(),
                    geometry: geometry.clone(),
                    confidence: op.confidence,
                    is_prediction: op.is_prediction.unwrap_or(false),
                    version: 1,
                });
            }
            OpAction::Update => {
                let id = op
                    .id
                    .as_deref()
                    .ok_or_else(|| SyncError::Rejected("missing annotation id".to_string()))?;
                // Unknown ids are skipped, not rejected.
                let Some(existing) = annotations.iter_mut().find(|a| a.id == id) else {
                    return Ok(());
                };
                check_version(existing, op.version)?;
                if let Some(label_id) = &op.label_id {
                    existing.label_id = label_id.clone();
                }
                if let Some(geometry) = &op.geometry {
                    geometry.to_shape()?;
                    existing.geometry = geometry.clone();
                }
                if let Some(confidence) = op.confidence {
                    existing.confidence = Some(confidence);
                }
                if let Some(is_prediction) = op.is_prediction {
                    existing.is_prediction = is_prediction;
                }
                existing.version += 1;
            }
            OpAction::Delete => {
                let id = op
                    .id
                    .as_deref()
                    .ok_or_else(|| SyncError::Rejected("missing annotation id".to_string()))?;
                if let Some(index) = annotations.iter().position(|a| a.id == id) {
                    check_version(&annotations[index], op.version)?;
                    annotations.remove(index);
                }
            }
        }
        Ok(())
    }

    fn project_labels(&mut self, project: &ProjectId) -> &mut Vec<Label> {
        self.labels.entry(project.clone()).or_default()
    }
}

fn check_version(existing: &RemoteAnnotation, expected: Option<u32>) -> Result<(), SyncError> {
    match expected {
        Some(expected) if expected != existing.version => Err(SyncError::Conflict {
            id: existing.id.clone(),
            expected,
            found: existing.version,
        }),
        _ => Ok(()),
    }
}

impl AnnotationService for InMemoryService {
    fn fetch_annotations(&mut self, image: &ImageId) -> Result<Vec<RemoteAnnotation>, SyncError> {
        self.take_failure()?;
        let record = self
            .images
            .get(image)
            .ok_or_else(|| SyncError::ImageNotFound(image.clone()))?;
        Ok(record.annotations.clone())
    }

    fn submit_ops(
        &mut self,
        image: &ImageId,
        ops: &[AnnotationOp],
    ) -> Result<Vec<RemoteAnnotation>, SyncError> {
        self.take_failure()?;
        let mut working = self
            .images
            .get(image)
            .ok_or_else(|| SyncError::ImageNotFound(image.clone()))?
            .annotations
            .clone();
        let id_counter = self.next_annotation;

        for op in ops {
            if let Err(err) = self.apply_op(&mut working, op) {
                self.next_annotation = id_counter;
                log::debug!("Rejected batch of {} op(s) for {}: {}", ops.len(), image, err);
                return Err(err);
            }
        }

        self.batches.push((image.clone(), ops.to_vec()));
        if let Some(record) = self.images.get_mut(image) {
            record.annotations = working.clone();
        }
        Ok(working)
    }
}

impl LabelService for InMemoryService {
    fn fetch_labels(&mut self, project: &ProjectId) -> Result<Vec<Label>, SyncError> {
        self.take_failure()?;
        Ok(self.labels.get(project).cloned().unwrap_or_default())
    }

    fn create_label(
        &mut self,
        project: &ProjectId,
        name: &str,
        color: &str,
    ) -> Result<Label, SyncError> {
        self.take_failure()?;
        self.next_label += 1;
        let label = Label::new(format!("label-{}", self.next_label), name, color);
        self.project_labels(project).push(label.clone());
        Ok(label)
    }

    fn update_label(
        &mut self,
        project: &ProjectId,
        id: &LabelId,
        name: Option<&str>,
        color: Option<&str>,
    ) -> Result<Label, SyncError> {
        self.take_failure()?;
        let label = self
            .project_labels(project)
            .iter_mut()
            .find(|l| &l.id == id)
            .ok_or_else(|| SyncError::LabelNotFound(id.clone()))?;
        if let Some(name) = name {
            label.name = name.to_string();
        }
        if let Some(color) = color {
            label.color = color.to_string();
        }
        Ok(label.clone())
    }

    fn delete_label(&mut self, project: &ProjectId, id: &LabelId) -> Result<(), SyncError> {
        self.take_failure()?;
        let labels = self.project_labels(project);
        let before = labels.len();
        labels.retain(|l| &l.id != id);
        if labels.len() == before {
            return Err(SyncError::LabelNotFound(id.clone()));
        }
        Ok(())
    }
}

impl ImageService for InMemoryService {
    fn image_info(&mut self, image: &ImageId) -> Result<ImageInfo, SyncError> {
        self.take_failure()?;
        self.images
            .get(image)
            .and_then(|record| record.info.clone())
            .ok_or_else(|| SyncError::ImageNotFound(image.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::wire::WireGeometry;

    fn seeded() -> (InMemoryService, ImageId) {
        let mut service = InMemoryService::new();
        let image = ImageId::new("img-1");
        service.add_image(ImageInfo::new("img-1", 640, 480));
        service.insert_annotations(
            &image,
            vec![RemoteAnnotation {
                id: "a1".to_string(),
                label_id: LabelId::new("car"),
                geometry: WireGeometry::Box {
                    x: 0.0,
                    y: 0.0,
                    w: 10.0,
                    h: 10.0,
                },
                confidence: None,
                is_prediction: false,
                version: 1,
            }],
        );
        (service, image)
    }

    fn box_geometry() -> WireGeometry {
        WireGeometry::Box {
            x: 5.0,
            y: 5.0,
            w: 20.0,
            h: 20.0,
        }
    }

    #[test]
    fn test_update_bumps_version() {
        let (mut service, image) = seeded();
        let op = AnnotationOp {
            action: OpAction::Update,
            id: Some("a1".to_string()),
            label_id: None,
            geometry: Some(box_geometry()),
            confidence: None,
            is_prediction: None,
            version: Some(1),
        };
        let result = service.submit_ops(&image, &[op]).unwrap();
        assert_eq!(result[0].version, 2);
        assert_eq!(result[0].geometry, box_geometry());
    }

    #[test]
    fn test_conflict_applies_nothing() {
        let (mut service, image) = seeded();
        let create = AnnotationOp {
            action: OpAction::Create,
            id: None,
            label_id: Some(LabelId::new("car")),
            geometry: Some(box_geometry()),
            confidence: None,
            is_prediction: None,
            version: None,
        };
        let stale_delete = AnnotationOp::delete("a1", Some(7));
        let err = service.submit_ops(&image, &[create, stale_delete]).unwrap_err();
        assert!(matches!(err, SyncError::Conflict { expected: 7, found: 1, .. }));
        assert_eq!(service.annotations(&image).len(), 1);
        assert!(service.batches().is_empty());
    }

    #[test]
    fn test_create_requires_label_and_geometry() {
        let (mut service, image) = seeded();
        let op = AnnotationOp {
            action: OpAction::Create,
            id: None,
            label_id: None,
            geometry: Some(box_geometry()),
            confidence: None,
            is_prediction: None,
            version: None,
        };
        assert!(matches!(
            service.submit_ops(&image, &[op]),
            Err(SyncError::Rejected(_))
        ));
    }

    #[test]
    fn test_injected_failure_is_one_shot() {
        let (mut service, image) = seeded();
        service.fail_next_request(SyncError::Transport("offline".to_string()));
        assert!(service.fetch_annotations(&image).is_err());
        assert_eq!(service.fetch_annotations(&image).unwrap().len(), 1);
    }

    #[test]
    fn test_add_image_after_seeding_keeps_annotations() {
        let mut service = InMemoryService::new();
        let image = ImageId::new("img-9");
        service.insert_annotations(
            &image,
            vec![RemoteAnnotation {
                id: "a1".to_string(),
                label_id: LabelId::new("car"),
                geometry: box_geometry(),
                confidence: None,
                is_prediction: false,
                version: 1,
            }],
        );
        service.add_image(ImageInfo::new("img-9", 32, 16));

        assert_eq!(service.image_info(&image).unwrap().width, 32);
        assert_eq!(service.annotations(&image).len(), 1);
    }

    #[test]
    fn test_labels_are_scoped_per_project() {
        let mut service = InMemoryService::new();
        let a = ProjectId::new("a");
        let b = ProjectId::new("b");
        service.insert_labels(&a, vec![Label::new("car", "car", "#38bdf8")]);
        service.create_label(&b, "person", "#f87171").unwrap();

        assert_eq!(service.fetch_labels(&a).unwrap().len(), 1);
        assert_eq!(service.fetch_labels(&b).unwrap()[0].name, "person");
        assert!(service.fetch_labels(&ProjectId::new("c")).unwrap().is_empty());
    }

    #[test]
    fn test_label_crud() {
        let mut service = InMemoryService::new();
        let project = ProjectId::new("p");
        let car = service.create_label(&project, "car", "#38bdf8").unwrap();
        service
            .update_label(&project, &car.id, Some("vehicle"), None)
            .unwrap();
        assert_eq!(service.fetch_labels(&project).unwrap()[0].name, "vehicle");
        service.delete_label(&project, &car.id).unwrap();
        assert!(matches!(
            service.delete_label(&project, &car.id),
            Err(SyncError::LabelNotFound(_))
        ));
    }
}
