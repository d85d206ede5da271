//! Offline project dumps.
//!
//! A dump is one JSON document holding a project's labels and every image
//! with its annotations in wire format. It seeds an [`InMemoryService`] so
//! the editor can run without a backend.

use serde::{Deserialize, Serialize};

use crate::model::{ImageInfo, Label, ProjectId};
use crate::sync::SyncError;
use crate::sync::service::InMemoryService;
use crate::sync::wire::decode_values;

fn default_project() -> ProjectId {
    ProjectId::new("default")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageDump {
    #[serde(flatten)]
    pub info: ImageInfo,
    /// Kept as raw values so one malformed entry does not sink the file.
    #[serde(default)]
    pub annotations: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDump {
    #[serde(default = "default_project")]
    pub project: ProjectId,
    #[serde(default)]
    pub labels: Vec<Label>,
    #[serde(default)]
    pub images: Vec<ImageDump>,
}

impl ProjectDump {
    /// Parse a dump. The top level must be a JSON object.
    pub fn from_json(json: &str) -> Result<Self, SyncError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        if !value.is_object() {
            return Err(SyncError::Decode(
                "project dump must be a JSON object".to_string(),
            ));
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Build a service holding the dump, plus the images in dump order.
    pub fn into_service(self) -> (InMemoryService, Vec<ImageInfo>) {
        let mut service = InMemoryService::new();
        service.insert_labels(&self.project, self.labels);

        let mut images = Vec::with_capacity(self.images.len());
        for image in self.images {
            let annotations = decode_values(image.annotations);
            service.add_image(image.info.clone());
            service.insert_annotations(&image.info.id, annotations);
            images.push(image.info);
        }
        log::debug!(
            "Seeded service with {} image(s) for project {}",
            images.len(),
            self.project
        );
        (service, images)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ImageId;
    use crate::sync::{AnnotationService, LabelService};

    const DUMP: &str = r##"{
        "project": "p1",
        "labels": [{"id": "car", "name": "car", "color": "#38bdf8"}],
        "images": [
            {
                "id": "img-1", "width": 640, "height": 480,
                "annotations": [
                    {"id": "a1", "label_id": "car", "geometry": {"x": 1, "y": 2, "width": 3, "height": 4}},
                    {"id": "bad", "label_id": "car"}
                ]
            },
            {"id": "img-2", "width": 10, "height": 10}
        ]
    }"##;

    #[test]
    fn test_dump_seeds_service() {
        let dump = ProjectDump::from_json(DUMP).unwrap();
        let project = dump.project.clone();
        let (mut service, images) = dump.into_service();

        assert_eq!(images.len(), 2);
        assert_eq!(images[0].width, 640);
        let fetched = service.fetch_annotations(&ImageId::new("img-1")).unwrap();
        assert_eq!(fetched.len(), 1);
        assert_eq!(fetched[0].version, 1);
        assert!(
            service
                .fetch_annotations(&ImageId::new("img-2"))
                .unwrap()
                .is_empty()
        );
        assert_eq!(service.fetch_labels(&project).unwrap().len(), 1);
    }

    #[test]
    fn test_invalid_dump() {
        for json in ["[]", "null", "42", "\"p1\"", "{not json"] {
            assert!(
                matches!(ProjectDump::from_json(json), Err(SyncError::Decode(_))),
                "accepted {json}"
            );
        }
    }

    #[test]
    fn test_empty_object_is_default_project() {
        let dump = ProjectDump::from_json("{}").unwrap();
        assert_eq!(dump.project, ProjectId::new("default"));
        assert!(dump.labels.is_empty());
        assert!(dump.images.is_empty());
    }
}
