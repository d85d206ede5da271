//! YOLO label export.
//!
//! YOLO uses one `.txt` file per image plus a `classes.txt` file for label names.
//!
//! # Detection Format (Bounding Boxes)
//!
//! Each line in the label file:
//! ```text
//! <class_id> <x_center> <y_center> <width> <height>
//! ```
//!
//! # Segmentation Format (Polygons)
//!
//! Each line in the label file:
//! ```text
//! <class_id> <x1> <y1> <x2> <y2> ... <xn> <yn>
//! ```
//!
//! All coordinates are normalized to [0, 1] relative to image size and
//! written with six decimals. The class id is the label's position in the
//! label directory.

use std::collections::HashMap;
use std::path::Path;

use super::ExportError;
use crate::geometry::{BoundingBox, Point};
use crate::model::{Annotation, ImageInfo, Label, LabelId, Shape};

/// YOLO format variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum YoloVariant {
    /// Bounding boxes only; polygons are reduced to their bounds.
    #[default]
    Detection,
    /// Polygons keep their vertices; boxes stay boxes.
    Segmentation,
}

/// Files produced by an export, as (relative path, contents).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExportResult {
    pub files: Vec<(String, String)>,
    pub warnings: Vec<String>,
}

impl ExportResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, name: impl Into<String>, contents: String) {
        self.files.push((name.into(), contents));
    }

    pub fn add_warning(&mut self, warning: impl Into<String>) {
        let warning = warning.into();
        log::warn!("Export: {}", warning);
        self.warnings.push(warning);
    }

    pub fn file(&self, name: &str) -> Option<&str> {
        self.files
            .iter()
            .find(|(file, _)| file == name)
            .map(|(_, contents)| contents.as_str())
    }

    /// Write every file under `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path) -> Result<(), ExportError> {
        std::fs::create_dir_all(dir)?;
        for (name, contents) in &self.files {
            std::fs::write(dir.join(name), contents)?;
        }
        log::info!("💾 Wrote {} file(s) to {:?}", self.files.len(), dir);
        Ok(())
    }
}

/// Convert a bounding box to normalized YOLO format (x_center, y_center, width, height).
pub fn bbox_to_yolo(bbox: &BoundingBox, img_width: u32, img_height: u32) -> (f32, f32, f32, f32) {
    let x_center = (bbox.x + bbox.width / 2.0) / img_width as f32;
    let y_center = (bbox.y + bbox.height / 2.0) / img_height as f32;
    let w = bbox.width / img_width as f32;
    let h = bbox.height / img_height as f32;
    (x_center, y_center, w, h)
}

fn normalize_point(p: &Point, width: u32, height: u32) -> (f32, f32) {
    (p.x / width as f32, p.y / height as f32)
}

/// Label file name for an image; path separators in the id are flattened.
pub fn label_file_name(info: &ImageInfo) -> String {
    let stem: String = info
        .id
        .as_str()
        .chars()
        .map(|c| if matches!(c, '/' | '\\') { '_' } else { c })
        .collect();
    format!("{}.txt", stem)
}

#[derive(Debug, Clone, Default)]
pub struct YoloExporter {
    variant: YoloVariant,
    /// Fail on unknown labels instead of skipping the annotation.
    strict: bool,
}

impl YoloExporter {
    pub fn detection() -> Self {
        Self {
            variant: YoloVariant::Detection,
            strict: false,
        }
    }

    pub fn segmentation() -> Self {
        Self {
            variant: YoloVariant::Segmentation,
            strict: false,
        }
    }

    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    pub fn variant(&self) -> YoloVariant {
        self.variant
    }

    /// `classes.txt` contents: one label name per line in directory order.
    pub fn classes_file(labels: &[Label]) -> String {
        labels
            .iter()
            .map(|l| l.name.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn shape_line(&self, class_idx: usize, shape: &Shape, info: &ImageInfo) -> String {
        match (self.variant, shape) {
            (YoloVariant::Segmentation, Shape::Polygon(vertices)) => {
                let coords: Vec<String> = vertices
                    .iter()
                    .map(|p| {
                        let (x, y) = normalize_point(p, info.width, info.height);
                        format!("{:.6} {:.6}", x, y)
                    })
                    .collect();
                format!("{} {}", class_idx, coords.join(" "))
            }
            _ => {
                let (x, y, w, h) = bbox_to_yolo(&shape.bounds(), info.width, info.height);
                format!("{} {:.6} {:.6} {:.6} {:.6}", class_idx, x, y, w, h)
            }
        }
    }

    /// Label lines for one image.
    pub fn label_lines(
        &self,
        info: &ImageInfo,
        annotations: &[Annotation],
        class_index: &HashMap<&LabelId, usize>,
        result: &mut ExportResult,
    ) -> Result<Vec<String>, ExportError> {
        if info.width == 0 || info.height == 0 {
            return Err(ExportError::InvalidImageDimensions {
                image: info.id.clone(),
                width: info.width,
                height: info.height,
            });
        }

        let mut lines = Vec::with_capacity(annotations.len());
        for ann in annotations {
            let Some(&class_idx) = class_index.get(&ann.label_id) else {
                if self.strict {
                    return Err(ExportError::MissingLabel {
                        image: info.id.clone(),
                        annotation: ann.id.to_string(),
                        label: ann.label_id.clone(),
                    });
                }
                result.add_warning(format!(
                    "Skipped annotation {} on {} (unknown label {})",
                    ann.id, info.id, ann.label_id
                ));
                continue;
            };
            lines.push(self.shape_line(class_idx, &ann.shape, info));
        }
        Ok(lines)
    }

    /// Export a set of images: `classes.txt` plus one label file per image.
    pub fn export(
        &self,
        labels: &[Label],
        images: &[(ImageInfo, Vec<Annotation>)],
    ) -> Result<ExportResult, ExportError> {
        let mut result = ExportResult::new();
        result.add_file("classes.txt", Self::classes_file(labels));

        let class_index: HashMap<&LabelId, usize> = labels
            .iter()
            .enumerate()
            .map(|(idx, label)| (&label.id, idx))
            .collect();

        for (info, annotations) in images {
            let lines = self.label_lines(info, annotations, &class_index, &mut result)?;
            log::debug!("Exported {} line(s) for {}", lines.len(), info.id);
            result.add_file(label_file_name(info), lines.join("\n"));
        }

        Ok(result)
    }
}
