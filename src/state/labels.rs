//! Project label directory.
//!
//! Read-mostly lookup table used while rendering (label colour) and while
//! saving (label must resolve). Removing a label leaves annotations that
//! reference it alone; they render with [`FALLBACK_COLOR`].

use thiserror::Error;

use crate::model::{DEFAULT_PALETTE, FALLBACK_COLOR, Label, LabelId, is_hex_color};

/// Validation failures for label edits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LabelError {
    #[error("label name must not be empty")]
    EmptyName,

    #[error("invalid label colour '{0}', expected #rrggbb")]
    InvalidColor(String),

    #[error("label '{0}' already exists")]
    Duplicate(LabelId),

    #[error("label '{0}' not found")]
    NotFound(LabelId),
}

/// Fields for a label that has not been created yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLabel {
    pub name: String,
    /// `None` picks the next palette colour.
    pub color: Option<String>,
}

impl NewLabel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }
}

/// Ordered label list for the active project.
#[derive(Debug, Clone)]
pub struct LabelDirectory {
    labels: Vec<Label>,
    palette: Vec<String>,
}

impl Default for LabelDirectory {
    fn default() -> Self {
        Self::with_palette(DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect())
    }
}

impl LabelDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory using a custom colour palette. An empty palette falls back
    /// to the built-in one.
    pub fn with_palette(palette: Vec<String>) -> Self {
        let palette = if palette.is_empty() {
            DEFAULT_PALETTE.iter().map(|c| c.to_string()).collect()
        } else {
            palette
        };
        Self {
            labels: Vec::new(),
            palette,
        }
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, id: &LabelId) -> Option<&Label> {
        self.labels.iter().find(|l| &l.id == id)
    }

    pub fn contains(&self, id: &LabelId) -> bool {
        self.get(id).is_some()
    }

    /// Render colour of a label, falling back for unknown ids.
    pub fn color_of(&self, id: &LabelId) -> &str {
        self.get(id).map_or(FALLBACK_COLOR, |l| l.color.as_str())
    }

    /// Label at position `index` (hotkey order).
    pub fn by_index(&self, index: usize) -> Option<&Label> {
        self.labels.get(index)
    }

    /// Position of a label, used as the export class index.
    pub fn index_of(&self, id: &LabelId) -> Option<usize> {
        self.labels.iter().position(|l| &l.id == id)
    }

    /// Colour the next label created without one will get.
    ///
    /// Round-robin continues from the number of labels already present.
    pub fn next_color(&self) -> &str {
        &self.palette[self.labels.len() % self.palette.len()]
    }

    /// Validate a new label and resolve its colour.
    pub fn prepare(&self, new: &NewLabel) -> Result<(String, String), LabelError> {
        let name = new.name.trim();
        if name.is_empty() {
            return Err(LabelError::EmptyName);
        }
        let color = match &new.color {
            Some(color) if !is_hex_color(color) => {
                return Err(LabelError::InvalidColor(color.clone()));
            }
            Some(color) => color.clone(),
            None => self.next_color().to_string(),
        };
        Ok((name.to_string(), color))
    }

    /// Replace the whole directory, as after a fetch.
    pub fn replace_all(&mut self, labels: Vec<Label>) {
        log::debug!("Label directory loaded with {} label(s)", labels.len());
        self.labels = labels;
    }

    /// Add a label that already has an id.
    pub fn insert(&mut self, label: Label) -> Result<(), LabelError> {
        if label.name.trim().is_empty() {
            return Err(LabelError::EmptyName);
        }
        if !is_hex_color(&label.color) {
            return Err(LabelError::InvalidColor(label.color));
        }
        if self.contains(&label.id) {
            return Err(LabelError::Duplicate(label.id));
        }
        log::debug!("Added label '{}' ({})", label.name, label.id);
        self.labels.push(label);
        Ok(())
    }

    /// Rename and/or recolour a label.
    pub fn update(
        &mut self,
        id: &LabelId,
        name: Option<&str>,
        color: Option<&str>,
    ) -> Result<&Label, LabelError> {
        if let Some(name) = name
            && name.trim().is_empty()
        {
            return Err(LabelError::EmptyName);
        }
        if let Some(color) = color
            && !is_hex_color(color)
        {
            return Err(LabelError::InvalidColor(color.to_string()));
        }
        let label = self
            .labels
            .iter_mut()
            .find(|l| &l.id == id)
            .ok_or_else(|| LabelError::NotFound(id.clone()))?;
        if let Some(name) = name {
            label.name = name.trim().to_string();
        }
        if let Some(color) = color {
            label.color = color.to_string();
        }
        Ok(label)
    }

    /// Remove a label. Annotations referencing it are not touched.
    pub fn remove(&mut self, id: &LabelId) -> Option<Label> {
        let index = self.index_of(id)?;
        let label = self.labels.remove(index);
        log::debug!("Removed label '{}' ({})", label.name, label.id);
        Some(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn directory() -> LabelDirectory {
        let mut dir = LabelDirectory::new();
        dir.insert(Label::new("l1", "car", "#38bdf8")).unwrap();
        dir.insert(Label::new("l2", "person", "#f87171")).unwrap();
        dir
    }

    #[test]
    fn test_palette_continues_from_existing_count() {
        let dir = directory();
        assert_eq!(dir.next_color(), DEFAULT_PALETTE[2]);
        let (name, color) = dir.prepare(&NewLabel::new("  bike ")).unwrap();
        assert_eq!(name, "bike");
        assert_eq!(color, DEFAULT_PALETTE[2]);
    }

    #[test]
    fn test_prepare_validates() {
        let dir = directory();
        assert_eq!(dir.prepare(&NewLabel::new("   ")), Err(LabelError::EmptyName));
        assert_eq!(
            dir.prepare(&NewLabel::new("x").with_color("red")),
            Err(LabelError::InvalidColor("red".to_string()))
        );
    }

    #[test]
    fn test_insert_rejects_duplicate() {
        let mut dir = directory();
        let err = dir.insert(Label::new("l1", "again", "#000000")).unwrap_err();
        assert_eq!(err, LabelError::Duplicate(LabelId::new("l1")));
    }

    #[test]
    fn test_unknown_label_uses_fallback_colour() {
        let mut dir = directory();
        assert_eq!(dir.color_of(&LabelId::new("l2")), "#f87171");
        dir.remove(&LabelId::new("l2"));
        assert_eq!(dir.color_of(&LabelId::new("l2")), FALLBACK_COLOR);
    }

    #[test]
    fn test_update_and_index() {
        let mut dir = directory();
        let updated = dir
            .update(&LabelId::new("l2"), Some("pedestrian"), None)
            .unwrap();
        assert_eq!(updated.name, "pedestrian");
        assert_eq!(dir.index_of(&LabelId::new("l2")), Some(1));
        assert_eq!(dir.by_index(0).map(|l| l.name.as_str()), Some("car"));
        assert!(matches!(
            dir.update(&LabelId::new("nope"), Some("x"), None),
            Err(LabelError::NotFound(_))
        ));
    }
}
