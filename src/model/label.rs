//! Label data model.
//!
//! Labels are project-scoped categories an annotation points at. Deleting a
//! label never touches the annotations that reference it.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Fixed colour palette handed out round-robin to labels created without a colour.
pub const DEFAULT_PALETTE: [&str; 12] = [
    "#38bdf8", "#f87171", "#4ade80", "#facc15", "#c084fc", "#fb923c", "#2dd4bf", "#f472b6",
    "#818cf8", "#a3e635", "#fbbf24", "#e879f9",
];

/// Colour used when rendering an annotation whose label is unknown.
pub const FALLBACK_COLOR: &str = "#9ca3af";

/// Opaque label identifier issued by the label service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelId(pub String);

impl LabelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LabelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Project identifier, scoping labels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub String);

impl ProjectId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }
}

impl fmt::Display for ProjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A label with a display name and a `#rrggbb` colour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    pub id: LabelId,
    pub name: String,
    pub color: String,
}

impl Label {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: LabelId::new(id),
            name: name.into(),
            color: color.into(),
        }
    }
}

/// Palette colour for the `n`-th label created without an explicit colour.
pub fn palette_color(n: usize) -> &'static str {
    DEFAULT_PALETTE[n % DEFAULT_PALETTE.len()]
}

/// Accepts `#rrggbb` (case-insensitive).
pub fn is_hex_color(color: &str) -> bool {
    color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_wraps() {
        assert_eq!(palette_color(0), "#38bdf8");
        assert_eq!(palette_color(12), "#38bdf8");
        assert_eq!(palette_color(13), "#f87171");
    }

    #[test]
    fn test_hex_color_validation() {
        assert!(is_hex_color("#A3e635"));
        assert!(!is_hex_color("a3e635"));
        assert!(!is_hex_color("#abc"));
        assert!(!is_hex_color("#gggggg"));
        assert!(DEFAULT_PALETTE.iter().all(|c| is_hex_color(c)));
    }
}
