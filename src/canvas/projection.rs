//! Projection of the annotation set into screen space.
//!
//! A [`Scene`] is what a renderer needs for one frame: every annotation
//! mapped through the viewport, resize handles when they are enabled, and
//! the draft being drawn. Rendering itself lives outside this crate.

use crate::canvas::controller::{Draft, InteractionController};
use crate::geometry::{BoundingBox, Handle, Point};
use crate::message::PointerTarget;
use crate::model::{AnnotationId, Shape};
use crate::state::{AnnotationStore, LabelDirectory};
use crate::transform::Viewport;

/// Screen-space geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum ScreenGeometry {
    Rect(BoundingBox),
    /// Closed polygon.
    Polygon(Vec<Point>),
    /// Open polyline (polygon draft, last point follows the cursor).
    Polyline(Vec<Point>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScreenShape {
    pub id: AnnotationId,
    pub geometry: ScreenGeometry,
    pub color: String,
    pub selected: bool,
    pub is_prediction: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScreenHandle {
    pub handle: Handle,
    pub position: Point,
}

/// Everything to draw for one frame, in render order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Scene {
    pub shapes: Vec<ScreenShape>,
    pub handles: Vec<ScreenHandle>,
    pub draft: Option<ScreenGeometry>,
}

fn project_shape(shape: &Shape, viewport: &Viewport) -> ScreenGeometry {
    match shape {
        Shape::Box(b) => ScreenGeometry::Rect(project_box(b, viewport)),
        Shape::Polygon(vertices) => ScreenGeometry::Polygon(
            vertices.iter().map(|p| viewport.image_to_screen(*p)).collect(),
        ),
    }
}

fn project_box(b: &BoundingBox, viewport: &Viewport) -> BoundingBox {
    let origin = viewport.image_to_screen(Point::new(b.x, b.y));
    BoundingBox::new(
        origin.x,
        origin.y,
        viewport.to_screen_len(b.width),
        viewport.to_screen_len(b.height),
    )
}

impl Scene {
    /// Project the current state. In-progress moves and resizes show their
    /// preview geometry instead of the stored one.
    pub fn build(
        store: &AnnotationStore,
        viewport: &Viewport,
        controller: &InteractionController,
        labels: &LabelDirectory,
    ) -> Self {
        let preview = controller.preview(store);

        let shapes = store
            .annotations()
            .iter()
            .map(|annotation| {
                let shape = match &preview {
                    Some((id, shape)) if *id == annotation.id => shape,
                    _ => &annotation.shape,
                };
                ScreenShape {
                    id: annotation.id.clone(),
                    geometry: project_shape(shape, viewport),
                    color: labels.color_of(&annotation.label_id).to_string(),
                    selected: store.selection().contains(&annotation.id),
                    is_prediction: annotation.is_prediction,
                }
            })
            .collect();

        let handles = InteractionController::handles_enabled(store)
            .and_then(|id| match &preview {
                Some((preview_id, shape)) if preview_id == id => shape.as_box().copied(),
                _ => store.get(id).and_then(|a| a.shape.as_box().copied()),
            })
            .map(|b| {
                b.handles()
                    .into_iter()
                    .map(|(handle, p)| ScreenHandle {
                        handle,
                        position: viewport.image_to_screen(p),
                    })
                    .collect()
            })
            .unwrap_or_default();

        let draft = controller.draft().map(|draft| match draft {
            Draft::Box(b) => ScreenGeometry::Rect(project_box(&b, viewport)),
            Draft::Polygon { vertices, cursor } => ScreenGeometry::Polyline(
                vertices
                    .iter()
                    .chain(cursor.iter())
                    .map(|p| viewport.image_to_screen(*p))
                    .collect(),
            ),
        });

        Self {
            shapes,
            handles,
            draft,
        }
    }
}

/// Geometric hit test at a screen position.
///
/// Resize handles of the single selected box win first, then shapes from
/// topmost (last drawn) down. Anything else is empty canvas.
pub fn hit_test(
    store: &AnnotationStore,
    viewport: &Viewport,
    position: Point,
    handle_radius: f32,
) -> PointerTarget {
    if let Some(id) = InteractionController::handles_enabled(store)
        && let Some(bbox) = store.get(id).and_then(|a| a.shape.as_box())
    {
        let grabbed = bbox
            .handles()
            .into_iter()
            .find(|(_, p)| viewport.image_to_screen(*p).distance_to(&position) <= handle_radius);
        if let Some((handle, _)) = grabbed {
            return PointerTarget::Handle(id.clone(), handle);
        }
    }

    let image_point = viewport.screen_to_image(position);
    store
        .annotations()
        .iter()
        .rev()
        .find(|a| a.shape.contains(&image_point))
        .map_or(PointerTarget::Canvas, |a| PointerTarget::Shape(a.id.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Annotation, Label, LabelId, Tool};

    fn store_with_boxes() -> AnnotationStore {
        let mut store = AnnotationStore::default();
        store.set_annotations(vec![
            Annotation::new(
                AnnotationId::persisted("under"),
                LabelId::new("car"),
                Shape::Box(BoundingBox::new(0.0, 0.0, 100.0, 100.0)),
            ),
            Annotation::new(
                AnnotationId::persisted("over"),
                LabelId::new("gone"),
                Shape::Box(BoundingBox::new(50.0, 50.0, 100.0, 100.0)),
            ),
        ]);
        store
    }

    #[test]
    fn test_hit_test_prefers_topmost() {
        let store = store_with_boxes();
        let vp = Viewport::default();
        assert_eq!(
            hit_test(&store, &vp, Point::new(75.0, 75.0), 6.0),
            PointerTarget::Shape(AnnotationId::persisted("over"))
        );
        assert_eq!(
            hit_test(&store, &vp, Point::new(10.0, 10.0), 6.0),
            PointerTarget::Shape(AnnotationId::persisted("under"))
        );
        assert_eq!(
            hit_test(&store, &vp, Point::new(500.0, 10.0), 6.0),
            PointerTarget::Canvas
        );
    }

    #[test]
    fn test_hit_test_finds_handles_of_selected_box() {
        let mut store = store_with_boxes();
        let vp = Viewport::with_transform(2.0, Point::new(10.0, 10.0), Default::default());
        let id = AnnotationId::persisted("under");
        store.select_annotation(Some(&id), false);
        store.set_active_tool(Tool::Select);

        // Top-left handle of "under" sits at screen (10, 10).
        assert_eq!(
            hit_test(&store, &vp, Point::new(13.0, 12.0), 6.0),
            PointerTarget::Handle(id, Handle::TopLeft)
        );
    }

    #[test]
    fn test_scene_projects_and_colours() {
        let mut store = store_with_boxes();
        store.select_annotation(Some(&AnnotationId::persisted("under")), false);
        let mut labels = LabelDirectory::new();
        labels.insert(Label::new("car", "Car", "#38bdf8")).unwrap();
        let vp = Viewport::with_transform(0.5, Point::new(100.0, 0.0), Default::default());

        let scene = Scene::build(&store, &vp, &InteractionController::default(), &labels);
        assert_eq!(scene.shapes.len(), 2);
        assert_eq!(
            scene.shapes[0].geometry,
            ScreenGeometry::Rect(BoundingBox::new(100.0, 0.0, 50.0, 50.0))
        );
        assert_eq!(scene.shapes[0].color, "#38bdf8");
        assert!(scene.shapes[0].selected);
        assert_eq!(scene.shapes[1].color, crate::model::FALLBACK_COLOR);
        assert_eq!(scene.handles.len(), 8);
        assert!(scene.draft.is_none());
    }

    #[test]
    fn test_scene_hides_handles_for_polygons() {
        let mut store = AnnotationStore::default();
        store.set_annotations(vec![Annotation::new(
            AnnotationId::persisted("p"),
            LabelId::new("car"),
            Shape::Polygon(vec![
                Point::new(0.0, 0.0),
                Point::new(10.0, 0.0),
                Point::new(0.0, 10.0),
            ]),
        )]);
        store.select_annotation(Some(&AnnotationId::persisted("p")), false);
        let scene = Scene::build(
            &store,
            &Viewport::default(),
            &InteractionController::default(),
            &LabelDirectory::new(),
        );
        assert!(scene.handles.is_empty());
    }
}
