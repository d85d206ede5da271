//! Tool state machine for the annotation canvas.
//!
//! The controller owns only transient gesture state (drags, drafts). It
//! reads the active tool and selection from the [`AnnotationStore`] and
//! commits finished gestures through the store's named operations, so each
//! gesture produces at most one history entry.

use crate::canvas::projection::hit_test;
use crate::geometry::{
    BoundingBox, Handle, MIN_POLYGON_VERTICES, Point, closes_polygon, dedup_vertices,
};
use crate::message::{EventOutcome, PointerEvent, PointerKind, PointerTarget, WheelEvent};
use crate::model::{Annotation, AnnotationId, GeometryPatch, Shape, ShapeKind, Tool};
use crate::state::AnnotationStore;
use crate::transform::{Viewport, ZoomDirection};

/// Gesture thresholds, all in screen pixels unless noted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InteractionConfig {
    /// Drawn boxes at or below this size in either dimension are discarded.
    pub min_box_screen_size: f32,
    /// Smallest box side reachable by resizing, in image pixels.
    pub min_resize_size: f32,
    /// Clicking this close to the first vertex closes a polygon.
    pub polygon_close_radius: f32,
    /// Pointer travel before a press on a shape becomes a move.
    pub drag_threshold: f32,
    /// Grab radius of resize handles.
    pub handle_radius: f32,
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            min_box_screen_size: 4.0,
            min_resize_size: 2.0,
            polygon_close_radius: 10.0,
            drag_threshold: 3.0,
            handle_radius: 6.0,
        }
    }
}

/// The pointer gesture in progress.
#[derive(Debug, Clone, PartialEq)]
enum Gesture {
    Idle,
    /// Dragging the viewport; `last` is the previous screen position.
    Panning { last: Point },
    /// Box tool drag, both corners in image space.
    DrawingBox { anchor: Point, current: Point },
    /// Pressed on a shape body, not yet past the drag threshold.
    Pressed {
        id: AnnotationId,
        screen_origin: Point,
        image_origin: Point,
    },
    /// Translating a shape; `delta` is in image space.
    Moving {
        id: AnnotationId,
        image_origin: Point,
        delta: Point,
    },
    /// Dragging a resize handle of a box.
    Resizing {
        id: AnnotationId,
        handle: Handle,
        original: BoundingBox,
        current: BoundingBox,
    },
}

/// Uncommitted shape being drawn, in image space.
#[derive(Debug, Clone, PartialEq)]
pub enum Draft {
    Box(BoundingBox),
    /// Placed vertices plus the hover position for the rubber-band edge.
    Polygon {
        vertices: Vec<Point>,
        cursor: Option<Point>,
    },
}

/// Translates pointer and wheel events into store and viewport commands.
#[derive(Debug, Clone)]
pub struct InteractionController {
    config: InteractionConfig,
    gesture: Gesture,
    /// Polygon vertices survive across pointer events until closed or cancelled.
    polygon_draft: Vec<Point>,
    polygon_cursor: Option<Point>,
}

impl Default for InteractionController {
    fn default() -> Self {
        Self::new(InteractionConfig::default())
    }
}

impl InteractionController {
    pub fn new(config: InteractionConfig) -> Self {
        Self {
            config,
            gesture: Gesture::Idle,
            polygon_draft: Vec::new(),
            polygon_cursor: None,
        }
    }

    pub fn config(&self) -> &InteractionConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: InteractionConfig) {
        self.config = config;
    }

    pub fn is_idle(&self) -> bool {
        self.gesture == Gesture::Idle && self.polygon_draft.is_empty()
    }

    pub fn is_panning(&self) -> bool {
        matches!(self.gesture, Gesture::Panning { .. })
    }

    /// Vertices of the polygon being drawn.
    pub fn polygon_draft(&self) -> &[Point] {
        &self.polygon_draft
    }

    /// The shape being drawn, if any.
    pub fn draft(&self) -> Option<Draft> {
        if let Gesture::DrawingBox { anchor, current } = &self.gesture {
            return Some(Draft::Box(BoundingBox::from_corners(*anchor, *current)));
        }
        if self.polygon_draft.is_empty() {
            None
        } else {
            Some(Draft::Polygon {
                vertices: self.polygon_draft.clone(),
                cursor: self.polygon_cursor,
            })
        }
    }

    /// Live geometry of the shape being moved or resized.
    pub fn preview(&self, store: &AnnotationStore) -> Option<(AnnotationId, Shape)> {
        match &self.gesture {
            Gesture::Moving { id, delta, .. } => {
                let annotation = store.get(id)?;
                Some((id.clone(), annotation.shape.translated(delta.x, delta.y)))
            }
            Gesture::Resizing { id, current, .. } => Some((id.clone(), Shape::Box(*current))),
            _ => None,
        }
    }

    /// Whether resize handles are shown and grabbable: exactly one box is
    /// selected and the select tool is active.
    pub fn handles_enabled(store: &AnnotationStore) -> Option<&AnnotationId> {
        if store.active_tool() != Tool::Select {
            return None;
        }
        let id = store.selection().single()?;
        match store.get(id) {
            Some(annotation) if annotation.kind() == ShapeKind::Box => Some(id),
            _ => None,
        }
    }

    // ========================================================================
    // Tool switching and cancellation
    // ========================================================================

    /// Activate a tool, discarding any gesture or draft in progress.
    pub fn set_tool(&mut self, tool: Tool, store: &mut AnnotationStore) -> EventOutcome {
        let was_busy = !self.is_idle();
        self.reset();
        if store.active_tool() == tool {
            return if was_busy {
                EventOutcome::Redraw
            } else {
                EventOutcome::Ignored
            };
        }
        store.set_active_tool(tool);
        log::debug!("🖌️ Tool: {}", tool.name());
        EventOutcome::Redraw
    }

    /// Drop the gesture and polygon draft without committing.
    pub fn reset(&mut self) {
        if !self.polygon_draft.is_empty() {
            log::debug!(
                "❌ Discarded polygon draft with {} vertices",
                self.polygon_draft.len()
            );
        }
        self.gesture = Gesture::Idle;
        self.polygon_draft.clear();
        self.polygon_cursor = None;
    }

    /// Escape: cancel the gesture or draft, otherwise clear the selection.
    pub fn cancel(&mut self, store: &mut AnnotationStore) -> EventOutcome {
        if !self.is_idle() {
            self.reset();
            return EventOutcome::Redraw;
        }
        if store.selection().is_empty() {
            return EventOutcome::Ignored;
        }
        store.select_annotation(None, false);
        EventOutcome::Redraw
    }

    // ========================================================================
    // Event handling
    // ========================================================================

    /// Wheel always zooms around the pointer, whatever the tool.
    pub fn handle_wheel(&mut self, event: &WheelEvent, viewport: &mut Viewport) -> EventOutcome {
        let Some(direction) = ZoomDirection::from_wheel_delta(event.delta) else {
            return EventOutcome::Ignored;
        };
        if viewport.zoom_at(event.position, direction) {
            EventOutcome::Redraw
        } else {
            EventOutcome::Ignored
        }
    }

    pub fn handle_pointer(
        &mut self,
        event: &PointerEvent,
        store: &mut AnnotationStore,
        viewport: &mut Viewport,
    ) -> EventOutcome {
        // An active drag owns the pointer until release, regardless of tool.
        match event.kind {
            PointerKind::Move => return self.on_move(event, store, viewport),
            PointerKind::Up => return self.on_up(event, store, viewport),
            PointerKind::Down | PointerKind::DoubleClick => {}
        }

        if event.kind == PointerKind::Down
            && (event.modifiers.alt || store.active_tool() == Tool::Pan)
        {
            self.gesture = Gesture::Panning {
                last: event.position,
            };
            return EventOutcome::Ignored;
        }

        match (store.active_tool(), event.kind) {
            (Tool::Select, PointerKind::Down) => self.select_down(event, store, viewport),
            (Tool::Box, PointerKind::Down) => {
                let anchor = viewport.screen_to_image(event.position);
                self.gesture = Gesture::DrawingBox {
                    anchor,
                    current: anchor,
                };
                log::trace!("✏️ Started box at ({:.1}, {:.1})", anchor.x, anchor.y);
                EventOutcome::Redraw
            }
            (Tool::Polygon, PointerKind::Down) => self.polygon_down(event, store, viewport),
            (Tool::Polygon, PointerKind::DoubleClick) => self.close_polygon(store, viewport),
            _ => EventOutcome::Ignored,
        }
    }

    fn resolve_target(
        &self,
        event: &PointerEvent,
        store: &AnnotationStore,
        viewport: &Viewport,
    ) -> PointerTarget {
        match &event.target {
            PointerTarget::Unresolved => {
                hit_test(store, viewport, event.position, self.config.handle_radius)
            }
            target => target.clone(),
        }
    }

    fn select_down(
        &mut self,
        event: &PointerEvent,
        store: &mut AnnotationStore,
        viewport: &Viewport,
    ) -> EventOutcome {
        let image_point = viewport.screen_to_image(event.position);
        match self.resolve_target(event, store, viewport) {
            PointerTarget::Handle(id, handle) => {
                let Some(original) = Self::handles_enabled(store)
                    .filter(|selected| **selected == id)
                    .and_then(|selected| store.get(selected))
                    .and_then(|a| a.shape.as_box().copied())
                else {
                    return EventOutcome::Ignored;
                };
                self.gesture = Gesture::Resizing {
                    id,
                    handle,
                    original,
                    current: original,
                };
                EventOutcome::Ignored
            }
            PointerTarget::Shape(id) => {
                if !store.contains(&id) {
                    return EventOutcome::Ignored;
                }
                if event.modifiers.shift {
                    store.select_annotation(Some(&id), true);
                    return EventOutcome::Redraw;
                }
                let changed = store.selection().single() != Some(&id);
                store.select_annotation(Some(&id), false);
                self.gesture = Gesture::Pressed {
                    id,
                    screen_origin: event.position,
                    image_origin: image_point,
                };
                if changed {
                    EventOutcome::Redraw
                } else {
                    EventOutcome::Ignored
                }
            }
            PointerTarget::Canvas | PointerTarget::Unresolved => {
                if store.selection().is_empty() {
                    EventOutcome::Ignored
                } else {
                    store.select_annotation(None, false);
                    EventOutcome::Redraw
                }
            }
        }
    }

    fn polygon_down(
        &mut self,
        event: &PointerEvent,
        store: &mut AnnotationStore,
        viewport: &Viewport,
    ) -> EventOutcome {
        // Alt never gets here; it is routed to the pan overlay.
        if event.modifiers.shift || event.modifiers.ctrl {
            log::trace!("Ignoring modified press in polygon tool");
            return EventOutcome::Ignored;
        }
        if let Some(first) = self.polygon_draft.first()
            && self.polygon_draft.len() >= MIN_POLYGON_VERTICES
            && closes_polygon(
                &viewport.image_to_screen(*first),
                &event.position,
                self.config.polygon_close_radius,
            )
        {
            return self.close_polygon(store, viewport);
        }

        let vertex = viewport.screen_to_image(event.position);
        self.polygon_draft.push(vertex);
        log::trace!(
            "✏️ Polygon vertex at ({:.1}, {:.1}), total: {}",
            vertex.x,
            vertex.y,
            self.polygon_draft.len()
        );
        EventOutcome::Redraw
    }

    /// Commit the polygon draft (double-click, Enter, or click on the first vertex).
    ///
    /// Consecutive duplicate vertices are collapsed first. Fewer than three
    /// remaining vertices rejects the commit and keeps the draft.
    pub fn close_polygon(&mut self, store: &mut AnnotationStore, viewport: &Viewport) -> EventOutcome {
        if self.polygon_draft.is_empty() {
            return EventOutcome::Ignored;
        }
        let vertices = dedup_vertices(&self.polygon_draft, viewport.to_image_len(1.0));
        if vertices.len() < MIN_POLYGON_VERTICES {
            log::debug!(
                "📝 Polygon needs at least 3 vertices, currently has {}",
                vertices.len()
            );
            self.polygon_draft = vertices;
            return EventOutcome::Redraw;
        }

        self.polygon_draft.clear();
        self.polygon_cursor = None;
        if self.commit(store, Shape::Polygon(vertices)) {
            EventOutcome::Changed
        } else {
            EventOutcome::Redraw
        }
    }

    fn on_move(
        &mut self,
        event: &PointerEvent,
        store: &AnnotationStore,
        viewport: &mut Viewport,
    ) -> EventOutcome {
        let image_point = viewport.screen_to_image(event.position);
        match &mut self.gesture {
            Gesture::Idle => {
                if self.polygon_draft.is_empty() {
                    EventOutcome::Ignored
                } else {
                    self.polygon_cursor = Some(image_point);
                    EventOutcome::Redraw
                }
            }
            Gesture::Panning { last } => {
                let delta = event.position.delta(last);
                *last = event.position;
                viewport.pan_by(delta.x, delta.y);
                EventOutcome::Redraw
            }
            Gesture::DrawingBox { current, .. } => {
                *current = image_point;
                EventOutcome::Redraw
            }
            Gesture::Pressed {
                id,
                screen_origin,
                image_origin,
            } => {
                if screen_origin.distance_to(&event.position) < self.config.drag_threshold {
                    return EventOutcome::Ignored;
                }
                let (id, image_origin) = (id.clone(), *image_origin);
                self.gesture = Gesture::Moving {
                    id,
                    image_origin,
                    delta: image_point.delta(&image_origin),
                };
                EventOutcome::Redraw
            }
            Gesture::Moving {
                image_origin,
                delta,
                ..
            } => {
                *delta = image_point.delta(image_origin);
                EventOutcome::Redraw
            }
            Gesture::Resizing {
                id,
                handle,
                original,
                current,
            } => {
                if !store.contains(id) {
                    return EventOutcome::Ignored;
                }
                *current =
                    original.resize_from_handle(*handle, image_point, self.config.min_resize_size);
                EventOutcome::Redraw
            }
        }
    }

    fn on_up(
        &mut self,
        event: &PointerEvent,
        store: &mut AnnotationStore,
        viewport: &Viewport,
    ) -> EventOutcome {
        let gesture = std::mem::replace(&mut self.gesture, Gesture::Idle);
        match gesture {
            Gesture::Idle | Gesture::Panning { .. } | Gesture::Pressed { .. } => {
                EventOutcome::Ignored
            }
            Gesture::DrawingBox { anchor, .. } => {
                let current = viewport.screen_to_image(event.position);
                let bbox = BoundingBox::from_corners(anchor, current);
                let min = self.config.min_box_screen_size;
                if viewport.to_screen_len(bbox.width) <= min
                    || viewport.to_screen_len(bbox.height) <= min
                {
                    log::debug!(
                        "📝 Discarded box {:.1}x{:.1} below minimum size",
                        bbox.width,
                        bbox.height
                    );
                    return EventOutcome::Redraw;
                }
                if self.commit(store, Shape::Box(bbox)) {
                    EventOutcome::Changed
                } else {
                    EventOutcome::Redraw
                }
            }
            Gesture::Moving { id, delta, .. } => {
                let patch = GeometryPatch::Translate {
                    dx: delta.x,
                    dy: delta.y,
                };
                if store.update_annotation_geometry(&id, &patch) {
                    log::debug!("✅ Moved {} by ({:.1}, {:.1})", id, delta.x, delta.y);
                    EventOutcome::Changed
                } else {
                    EventOutcome::Redraw
                }
            }
            Gesture::Resizing {
                id,
                original,
                current,
                ..
            } => {
                if current == original {
                    return EventOutcome::Ignored;
                }
                let patch = GeometryPatch::replace_with(&Shape::Box(current));
                if store.update_annotation_geometry(&id, &patch) {
                    log::debug!("✅ Resized {} to {:.1}x{:.1}", id, current.width, current.height);
                    EventOutcome::Changed
                } else {
                    EventOutcome::Redraw
                }
            }
        }
    }

    /// Add a drawn shape under the active label.
    fn commit(&mut self, store: &mut AnnotationStore, shape: Shape) -> bool {
        let Some(label) = store.active_label().cloned() else {
            log::warn!("No active label, discarding drawn {:?}", shape.kind());
            return false;
        };
        let id = store.allocate_local_id();
        let kind = shape.kind();
        let added = store.add_annotation(Annotation::new(id.clone(), label.clone(), shape));
        if added {
            log::info!("✅ Created {:?} annotation {} (label={})", kind, id, label);
        }
        added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{Modifiers, PointerEvent};
    use crate::model::LabelId;

    const EPSILON: f32 = 0.001;

    fn setup(tool: Tool) -> (InteractionController, AnnotationStore, Viewport) {
        let mut store = AnnotationStore::default();
        store.set_active_tool(tool);
        store.set_active_label(Some(LabelId::new("car")));
        (InteractionController::default(), store, Viewport::default())
    }

    fn drag(
        ctl: &mut InteractionController,
        store: &mut AnnotationStore,
        vp: &mut Viewport,
        from: (f32, f32),
        to: (f32, f32),
    ) -> EventOutcome {
        ctl.handle_pointer(&PointerEvent::down(from.0, from.1), store, vp);
        ctl.handle_pointer(&PointerEvent::moved(to.0, to.1), store, vp);
        ctl.handle_pointer(&PointerEvent::up(to.0, to.1), store, vp)
    }

    fn click(
        ctl: &mut InteractionController,
        store: &mut AnnotationStore,
        vp: &mut Viewport,
        x: f32,
        y: f32,
    ) -> EventOutcome {
        let out = ctl.handle_pointer(&PointerEvent::down(x, y), store, vp);
        ctl.handle_pointer(&PointerEvent::up(x, y), store, vp);
        out
    }

    #[test]
    fn test_box_normalizes_drag_direction() {
        let (mut ctl, mut store, mut vp) = setup(Tool::Box);
        let out = drag(&mut ctl, &mut store, &mut vp, (50.0, 60.0), (10.0, 20.0));
        assert_eq!(out, EventOutcome::Changed);
        let bbox = *store.annotations()[0].shape.as_box().unwrap();
        assert_eq!(bbox, BoundingBox::new(10.0, 20.0, 40.0, 40.0));
        assert!(store.annotations()[0].is_local());
    }

    #[test]
    fn test_small_box_is_discarded() {
        let (mut ctl, mut store, mut vp) = setup(Tool::Box);
        drag(&mut ctl, &mut store, &mut vp, (0.0, 0.0), (3.0, 10.0));
        assert!(store.is_empty());
        assert_eq!(store.undo_count(), 0);
    }

    #[test]
    fn test_box_threshold_uses_screen_space() {
        let (mut ctl, mut store, _) = setup(Tool::Box);
        // At 2x zoom a 3px image-space box is 6 screen px and survives.
        let mut vp = Viewport::with_transform(2.0, Point::default(), Default::default());
        drag(&mut ctl, &mut store, &mut vp, (0.0, 0.0), (6.0, 6.0));
        assert_eq!(store.len(), 1);
        let bbox = store.annotations()[0].shape.bounds();
        assert!((bbox.width - 3.0).abs() < EPSILON);
    }

    #[test]
    fn test_no_active_label_discards_box() {
        let (mut ctl, mut store, mut vp) = setup(Tool::Box);
        store.set_active_label(None);
        drag(&mut ctl, &mut store, &mut vp, (0.0, 0.0), (40.0, 40.0));
        assert!(store.is_empty());
    }

    #[test]
    fn test_polygon_two_vertices_rejected_three_accepted() {
        let (mut ctl, mut store, mut vp) = setup(Tool::Polygon);
        click(&mut ctl, &mut store, &mut vp, 0.0, 0.0);
        click(&mut ctl, &mut store, &mut vp, 100.0, 0.0);
        assert_eq!(ctl.close_polygon(&mut store, &vp), EventOutcome::Redraw);
        assert!(store.is_empty());
        assert_eq!(ctl.polygon_draft().len(), 2);

        click(&mut ctl, &mut store, &mut vp, 100.0, 100.0);
        assert_eq!(ctl.close_polygon(&mut store, &vp), EventOutcome::Changed);
        assert_eq!(store.len(), 1);
        assert_eq!(store.annotations()[0].kind(), ShapeKind::Polygon);
        assert!(ctl.polygon_draft().is_empty());
    }

    #[test]
    fn test_polygon_ignores_modified_presses() {
        let (mut ctl, mut store, mut vp) = setup(Tool::Polygon);
        click(&mut ctl, &mut store, &mut vp, 0.0, 0.0);
        for modifiers in [Modifiers::shift(), Modifiers::ctrl()] {
            let press = PointerEvent::down(40.0, 40.0).with_modifiers(modifiers);
            assert_eq!(
                ctl.handle_pointer(&press, &mut store, &mut vp),
                EventOutcome::Ignored
            );
        }
        assert_eq!(ctl.polygon_draft().len(), 1);
    }

    #[test]
    fn test_double_click_closes_polygon_without_duplicate_vertex() {
        let (mut ctl, mut store, mut vp) = setup(Tool::Polygon);
        click(&mut ctl, &mut store, &mut vp, 0.0, 0.0);
        click(&mut ctl, &mut store, &mut vp, 50.0, 0.0);
        click(&mut ctl, &mut store, &mut vp, 50.0, 50.0);
        // Second press of the double-click lands on the same spot.
        click(&mut ctl, &mut store, &mut vp, 50.0, 50.0);
        ctl.handle_pointer(&PointerEvent::double_click(50.0, 50.0), &mut store, &mut vp);

        let Shape::Polygon(vertices) = &store.annotations()[0].shape else {
            panic!("expected polygon");
        };
        assert_eq!(vertices.len(), 3);
    }

    #[test]
    fn test_click_near_first_vertex_closes() {
        let (mut ctl, mut store, mut vp) = setup(Tool::Polygon);
        click(&mut ctl, &mut store, &mut vp, 10.0, 10.0);
        click(&mut ctl, &mut store, &mut vp, 80.0, 10.0);
        click(&mut ctl, &mut store, &mut vp, 80.0, 80.0);
        let out = click(&mut ctl, &mut store, &mut vp, 14.0, 13.0);
        assert_eq!(out, EventOutcome::Changed);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_switching_tool_discards_polygon_draft() {
        let (mut ctl, mut store, mut vp) = setup(Tool::Polygon);
        click(&mut ctl, &mut store, &mut vp, 0.0, 0.0);
        click(&mut ctl, &mut store, &mut vp, 10.0, 0.0);
        ctl.set_tool(Tool::Select, &mut store);
        assert!(ctl.polygon_draft().is_empty());
        assert!(ctl.draft().is_none());

        ctl.set_tool(Tool::Polygon, &mut store);
        click(&mut ctl, &mut store, &mut vp, 50.0, 50.0);
        assert_eq!(ctl.polygon_draft().len(), 1);
    }

    #[test]
    fn test_select_click_and_drag_moves_once() {
        let (mut ctl, mut store, mut vp) = setup(Tool::Box);
        drag(&mut ctl, &mut store, &mut vp, (10.0, 10.0), (50.0, 50.0));
        ctl.set_tool(Tool::Select, &mut store);
        let undo_before = store.undo_count();

        ctl.handle_pointer(&PointerEvent::down(20.0, 20.0), &mut store, &mut vp);
        assert_eq!(store.selection().len(), 1);
        ctl.handle_pointer(&PointerEvent::moved(25.0, 22.0), &mut store, &mut vp);
        ctl.handle_pointer(&PointerEvent::moved(30.0, 25.0), &mut store, &mut vp);
        assert!(ctl.preview(&store).is_some());
        let out = ctl.handle_pointer(&PointerEvent::up(30.0, 25.0), &mut store, &mut vp);

        assert_eq!(out, EventOutcome::Changed);
        assert_eq!(store.undo_count(), undo_before + 1);
        assert_eq!(
            *store.annotations()[0].shape.as_box().unwrap(),
            BoundingBox::new(20.0, 15.0, 40.0, 40.0)
        );
    }

    #[test]
    fn test_click_below_drag_threshold_does_not_move() {
        let (mut ctl, mut store, mut vp) = setup(Tool::Box);
        drag(&mut ctl, &mut store, &mut vp, (10.0, 10.0), (50.0, 50.0));
        ctl.set_tool(Tool::Select, &mut store);
        let before = store.snapshot();
        drag(&mut ctl, &mut store, &mut vp, (20.0, 20.0), (21.0, 21.0));
        assert_eq!(store.snapshot(), before);
    }

    #[test]
    fn test_click_on_canvas_clears_selection() {
        let (mut ctl, mut store, mut vp) = setup(Tool::Box);
        drag(&mut ctl, &mut store, &mut vp, (10.0, 10.0), (50.0, 50.0));
        ctl.set_tool(Tool::Select, &mut store);
        click(&mut ctl, &mut store, &mut vp, 20.0, 20.0);
        assert_eq!(store.selection().len(), 1);
        click(&mut ctl, &mut store, &mut vp, 300.0, 300.0);
        assert!(store.selection().is_empty());
    }

    #[test]
    fn test_shift_click_toggles_selection() {
        let (mut ctl, mut store, mut vp) = setup(Tool::Box);
        drag(&mut ctl, &mut store, &mut vp, (10.0, 10.0), (50.0, 50.0));
        drag(&mut ctl, &mut store, &mut vp, (100.0, 10.0), (150.0, 50.0));
        ctl.set_tool(Tool::Select, &mut store);

        click(&mut ctl, &mut store, &mut vp, 20.0, 20.0);
        let shift = PointerEvent::down(120.0, 20.0).with_modifiers(Modifiers::shift());
        ctl.handle_pointer(&shift, &mut store, &mut vp);
        assert_eq!(store.selection().len(), 2);
        ctl.handle_pointer(&shift, &mut store, &mut vp);
        assert_eq!(store.selection().len(), 1);
    }

    #[test]
    fn test_resize_clamps_minimum_and_never_flips() {
        let (mut ctl, mut store, mut vp) = setup(Tool::Box);
        drag(&mut ctl, &mut store, &mut vp, (10.0, 10.0), (50.0, 50.0));
        ctl.set_tool(Tool::Select, &mut store);
        click(&mut ctl, &mut store, &mut vp, 20.0, 20.0);
        assert!(InteractionController::handles_enabled(&store).is_some());

        // Drag the bottom-right handle far past the top-left corner.
        drag(&mut ctl, &mut store, &mut vp, (50.0, 50.0), (-100.0, -100.0));
        let bbox = *store.annotations()[0].shape.as_box().unwrap();
        assert_eq!(bbox.x, 10.0);
        assert_eq!(bbox.y, 10.0);
        assert!((bbox.width - 2.0).abs() < EPSILON);
        assert!((bbox.height - 2.0).abs() < EPSILON);
    }

    #[test]
    fn test_handles_disabled_for_multi_selection_and_other_tools() {
        let (mut ctl, mut store, mut vp) = setup(Tool::Box);
        drag(&mut ctl, &mut store, &mut vp, (10.0, 10.0), (50.0, 50.0));
        drag(&mut ctl, &mut store, &mut vp, (100.0, 10.0), (150.0, 50.0));
        ctl.set_tool(Tool::Select, &mut store);
        click(&mut ctl, &mut store, &mut vp, 20.0, 20.0);
        assert!(InteractionController::handles_enabled(&store).is_some());

        store.select_all();
        assert!(InteractionController::handles_enabled(&store).is_none());

        click(&mut ctl, &mut store, &mut vp, 20.0, 20.0);
        store.set_active_tool(Tool::Pan);
        assert!(InteractionController::handles_enabled(&store).is_none());
    }

    #[test]
    fn test_pan_tool_and_alt_overlay() {
        let (mut ctl, mut store, mut vp) = setup(Tool::Pan);
        drag(&mut ctl, &mut store, &mut vp, (0.0, 0.0), (30.0, -10.0));
        assert_eq!(vp.offset(), Point::new(30.0, -10.0));

        ctl.set_tool(Tool::Box, &mut store);
        let down = PointerEvent::down(0.0, 0.0).with_modifiers(Modifiers::alt());
        ctl.handle_pointer(&down, &mut store, &mut vp);
        ctl.handle_pointer(&PointerEvent::moved(10.0, 10.0), &mut store, &mut vp);
        ctl.handle_pointer(&PointerEvent::up(10.0, 10.0), &mut store, &mut vp);
        assert_eq!(vp.offset(), Point::new(40.0, 0.0));
        assert!(store.is_empty());
    }

    #[test]
    fn test_wheel_zooms_in_any_tool() {
        for tool in Tool::all() {
            let (mut ctl, _, mut vp) = setup(*tool);
            let out = ctl.handle_wheel(&WheelEvent::new(100.0, 100.0, -1.0), &mut vp);
            assert_eq!(out, EventOutcome::Redraw);
            assert!(vp.scale() > 1.0);
        }
    }

    #[test]
    fn test_escape_cancels_draft_then_selection() {
        let (mut ctl, mut store, mut vp) = setup(Tool::Polygon);
        click(&mut ctl, &mut store, &mut vp, 0.0, 0.0);
        assert_eq!(ctl.cancel(&mut store), EventOutcome::Redraw);
        assert!(ctl.polygon_draft().is_empty());
        assert_eq!(ctl.cancel(&mut store), EventOutcome::Ignored);
    }

    #[test]
    fn test_renderer_target_overrides_geometry() {
        let (mut ctl, mut store, mut vp) = setup(Tool::Box);
        drag(&mut ctl, &mut store, &mut vp, (10.0, 10.0), (50.0, 50.0));
        ctl.set_tool(Tool::Select, &mut store);
        let id = store.annotations()[0].id.clone();

        // Renderer says canvas even though the point is inside the box.
        let down = PointerEvent::down(20.0, 20.0).on(PointerTarget::Canvas);
        ctl.handle_pointer(&down, &mut store, &mut vp);
        assert!(store.selection().is_empty());

        let down = PointerEvent::down(500.0, 500.0).on(PointerTarget::Shape(id.clone()));
        ctl.handle_pointer(&down, &mut store, &mut vp);
        assert!(store.selection().contains(&id));
    }
}
