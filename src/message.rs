//! Input events delivered to the canvas.
//!
//! Hosts translate their windowing events into these types; positions are
//! always in screen space (viewport pixels).

use crate::geometry::{Handle, Point, Size};
use crate::model::AnnotationId;

/// Modifier keys held during an event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Modifiers {
    pub shift: bool,
    pub alt: bool,
    pub ctrl: bool,
}

impl Modifiers {
    pub const NONE: Modifiers = Modifiers {
        shift: false,
        alt: false,
        ctrl: false,
    };

    pub fn shift() -> Self {
        Self {
            shift: true,
            ..Self::NONE
        }
    }

    pub fn alt() -> Self {
        Self {
            alt: true,
            ..Self::NONE
        }
    }

    pub fn ctrl() -> Self {
        Self {
            ctrl: true,
            ..Self::NONE
        }
    }
}

/// Phase of a pointer event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerKind {
    Down,
    Move,
    Up,
    DoubleClick,
}

/// What the rendering layer found under the pointer.
///
/// Hit-testing belongs to the renderer; when it has no answer the
/// controller falls back to its own geometric test.
#[derive(Debug, Clone, PartialEq)]
pub enum PointerTarget {
    /// Empty canvas.
    Canvas,
    /// The body of an annotation.
    Shape(AnnotationId),
    /// A resize handle of an annotation.
    Handle(AnnotationId, Handle),
    /// Renderer did not resolve a target.
    Unresolved,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PointerEvent {
    pub kind: PointerKind,
    pub position: Point,
    pub modifiers: Modifiers,
    pub target: PointerTarget,
}

impl PointerEvent {
    pub fn new(kind: PointerKind, x: f32, y: f32) -> Self {
        Self {
            kind,
            position: Point::new(x, y),
            modifiers: Modifiers::NONE,
            target: PointerTarget::Unresolved,
        }
    }

    pub fn down(x: f32, y: f32) -> Self {
        Self::new(PointerKind::Down, x, y)
    }

    pub fn moved(x: f32, y: f32) -> Self {
        Self::new(PointerKind::Move, x, y)
    }

    pub fn up(x: f32, y: f32) -> Self {
        Self::new(PointerKind::Up, x, y)
    }

    pub fn double_click(x: f32, y: f32) -> Self {
        Self::new(PointerKind::DoubleClick, x, y)
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn on(mut self, target: PointerTarget) -> Self {
        self.target = target;
        self
    }
}

/// Scroll wheel tick. Negative `delta` scrolls up.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WheelEvent {
    pub position: Point,
    pub delta: f32,
}

impl WheelEvent {
    pub fn new(x: f32, y: f32, delta: f32) -> Self {
        Self {
            position: Point::new(x, y),
            delta,
        }
    }
}

/// Keys the editor reacts to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Key {
    /// A printable character, compared case-insensitively.
    Char(char),
    Delete,
    Backspace,
    Escape,
    Enter,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: Key,
    pub modifiers: Modifiers,
}

impl KeyEvent {
    pub fn new(key: Key) -> Self {
        Self {
            key,
            modifiers: Modifiers::NONE,
        }
    }

    pub fn with_modifiers(mut self, modifiers: Modifiers) -> Self {
        self.modifiers = modifiers;
        self
    }
}

/// Any event routed through the editor session.
#[derive(Debug, Clone, PartialEq)]
pub enum CanvasEvent {
    Pointer(PointerEvent),
    Wheel(WheelEvent),
    Key(KeyEvent),
    /// The viewport was resized.
    Resize(Size),
}

/// What handling an event did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum EventOutcome {
    /// Nothing changed.
    Ignored,
    /// View state changed (viewport, draft, selection); repaint needed.
    Redraw,
    /// The annotation document changed.
    Changed,
}

impl EventOutcome {
    pub fn needs_redraw(self) -> bool {
        self != EventOutcome::Ignored
    }

    /// Combine two outcomes, keeping the stronger one.
    pub fn merge(self, other: EventOutcome) -> EventOutcome {
        self.max(other)
    }
}
