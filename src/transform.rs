//! Image-space ↔ screen-space mapping.
//!
//! A [`Viewport`] is a uniform scale plus a 2D offset:
//! `screen = image * scale + offset`. Annotation state never lives here;
//! switching images simply refits the viewport.

use crate::geometry::{Point, Size};

/// Default multiplicative zoom step per wheel tick.
pub const DEFAULT_ZOOM_STEP: f32 = 1.05;

/// Default lower zoom bound.
pub const DEFAULT_MIN_ZOOM: f32 = 0.2;

/// Default upper zoom bound.
pub const DEFAULT_MAX_ZOOM: f32 = 6.0;

/// Direction of a single zoom step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ZoomDirection {
    In,
    Out,
}

impl ZoomDirection {
    /// Map a wheel delta to a direction; scrolling up (negative delta) zooms in.
    pub fn from_wheel_delta(delta: f32) -> Option<Self> {
        if delta < 0.0 {
            Some(ZoomDirection::In)
        } else if delta > 0.0 {
            Some(ZoomDirection::Out)
        } else {
            None
        }
    }
}

/// Zoom step and clamping bounds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub step: f32,
    pub min: f32,
    pub max: f32,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self {
            step: DEFAULT_ZOOM_STEP,
            min: DEFAULT_MIN_ZOOM,
            max: DEFAULT_MAX_ZOOM,
        }
    }
}

/// Current pan/zoom state of the canvas.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    scale: f32,
    offset: Point,
    limits: ZoomLimits,
}

impl Default for Viewport {
    fn default() -> Self {
        Self::new(ZoomLimits::default())
    }
}

impl Viewport {
    /// Identity transform with the given zoom limits.
    pub fn new(limits: ZoomLimits) -> Self {
        Self {
            scale: 1.0,
            offset: Point::default(),
            limits,
        }
    }

    /// Construct with an explicit scale and offset.
    pub fn with_transform(scale: f32, offset: Point, limits: ZoomLimits) -> Self {
        Self {
            scale,
            offset,
            limits,
        }
    }

    pub fn scale(&self) -> f32 {
        self.scale
    }

    pub fn offset(&self) -> Point {
        self.offset
    }

    pub fn limits(&self) -> ZoomLimits {
        self.limits
    }

    /// Fit the whole image inside the viewport and center it.
    ///
    /// Degenerate dimensions leave the transform untouched. The fitted scale
    /// is not clamped to the zoom limits, so a very large image still fits.
    pub fn fit_to_viewport(&mut self, image: Size, viewport: Size) {
        if !image.is_positive() || !viewport.is_positive() {
            log::warn!(
                "Cannot fit image {:?} into viewport {:?}, keeping current transform",
                image,
                viewport
            );
            return;
        }

        let scale = (viewport.width / image.width).min(viewport.height / image.height);
        self.scale = scale;
        self.offset = Point::new(
            (viewport.width - image.width * scale) / 2.0,
            (viewport.height - image.height * scale) / 2.0,
        );
        log::debug!(
            "Fit {}x{} into {}x{}: scale={:.3}, offset=({:.1}, {:.1})",
            image.width,
            image.height,
            viewport.width,
            viewport.height,
            self.scale,
            self.offset.x,
            self.offset.y
        );
    }

    /// Zoom one step around a screen point, keeping the image point under it fixed.
    ///
    /// Only the limit in the direction of travel applies, so a fitted scale
    /// outside the limits never jumps the wrong way. Returns false when the
    /// scale cannot move in the requested direction.
    pub fn zoom_at(&mut self, pointer: Point, direction: ZoomDirection) -> bool {
        let new_scale = match direction {
            ZoomDirection::In => (self.scale * self.limits.step).min(self.limits.max),
            ZoomDirection::Out => (self.scale / self.limits.step).max(self.limits.min),
        };
        let moves_forward = match direction {
            ZoomDirection::In => new_scale > self.scale,
            ZoomDirection::Out => new_scale < self.scale,
        };
        if !moves_forward {
            return false;
        }
        self.zoom_to(pointer, new_scale)
    }

    /// Set an absolute scale, anchored at a screen point.
    pub fn zoom_to(&mut self, pointer: Point, new_scale: f32) -> bool {
        if !new_scale.is_finite() || new_scale <= 0.0 || new_scale == self.scale {
            return false;
        }

        let ratio = new_scale / self.scale;
        self.offset = Point::new(
            pointer.x - (pointer.x - self.offset.x) * ratio,
            pointer.y - (pointer.y - self.offset.y) * ratio,
        );
        self.scale = new_scale;
        log::trace!(
            "Zoom to {:.3}x at ({:.1}, {:.1}), offset=({:.1}, {:.1})",
            self.scale,
            pointer.x,
            pointer.y,
            self.offset.x,
            self.offset.y
        );
        true
    }

    /// Translate the view by a screen-space delta. Unclamped.
    pub fn pan_by(&mut self, dx: f32, dy: f32) {
        self.offset = self.offset.offset(dx, dy);
    }

    pub fn screen_to_image(&self, point: Point) -> Point {
        Point::new(
            (point.x - self.offset.x) / self.scale,
            (point.y - self.offset.y) / self.scale,
        )
    }

    pub fn image_to_screen(&self, point: Point) -> Point {
        Point::new(
            point.x * self.scale + self.offset.x,
            point.y * self.scale + self.offset.y,
        )
    }

    /// Convert an image-space length to screen pixels.
    pub fn to_screen_len(&self, len: f32) -> f32 {
        len * self.scale
    }

    /// Convert a screen-space length to image pixels.
    pub fn to_image_len(&self, len: f32) -> f32 {
        len / self.scale
    }
}
