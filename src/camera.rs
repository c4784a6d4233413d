#[cfg(test)]
#[path = "camera_test.rs"]
mod camera_test;

use crate::consts::{MAX_ZOOM, MIN_ZOOM};

/// A point in either screen or world space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    #[must_use]
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn is_finite(self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// Component-wise difference `self - other`.
    #[must_use]
    pub fn sub(self, other: Point) -> Point {
        Point { x: self.x - other.x, y: self.y - other.y }
    }
}

/// Inclusive bounds for the zoom factor.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ZoomLimits {
    pub min: f64,
    pub max: f64,
}

impl Default for ZoomLimits {
    fn default() -> Self {
        Self { min: MIN_ZOOM, max: MAX_ZOOM }
    }
}

impl ZoomLimits {
    #[must_use]
    pub fn clamp(&self, zoom: f64) -> f64 {
        zoom.clamp(self.min, self.max)
    }
}

/// Camera state for pan/zoom on the infinite canvas.
///
/// `pan_x` / `pan_y` are in screen pixels. `zoom` is a scale factor
/// (1.0 = no zoom) that always stays within the camera's [`ZoomLimits`];
/// it is only reachable through [`Camera::zoom`] for that reason.
#[derive(Debug, Clone, Copy)]
pub struct Camera {
    pub pan_x: f64,
    pub pan_y: f64,
    zoom: f64,
    limits: ZoomLimits,
}

impl Default for Camera {
    fn default() -> Self {
        Self::new(ZoomLimits::default())
    }
}

impl Camera {
    /// Identity camera (no pan, zoom 1.0 clamped into `limits`).
    #[must_use]
    pub fn new(limits: ZoomLimits) -> Self {
        Self { pan_x: 0.0, pan_y: 0.0, zoom: limits.clamp(1.0), limits }
    }

    /// Current zoom factor.
    #[must_use]
    pub fn zoom(&self) -> f64 {
        self.zoom
    }

    #[must_use]
    pub fn limits(&self) -> ZoomLimits {
        self.limits
    }

    /// Shift the view by a screen-space delta. The canvas is unbounded.
    pub fn pan(&mut self, dx: f64, dy: f64) {
        if !(dx.is_finite() && dy.is_finite()) {
            return;
        }
        self.pan_x += dx;
        self.pan_y += dy;
    }

    /// Change zoom by `delta`, clamped to the limits. Non-finite input is ignored.
    ///
    /// With a `pivot` (screen point), the pan is corrected so the world point
    /// under the pivot stays under it: `pan' = pivot - (pivot - pan) * (new / old)`.
    pub fn zoom_by(&mut self, delta: f64, pivot: Option<Point>) {
        if !delta.is_finite() || pivot.is_some_and(|p| !p.is_finite()) {
            return;
        }
        let old = self.zoom;
        let new = self.limits.clamp(old + delta);
        if new == old {
            return;
        }
        if let Some(p) = pivot {
            let ratio = new / old;
            self.pan_x = p.x - (p.x - self.pan_x) * ratio;
            self.pan_y = p.y - (p.y - self.pan_y) * ratio;
        }
        self.zoom = new;
    }

    /// Convert a screen-space point (pixels) to world coordinates.
    #[must_use]
    pub fn screen_to_world(&self, screen: Point) -> Point {
        Point {
            x: (screen.x - self.pan_x) / self.zoom,
            y: (screen.y - self.pan_y) / self.zoom,
        }
    }

    /// Convert a world-space point to screen coordinates (pixels).
    #[must_use]
    pub fn world_to_screen(&self, world: Point) -> Point {
        Point {
            x: world.x * self.zoom + self.pan_x,
            y: world.y * self.zoom + self.pan_y,
        }
    }

    /// Convert a screen-space distance (pixels) to world-space distance.
    #[must_use]
    pub fn screen_dist_to_world(&self, screen_dist: f64) -> f64 {
        screen_dist / self.zoom
    }
}
