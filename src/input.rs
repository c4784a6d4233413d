//! Input model: modifier keys, mouse buttons, pointer ids, and gesture states.
//!
//! This module defines the types consumed by the board controller. `Modifiers`
//! and `Button` capture the user's intent at the time of a pointer event.
//! `GestureState` is the gesture tracked for one pointer between pointer-down
//! and pointer-up, carrying all context needed to compute positions and to
//! decide on release whether anything must be persisted.

#[cfg(test)]
#[path = "input_test.rs"]
mod input_test;

use crate::camera::Point;
use crate::doc::{Bounds, NoteId};
use crate::hit::ResizeAnchor;

/// Keyboard/mouse modifier keys held during an event.
#[allow(clippy::struct_excessive_bools)]
#[derive(Debug, Clone, Copy, Default)]
pub struct Modifiers {
    pub shift: bool,
    pub ctrl: bool,
    pub alt: bool,
    pub meta: bool,
}

impl Modifiers {
    /// Whether a click should toggle selection instead of starting a drag.
    #[must_use]
    pub fn toggles_selection(self) -> bool {
        self.shift || self.ctrl || self.meta
    }

    /// Whether a wheel event should zoom instead of pan.
    #[must_use]
    pub fn zooms_wheel(self) -> bool {
        self.ctrl || self.meta
    }
}

/// Mouse button identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Button {
    /// Left mouse button (or single-finger tap).
    Primary,
    /// Middle mouse button (scroll wheel click).
    Middle,
    /// Right mouse button (or two-finger tap).
    Secondary,
}

/// Identifier of a pointer (mouse, pen, or touch contact) as reported by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PointerId(pub i32);

/// A keyboard key.
///
/// The inner string holds the key name as reported by the host (e.g. `"Delete"`, `"Escape"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Key(pub String);

impl Key {
    #[must_use]
    pub fn is(&self, name: &str) -> bool {
        self.0 == name
    }
}

/// Wheel / trackpad scroll delta.
#[derive(Debug, Clone, Copy)]
pub struct WheelDelta {
    /// Horizontal scroll amount in pixels.
    pub dx: f64,
    /// Vertical scroll amount in pixels (positive = down).
    pub dy: f64,
}

/// Gesture state for a single pointer.
///
/// `Idle` is never stored: a pointer without an entry in the controller is idle.
/// The committing and cancelled outcomes are transitions back to `Idle`, reported
/// by [`crate::gesture::GestureController`] rather than held as states.
#[derive(Debug, Clone, PartialEq)]
pub enum GestureState {
    /// No gesture in progress; waiting for the next pointer-down.
    Idle,
    /// The user is panning the canvas.
    Panning {
        /// Screen-space position of the previous pointer event.
        last_screen: Point,
    },
    /// The user is moving a note.
    Dragging {
        id: NoteId,
        /// Pointer position minus note origin, in world space.
        grab: Point,
        /// Note origin before the gesture.
        origin: Point,
        /// Stacking order before bring-to-front.
        orig_z: i64,
    },
    /// The user is resizing a note by one of its handles.
    Resizing {
        id: NoteId,
        anchor: ResizeAnchor,
        /// World-space pointer position at the start of the resize.
        start_world: Point,
        /// Note bounds before the gesture.
        orig: Bounds,
        /// Stacking order before bring-to-front.
        orig_z: i64,
    },
}

impl GestureState {
    /// The note this gesture manipulates, if any.
    #[must_use]
    pub fn note_id(&self) -> Option<NoteId> {
        match self {
            Self::Dragging { id, .. } | Self::Resizing { id, .. } => Some(*id),
            Self::Idle | Self::Panning { .. } => None,
        }
    }
}

impl Default for GestureState {
    fn default() -> Self {
        Self::Idle
    }
}
