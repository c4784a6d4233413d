//! Drag/resize/pan gesture controller.
//!
//! Each pointer runs its own state machine: Idle → Dragging | Resizing | Panning
//! → Idle. Moves mutate the registry (or camera) directly; nothing touches the
//! network here. On release the controller only reports whether the note's
//! geometry actually changed, so a click without displacement never turns into
//! a write. Cancellation restores the pre-gesture geometry.

#[cfg(test)]
#[path = "gesture_test.rs"]
mod gesture_test;

use std::collections::HashMap;

use tracing::debug;

use crate::camera::{Camera, Point};
use crate::consts::{MIN_NOTE_HEIGHT, MIN_NOTE_WIDTH};
use crate::doc::{NoteId, NoteRegistry};
use crate::hit::ResizeAnchor;
use crate::input::{GestureState, PointerId};

/// Minimum note size enforced while resizing.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SizeLimits {
    pub min_width: f64,
    pub min_height: f64,
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self { min_width: MIN_NOTE_WIDTH, min_height: MIN_NOTE_HEIGHT }
    }
}

/// How a gesture ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureEnd {
    /// No gesture was active for the pointer.
    None,
    /// The gesture ended without a geometry change (a pan, or a click in place).
    Released { id: Option<NoteId> },
    /// The note's geometry changed and must be committed.
    Commit { id: NoteId },
    /// The gesture was aborted and the note restored.
    Cancelled { id: Option<NoteId> },
}

/// Tracks the active gesture of every pointer.
#[derive(Debug, Default)]
pub struct GestureController {
    active: HashMap<PointerId, GestureState>,
}

impl GestureController {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current state of `pointer`; `Idle` when nothing is tracked.
    #[must_use]
    pub fn state(&self, pointer: PointerId) -> &GestureState {
        const IDLE: GestureState = GestureState::Idle;
        self.active.get(&pointer).unwrap_or(&IDLE)
    }

    /// Whether any pointer is currently dragging or resizing `id`.
    #[must_use]
    pub fn is_manipulating(&self, id: NoteId) -> bool {
        self.active.values().any(|g| g.note_id() == Some(id))
    }

    /// Number of pointers with an active gesture.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Start panning with `pointer`.
    pub fn begin_pan(&mut self, pointer: PointerId, screen: Point) {
        self.active.insert(pointer, GestureState::Panning { last_screen: screen });
    }

    /// Start dragging note `id`. Brings the note to the front.
    ///
    /// Returns false (and stays idle) when the note is missing, locked, or
    /// already held by another pointer. Capability checks belong to the caller.
    pub fn begin_drag(&mut self, pointer: PointerId, id: NoteId, pointer_world: Point, notes: &mut NoteRegistry) -> bool {
        if self.active.contains_key(&pointer) || self.is_manipulating(id) || !is_movable(id, notes) {
            return false;
        }
        let Some(orig_z) = bring_to_front(id, notes) else {
            return false;
        };
        let Some(note) = notes.get(id) else {
            return false;
        };
        let origin = Point::new(note.x, note.y);
        let grab = pointer_world.sub(origin);
        debug!(%id, x = origin.x, y = origin.y, "drag started");
        self.active.insert(pointer, GestureState::Dragging { id, grab, origin, orig_z });
        true
    }

    /// Start resizing note `id` from `anchor`. Brings the note to the front.
    pub fn begin_resize(
        &mut self,
        pointer: PointerId,
        id: NoteId,
        anchor: ResizeAnchor,
        pointer_world: Point,
        notes: &mut NoteRegistry,
    ) -> bool {
        if self.active.contains_key(&pointer) || self.is_manipulating(id) || !is_movable(id, notes) {
            return false;
        }
        let Some(orig_z) = bring_to_front(id, notes) else {
            return false;
        };
        let Some(note) = notes.get(id) else {
            return false;
        };
        let orig = note.bounds();
        debug!(%id, ?anchor, "resize started");
        self.active.insert(pointer, GestureState::Resizing { id, anchor, start_world: pointer_world, orig, orig_z });
        true
    }

    /// Advance the gesture of `pointer`. Returns true when something visible changed.
    pub fn pointer_move(
        &mut self,
        pointer: PointerId,
        screen: Point,
        camera: &mut Camera,
        notes: &mut NoteRegistry,
        limits: SizeLimits,
    ) -> bool {
        let Some(state) = self.active.get_mut(&pointer) else {
            return false;
        };
        match state {
            GestureState::Idle => false,
            GestureState::Panning { last_screen } => {
                camera.pan(screen.x - last_screen.x, screen.y - last_screen.y);
                *last_screen = screen;
                true
            }
            GestureState::Dragging { id, grab, .. } => {
                let Some(note) = notes.get_mut(*id) else {
                    return false;
                };
                let pos = camera.screen_to_world(screen).sub(*grab);
                note.x = pos.x;
                note.y = pos.y;
                true
            }
            GestureState::Resizing { id, anchor, start_world, orig, .. } => {
                let Some(note) = notes.get_mut(*id) else {
                    return false;
                };
                let d = camera.screen_to_world(screen).sub(*start_world);
                let mut left = orig.x;
                let mut right = orig.right();
                let mut top = orig.y;
                let mut bottom = orig.bottom();
                if anchor.moves_left() {
                    left = (orig.x + d.x).min(right - limits.min_width);
                }
                if anchor.moves_right() {
                    right = (orig.right() + d.x).max(left + limits.min_width);
                }
                if anchor.moves_top() {
                    top = (orig.y + d.y).min(bottom - limits.min_height);
                }
                if anchor.moves_bottom() {
                    bottom = (orig.bottom() + d.y).max(top + limits.min_height);
                }
                note.x = left;
                note.y = top;
                note.width = right - left;
                note.height = bottom - top;
                true
            }
        }
    }

    /// Finish the gesture of `pointer` and report whether a commit is due.
    ///
    /// A note released in place drops back to its original stacking.
    #[allow(clippy::float_cmp)]
    pub fn pointer_up(&mut self, pointer: PointerId, notes: &mut NoteRegistry) -> GestureEnd {
        let Some(state) = self.active.remove(&pointer) else {
            return GestureEnd::None;
        };
        match state {
            GestureState::Idle | GestureState::Panning { .. } => GestureEnd::Released { id: None },
            GestureState::Dragging { id, origin, orig_z, .. } => match notes.get_mut(id) {
                Some(note) if note.x != origin.x || note.y != origin.y => GestureEnd::Commit { id },
                Some(note) => {
                    note.z_index = orig_z;
                    GestureEnd::Released { id: Some(id) }
                }
                None => GestureEnd::None,
            },
            GestureState::Resizing { id, orig, orig_z, .. } => match notes.get_mut(id) {
                Some(note) if note.bounds() != orig => GestureEnd::Commit { id },
                Some(note) => {
                    note.z_index = orig_z;
                    GestureEnd::Released { id: Some(id) }
                }
                None => GestureEnd::None,
            },
        }
    }

    /// Abort the gesture of `pointer`, restoring the note's pre-gesture geometry and stacking.
    pub fn cancel(&mut self, pointer: PointerId, notes: &mut NoteRegistry) -> GestureEnd {
        let Some(state) = self.active.remove(&pointer) else {
            return GestureEnd::None;
        };
        let id = state.note_id();
        restore(&state, notes);
        if let Some(id) = id {
            debug!(%id, "gesture cancelled");
        }
        GestureEnd::Cancelled { id }
    }

    /// Abort every active gesture. Returns the ids of notes that were restored.
    pub fn cancel_all(&mut self, notes: &mut NoteRegistry) -> Vec<NoteId> {
        let mut ids = Vec::new();
        for (_, state) in self.active.drain() {
            restore(&state, notes);
            ids.extend(state.note_id());
        }
        ids
    }

    /// Drop any gesture on `id` without touching the registry (the note is gone).
    pub fn forget_note(&mut self, id: NoteId) {
        self.active.retain(|_, g| g.note_id() != Some(id));
    }

    /// Point gestures on `old` at `new` after a provisional id is confirmed.
    pub fn rekey(&mut self, old: NoteId, new: NoteId) {
        for state in self.active.values_mut() {
            match state {
                GestureState::Dragging { id, .. } | GestureState::Resizing { id, .. } if *id == old => *id = new,
                _ => {}
            }
        }
    }
}

fn is_movable(id: NoteId, notes: &NoteRegistry) -> bool {
    notes.get(id).is_some_and(|n| !n.locked)
}

/// Raise `id` above every other note unless it already is. Returns the original z.
fn bring_to_front(id: NoteId, notes: &mut NoteRegistry) -> Option<i64> {
    let orig_z = notes.get(id)?.z_index;
    let others_max = notes.all().iter().filter(|n| n.id != id).map(|n| n.z_index).max();
    if let Some(max) = others_max
        && max >= orig_z
    {
        notes.get_mut(id)?.z_index = max + 1;
    }
    Some(orig_z)
}

fn restore(state: &GestureState, notes: &mut NoteRegistry) {
    match *state {
        GestureState::Dragging { id, origin, orig_z, .. } => {
            if let Some(note) = notes.get_mut(id) {
                note.x = origin.x;
                note.y = origin.y;
                note.z_index = orig_z;
            }
        }
        GestureState::Resizing { id, orig, orig_z, .. } => {
            if let Some(note) = notes.get_mut(id) {
                note.x = orig.x;
                note.y = orig.y;
                note.width = orig.width;
                note.height = orig.height;
                note.z_index = orig_z;
            }
        }
        GestureState::Idle | GestureState::Panning { .. } => {}
    }
}
