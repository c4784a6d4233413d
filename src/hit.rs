#[cfg(test)]
#[path = "hit_test.rs"]
mod hit_test;

use crate::camera::{Camera, Point};
use crate::doc::{Bounds, NoteId, NoteRegistry};

/// Which part of a note was hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HitPart {
    Body,
    ResizeHandle(ResizeAnchor),
}

/// Anchor position for resize handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResizeAnchor {
    N,
    Ne,
    E,
    Se,
    S,
    Sw,
    W,
    Nw,
}

impl ResizeAnchor {
    /// Handle drags the left edge.
    #[must_use]
    pub fn moves_left(self) -> bool {
        matches!(self, Self::W | Self::Nw | Self::Sw)
    }

    /// Handle drags the right edge.
    #[must_use]
    pub fn moves_right(self) -> bool {
        matches!(self, Self::E | Self::Ne | Self::Se)
    }

    /// Handle drags the top edge.
    #[must_use]
    pub fn moves_top(self) -> bool {
        matches!(self, Self::N | Self::Ne | Self::Nw)
    }

    /// Handle drags the bottom edge.
    #[must_use]
    pub fn moves_bottom(self) -> bool {
        matches!(self, Self::S | Self::Se | Self::Sw)
    }
}

/// Result of a hit test.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hit {
    pub note_id: NoteId,
    pub part: HitPart,
}

/// Find the topmost note under `world_pt`.
///
/// Notes are checked in reverse paint order. Unlocked notes expose eight
/// resize handles within `handle_radius_px` screen pixels of their corners and
/// edges; handles win over the body of the same note.
#[must_use]
pub fn hit_test(world_pt: Point, notes: &NoteRegistry, camera: &Camera, handle_radius_px: f64) -> Option<Hit> {
    let radius = camera.screen_dist_to_world(handle_radius_px);
    for note in notes.all().into_iter().rev() {
        let bounds = note.bounds();
        if !note.locked
            && let Some(anchor) = handle_at(world_pt, &bounds, radius)
        {
            return Some(Hit { note_id: note.id, part: HitPart::ResizeHandle(anchor) });
        }
        if bounds.contains(world_pt) {
            return Some(Hit { note_id: note.id, part: HitPart::Body });
        }
    }
    None
}

fn handle_at(pt: Point, b: &Bounds, radius: f64) -> Option<ResizeAnchor> {
    let near = |a: f64, b: f64| (a - b).abs() <= radius;
    let within_x = pt.x >= b.x - radius && pt.x <= b.right() + radius;
    let within_y = pt.y >= b.y - radius && pt.y <= b.bottom() + radius;
    if !within_x || !within_y {
        return None;
    }

    let left = near(pt.x, b.x);
    let right = near(pt.x, b.right());
    let top = near(pt.y, b.y);
    let bottom = near(pt.y, b.bottom());

    match (left, right, top, bottom) {
        (true, _, true, _) => Some(ResizeAnchor::Nw),
        (_, true, true, _) => Some(ResizeAnchor::Ne),
        (true, _, _, true) => Some(ResizeAnchor::Sw),
        (_, true, _, true) => Some(ResizeAnchor::Se),
        (true, _, _, _) => Some(ResizeAnchor::W),
        (_, true, _, _) => Some(ResizeAnchor::E),
        (_, _, true, _) => Some(ResizeAnchor::N),
        (_, _, _, true) => Some(ResizeAnchor::S),
        _ => None,
    }
}
