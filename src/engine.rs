//! Board controller: the engine's public surface.
//!
//! `EngineCore` wires pointer, wheel and key events to the camera, the gesture
//! controller and the selection, and exposes the board operations (add, update,
//! delete, bulk delete, pan, zoom, select). Every mutating operation checks the
//! caller's [`Role`] first, mutates the registry optimistically through the
//! [`Synchronizer`], and returns [`Action`]s for the host: backend requests to
//! execute, notices to surface, and repaint hints. Backend answers come back
//! through [`EngineCore::resolve`].

#[cfg(test)]
#[path = "engine_test.rs"]
mod engine_test;

use std::collections::BTreeMap;

use tracing::debug;

use crate::backend::BackendError;
use crate::camera::{Camera, Point};
use crate::config::BoardConfig;
use crate::consts::DEFAULT_NOTE_COLOR;
use crate::doc::{Importance, Note, NoteDraft, NoteId, NotePatch, NoteRegistry, Tag, TagId};
use crate::error::BoardError;
use crate::gesture::{GestureController, GestureEnd};
use crate::hit::{HitPart, hit_test};
use crate::input::{Button, Key, Modifiers, PointerId, WheelDelta};
use crate::selection::Selection;
use crate::sync::{Notice, Request, Response, Synchronizer, Ticket};

/// What the caller is allowed to do to the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Role {
    /// Read-only: every mutating call is rejected.
    Viewer,
    /// May mutate, but not move, resize, unlock or delete locked notes.
    #[default]
    Editor,
    /// May mutate and override locks.
    Admin,
}

impl Role {
    #[must_use]
    pub fn can_mutate(self) -> bool {
        !matches!(self, Self::Viewer)
    }

    #[must_use]
    pub fn overrides_lock(self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// Actions returned from engine calls for the host to process.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    /// Execute this backend call and feed the result to [`EngineCore::resolve`].
    Persist(Request),
    /// Surface this to the user.
    Notify(Notice),
    /// An input-driven operation was refused.
    Rejected(BoardError),
    RenderNeeded,
}

/// Core engine state. Performs no I/O.
pub struct EngineCore {
    notes: NoteRegistry,
    camera: Camera,
    selection: Selection,
    gestures: GestureController,
    sync: Synchronizer,
    /// Known tags; `None` until a catalog has been loaded.
    tags: Option<BTreeMap<TagId, Tag>>,
    role: Role,
    config: BoardConfig,
    pub viewport_width: f64,
    pub viewport_height: f64,
}

impl Default for EngineCore {
    fn default() -> Self {
        Self::new(BoardConfig::default(), Role::default())
    }
}

impl EngineCore {
    #[must_use]
    pub fn new(config: BoardConfig, role: Role) -> Self {
        Self {
            notes: NoteRegistry::new(),
            camera: Camera::new(config.zoom),
            selection: Selection::new(),
            gestures: GestureController::new(),
            sync: Synchronizer::new(),
            tags: None,
            role,
            config,
            viewport_width: 0.0,
            viewport_height: 0.0,
        }
    }

    // --- Queries ---

    #[must_use]
    pub fn notes(&self) -> &NoteRegistry {
        &self.notes
    }

    #[must_use]
    pub fn note(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(id)
    }

    #[must_use]
    pub fn camera(&self) -> Camera {
        self.camera
    }

    #[must_use]
    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn config(&self) -> &BoardConfig {
        &self.config
    }

    /// Loaded tags in id order. Empty until a catalog is loaded.
    #[must_use]
    pub fn tags(&self) -> Vec<&Tag> {
        self.tags.iter().flat_map(BTreeMap::values).collect()
    }

    /// Number of backend calls still awaiting [`EngineCore::resolve`].
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.sync.pending_count()
    }

    /// Whether any pointer is dragging, resizing or panning.
    #[must_use]
    pub fn is_interacting(&self) -> bool {
        self.gestures.active_count() > 0
    }

    // --- Host inputs ---

    pub fn set_viewport(&mut self, width: f64, height: f64) {
        self.viewport_width = width;
        self.viewport_height = height;
    }

    pub fn set_role(&mut self, role: Role) {
        self.role = role;
    }

    /// Replace every note with a freshly fetched set.
    ///
    /// Active gestures are dropped, the selection is cleared, and responses to
    /// calls issued before the reload no longer roll anything back.
    pub fn load_notes(&mut self, notes: Vec<Note>) -> Vec<Action> {
        self.gestures.cancel_all(&mut self.notes);
        self.sync.begin_generation();
        self.notes.load(notes);
        self.prune_tags();
        self.selection.clear();
        debug!(count = self.notes.len(), "notes loaded");
        vec![Action::RenderNeeded]
    }

    /// Replace the tag catalog and drop note references to tags outside it.
    pub fn load_tags(&mut self, tags: Vec<Tag>) -> Vec<Action> {
        self.tags = Some(tags.into_iter().map(|t| (t.id, t)).collect());
        self.prune_tags();
        vec![Action::RenderNeeded]
    }

    fn prune_tags(&mut self) {
        let Some(catalog) = &self.tags else {
            return;
        };
        let ids: Vec<NoteId> = self.notes.ids().collect();
        for id in ids {
            if let Some(note) = self.notes.get_mut(id) {
                let dropped = note.retain_tags(|t| catalog.contains_key(&t));
                if dropped > 0 {
                    debug!(%id, dropped, "dangling tag references dropped");
                }
            }
        }
    }

    /// Feed the backend's answer to an earlier [`Action::Persist`].
    pub fn resolve(&mut self, ticket: Ticket, result: Result<Response, BackendError>) -> Vec<Action> {
        let res = self.sync.resolve(&mut self.notes, ticket, result);
        if let Some((old, new)) = res.rekeyed {
            self.selection.rekey(old, new);
            self.gestures.rekey(old, new);
        }
        for id in res.removed {
            self.selection.remove(id);
            self.gestures.forget_note(id);
        }
        let mut actions: Vec<Action> = res.followups.into_iter().map(Action::Persist).collect();
        actions.extend(res.notices.into_iter().map(Action::Notify));
        actions.push(Action::RenderNeeded);
        actions
    }

    // --- Board operations ---

    fn ensure_can_mutate(&self) -> Result<(), BoardError> {
        if self.role.can_mutate() { Ok(()) } else { Err(BoardError::PermissionDenied) }
    }

    /// Add a default note centered in the viewport.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::PermissionDenied`] for read-only callers.
    pub fn add_note(&mut self) -> Result<Vec<Action>, BoardError> {
        let center = self.camera.screen_to_world(Point::new(self.viewport_width / 2.0, self.viewport_height / 2.0));
        let draft = NoteDraft {
            content: String::new(),
            importance: Importance::default(),
            color: DEFAULT_NOTE_COLOR.to_owned(),
            x: center.x - self.config.default_width / 2.0,
            y: center.y - self.config.default_height / 2.0,
            width: self.config.default_width,
            height: self.config.default_height,
            z_index: 0,
            tag_ids: Default::default(),
        };
        self.add_note_with(draft)
    }

    /// Add a note from `draft`, stacked above every existing note.
    ///
    /// The size is raised to the configured minimum if needed.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::PermissionDenied`] for read-only callers.
    pub fn add_note_with(&mut self, mut draft: NoteDraft) -> Result<Vec<Action>, BoardError> {
        self.ensure_can_mutate()?;
        draft.width = draft.width.max(self.config.min_size.min_width);
        draft.height = draft.height.max(self.config.min_size.min_height);
        draft.z_index = self.notes.max_z().map_or(0, |z| z + 1);
        let (id, request) = self.sync.commit_create(&mut self.notes, draft);
        debug!(%id, "note added");
        Ok(vec![Action::Persist(request), Action::RenderNeeded])
    }

    /// Merge `patch` into a note.
    ///
    /// # Errors
    ///
    /// - [`BoardError::PermissionDenied`] for read-only callers.
    /// - [`BoardError::NotFound`] if the note is not loaded.
    /// - [`BoardError::Locked`] if the patch moves, resizes or unlocks a locked
    ///   note and the caller cannot override locks.
    /// - [`BoardError::BelowMinimumSize`] if the patch sets a width or height
    ///   below the configured minimum.
    pub fn update_note(&mut self, id: NoteId, patch: NotePatch) -> Result<Vec<Action>, BoardError> {
        self.ensure_can_mutate()?;
        let note = self.notes.get(id).ok_or(BoardError::NotFound(id))?;
        let unlocks = patch.locked == Some(false);
        if note.locked && (patch.touches_geometry() || unlocks) && !self.role.overrides_lock() {
            return Err(BoardError::Locked(id));
        }
        let min = self.config.min_size;
        let too_narrow = patch.width.is_some_and(|w| w < min.min_width);
        let too_short = patch.height.is_some_and(|h| h < min.min_height);
        if too_narrow || too_short {
            return Err(BoardError::BelowMinimumSize {
                width: patch.width.unwrap_or(note.width),
                height: patch.height.unwrap_or(note.height),
                min_width: min.min_width,
                min_height: min.min_height,
            });
        }
        let mut actions: Vec<Action> = self.sync.commit_update(&mut self.notes, id, patch).into_iter().map(Action::Persist).collect();
        actions.push(Action::RenderNeeded);
        Ok(actions)
    }

    /// Delete one note.
    ///
    /// # Errors
    ///
    /// - [`BoardError::PermissionDenied`] for read-only callers.
    /// - [`BoardError::NotFound`] if the note is not loaded.
    /// - [`BoardError::Locked`] if the note is locked and the caller cannot override locks.
    pub fn delete_note(&mut self, id: NoteId) -> Result<Vec<Action>, BoardError> {
        self.ensure_can_mutate()?;
        let note = self.notes.get(id).ok_or(BoardError::NotFound(id))?;
        if note.locked && !self.role.overrides_lock() {
            return Err(BoardError::Locked(id));
        }
        self.gestures.forget_note(id);
        self.selection.remove(id);
        let mut actions: Vec<Action> = self.sync.commit_delete(&mut self.notes, id).into_iter().map(Action::Persist).collect();
        actions.push(Action::RenderNeeded);
        Ok(actions)
    }

    /// Delete several notes as one operation.
    ///
    /// Unknown ids are ignored. Locked notes are skipped unless the caller can
    /// override locks and are listed in the eventual [`crate::sync::BulkDeleteReport`].
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::PermissionDenied`] for read-only callers.
    pub fn bulk_delete(&mut self, ids: &[NoteId]) -> Result<Vec<Action>, BoardError> {
        self.ensure_can_mutate()?;
        let overrides = self.role.overrides_lock();
        let (locked, deletable): (Vec<NoteId>, Vec<NoteId>) = ids
            .iter()
            .copied()
            .filter(|id| self.notes.contains(*id))
            .partition(|id| !overrides && self.notes.get(*id).is_some_and(|n| n.locked));
        for &id in &deletable {
            self.gestures.forget_note(id);
            self.selection.remove(id);
        }
        if !locked.is_empty() {
            debug!(skipped = locked.len(), "locked notes skipped by bulk delete");
        }
        let (requests, finished) = self.sync.commit_bulk_delete(&mut self.notes, &deletable, locked);
        let mut actions: Vec<Action> = requests.into_iter().map(Action::Persist).collect();
        actions.extend(finished.map(Action::Notify));
        actions.push(Action::RenderNeeded);
        Ok(actions)
    }

    /// Delete every selected note.
    ///
    /// # Errors
    ///
    /// Returns [`BoardError::PermissionDenied`] for read-only callers.
    pub fn bulk_delete_selected(&mut self) -> Result<Vec<Action>, BoardError> {
        let ids = self.selection.ids();
        self.bulk_delete(&ids)
    }

    // --- Viewport ---

    /// Pan by a screen-space delta.
    pub fn pan(&mut self, dx: f64, dy: f64) -> Vec<Action> {
        self.camera.pan(dx, dy);
        vec![Action::RenderNeeded]
    }

    /// Zoom by `delta`, keeping the world point under `pivot` fixed on screen.
    pub fn zoom_at(&mut self, delta: f64, pivot: Option<Point>) -> Vec<Action> {
        self.camera.zoom_by(delta, pivot);
        vec![Action::RenderNeeded]
    }

    // --- Selection ---

    /// Flip the selection state of a loaded note. Returns whether it is now selected.
    pub fn toggle_select(&mut self, id: NoteId) -> bool {
        self.selection.toggle(id, &self.notes)
    }

    pub fn select_all(&mut self) {
        let ids: Vec<NoteId> = self.notes.ids().collect();
        self.selection.select_all(ids, &self.notes);
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    // --- Input events ---

    pub fn on_pointer_down(&mut self, pointer: PointerId, screen: Point, button: Button, modifiers: Modifiers) -> Vec<Action> {
        match button {
            Button::Middle => {
                self.gestures.begin_pan(pointer, screen);
                return Vec::new();
            }
            Button::Secondary => return Vec::new(),
            Button::Primary => {}
        }

        let world = self.camera.screen_to_world(screen);
        let Some(hit) = hit_test(world, &self.notes, &self.camera, self.config.handle_radius_px) else {
            if !modifiers.toggles_selection() {
                self.selection.clear();
            }
            self.gestures.begin_pan(pointer, screen);
            return vec![Action::RenderNeeded];
        };

        if modifiers.toggles_selection() {
            self.selection.toggle(hit.note_id, &self.notes);
            return vec![Action::RenderNeeded];
        }
        if let Err(e) = self.ensure_can_mutate() {
            return vec![Action::Rejected(e)];
        }

        let id = hit.note_id;
        let Some(before) = self.notes.get(id).cloned() else {
            return Vec::new();
        };
        let started = match hit.part {
            HitPart::Body => self.gestures.begin_drag(pointer, id, world, &mut self.notes),
            HitPart::ResizeHandle(anchor) => self.gestures.begin_resize(pointer, id, anchor, world, &mut self.notes),
        };
        if !started {
            return Vec::new();
        }
        self.sync.begin_local_edit(before);
        vec![Action::RenderNeeded]
    }

    pub fn on_pointer_move(&mut self, pointer: PointerId, screen: Point) -> Vec<Action> {
        let moved =
            self.gestures.pointer_move(pointer, screen, &mut self.camera, &mut self.notes, self.config.min_size);
        if moved { vec![Action::RenderNeeded] } else { Vec::new() }
    }

    /// Finish the pointer's gesture; a note whose geometry changed is committed once.
    pub fn on_pointer_up(&mut self, pointer: PointerId) -> Vec<Action> {
        match self.gestures.pointer_up(pointer, &mut self.notes) {
            GestureEnd::None => Vec::new(),
            GestureEnd::Commit { id } => {
                let mut actions: Vec<Action> =
                    self.sync.finish_local_edit(&self.notes, id).into_iter().map(Action::Persist).collect();
                actions.push(Action::RenderNeeded);
                actions
            }
            GestureEnd::Released { id } | GestureEnd::Cancelled { id } => {
                if let Some(id) = id {
                    self.sync.abandon_local_edit(&mut self.notes, id);
                }
                vec![Action::RenderNeeded]
            }
        }
    }

    /// Abort the pointer's gesture (capture lost); the note returns to its pre-gesture geometry.
    pub fn on_pointer_cancel(&mut self, pointer: PointerId) -> Vec<Action> {
        match self.gestures.cancel(pointer, &mut self.notes) {
            GestureEnd::None => Vec::new(),
            end => {
                if let GestureEnd::Cancelled { id: Some(id) } = end {
                    self.sync.abandon_local_edit(&mut self.notes, id);
                }
                vec![Action::RenderNeeded]
            }
        }
    }

    pub fn on_wheel(&mut self, screen: Point, delta: WheelDelta, modifiers: Modifiers) -> Vec<Action> {
        if modifiers.zooms_wheel() {
            self.zoom_at(-delta.dy * self.config.wheel_zoom_step, Some(screen))
        } else {
            self.pan(-delta.dx, -delta.dy)
        }
    }

    pub fn on_key_down(&mut self, key: &Key, _modifiers: Modifiers) -> Vec<Action> {
        if key.is("Escape") {
            let ids = self.gestures.cancel_all(&mut self.notes);
            for id in ids {
                self.sync.abandon_local_edit(&mut self.notes, id);
            }
            return vec![Action::RenderNeeded];
        }
        if (key.is("Delete") || key.is("Backspace")) && !self.selection.is_empty() {
            return match self.bulk_delete_selected() {
                Ok(actions) => actions,
                Err(e) => {
                    debug!(error = %e, "delete key rejected");
                    vec![Action::Rejected(e)]
                }
            };
        }
        Vec::new()
    }
}
