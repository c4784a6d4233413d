//! Document model: notes, tags, sparse patches, and the in-memory registry.
//!
//! This module defines the data that lives on the board (`Note`, `Tag`), the
//! payload for creating a note (`NoteDraft`), a sparse-update type for
//! incremental edits (`NotePatch`), and the runtime registry that owns every
//! loaded note (`NoteRegistry`).
//!
//! Data flows into this layer from the backend (JSON deserialization) and from
//! the gesture and sync layers (optimistic mutations). Renderers read from
//! `NoteRegistry::all` to determine paint order.

#[cfg(test)]
#[path = "doc_test.rs"]
mod doc_test;

use std::collections::{BTreeSet, HashMap};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::camera::Point;

/// Identifier of a note.
///
/// Server-assigned ids are positive. Negative ids are provisional: they name a
/// note whose create call has not been confirmed yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NoteId(pub i64);

impl NoteId {
    /// Whether this id was minted locally and is still waiting for the server.
    #[must_use]
    pub fn is_provisional(self) -> bool {
        self.0 < 0
    }
}

impl fmt::Display for NoteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub i64);

impl fmt::Display for TagId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Importance level of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Importance {
    Low,
    #[default]
    Medium,
    High,
}

impl Importance {
    /// Wire name, as used in list filters.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl std::str::FromStr for Importance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown importance: {other}")),
        }
    }
}

/// A tag that notes can reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub name: String,
    pub color: String,
}

/// Axis-aligned rectangle in world coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    /// Whether `pt` lies inside the rectangle (edges inclusive).
    #[must_use]
    pub fn contains(&self, pt: Point) -> bool {
        pt.x >= self.x && pt.x <= self.x + self.width && pt.y >= self.y && pt.y <= self.y + self.height
    }

    #[must_use]
    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

/// A note as stored in the registry and on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Note {
    pub id: NoteId,
    /// Free text body.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub importance: Importance,
    /// Color tag; interpreted by the renderer.
    #[serde(default)]
    pub color: String,
    /// Left edge in world coordinates.
    pub x: f64,
    /// Top edge in world coordinates.
    pub y: f64,
    pub width: f64,
    pub height: f64,
    /// Stacking order; lower values are painted beneath higher values.
    #[serde(default)]
    pub z_index: i64,
    /// Referenced tags. Order is irrelevant.
    #[serde(default)]
    pub tag_ids: BTreeSet<TagId>,
    /// Locked notes refuse gestures and non-privileged geometry edits.
    #[serde(default)]
    pub locked: bool,
}

impl Note {
    #[must_use]
    pub fn bounds(&self) -> Bounds {
        Bounds { x: self.x, y: self.y, width: self.width, height: self.height }
    }

    /// Drop tag references for which `known` returns false. Returns how many were dropped.
    pub fn retain_tags(&mut self, known: impl Fn(TagId) -> bool) -> usize {
        let before = self.tag_ids.len();
        self.tag_ids.retain(|t| known(*t));
        before - self.tag_ids.len()
    }
}

/// Payload for creating a note. The server assigns the id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteDraft {
    pub content: String,
    pub importance: Importance,
    pub color: String,
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
    pub z_index: i64,
    pub tag_ids: BTreeSet<TagId>,
}

impl NoteDraft {
    /// Materialize the draft as a note with the given id.
    #[must_use]
    pub fn into_note(self, id: NoteId) -> Note {
        Note {
            id,
            content: self.content,
            importance: self.importance,
            color: self.color,
            x: self.x,
            y: self.y,
            width: self.width,
            height: self.height,
            z_index: self.z_index,
            tag_ids: self.tag_ids,
            locked: false,
        }
    }
}

/// Sparse update for a note. Only present fields are applied.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotePatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub importance: Option<Importance>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub width: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub z_index: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<BTreeSet<TagId>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locked: Option<bool>,
}

impl NotePatch {
    /// Patch that moves a note.
    #[must_use]
    pub fn position(x: f64, y: f64) -> Self {
        Self { x: Some(x), y: Some(y), ..Default::default() }
    }

    /// Patch that resizes a note in place.
    #[must_use]
    pub fn size(width: f64, height: f64) -> Self {
        Self { width: Some(width), height: Some(height), ..Default::default() }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Whether the patch moves or resizes the note.
    #[must_use]
    pub fn touches_geometry(&self) -> bool {
        self.x.is_some() || self.y.is_some() || self.width.is_some() || self.height.is_some()
    }

    /// Apply every present field to `note`.
    pub fn apply(&self, note: &mut Note) {
        if let Some(ref content) = self.content {
            note.content.clone_from(content);
        }
        if let Some(importance) = self.importance {
            note.importance = importance;
        }
        if let Some(ref color) = self.color {
            note.color.clone_from(color);
        }
        if let Some(x) = self.x {
            note.x = x;
        }
        if let Some(y) = self.y {
            note.y = y;
        }
        if let Some(w) = self.width {
            note.width = w;
        }
        if let Some(h) = self.height {
            note.height = h;
        }
        if let Some(z) = self.z_index {
            note.z_index = z;
        }
        if let Some(ref tags) = self.tag_ids {
            note.tag_ids.clone_from(tags);
        }
        if let Some(locked) = self.locked {
            note.locked = locked;
        }
    }

    /// For every field this patch names, copy the value from `source` into `target`.
    ///
    /// Used to roll back exactly the fields a failed commit touched.
    pub fn restore(&self, source: &Note, target: &mut Note) {
        let undo = Self::diff(target, source);
        let scoped = Self {
            content: self.content.as_ref().and(undo.content),
            importance: self.importance.and(undo.importance),
            color: self.color.as_ref().and(undo.color),
            x: self.x.and(undo.x),
            y: self.y.and(undo.y),
            width: self.width.and(undo.width),
            height: self.height.and(undo.height),
            z_index: self.z_index.and(undo.z_index),
            tag_ids: self.tag_ids.as_ref().and(undo.tag_ids),
            locked: self.locked.and(undo.locked),
        };
        scoped.apply(target);
    }

    /// Every field named by either patch; `self` wins where both do.
    #[must_use]
    pub fn union(mut self, other: &NotePatch) -> Self {
        self.content = self.content.or_else(|| other.content.clone());
        self.importance = self.importance.or(other.importance);
        self.color = self.color.or_else(|| other.color.clone());
        self.x = self.x.or(other.x);
        self.y = self.y.or(other.y);
        self.width = self.width.or(other.width);
        self.height = self.height.or(other.height);
        self.z_index = self.z_index.or(other.z_index);
        self.tag_ids = self.tag_ids.or_else(|| other.tag_ids.clone());
        self.locked = self.locked.or(other.locked);
        self
    }

    /// This patch minus every field `other` names.
    #[must_use]
    pub fn without(&self, other: &NotePatch) -> Self {
        fn keep<T: Clone>(mine: &Option<T>, theirs: &Option<T>) -> Option<T> {
            if theirs.is_some() { None } else { mine.clone() }
        }
        Self {
            content: keep(&self.content, &other.content),
            importance: keep(&self.importance, &other.importance),
            color: keep(&self.color, &other.color),
            x: keep(&self.x, &other.x),
            y: keep(&self.y, &other.y),
            width: keep(&self.width, &other.width),
            height: keep(&self.height, &other.height),
            z_index: keep(&self.z_index, &other.z_index),
            tag_ids: keep(&self.tag_ids, &other.tag_ids),
            locked: keep(&self.locked, &other.locked),
        }
    }

    /// Only the geometry fields (position and size) of this patch.
    #[must_use]
    pub fn geometry(&self) -> Self {
        Self { x: self.x, y: self.y, width: self.width, height: self.height, ..Default::default() }
    }

    /// Patch containing every field where `after` differs from `before`.
    #[must_use]
    #[allow(clippy::float_cmp)]
    pub fn diff(before: &Note, after: &Note) -> Self {
        Self {
            content: (before.content != after.content).then(|| after.content.clone()),
            importance: (before.importance != after.importance).then_some(after.importance),
            color: (before.color != after.color).then(|| after.color.clone()),
            x: (before.x != after.x).then_some(after.x),
            y: (before.y != after.y).then_some(after.y),
            width: (before.width != after.width).then_some(after.width),
            height: (before.height != after.height).then_some(after.height),
            z_index: (before.z_index != after.z_index).then_some(after.z_index),
            tag_ids: (before.tag_ids != after.tag_ids).then(|| after.tag_ids.clone()),
            locked: (before.locked != after.locked).then_some(after.locked),
        }
    }
}

/// In-memory mirror of every loaded note, keyed by id.
///
/// The registry is the rendering source of truth between server round trips.
/// Other components hold ids into it, never copies.
#[derive(Debug, Default)]
pub struct NoteRegistry {
    notes: HashMap<NoteId, Note>,
}

impl NoteRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self { notes: HashMap::new() }
    }

    /// Replace every note with a freshly fetched set.
    pub fn load(&mut self, notes: Vec<Note>) {
        self.notes.clear();
        for note in notes {
            self.notes.insert(note.id, note);
        }
    }

    /// Insert or replace a note, returning the previous copy if any.
    pub fn upsert(&mut self, note: Note) -> Option<Note> {
        self.notes.insert(note.id, note)
    }

    /// Remove a note by id, returning it if it was present.
    pub fn remove(&mut self, id: NoteId) -> Option<Note> {
        self.notes.remove(&id)
    }

    #[must_use]
    pub fn get(&self, id: NoteId) -> Option<&Note> {
        self.notes.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: NoteId) -> Option<&mut Note> {
        self.notes.get_mut(&id)
    }

    #[must_use]
    pub fn contains(&self, id: NoteId) -> bool {
        self.notes.contains_key(&id)
    }

    /// Apply a patch to an existing note. Returns false if the note doesn't exist.
    pub fn apply_patch(&mut self, id: NoteId, patch: &NotePatch) -> bool {
        let Some(note) = self.notes.get_mut(&id) else {
            return false;
        };
        patch.apply(note);
        true
    }

    /// All notes in paint order: `z_index` ascending, ties broken by id ascending.
    #[must_use]
    pub fn all(&self) -> Vec<&Note> {
        let mut notes: Vec<&Note> = self.notes.values().collect();
        notes.sort_by(|a, b| a.z_index.cmp(&b.z_index).then_with(|| a.id.cmp(&b.id)));
        notes
    }

    /// Ids of every loaded note, unordered.
    pub fn ids(&self) -> impl Iterator<Item = NoteId> + '_ {
        self.notes.keys().copied()
    }

    /// Highest `z_index` on the board, if any note is loaded.
    #[must_use]
    pub fn max_z(&self) -> Option<i64> {
        self.notes.values().map(|n| n.z_index).max()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.notes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.notes.is_empty()
    }
}
