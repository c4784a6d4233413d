//! Persistence synchronizer. Optimistic commits reconciled against the backend.
//!
//! DESIGN
//! ======
//! Every commit mutates the registry first and returns a [`Request`] for the
//! host to execute. The host later calls [`Synchronizer::resolve`] with the
//! backend's answer. Nothing here performs I/O or waits.
//!
//! Each note carries a local revision counter, bumped on every commit and on
//! gesture start. A response is applied only while no newer local revision
//! exists for the note (a later commit in flight, a gesture in progress, or a
//! later commit already confirmed). Stale successes are ignored. A stale
//! failure only undoes fields that no newer commit names, and is folded into
//! the rollback points of the newer edits. Which fields a commit names is
//! tracked per revision, never inferred from values.
//!
//! Provisional notes (negative ids) never reach the backend except through
//! their create call. Edits and deletes made before the create resolves are
//! flushed as follow-up requests once the server id is known.
//!
//! ERROR HANDLING
//! ==============
//! A failed request rolls back the fields it changed and yields one
//! [`Notice::Failed`]. Bulk deletes are tracked per batch: each item rolls back
//! independently and one [`BulkDeleteReport`] is emitted when the last item
//! resolves.

#[cfg(test)]
#[path = "sync_test.rs"]
mod sync_test;

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::backend::BackendError;
use crate::doc::{Note, NoteDraft, NoteId, NotePatch, NoteRegistry};

// =============================================================================
// TYPES
// =============================================================================

/// Handle tying a backend call to its pending local mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Ticket(pub u64);

/// Identifier of a bulk delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BatchId(pub u64);

/// A backend call the host must perform.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub ticket: Ticket,
    pub op: Operation,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    Create(NoteDraft),
    Update { id: NoteId, patch: NotePatch },
    Delete { id: NoteId },
}

/// Successful backend answer to a [`Request`].
#[derive(Debug, Clone, PartialEq)]
pub enum Response {
    Created(Note),
    Updated(Note),
    Deleted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpKind {
    Create,
    Update,
    Delete,
}

/// A persistence failure reported to the host.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistFailure {
    pub id: NoteId,
    pub op: OpKind,
    pub error: String,
    /// Whether the optimistic change was undone in the registry. False when a
    /// newer local edit superseded the failed one.
    pub rolled_back: bool,
}

/// Outcome of a bulk delete, emitted once every item has resolved.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BulkDeleteReport {
    pub deleted: Vec<NoteId>,
    pub failed: Vec<(NoteId, String)>,
    /// Locked notes the caller was not allowed to delete.
    pub skipped_locked: Vec<NoteId>,
}

/// Something the host application should hear about.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    /// A provisional note received its server id.
    Created { provisional: NoteId, id: NoteId },
    Failed(PersistFailure),
    BulkDeleteFinished(BulkDeleteReport),
}

/// Effects of resolving one request.
#[derive(Debug, Default)]
pub struct Resolution {
    pub notices: Vec<Notice>,
    /// Requests that must be issued as a consequence (provisional flushes).
    pub followups: Vec<Request>,
    /// A provisional id that was replaced by its server id.
    pub rekeyed: Option<(NoteId, NoteId)>,
    /// Notes that disappeared from the registry.
    pub removed: Vec<NoteId>,
}

struct Pending {
    id: NoteId,
    revision: u64,
    generation: u64,
    kind: PendingKind,
}

enum PendingKind {
    Create,
    Update { patch: NotePatch, before: Note },
    Delete { note: Note, batch: Option<BatchId> },
}

impl Pending {
    fn snapshot_mut(&mut self) -> Option<&mut Note> {
        match &mut self.kind {
            PendingKind::Create => None,
            PendingKind::Update { before, .. } => Some(before),
            PendingKind::Delete { note, .. } => Some(note),
        }
    }
}

/// Rollback point held while a gesture manipulates a note.
struct Hold {
    revision: u64,
    before: Note,
    /// A failed commit rewrote `before` during the gesture.
    rebased: bool,
}

#[derive(Default)]
struct Batch {
    remaining: usize,
    report: BulkDeleteReport,
}

/// Local bookkeeping for a note whose create call is still in flight.
struct Provisional {
    /// Set when the note was deleted locally before confirmation.
    deleted: Option<Option<BatchId>>,
}

// =============================================================================
// SYNCHRONIZER
// =============================================================================

pub struct Synchronizer {
    next_ticket: u64,
    next_provisional: i64,
    next_batch: u64,
    generation: u64,
    revisions: HashMap<NoteId, u64>,
    settled: HashMap<NoteId, u64>,
    /// Fields of confirmed updates, kept while an older request is in flight.
    confirmed: HashMap<NoteId, Vec<(u64, NotePatch)>>,
    holds: HashMap<NoteId, Hold>,
    pending: HashMap<Ticket, Pending>,
    batches: HashMap<BatchId, Batch>,
    provisional: HashMap<NoteId, Provisional>,
}

impl Default for Synchronizer {
    fn default() -> Self {
        Self::new()
    }
}

impl Synchronizer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            next_ticket: 1,
            next_provisional: -1,
            next_batch: 1,
            generation: 0,
            revisions: HashMap::new(),
            settled: HashMap::new(),
            confirmed: HashMap::new(),
            holds: HashMap::new(),
            pending: HashMap::new(),
            batches: HashMap::new(),
            provisional: HashMap::new(),
        }
    }

    // --- Queries ---

    /// Number of requests awaiting resolution.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Current local revision of `id` (0 if never touched).
    #[must_use]
    pub fn revision(&self, id: NoteId) -> u64 {
        self.revisions.get(&id).copied().unwrap_or(0)
    }

    // --- Generations ---

    /// Mark a full reload. Responses to earlier requests no longer roll back
    /// or overwrite anything; failures are still reported.
    pub fn begin_generation(&mut self) {
        self.generation += 1;
        self.holds.clear();
    }

    // --- Gestures ---

    /// Record `before` as the rollback point of a note a gesture has started on.
    pub fn begin_local_edit(&mut self, before: Note) {
        let revision = self.bump(before.id);
        self.holds.insert(before.id, Hold { revision, before, rebased: false });
    }

    /// Commit the gesture on `id`: one update carrying every field that changed
    /// since [`Synchronizer::begin_local_edit`]. Returns `None` when the
    /// geometry did not change or the note is provisional.
    pub fn finish_local_edit(&mut self, notes: &NoteRegistry, id: NoteId) -> Option<Request> {
        let hold = self.holds.remove(&id)?;
        let current = notes.get(id)?;
        let patch = NotePatch::diff(&hold.before, current);
        if !patch.touches_geometry() {
            return None;
        }
        let revision = self.bump(id);
        if id.is_provisional() {
            debug!(%id, "gesture on provisional note kept local");
            return None;
        }
        debug!(%id, revision, "gesture committed");
        let op = Operation::Update { id, patch: patch.clone() };
        Some(self.issue(id, revision, PendingKind::Update { patch, before: hold.before }, op))
    }

    /// Drop the gesture hold on `id` after the gesture was cancelled or released
    /// in place. If a failure rebased the rollback point meanwhile, the note's
    /// geometry is put back to it.
    pub fn abandon_local_edit(&mut self, notes: &mut NoteRegistry, id: NoteId) {
        let Some(hold) = self.holds.remove(&id) else {
            return;
        };
        if hold.rebased
            && let Some(note) = notes.get_mut(id)
        {
            let geometry = NotePatch::diff(note, &hold.before).geometry();
            geometry.apply(note);
        }
    }

    // --- Commits ---

    /// Insert a provisional note and request its creation.
    pub fn commit_create(&mut self, notes: &mut NoteRegistry, draft: NoteDraft) -> (NoteId, Request) {
        let id = NoteId(self.next_provisional);
        self.next_provisional -= 1;
        notes.upsert(draft.clone().into_note(id));
        let revision = self.bump(id);
        self.provisional.insert(id, Provisional { deleted: None });
        debug!(%id, "note created optimistically");
        let request = self.issue(id, revision, PendingKind::Create, Operation::Create(draft));
        (id, request)
    }

    /// Merge `patch` into the note and request the update.
    ///
    /// Returns `None` if the note is unknown, the patch is empty, or the note
    /// is provisional (the change is flushed once the note is confirmed).
    pub fn commit_update(&mut self, notes: &mut NoteRegistry, id: NoteId, patch: NotePatch) -> Option<Request> {
        if patch.is_empty() {
            return None;
        }
        let note = notes.get_mut(id)?;
        let before = note.clone();
        patch.apply(note);
        let revision = self.bump(id);
        if id.is_provisional() {
            return None;
        }
        debug!(%id, revision, "note updated optimistically");
        let op = Operation::Update { id, patch: patch.clone() };
        Some(self.issue(id, revision, PendingKind::Update { patch, before }, op))
    }

    /// Move a note to `(x, y)`.
    pub fn commit_position(&mut self, notes: &mut NoteRegistry, id: NoteId, x: f64, y: f64) -> Option<Request> {
        self.commit_update(notes, id, NotePatch::position(x, y))
    }

    /// Resize a note in place to `width` x `height`.
    pub fn commit_resize(&mut self, notes: &mut NoteRegistry, id: NoteId, width: f64, height: f64) -> Option<Request> {
        self.commit_update(notes, id, NotePatch::size(width, height))
    }

    /// Remove a note and request its deletion.
    pub fn commit_delete(&mut self, notes: &mut NoteRegistry, id: NoteId) -> Option<Request> {
        self.delete_one(notes, id, None)
    }

    /// Remove several notes as one logical operation.
    ///
    /// Returns the requests to issue and, if nothing is left to wait for, the
    /// finished report.
    pub fn commit_bulk_delete(
        &mut self,
        notes: &mut NoteRegistry,
        ids: &[NoteId],
        skipped_locked: Vec<NoteId>,
    ) -> (Vec<Request>, Option<Notice>) {
        let batch_id = BatchId(self.next_batch);
        self.next_batch += 1;
        let mut batch = Batch { remaining: 0, report: BulkDeleteReport { skipped_locked, ..Default::default() } };

        let mut requests = Vec::new();
        for &id in ids {
            if !notes.contains(id) {
                continue;
            }
            batch.remaining += 1;
            if let Some(request) = self.delete_one(notes, id, Some(batch_id)) {
                requests.push(request);
            }
        }
        debug!(batch = batch_id.0, count = batch.remaining, "bulk delete started");

        if batch.remaining == 0 {
            return (requests, Some(Notice::BulkDeleteFinished(batch.report)));
        }
        self.batches.insert(batch_id, batch);
        (requests, None)
    }

    fn delete_one(&mut self, notes: &mut NoteRegistry, id: NoteId, batch: Option<BatchId>) -> Option<Request> {
        let note = notes.remove(id)?;
        self.holds.remove(&id);
        let revision = self.bump(id);
        if let Some(entry) = self.provisional.get_mut(&id) {
            entry.deleted = Some(batch);
            debug!(%id, "provisional note deleted locally");
            return None;
        }
        debug!(%id, "note deleted optimistically");
        Some(self.issue(id, revision, PendingKind::Delete { note, batch }, Operation::Delete { id }))
    }

    // --- Resolution ---

    /// Reconcile the backend's answer for `ticket`.
    pub fn resolve(
        &mut self,
        notes: &mut NoteRegistry,
        ticket: Ticket,
        result: Result<Response, BackendError>,
    ) -> Resolution {
        let mut out = Resolution::default();
        let Some(pending) = self.pending.remove(&ticket) else {
            warn!(ticket = ticket.0, "resolution for unknown ticket ignored");
            return out;
        };
        let current = pending.generation == self.generation;
        let id = pending.id;

        match (pending.kind, result) {
            (PendingKind::Create, Ok(Response::Created(server))) => {
                self.confirm_create(notes, pending.id, server, current, &mut out);
            }
            (PendingKind::Create, Ok(_)) => {
                self.fail_create(notes, pending.id, "unexpected response to create".into(), current, &mut out);
            }
            (PendingKind::Create, Err(e)) => {
                self.fail_create(notes, pending.id, e.to_string(), current, &mut out);
            }
            (PendingKind::Update { patch, .. }, Ok(Response::Updated(server))) => {
                let stale = self.superseded(pending.id, pending.revision);
                let settled = self.settled.entry(pending.id).or_insert(0);
                *settled = (*settled).max(pending.revision);
                if stale || !current {
                    debug!(id = %pending.id, revision = pending.revision, "stale update response ignored");
                } else if let Some(note) = notes.get_mut(pending.id) {
                    patch.restore(&server, note);
                }
                self.confirmed.entry(pending.id).or_default().push((pending.revision, patch));
            }
            (PendingKind::Update { patch, before }, result) => {
                let error = match result {
                    Err(e) => e.to_string(),
                    Ok(_) => "unexpected response to update".into(),
                };
                let rolled_back = current && self.roll_back_update(notes, pending.id, pending.revision, &patch, &before);
                warn!(id = %pending.id, %error, rolled_back, "note update failed");
                out.notices.push(Notice::Failed(PersistFailure { id: pending.id, op: OpKind::Update, error, rolled_back }));
            }
            (PendingKind::Delete { batch, .. }, Ok(_)) => {
                self.revisions.remove(&pending.id);
                self.settled.remove(&pending.id);
                self.confirmed.remove(&pending.id);
                if let Some(batch) = batch {
                    self.batch_item(batch, pending.id, None, &mut out);
                }
            }
            (PendingKind::Delete { note, batch }, Err(e)) => {
                let error = e.to_string();
                let rolled_back = current && !notes.contains(note.id);
                if rolled_back {
                    notes.upsert(note);
                }
                warn!(id = %pending.id, %error, rolled_back, "note delete failed");
                match batch {
                    Some(batch) => self.batch_item(batch, pending.id, Some(error), &mut out),
                    None => out.notices.push(Notice::Failed(PersistFailure {
                        id: pending.id,
                        op: OpKind::Delete,
                        error,
                        rolled_back,
                    })),
                }
            }
        }
        self.prune_confirmed(id);
        out
    }

    fn confirm_create(&mut self, notes: &mut NoteRegistry, provisional: NoteId, server: Note, current: bool, out: &mut Resolution) {
        let id = server.id;
        out.notices.push(Notice::Created { provisional, id });
        let entry = self.provisional.remove(&provisional);
        let revision = self.revisions.remove(&provisional);

        if let Some(Provisional { deleted: Some(batch) }) = entry {
            debug!(%provisional, %id, "flushing local delete of confirmed note");
            let revision = self.bump(id);
            let request = self.issue(id, revision, PendingKind::Delete { note: server, batch }, Operation::Delete { id });
            out.followups.push(request);
            return;
        }
        if !current {
            return;
        }
        let Some(mut local) = notes.remove(provisional) else {
            return;
        };
        local.id = id;
        if let Some(revision) = revision {
            self.revisions.insert(id, revision);
        }
        if let Some(mut hold) = self.holds.remove(&provisional) {
            hold.before.id = id;
            self.holds.insert(id, hold);
        }
        out.rekeyed = Some((provisional, id));

        // Edits made mid-gesture are left for the gesture's own commit.
        let edited = self.holds.get(&id).map_or(&local, |h| &h.before);
        let patch = NotePatch::diff(&server, edited);
        notes.upsert(local);
        if patch.is_empty() {
            return;
        }
        debug!(%id, "flushing local edits of confirmed note");
        let revision = self.bump(id);
        let op = Operation::Update { id, patch: patch.clone() };
        let request = self.issue(id, revision, PendingKind::Update { patch, before: server }, op);
        out.followups.push(request);
        if self.holds.contains_key(&id) {
            let revision = self.bump(id);
            if let Some(hold) = self.holds.get_mut(&id) {
                hold.revision = revision;
            }
        }
    }

    fn fail_create(&mut self, notes: &mut NoteRegistry, provisional: NoteId, error: String, current: bool, out: &mut Resolution) {
        let entry = self.provisional.remove(&provisional);
        self.revisions.remove(&provisional);
        self.holds.remove(&provisional);
        warn!(id = %provisional, %error, "note create failed");

        if let Some(Provisional { deleted: Some(batch) }) = entry {
            // Deleted locally before the server ever had it; nothing to restore.
            if let Some(batch) = batch {
                self.batch_item(batch, provisional, None, out);
            }
            return;
        }
        let rolled_back = current && notes.remove(provisional).is_some();
        if rolled_back {
            out.removed.push(provisional);
        }
        out.notices.push(Notice::Failed(PersistFailure { id: provisional, op: OpKind::Create, error, rolled_back }));
    }

    /// Undo a failed update. If newer edits exist, fields they name are left
    /// alone, and their rollback points forget the failed value. A note under
    /// a newer gesture is left where the pointer put it. Returns whether the
    /// registry changed.
    fn roll_back_update(&mut self, notes: &mut NoteRegistry, id: NoteId, revision: u64, patch: &NotePatch, before: &Note) -> bool {
        if !self.superseded(id, revision) {
            return match notes.get_mut(id) {
                Some(note) => {
                    patch.restore(before, note);
                    true
                }
                None => false,
            };
        }
        let successors: Vec<(Ticket, u64)> =
            self.pending.iter().filter(|(_, p)| p.id == id && p.revision > revision).map(|(t, p)| (*t, p.revision)).collect();
        for (ticket, later) in successors {
            let undo = patch.without(&self.named_between(id, revision, later));
            if let Some(snapshot) = self.pending.get_mut(&ticket).and_then(Pending::snapshot_mut) {
                undo.restore(before, snapshot);
            }
        }
        if let Some(held) = self.holds.get(&id).map(|h| h.revision)
            && held > revision
        {
            let undo = patch.without(&self.named_between(id, revision, held));
            if let Some(hold) = self.holds.get_mut(&id) {
                undo.restore(before, &mut hold.before);
                hold.rebased = true;
            }
            return false;
        }
        let undo = patch.without(&self.named_between(id, revision, u64::MAX));
        let Some(note) = notes.get_mut(id) else {
            return false;
        };
        let prior = note.clone();
        undo.restore(before, note);
        *note != prior
    }

    /// Fields named by in-flight or confirmed updates of `id` with a revision
    /// strictly between `after` and `before`.
    fn named_between(&self, id: NoteId, after: u64, before: u64) -> NotePatch {
        let within = |r: u64| r > after && r < before;
        let in_flight = self.pending.values().filter(|p| p.id == id && within(p.revision)).filter_map(|p| match &p.kind {
            PendingKind::Update { patch, .. } => Some(patch),
            PendingKind::Create | PendingKind::Delete { .. } => None,
        });
        let confirmed = self.confirmed.get(&id).into_iter().flatten().filter(|(r, _)| within(*r)).map(|(_, p)| p);
        in_flight.chain(confirmed).fold(NotePatch::default(), |names, p| names.union(p))
    }

    /// Forget confirmed field names no in-flight request of `id` can still need.
    fn prune_confirmed(&mut self, id: NoteId) {
        let oldest = self.pending.values().filter(|p| p.id == id).map(|p| p.revision).min();
        match oldest {
            None => {
                self.confirmed.remove(&id);
            }
            Some(oldest) => {
                if let Some(list) = self.confirmed.get_mut(&id) {
                    list.retain(|(r, _)| *r > oldest);
                }
            }
        }
    }

    /// Whether a local edit newer than `revision` exists for `id`.
    fn superseded(&self, id: NoteId, revision: u64) -> bool {
        self.pending.values().any(|p| p.id == id && p.revision > revision)
            || self.holds.get(&id).is_some_and(|h| h.revision > revision)
            || self.settled.get(&id).is_some_and(|s| *s > revision)
    }

    fn batch_item(&mut self, batch_id: BatchId, id: NoteId, error: Option<String>, out: &mut Resolution) {
        let Some(batch) = self.batches.get_mut(&batch_id) else {
            return;
        };
        match error {
            Some(error) => batch.report.failed.push((id, error)),
            None => batch.report.deleted.push(id),
        }
        batch.remaining = batch.remaining.saturating_sub(1);
        if batch.remaining > 0 {
            return;
        }
        if let Some(done) = self.batches.remove(&batch_id) {
            debug!(
                batch = batch_id.0,
                deleted = done.report.deleted.len(),
                failed = done.report.failed.len(),
                "bulk delete finished"
            );
            out.notices.push(Notice::BulkDeleteFinished(done.report));
        }
    }

    fn bump(&mut self, id: NoteId) -> u64 {
        let revision = self.revisions.entry(id).or_insert(0);
        *revision += 1;
        *revision
    }

    fn issue(&mut self, id: NoteId, revision: u64, kind: PendingKind, op: Operation) -> Request {
        let ticket = Ticket(self.next_ticket);
        self.next_ticket += 1;
        self.pending.insert(ticket, Pending { id, revision, generation: self.generation, kind });
        Request { ticket, op }
    }
}
