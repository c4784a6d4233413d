//! Async driver tying an [`EngineCore`] to a backend.
//!
//! DESIGN
//! ======
//! The engine never waits on the network. `BoardSession` turns each
//! [`Action::Persist`] into a boxed backend future and parks it in a
//! `FuturesUnordered`; the host keeps feeding input and polls completions when
//! it likes. Each completion is resolved back into the engine, whose follow-up
//! requests are queued the same way. Nothing is spawned and in-flight calls
//! are never cancelled.
//!
//! Notices are returned from every call that can produce them and, if the host
//! subscribed, also pushed to an unbounded channel.

#[cfg(test)]
#[path = "session_test.rs"]
mod session_test;

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::backend::{BackendError, NoteBackend, NoteFilter, TagBackend};
use crate::doc::{Tag, TagId};
use crate::engine::{Action, EngineCore};
use crate::error::{BoardError, ErrorCode};
use crate::sync::{Notice, Operation, Request, Response, Ticket};

type Completion = BoxFuture<'static, (Ticket, Result<Response, BackendError>)>;

pub struct BoardSession {
    engine: EngineCore,
    notes: Arc<dyn NoteBackend>,
    tags: Option<Arc<dyn TagBackend>>,
    inflight: FuturesUnordered<Completion>,
    notifier: Option<mpsc::UnboundedSender<Notice>>,
}

impl BoardSession {
    #[must_use]
    pub fn new(engine: EngineCore, notes: Arc<dyn NoteBackend>) -> Self {
        Self { engine, notes, tags: None, inflight: FuturesUnordered::new(), notifier: None }
    }

    /// Attach a tag collaborator.
    #[must_use]
    pub fn with_tags(mut self, tags: Arc<dyn TagBackend>) -> Self {
        self.tags = Some(tags);
        self
    }

    /// Receive every notice on a channel from now on.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<Notice> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.notifier = Some(tx);
        rx
    }

    #[must_use]
    pub fn engine(&self) -> &EngineCore {
        &self.engine
    }

    /// Number of backend calls still running.
    #[must_use]
    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }

    // --- Driving the engine ---

    /// Run an engine call and execute what it asks for.
    pub fn dispatch(&mut self, call: impl FnOnce(&mut EngineCore) -> Vec<Action>) -> Vec<Notice> {
        let actions = call(&mut self.engine);
        self.apply(actions)
    }

    /// Run a fallible engine call and execute what it asks for.
    ///
    /// # Errors
    ///
    /// Returns the engine's [`BoardError`] unchanged; nothing was mutated in that case.
    pub fn try_dispatch(
        &mut self,
        call: impl FnOnce(&mut EngineCore) -> Result<Vec<Action>, BoardError>,
    ) -> Result<Vec<Notice>, BoardError> {
        let actions = call(&mut self.engine).inspect_err(|e| {
            debug!(error = %e, code = e.error_code(), "board operation rejected");
        })?;
        Ok(self.apply(actions))
    }

    /// Queue backend calls and deliver notices. Returns the notices.
    pub fn apply(&mut self, actions: Vec<Action>) -> Vec<Notice> {
        let mut notices = Vec::new();
        for action in actions {
            match action {
                Action::Persist(request) => {
                    let call = self.execute(request);
                    self.inflight.push(call);
                }
                Action::Notify(notice) => {
                    self.deliver(&notice);
                    notices.push(notice);
                }
                Action::Rejected(e) => debug!(error = %e, code = e.error_code(), "input rejected"),
                Action::RenderNeeded => {}
            }
        }
        notices
    }

    fn execute(&self, request: Request) -> Completion {
        let backend = Arc::clone(&self.notes);
        let Request { ticket, op } = request;
        Box::pin(async move {
            let result = match op {
                Operation::Create(draft) => backend.create(&draft).await.map(Response::Created),
                Operation::Update { id, patch } => backend.update(id, &patch).await.map(Response::Updated),
                Operation::Delete { id } => backend.delete(id).await.map(|()| Response::Deleted),
            };
            (ticket, result)
        })
    }

    fn deliver(&self, notice: &Notice) {
        if let Some(tx) = &self.notifier
            && tx.send(notice.clone()).is_err()
        {
            debug!("notice receiver dropped");
        }
    }

    // --- Completions ---

    /// Wait for one in-flight call and resolve it.
    ///
    /// Returns `None` when nothing is in flight, otherwise the notices the
    /// resolution produced.
    pub async fn next_completion(&mut self) -> Option<Vec<Notice>> {
        let (ticket, result) = self.inflight.next().await?;
        if let Err(e) = &result {
            warn!(ticket = ticket.0, error = %e, code = e.error_code(), "backend call failed");
        }
        let actions = self.engine.resolve(ticket, result);
        Some(self.apply(actions))
    }

    /// Resolve every in-flight call, including follow-ups they trigger.
    pub async fn settle(&mut self) -> Vec<Notice> {
        let mut notices = Vec::new();
        while let Some(batch) = self.next_completion().await {
            notices.extend(batch);
        }
        notices
    }

    // --- Loading ---

    /// Fetch the notes matching `filter` and replace the board with them.
    ///
    /// # Errors
    ///
    /// Returns the backend error; the board is left unchanged.
    pub async fn reload(&mut self, filter: &NoteFilter) -> Result<usize, BackendError> {
        let notes = self.notes.list(filter).await?;
        let count = notes.len();
        self.engine.load_notes(notes);
        info!(count, "board reloaded");
        Ok(count)
    }

    fn tag_backend(&self) -> Result<Arc<dyn TagBackend>, BackendError> {
        self.tags.clone().ok_or_else(|| BackendError::InvalidConfig("no tag backend attached".into()))
    }

    /// Fetch the tag catalog into the engine.
    ///
    /// # Errors
    ///
    /// Returns the backend error, or [`BackendError::InvalidConfig`] without a tag backend.
    pub async fn refresh_tags(&mut self) -> Result<usize, BackendError> {
        let tags = self.tag_backend()?.list_tags().await?;
        let count = tags.len();
        self.engine.load_tags(tags);
        Ok(count)
    }

    /// Create a tag and refresh the catalog.
    ///
    /// # Errors
    ///
    /// Returns the backend error, or [`BackendError::InvalidConfig`] without a tag backend.
    pub async fn create_tag(&mut self, name: &str, color: &str) -> Result<Tag, BackendError> {
        let tag = self.tag_backend()?.create_tag(name, color).await?;
        debug!(id = %tag.id, name = %tag.name, "tag created");
        self.refresh_tags().await?;
        Ok(tag)
    }

    /// Delete a tag and refresh the catalog, dropping references to it.
    ///
    /// # Errors
    ///
    /// Returns the backend error, or [`BackendError::InvalidConfig`] without a tag backend.
    pub async fn delete_tag(&mut self, id: TagId) -> Result<(), BackendError> {
        self.tag_backend()?.delete_tag(id).await?;
        debug!(%id, "tag deleted");
        self.refresh_tags().await?;
        Ok(())
    }
}
